use crate::extract::packing_list::KEY_COLUMN;
use crate::extract::rule::ColumnSelection;
use crate::extract::rule::EmptyRows;
use crate::extract::rule::ExtractionRule;
use crate::extract::rule::KeyCell;
use crate::extract::rule::SheetChoice;
use crate::extract::rule::Truncation;

/// Invoice columns read from `B:L`, in sheet order.
pub const FIXED_COLUMNS: [&str; 11] = [
    "P/N", "DESCRIPTION", "HS", "NAME", "UNIT", "Q'TY (SET)",
    "U/P (USD)", "AMOUNT (USD)", "NW", "GW", "IsKits",
];

/// Canonical invoice columns: the fixed columns followed by BOL.
pub fn columns() -> Vec<String> {
    FIXED_COLUMNS.iter()
        .map(|column| column.to_string())
        .chain([KEY_COLUMN.to_owned()])
        .collect()
}

/// Invoices: B:L of the first sheet below the header in row 13, cut at the
/// Total row, keyed by the invoice number in G1 of the active sheet.
pub(crate) fn rule() -> ExtractionRule {
    ExtractionRule {
        kind: "invoice",
        pattern: "* HIC Invoice.xlsx",
        data_sheet: SheetChoice::First,
        header_sheet: SheetChoice::Active,
        columns: ColumnSelection::Window("B:L"),
        data_row: 14,
        truncate: Some(Truncation { column: 4, needle: "Total" }),
        empty_rows: EmptyRows::Keep,
        key: Some(KeyCell { cell: "G1", guard: None, strip: Some("INVOICE NO.") }),
        lead_row: None,
        output_columns: columns(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::reference::reference_to_index;
    use crate::spreadsheet::sheet::Sheet;
    use crate::table::Value;

    fn sheet(cells: &[(&str, Value)]) -> Sheet {
        let mut sheet = Sheet::new("X HIC Invoice.xlsx", "INV");
        for (reference, value) in cells {
            let (row, col) = reference_to_index(reference).unwrap();
            sheet.push(row, col, value.clone());
        }
        sheet
    }

    #[test]
    fn invoice_number_label_is_stripped() {
        let sheet = sheet(&[
            ("G1", "INVOICE NO. HIC-2024-07".into()),
            ("B13", "P/N".into()),
            ("B14", "PN-1".into()),
            ("G14", Value::Number(5.0)),
            ("B15", "PN-2".into()),
            ("F16", "TOTAL".into()),
            ("B17", "PN-3".into()),
        ]);
        let records = rule().extract_sheet(&sheet, false).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0][0], Value::from("PN-1"));
        assert_eq!(records[0][5], Value::Number(5.0));
        assert_eq!(records[1][11], Value::from("HIC-2024-07"));
    }

    #[test]
    fn missing_invoice_number_gives_blank_key() {
        let sheet = sheet(&[("B14", "PN-1".into())]);
        let records = rule().extract_sheet(&sheet, false).unwrap();
        assert_eq!(records, vec![{
            let mut record = vec![Value::Empty; 12];
            record[0] = "PN-1".into();
            record[11] = "".into();
            record
        }]);
    }
}
