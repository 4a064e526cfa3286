use crate::extract::rule::ColumnSelection;
use crate::extract::rule::EmptyRows;
use crate::extract::rule::ExtractionRule;
use crate::extract::rule::KeyCell;
use crate::extract::rule::SheetChoice;
use crate::extract::rule::Truncation;

/// Shipment key column shared by every extracted kind.
pub const KEY_COLUMN: &str = "BOL";
/// Delivery address column, always left blank.
pub const ADDRESS_COLUMN: &str = "收货地址";
/// Number of positional columns read from `B:P`.
pub const FIXED_COLUMNS: usize = 15;

/// Canonical packing-list columns: "0".."14", BOL, 收货地址.
pub fn columns() -> Vec<String> {
    (0..FIXED_COLUMNS)
        .map(|index| index.to_string())
        .chain([KEY_COLUMN.to_owned(), ADDRESS_COLUMN.to_owned()])
        .collect()
}

/// Packing lists: B:P of the first sheet from row 12 up to the TOTAL row,
/// keyed by K5 of the active sheet, with row 11 of the active sheet kept as
/// a leading header record for the first file.
pub(crate) fn rule() -> ExtractionRule {
    ExtractionRule {
        kind: "packing list",
        pattern: "* Packing List.xlsx",
        data_sheet: SheetChoice::First,
        header_sheet: SheetChoice::Active,
        columns: ColumnSelection::Window("B:P"),
        data_row: 12,
        truncate: Some(Truncation { column: 0, needle: "TOTAL" }),
        empty_rows: EmptyRows::Drop,
        key: Some(KeyCell { cell: "K5", guard: Some("K5"), strip: None }),
        lead_row: Some(11),
        output_columns: columns(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::reference::reference_to_index;
    use crate::spreadsheet::sheet::Sheet;
    use crate::table::Value;

    #[test]
    fn total_row_ends_the_data() {
        let mut sheet = Sheet::new("A Packing List.xlsx", "PL");
        for (reference, value) in [
            ("K5", Value::from("SEA123")),
            ("B11", Value::from("CTN")),
            ("B12", Value::from("1")),
            ("C12", Value::Number(10.0)),
            ("B13", Value::from("2")),
            ("B15", Value::from("total:")),
            ("B16", Value::from("3")),
        ] {
            let (row, col) = reference_to_index(reference).unwrap();
            sheet.push(row, col, value);
        }

        let records = rule().extract_sheet(&sheet, true).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0][0], Value::from("CTN"));
        assert_eq!(records[1][1], Value::Number(10.0));
        assert_eq!(records[2][0], Value::from("2"));
        assert!(records.iter().all(|record| record.len() == 17));
        assert!(records.iter().all(|record| record[15] == Value::from("SEA123")));
        assert!(records.iter().all(|record| record[16] == Value::Empty));
    }

    #[test]
    fn column_names() {
        let columns = columns();
        assert_eq!(columns.len(), 17);
        assert_eq!(columns[0], "0");
        assert_eq!(columns[14], "14");
        assert_eq!(columns[15], "BOL");
        assert_eq!(columns[16], "收货地址");
    }
}
