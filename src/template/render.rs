//! Writes the extracted tables into the four template sheets.
use crate::config::Config;
use crate::error::CustomsError;
use crate::error::ResultMessage;
use crate::extract::contract;
use crate::extract::declaration;
use crate::extract::invoice;
use crate::extract::packing_list;
use crate::extract::DeclarationTables;
use crate::table::Table;
use crate::table::Value;
use crate::template::merge::merge_key_column;
use crate::template::workbook::TemplateWorkbook;
use log::debug;
use log::info;
use log::warn;
use std::path::Path;

/// What goes into the header row of a sheet.
#[derive(Clone, Debug)]
pub(crate) enum Headers {
    /// Column names written from column A
    Names(Vec<String>),
    /// The first `width` values of the first record, followed by `labels`;
    /// the first record is not written as data
    FirstRecord {
        width: usize,
        labels: &'static [&'static str],
    },
}

/// Fixed positions of one template sheet.
#[derive(Clone, Debug)]
pub(crate) struct SheetLayout {
    pub(crate) sheet: &'static str,
    /// Cell receiving the file identifier
    pub(crate) id_cell: Option<&'static str>,
    /// Cell receiving the processing date
    pub(crate) date_cell: Option<&'static str>,
    /// Picture file name in the image folder and its anchor cell
    pub(crate) image: Option<(&'static str, &'static str)>,
    /// 1-based
    pub(crate) header_row: usize,
    /// 1-based
    pub(crate) data_row: usize,
    pub(crate) headers: Headers,
    /// Column letters whose equal adjacent keys are merged
    pub(crate) key_column: Option<&'static str>,
    /// Existing merges overlapping `row..=row + table length` are removed first
    pub(crate) unmerge_from: Option<usize>,
}

pub(crate) fn packing_list_layout() -> SheetLayout {
    SheetLayout {
        sheet: "PKL ",
        id_cell: Some("J10"),
        date_cell: Some("J11"),
        image: Some(("01.png", "A1")),
        header_row: 14,
        data_row: 15,
        headers: Headers::FirstRecord {
            width: packing_list::FIXED_COLUMNS,
            labels: &[packing_list::KEY_COLUMN, packing_list::ADDRESS_COLUMN],
        },
        key_column: Some("P"),
        unmerge_from: Some(14),
    }
}

pub(crate) fn invoice_layout() -> SheetLayout {
    SheetLayout {
        sheet: "INV",
        id_cell: Some("G14"),
        date_cell: Some("G15"),
        image: Some(("02.png", "A1")),
        header_row: 18,
        data_row: 19,
        headers: Headers::Names(invoice::columns()),
        key_column: Some("L"),
        unmerge_from: Some(19),
    }
}

pub(crate) fn contract_layout() -> SheetLayout {
    SheetLayout {
        sheet: "合同 ",
        id_cell: Some("F2"),
        date_cell: Some("F3"),
        image: None,
        header_row: 11,
        data_row: 12,
        headers: Headers::Names(contract::COLUMNS.iter().map(|column| column.to_string()).collect()),
        key_column: None,
        unmerge_from: None,
    }
}

pub(crate) fn declaration_layout() -> SheetLayout {
    SheetLayout {
        sheet: "申报要素",
        id_cell: None,
        date_cell: None,
        image: None,
        header_row: 1,
        data_row: 2,
        headers: Headers::Names(declaration::columns()),
        key_column: None,
        unmerge_from: None,
    }
}

/// Fills the template with the four tables and writes the result to `output_path`.
///
/// # Arguments
/// * `config` - Supplies the template and image locations
/// * `tables` - Extracted and derived tables
/// * `file_id` - Identifier written into the metadata cells
/// * `date` - Processing date written into the metadata cells
/// * `output_path` - Destination workbook
pub(crate) fn render(config: &Config, tables: &DeclarationTables, file_id: &str, date: &str, output_path: &Path) -> Result<(), CustomsError> {
    let mut workbook = TemplateWorkbook::open(&config.template_path)?;
    let sheets = [
        (packing_list_layout(), &tables.packing_list),
        (invoice_layout(), &tables.invoice),
        (contract_layout(), &tables.contract),
        (declaration_layout(), &tables.declaration),
    ];
    for (layout, table) in &sheets {
        render_sheet(&mut workbook, layout, table, file_id, date, &config.images_dir)
            .with_prefix(&format!("Failed to fill sheet '{}'", layout.sheet))?;
    }
    workbook.center_all_cells()?;
    workbook.save(output_path)?;
    info!("Wrote {}", output_path.display());
    Ok(())
}

fn render_sheet(
    workbook: &mut TemplateWorkbook,
    layout: &SheetLayout,
    table: &Table,
    file_id: &str,
    date: &str,
    images_dir: &Path,
) -> Result<(), CustomsError> {
    let worksheet = workbook.worksheet_mut(layout.sheet)?;
    if let Some(cell) = layout.id_cell {
        worksheet.set(cell, &Value::from(file_id))?;
    }
    if let Some(cell) = layout.date_cell {
        worksheet.set(cell, &Value::from(date))?;
    }

    if let Some((file_name, anchor)) = layout.image {
        let image_path = images_dir.join(file_name);
        if image_path.is_file() {
            workbook.add_image(layout.sheet, &image_path, anchor)?;
        } else {
            warn!("Image {} not found, sheet '{}' is left without it", image_path.display(), layout.sheet);
        }
    }

    let worksheet = workbook.worksheet_mut(layout.sheet)?;
    if let Some(first_row) = layout.unmerge_from {
        if !table.is_empty() {
            let removed = worksheet.unmerge_overlapping(first_row - 1, first_row - 1 + table.len());
            debug!("Removed {} merged range(s) from '{}', {} left", removed.len(), layout.sheet, worksheet.merges().len());
        }
    }

    let header_row = layout.header_row - 1;
    let records = match &layout.headers {
        Headers::Names(names) => {
            for (col, name) in names.iter().enumerate() {
                worksheet.set_value(header_row, col, &Value::from(name.as_str()));
            }
            table.records()
        }
        Headers::FirstRecord { width, labels } => {
            if let Some(first) = table.records().first() {
                for (col, value) in first.iter().take(*width).enumerate() {
                    worksheet.set_value(header_row, col, value);
                }
            }
            for (offset, label) in labels.iter().enumerate() {
                worksheet.set_value(header_row, width + offset, &Value::from(*label));
            }
            table.records().get(1..).unwrap_or_default()
        }
    };

    let data_row = layout.data_row - 1;
    for (index, record) in records.iter().enumerate() {
        for (col, value) in record.iter().enumerate() {
            worksheet.set_value(data_row + index, col, value);
        }
    }

    if let Some(column) = layout.key_column {
        // Keys of the written records only; a leading header record is skipped
        let keys = table.key_values(packing_list::KEY_COLUMN);
        let skipped = keys.len().saturating_sub(records.len());
        let merged = merge_key_column(worksheet, &keys[skipped..], column, layout.data_row)?;
        debug!("Merged {} range(s) in column {} of '{}'", merged.len(), column, layout.sheet);
    }
    if records.is_empty() {
        warn!("Sheet '{}' has no rows to write", layout.sheet);
    } else {
        info!("Sheet '{}': {} row(s) written", layout.sheet, records.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::xlsx::XlsxSpreadsheet;
    use crate::template::package::Package;
    use crate::test_support::png;
    use crate::test_support::template;
    use crate::test_support::SheetFixture;
    use crate::test_support::WorkbookFixture;

    fn packing(rows: &[(&str, &str)]) -> Table {
        let mut table = Table::new(&packing_list::columns());
        for (first, key) in rows {
            let mut values = vec![Value::Empty; 17];
            values[0] = Value::from(*first);
            values[15] = Value::from(*key);
            table.push(values);
        }
        table
    }

    fn tables(packing_list: Table) -> DeclarationTables {
        let invoice = Table::new(&invoice::columns());
        DeclarationTables {
            packing_list,
            contract: contract::build_contract(&invoice),
            invoice,
            declaration: Table::new(&declaration::columns()),
        }
    }

    #[test]
    fn packing_list_header_record_and_merges() {
        let directory = tempfile::tempdir().unwrap();
        let config = Config::new(directory.path())
            .with_template_path(directory.path().join("001.xlsx"))
            .with_images_dir(directory.path().join("images"));
        template().write(&config.template_path);
        std::fs::create_dir(&config.images_dir).unwrap();
        std::fs::write(config.images_dir.join("01.png"), png(10, 10)).unwrap();

        let output = directory.path().join("out.xlsx");
        let table = packing(&[("CTN", "SEA-1"), ("1", "SEA-1"), ("2", "SEA-1"), ("3", "SEA-2")]);
        render(&config, &tables(table), "WWSH20240305001", "2024/3/5", &output).unwrap();

        let mut spreadsheet = XlsxSpreadsheet::open(&output).unwrap();
        let sheet = spreadsheet.read_sheet("PKL ").unwrap();
        assert_eq!(sheet.get(9, 9), Value::from("WWSH20240305001"));
        assert_eq!(sheet.get(10, 9), Value::from("2024/3/5"));
        assert_eq!(sheet.get(13, 0), Value::from("CTN"));
        assert_eq!(sheet.get(13, 15), Value::from("BOL"));
        assert_eq!(sheet.get(13, 16), Value::from("收货地址"));
        assert_eq!(sheet.get(14, 0), Value::from("1"));
        assert_eq!(sheet.get(14, 15), Value::from("SEA-1"));
        // Covered cells of a merged range are cleared
        assert_eq!(sheet.get(15, 15), Value::Empty);
        assert_eq!(sheet.get(16, 15), Value::from("SEA-2"));

        let inv = spreadsheet.read_sheet("INV").unwrap();
        assert_eq!(inv.get(17, 0), Value::from("P/N"));
        assert_eq!(inv.get(17, 11), Value::from("BOL"));
        assert_eq!(inv.get(13, 6), Value::from("WWSH20240305001"));
        let decl = spreadsheet.read_sheet("申报要素").unwrap();
        assert_eq!(decl.get(0, 10), Value::from("申报要素"));
        let contract = spreadsheet.read_sheet("合同 ").unwrap();
        assert_eq!(contract.get(10, 2), Value::from("单位"));
        assert_eq!(contract.get(2, 5), Value::from("2024/3/5"));

        let package = Package::open(&output).unwrap();
        let pkl = String::from_utf8(package.part("xl/worksheets/sheet1.xml").unwrap().to_vec()).unwrap();
        assert!(pkl.contains(r#"<mergeCell ref="P15:P16"/>"#), "{pkl}");
        assert!(!pkl.contains(r#"<mergeCell ref="A15:C15"/>"#), "{pkl}");
        assert!(package.contains("xl/media/image1.png"));
        assert!(!package.contains("xl/media/image2.png"));
    }

    #[test]
    fn empty_packing_list_only_writes_labels() {
        let directory = tempfile::tempdir().unwrap();
        let config = Config::new(directory.path()).with_template_path(directory.path().join("001.xlsx"));
        template().write(&config.template_path);
        let output = directory.path().join("out.xlsx");
        render(&config, &tables(packing(&[])), "ID", "DATE", &output).unwrap();

        let mut spreadsheet = XlsxSpreadsheet::open(&output).unwrap();
        let sheet = spreadsheet.read_sheet("PKL ").unwrap();
        assert_eq!(sheet.get(13, 15), Value::from("BOL"));
        assert_eq!(sheet.get(13, 16), Value::from("收货地址"));
        assert_eq!(sheet.get(13, 0), Value::Empty);

        let package = Package::open(&output).unwrap();
        let pkl = String::from_utf8(package.part("xl/worksheets/sheet1.xml").unwrap().to_vec()).unwrap();
        assert!(pkl.contains(r#"<mergeCell ref="A15:C15"/>"#), "{pkl}");
    }

    #[test]
    fn missing_sheet_is_reported() {
        let directory = tempfile::tempdir().unwrap();
        let config = Config::new(directory.path()).with_template_path(directory.path().join("001.xlsx"));
        WorkbookFixture::new()
            .sheet(SheetFixture::new("PKL "))
            .write(&config.template_path);
        let error = render(&config, &tables(packing(&[])), "ID", "DATE", &directory.path().join("out.xlsx")).unwrap_err();
        assert!(error.to_string().contains("Worksheet 'INV' not found"), "{error}");
        assert!(!directory.path().join("out.xlsx").exists());
    }
}
