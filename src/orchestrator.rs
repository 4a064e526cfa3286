//! Runs one complete processing pass: extract, derive, render, report.
use crate::config::Config;
use crate::error::CustomsError;
use crate::extract::DeclarationTables;
use crate::template::render::render;
use chrono::Datelike;
use chrono::Local;
use chrono::NaiveDate;
use log::error;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Message reported on success.
pub const SUCCESS_MESSAGE: &str = "报关文件处理完成";
/// Prefix of the message reported on failure.
pub const ERROR_PREFIX: &str = "处理过程中出现错误";
/// Suffix of the generated workbook name.
pub const OUTPUT_SUFFIX: &str = "-苏州吴江提货.xlsx";

/// Row counts of the four tables.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub packing_list_items: usize,
    pub invoice_items: usize,
    pub contract_items: usize,
    pub declaration_items: usize,
}

impl From<&DeclarationTables> for Summary {
    fn from(tables: &DeclarationTables) -> Self {
        Summary {
            packing_list_items: tables.packing_list.len(),
            invoice_items: tables.invoice.len(),
            contract_items: tables.contract.len(),
            declaration_items: tables.declaration.len(),
        }
    }
}

/// Outcome of [`process_customs_declaration`], serialized with a `status` tag.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessingResult {
    Success {
        message: String,
        output_file: String,
        file_id: String,
        processing_date: String,
        summary: Summary,
    },
    Error {
        message: String,
        output_file: Option<String>,
    },
}

impl ProcessingResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingResult::Success { .. })
    }
}

/// Identifier of the package produced on `date`: `WWSH` + `YYYYMMDD` + `001`.
pub fn file_id(date: NaiveDate) -> String {
    date.format("WWSH%Y%m%d001").to_string()
}

/// Processing date as `YYYY/M/D`, without zero padding.
pub fn processing_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.year(), date.month(), date.day())
}

/// Builds the customs declaration workbook from the files in `config.input_dir`.
///
/// Never fails: any error is reported as [`ProcessingResult::Error`].
pub fn process_customs_declaration(config: &Config) -> ProcessingResult {
    process_on(config, Local::now().date_naive())
}

/// Same as [`process_customs_declaration`] for a given processing date.
pub fn process_on(config: &Config, date: NaiveDate) -> ProcessingResult {
    match run(config, date) {
        Ok(result) => result,
        Err(error) => {
            error!("Processing failed: {error}");
            ProcessingResult::Error {
                message: format!("{ERROR_PREFIX}: {error}"),
                output_file: None,
            }
        }
    }
}

fn run(config: &Config, date: NaiveDate) -> Result<ProcessingResult, CustomsError> {
    info!("Reading input files from {}", config.input_dir.display());
    let tables = DeclarationTables::extract(config)?;
    let summary = Summary::from(&tables);
    info!(
        "Extracted {} packing list, {} invoice, {} contract and {} declaration row(s)",
        summary.packing_list_items, summary.invoice_items, summary.contract_items, summary.declaration_items,
    );

    let file_id = file_id(date);
    let processing_date = processing_date(date);
    fs::create_dir_all(&config.output_dir)?;
    let output_path: PathBuf = config.output_dir.join(format!("{file_id}{OUTPUT_SUFFIX}"));
    render(config, &tables, &file_id, &processing_date, &output_path)?;

    Ok(ProcessingResult::Success {
        message: SUCCESS_MESSAGE.to_owned(),
        output_file: output_path.display().to_string(),
        file_id,
        processing_date,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::xlsx::XlsxSpreadsheet;
    use crate::table::Value;
    use crate::test_support::template;
    use crate::test_support::SheetFixture;
    use crate::test_support::WorkbookFixture;
    use std::path::Path;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn config(root: &Path) -> Config {
        Config::new(root.join("uploads"))
            .with_output_dir(root.join("outputs"))
            .with_template_path(root.join("templates").join("001.xlsx"))
            .with_images_dir(root.join("images"))
    }

    fn write_inputs(input: &Path) {
        fs::create_dir_all(input).unwrap();
        WorkbookFixture::new().sheet(SheetFixture::new("PL")
            .text("K5", "SEA-1")
            .text("B11", "CTN")
            .text("B12", "1")
            .text("B13", "2")
            .text("B14", "TOTAL"))
            .write(&input.join("A Packing List.xlsx"));
        WorkbookFixture::new().sheet(SheetFixture::new("INV")
            .text("G1", "INVOICE NO. HIC-9")
            .text("B13", "P/N")
            .text("B14", "PN-1")
            .text("E14", "Widget")
            .number("G14", 3.0)
            .text("B15", "PN-2")
            .text("F16", "Total"))
            .write(&input.join("A HIC Invoice.xlsx"));
        let mut declaration = SheetFixture::new("Sheet1");
        for (col, label) in crate::extract::declaration::COLUMNS.iter().enumerate() {
            let column = crate::spreadsheet::reference::index_to_col(col);
            declaration = declaration
                .text(&format!("{column}1"), label)
                .text(&format!("{column}2"), &format!("{label}-1"));
        }
        WorkbookFixture::new().sheet(declaration).write(&input.join("A随附文件.xlsx"));
    }

    #[test]
    fn date_formats() {
        assert_eq!(file_id(date()), "WWSH20240305001");
        assert_eq!(processing_date(date()), "2024/3/5");
        let december = NaiveDate::from_ymd_opt(2023, 12, 25).unwrap();
        assert_eq!(processing_date(december), "2023/12/25");
    }

    #[test]
    fn end_to_end() {
        let directory = tempfile::tempdir().unwrap();
        let config = config(directory.path());
        write_inputs(&config.input_dir);
        fs::create_dir_all(config.template_path.parent().unwrap()).unwrap();
        template().write(&config.template_path);

        let result = process_on(&config, date());
        let expected_path = config.output_dir.join("WWSH20240305001-苏州吴江提货.xlsx");
        assert_eq!(result, ProcessingResult::Success {
            message: "报关文件处理完成".to_owned(),
            output_file: expected_path.display().to_string(),
            file_id: "WWSH20240305001".to_owned(),
            processing_date: "2024/3/5".to_owned(),
            summary: Summary {
                packing_list_items: 3,
                invoice_items: 2,
                contract_items: 2,
                declaration_items: 1,
            },
        });

        let mut spreadsheet = XlsxSpreadsheet::open(&expected_path).unwrap();
        let inv = spreadsheet.read_sheet("INV").unwrap();
        assert_eq!(inv.get(18, 0), Value::from("PN-1"));
        assert_eq!(inv.get(18, 11), Value::from("HIC-9"));
        assert_eq!(inv.get(19, 11), Value::Empty);
        let contract = spreadsheet.read_sheet("合同 ").unwrap();
        assert_eq!(contract.get(11, 1), Value::from("Widget"));
        assert_eq!(contract.get(11, 3), Value::Number(3.0));
        let declaration = spreadsheet.read_sheet("申报要素").unwrap();
        assert_eq!(declaration.get(1, 0), Value::from("Item-1"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["summary"]["packing_list_items"], 3);
    }

    #[test]
    fn missing_template_is_an_error_result() {
        let directory = tempfile::tempdir().unwrap();
        let config = config(directory.path());
        write_inputs(&config.input_dir);

        let result = process_on(&config, date());
        let ProcessingResult::Error { message, output_file } = &result else {
            panic!("expected an error result, got {result:?}");
        };
        assert!(message.starts_with("处理过程中出现错误: Template file not found at: "), "{message}");
        assert!(message.contains("001.xlsx"), "{message}");
        assert_eq!(output_file, &None);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json["output_file"].is_null());
    }

    #[test]
    fn missing_input_directory_is_an_error_result() {
        let directory = tempfile::tempdir().unwrap();
        let result = process_on(&config(directory.path()), date());
        assert!(!result.is_success());
    }
}
