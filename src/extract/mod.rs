//! # Extraction Module
//!
//! Turns the input folder into three tables (packing lists, invoices,
//! declarations) and derives the contract table from the invoices.
//! Each kind is a declarative [`rule::ExtractionRule`]; [`aggregate`] runs a
//! rule over every matching file and concatenates the records in file order.
use crate::config::Config;
use crate::error::CustomsError;
use crate::table::Table;
use anyhow::Context;
use log::debug;
use log::info;
use thiserror::Error;

pub mod contract;
pub mod declaration;
pub mod invoice;
pub mod packing_list;
pub(crate) mod rule;
pub(crate) mod selector;

pub use contract::build_contract;

/// Errors raised while extracting records from input files.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A header label expected by a label-based rule is absent
    #[error("Column '{0}' not found in '{1}'")]
    MissingColumnError(String, String),

    /// An input file exceeds the configured size limit
    #[error("File '{0}' is {1} bytes, larger than the {2} byte limit")]
    FileTooLargeError(String, u64, u64),
}

/// The four tables placed into the template.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeclarationTables {
    pub packing_list: Table,
    pub invoice: Table,
    pub contract: Table,
    pub declaration: Table,
}

impl DeclarationTables {
    /// Extracts every kind from the input directory and derives the contract.
    pub fn extract(config: &Config) -> Result<DeclarationTables, CustomsError> {
        let packing_list = extract_packing_lists(config)?;
        let invoice = extract_invoices(config)?;
        let contract = build_contract(&invoice);
        let declaration = extract_declarations(config)?;
        Ok(DeclarationTables {
            packing_list,
            invoice,
            contract,
            declaration,
        })
    }
}

/// Runs `rule` over every matching file of the input directory.
///
/// The result always carries the rule's columns, even when no file matches.
pub(crate) fn aggregate(rule: &rule::ExtractionRule, config: &Config) -> Result<Table, CustomsError> {
    let files = selector::select_files(&config.input_dir, rule.pattern, config.max_file_size)?;
    info!("Found {} {} file(s)", files.len(), rule.kind);
    let mut table = Table::new(&rule.output_columns);
    for (index, path) in files.iter().enumerate() {
        let records = rule.extract_file(path, index == 0)
            .with_context(|| format!("Failed to extract {} '{}'", rule.kind, path.display()))?;
        debug!("{}: {} record(s)", path.display(), records.len());
        for record in records {
            table.push(record);
        }
    }
    Ok(table)
}

/// Extracts and concatenates every packing list.
pub fn extract_packing_lists(config: &Config) -> Result<Table, CustomsError> {
    aggregate(&packing_list::rule(), config)
}

/// Extracts and concatenates every invoice.
pub fn extract_invoices(config: &Config) -> Result<Table, CustomsError> {
    aggregate(&invoice::rule(), config)
}

/// Extracts and concatenates every declaration file.
pub fn extract_declarations(config: &Config) -> Result<Table, CustomsError> {
    aggregate(&declaration::rule(), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use crate::test_support::SheetFixture;
    use crate::test_support::WorkbookFixture;

    fn packing_list(key: &str, first: &str) -> WorkbookFixture {
        WorkbookFixture::new().sheet(SheetFixture::new("PL")
            .text("K5", key)
            .text("B11", "CTN NO.")
            .text("B12", first)
            .number("C12", 1.0)
            .text("B13", "TOTAL"))
    }

    #[test]
    fn empty_folder_keeps_columns() {
        let directory = tempfile::tempdir().unwrap();
        let config = Config::new(directory.path());
        let packing = extract_packing_lists(&config).unwrap();
        let invoices = extract_invoices(&config).unwrap();
        let declarations = extract_declarations(&config).unwrap();
        assert!(packing.is_empty() && invoices.is_empty() && declarations.is_empty());
        assert_eq!(packing.columns().len(), 17);
        assert_eq!(invoices.columns().len(), 12);
        assert_eq!(declarations.columns().len(), 11);
        assert_eq!(build_contract(&invoices).columns().len(), 6);

        let tables = DeclarationTables::extract(&config).unwrap();
        assert_eq!(tables.contract.columns().len(), 6);
        assert!(tables.declaration.is_empty());
    }

    #[test]
    fn packing_lists_concatenate_in_name_order() {
        let directory = tempfile::tempdir().unwrap();
        packing_list("BOL-B", "b-1").write(&directory.path().join("B Packing List.xlsx"));
        packing_list("BOL-A", "a-1").write(&directory.path().join("A  Packing List.xlsx"));

        let table = extract_packing_lists(&Config::new(directory.path())).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.value(0, "0"), Some(&Value::from("CTN NO.")));
        assert_eq!(table.value(1, "0"), Some(&Value::from("a-1")));
        assert_eq!(table.value(2, "0"), Some(&Value::from("b-1")));
        assert_eq!(table.key_values("BOL"), vec![
            Value::from("BOL-A"), Value::from("BOL-A"), Value::from("BOL-B"),
        ]);
    }

    #[test]
    fn data_rows_come_from_the_first_sheet() {
        let directory = tempfile::tempdir().unwrap();
        packing_list("SEA-1", "a-1")
            .sheet(SheetFixture::new("Notes"))
            .active_tab(1)
            .write(&directory.path().join("A Packing List.xlsx"));

        let table = extract_packing_lists(&Config::new(directory.path())).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "0"), Some(&Value::Empty));
        assert_eq!(table.value(1, "0"), Some(&Value::from("a-1")));
        assert_eq!(table.value(1, "1"), Some(&Value::Number(1.0)));
        assert_eq!(table.value(1, "BOL"), Some(&Value::from("")));
    }

    #[test]
    fn invoice_key_comes_from_the_active_sheet() {
        let directory = tempfile::tempdir().unwrap();
        WorkbookFixture::new()
            .sheet(SheetFixture::new("Items").text("B14", "PN-1").text("G1", "INVOICE NO. WRONG"))
            .sheet(SheetFixture::new("Cover").text("G1", "INVOICE NO. HIC-9"))
            .active_tab(1)
            .write(&directory.path().join("X HIC Invoice.xlsx"));

        let table = extract_invoices(&Config::new(directory.path())).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "P/N"), Some(&Value::from("PN-1")));
        assert_eq!(table.value(0, "BOL"), Some(&Value::from("HIC-9")));
    }

    #[test]
    fn unreadable_file_names_the_file() {
        let directory = tempfile::tempdir().unwrap();
        std::fs::write(directory.path().join("X HIC Invoice.xlsx"), b"garbage").unwrap();
        let error = extract_invoices(&Config::new(directory.path())).unwrap_err();
        assert!(error.to_string().contains("X HIC Invoice.xlsx"), "{error}");
    }
}
