//! # Spreadsheet Reading Module
//!
//! Reads Office Open XML workbooks (`.xlsx`, `.xlsm`) into sparse sheets of
//! typed values. Shared strings and number formats are resolved while reading,
//! so a [`sheet::Sheet`] only holds final [`crate::table::Value`]s.
use thiserror::Error;

pub(crate) mod cell;
pub(crate) mod excel;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

/// Errors raised while opening or reading a spreadsheet.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// A required part is missing from the package
    #[error("Missing part '{0}' in spreadsheet package")]
    FileError(String),

    /// The file is an encrypted (CFB wrapped) workbook or a legacy binary file
    #[error("Spreadsheet '{0}' is password protected or not an Office Open XML workbook")]
    SpreadsheetPasswordProtectedError(String),

    /// The workbook declares no worksheets
    #[error("Spreadsheet '{0}' contains no worksheets")]
    SpreadsheetEmptyError(String),

    /// Requested sheet does not exist
    #[error("Sheet '{1}' not found in '{0}'")]
    SheetNotFoundError(String, String),

    /// A cell value could not be interpreted with its declared type
    #[error("Invalid cell value '{3}' at {0}!{1}!{2}")]
    CellValueError(String, String, String, String),
}
