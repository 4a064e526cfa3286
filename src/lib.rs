//! # Customs Declaration Package Builder
//!
//! Collects the packing lists, invoices and declaration element files of one
//! shipment from an input folder and writes them into a four-sheet customs
//! declaration workbook based on a fixed template.
//!
//! ## Features
//!
//! - **File discovery**: Input files are matched by name pattern and read in name order
//! - **Rule-based extraction**: Each document kind is described by a declarative rule
//!   (column window or header labels, first data row, truncation marker, key cell)
//! - **Contract derivation**: The contract sheet is projected from the invoice items
//! - **Template patching**: Values, merged key ranges and pictures are written into the
//!   template package while keeping its styles and layout
//! - **Structured result**: Every run reports a serializable [`ProcessingResult`]
//!
//! ## Entry point
//!
//! [`process_customs_declaration`] runs one complete pass for a [`Config`]:
//!
//! ```no_run
//! use customs_pack::Config;
//! use customs_pack::process_customs_declaration;
//!
//! let result = process_customs_declaration(&Config::new("uploads"));
//! println!("{}", serde_json::to_string_pretty(&result).unwrap());
//! ```
pub mod config;
pub mod error;
pub mod extract;
mod helpers;
pub mod orchestrator;
mod spreadsheet;
pub mod table;
mod template;

#[cfg(test)]
mod test_support;

pub use crate::config::Config;
pub use crate::error::CustomsError;
pub use crate::extract::DeclarationTables;
pub use crate::extract::ExtractError;
pub use crate::helpers::xml::XmlError;
pub use crate::orchestrator::process_customs_declaration;
pub use crate::orchestrator::ProcessingResult;
pub use crate::orchestrator::Summary;
pub use crate::spreadsheet::SpreadsheetError;
pub use crate::table::range::RangeError;
pub use crate::table::Table;
pub use crate::table::Value;
pub use crate::template::TemplateError;
