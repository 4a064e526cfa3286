//! # Template Module
//!
//! Edits a copy of the template workbook in place: cell values keep the
//! template's styling, merged ranges and pictures are added to the existing
//! package, and every other part is copied through unchanged.
use thiserror::Error;

pub(crate) mod drawing;
pub(crate) mod merge;
pub(crate) mod package;
pub(crate) mod render;
pub(crate) mod workbook;
pub(crate) mod worksheet;

/// Errors raised while loading or filling the template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template file not found at: {0}")]
    TemplateNotFoundError(String),

    #[error("Failed to load template file at {0}: {1}")]
    TemplateLoadError(String, String),

    #[error("Worksheet '{sheet}' not found in {template}. Available sheets: {available:?}")]
    SheetNotFoundError {
        sheet: String,
        template: String,
        available: Vec<String>,
    },

    #[error("Unsupported image format in '{0}', expected PNG or JPEG")]
    ImageFormatError(String),

    #[error("Missing part '{0}' in template package")]
    MissingPartError(String),
}
