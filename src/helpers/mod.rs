//! Low-level helpers shared by the workbook reader and the template writer.
pub(crate) mod xml;
pub(crate) mod zip;
