use crate::error::CustomsError;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::row_to_index;
use regex::Regex;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use thiserror::Error;

/// Errors related to Excel-style range parsing.
#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid range format '{0}'")]
    FormatError(String),

    #[error("Range '{0}' must name both corner cells")]
    UnboundedError(String),
}

/// Represents an Excel-style cell range with optional boundaries.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) struct Range {
    /// Lower row bound (0-based index), None for unbounded
    pub(crate) row_lower_bound: Option<usize>,
    /// Upper row bound (0-based index), None for unbounded
    pub(crate) row_upper_bound: Option<usize>,
    /// Lower column bound (0-based index), None for unbounded
    pub(crate) col_lower_bound: Option<usize>,
    /// Upper column bound (0-based index), None for unbounded
    pub(crate) col_upper_bound: Option<usize>,
}

impl Range {
    /// Restricts the range to start at the given 0-based row.
    pub(crate) fn from_row(mut self, row: usize) -> Self {
        self.row_lower_bound = Some(row);
        self
    }
}

impl TryFrom<&str> for Range {
    type Error = CustomsError;

    /// Parses an Excel-style range string (e.g., "A1", "B2:C5", "A", "1:10", "B:P").
    /// Supports single cells, ranges, and partial ranges (columns or rows only).
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^\$?([A-Z]*)\$?(\d*)(:\$?([A-Z]*)\$?(\d*))?$").expect("Hardcode regex pattern");
        let value = value.trim().to_ascii_uppercase();
        let captures = pattern
            .captures(value.as_str())
            .ok_or(RangeError::FormatError(value.to_owned()))?;
        let col_lower_bound = captures.get(1).map(|matcher| matcher.as_str()).and_then(col_to_index);
        let row_lower_bound = captures.get(2).map(|matcher| matcher.as_str()).and_then(row_to_index);
        let mut col_upper_bound = captures.get(4).map(|matcher| matcher.as_str()).and_then(col_to_index);
        let mut row_upper_bound = captures.get(5).map(|matcher| matcher.as_str()).and_then(row_to_index);
        // A single cell or a single column / row names both ends at once
        if captures.get(3).is_none() {
            col_upper_bound = col_lower_bound;
            row_upper_bound = row_lower_bound;
        }
        Ok(Range {
            row_lower_bound,
            row_upper_bound,
            col_lower_bound,
            col_upper_bound,
        })
    }
}

/// A fully bounded rectangle of cells, such as a merged region.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct CellRange {
    pub(crate) first_row: usize,
    pub(crate) first_col: usize,
    pub(crate) last_row: usize,
    pub(crate) last_col: usize,
}

impl CellRange {
    pub(crate) fn new(first_row: usize, first_col: usize, last_row: usize, last_col: usize) -> Self {
        CellRange {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        }
    }

    /// Returns true when any row of this range lies within `lower..=upper` (0-based).
    pub(crate) fn overlaps_rows(&self, lower: usize, upper: usize) -> bool {
        self.last_row >= lower && self.first_row <= upper
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }

    pub(crate) fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }
}

impl TryFrom<&str> for CellRange {
    type Error = CustomsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let range = Range::try_from(value)?;
        match range {
            Range {
                row_lower_bound: Some(first_row),
                row_upper_bound: Some(last_row),
                col_lower_bound: Some(first_col),
                col_upper_bound: Some(last_col),
            } => Ok(CellRange::new(first_row, first_col, last_row, last_col)),
            _ => Err(RangeError::UnboundedError(value.to_owned()))?,
        }
    }
}

impl Display for CellRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let first = index_to_reference(self.first_row, self.first_col);
        if self.is_single_cell() {
            write!(f, "{first}")
        } else {
            write!(f, "{first}:{}", index_to_reference(self.last_row, self.last_col))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_window() {
        let range = Range::try_from("B:P").unwrap();
        assert_eq!(range.col_lower_bound, Some(1));
        assert_eq!(range.col_upper_bound, Some(15));
        assert_eq!(range.row_lower_bound, None);
        assert_eq!(range.row_upper_bound, None);
    }

    #[test]
    fn single_cell_and_rows() {
        let range = Range::try_from("k5").unwrap();
        assert_eq!((range.row_lower_bound, range.col_lower_bound), (Some(4), Some(10)));
        assert_eq!((range.row_upper_bound, range.col_upper_bound), (Some(4), Some(10)));

        let range = Range::try_from("12:").unwrap();
        assert_eq!(range.row_lower_bound, Some(11));
        assert_eq!(range.row_upper_bound, None);
    }

    #[test]
    fn invalid_range() {
        assert!(Range::try_from("B2-C3").is_err());
        assert!(CellRange::try_from("B:C").is_err());
    }

    #[test]
    fn cell_range_display_and_overlap() {
        let range = CellRange::try_from("P15:P17").unwrap();
        assert_eq!(range, CellRange::new(14, 15, 16, 15));
        assert_eq!(range.to_string(), "P15:P17");
        assert_eq!(CellRange::try_from("$A$1").unwrap().to_string(), "A1");
        assert!(range.overlaps_rows(16, 30));
        assert!(range.overlaps_rows(0, 14));
        assert!(!range.overlaps_rows(17, 30));
        assert!(range.contains(15, 15));
        assert!(!range.contains(15, 14));
    }
}
