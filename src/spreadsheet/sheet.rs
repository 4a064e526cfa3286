use crate::table::range::Range;
use crate::table::Value;
use std::collections::BTreeMap;

/// A worksheet read into memory as a sparse grid of non-empty values.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// Non-empty cells keyed by 0-based (row, col)
    cells: BTreeMap<(usize, usize), Value>,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(crate) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: BTreeMap::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    /// Returns true if the sheet contains no values.
    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Stores a value; blank values are not stored.
    pub(crate) fn push(&mut self, row: usize, col: usize, value: Value) {
        if value.is_blank() {
            return;
        }
        self.update_bound(row, col);
        self.cells.insert((row, col), value);
    }

    /// Updates the actual data range boundaries based on cell positions.
    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|lower| row < lower).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|upper| upper < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|lower| col < lower).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|upper| upper < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Value at 0-based (row, col), `Empty` when the cell is absent.
    pub(crate) fn get(&self, row: usize, col: usize) -> Value {
        self.cells.get(&(row, col)).cloned().unwrap_or(Value::Empty)
    }

    /// Reads one row across the columns of `window`.
    /// Unbounded column limits fall back to the sheet's own data range.
    pub(crate) fn row(&self, row: usize, window: &Range) -> Vec<Value> {
        let Some((col_lower, col_upper)) = self.columns(window) else {
            return Vec::new();
        };
        (col_lower..=col_upper).map(|col| self.get(row, col)).collect()
    }

    /// Reads every row of `window`.
    ///
    /// The row range ends at the window's upper bound, or at the last row of
    /// the sheet that holds any value (in any column) when unbounded, so
    /// trailing empty rows are never produced.
    pub(crate) fn rows(&self, window: &Range) -> Vec<Vec<Value>> {
        let row_lower = window.row_lower_bound.unwrap_or(0);
        let Some(row_upper) = window.row_upper_bound.or(self.row_upper_bound) else {
            return Vec::new();
        };
        (row_lower..=row_upper).map(|row| self.row(row, window)).collect()
    }

    fn columns(&self, window: &Range) -> Option<(usize, usize)> {
        let lower = window.col_lower_bound.unwrap_or(0);
        let upper = window.col_upper_bound.or(self.col_upper_bound)?;
        (lower <= upper).then_some((lower, upper))
    }
}
