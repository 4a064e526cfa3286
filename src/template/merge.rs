//! Collapses consecutive rows sharing a key into merged cells.
use crate::error::CustomsError;
use crate::spreadsheet::reference::col_to_index;
use crate::table::range::CellRange;
use crate::table::range::RangeError;
use crate::table::Value;
use crate::template::worksheet::Worksheet;

/// Finds the runs of equal adjacent keys spanning more than one row.
///
/// # Arguments
/// * `keys` - Key of each table row, top to bottom
/// * `start_row` - Sheet row (1-based) receiving the first key
///
/// # Returns
/// Inclusive (first, last) 1-based sheet rows of every run to merge
pub(crate) fn merge_runs(keys: &[Value], start_row: usize) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut run_start = 0usize;
    for index in 1..=keys.len() {
        if index == keys.len() || keys[index] != keys[run_start] {
            if index - run_start > 1 {
                runs.push((start_row + run_start, start_row + index - 1));
            }
            run_start = index;
        }
    }
    runs
}

/// Merges runs of equal keys in `column` of the sheet.
///
/// # Arguments
/// * `worksheet` - Sheet receiving the merged ranges
/// * `keys` - Key of each written row, top to bottom
/// * `column` - Column letters, e.g. "P"
/// * `start_row` - Sheet row (1-based) of the first key
///
/// # Returns
/// The merged ranges
pub(crate) fn merge_key_column(worksheet: &mut Worksheet, keys: &[Value], column: &str, start_row: usize) -> Result<Vec<CellRange>, CustomsError> {
    let col = col_to_index(column).ok_or_else(|| RangeError::FormatError(column.to_owned()))?;
    let mut merged = Vec::new();
    for (first, last) in merge_runs(keys, start_row) {
        let range = CellRange::new(first - 1, col, last - 1, col);
        worksheet.merge(range);
        merged.push(range);
    }
    Ok(merged)
}
