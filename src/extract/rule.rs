//! Declarative extraction rules and the scan routine that executes them.
use crate::error::CustomsError;
use crate::extract::ExtractError;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use crate::spreadsheet::SpreadsheetError;
use crate::table::range::Range;
use crate::table::range::RangeError;
use crate::table::Record;
use crate::table::Value;
use log::debug;
use std::path::Path;

/// Which worksheet of a matched file a part of the rule reads.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum SheetChoice {
    /// The sheet shown when the workbook is opened
    Active,
    /// The first sheet in workbook order
    First,
}

/// How data columns are located.
#[derive(Clone, Debug)]
pub(crate) enum ColumnSelection {
    /// A fixed column window such as "B:P"
    Window(&'static str),
    /// Columns found by their label in a 1-based header row
    Labels {
        header_row: usize,
        labels: &'static [&'static str],
    },
}

/// Where the per-file key value comes from.
#[derive(Clone, Debug)]
pub(crate) struct KeyCell {
    /// Cell holding the key, e.g. "K5"
    pub(crate) cell: &'static str,
    /// The key is only taken when this cell is truthy
    pub(crate) guard: Option<&'static str>,
    /// Label removed from the key text, which is then trimmed
    pub(crate) strip: Option<&'static str>,
}

/// Cuts the data at the first row whose column text contains `needle`.
#[derive(Clone, Debug)]
pub(crate) struct Truncation {
    /// 0-based position inside the selected columns
    pub(crate) column: usize,
    /// Matched case-insensitively
    pub(crate) needle: &'static str,
}

/// Handling of rows with no value in any selected column.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum EmptyRows {
    /// Every empty row is dropped
    Drop,
    /// Empty rows are kept; the rows still end at the last sheet row
    /// holding a value in any column, selected or not
    Keep,
}

/// Describes how one kind of input file turns into records.
#[derive(Clone, Debug)]
pub(crate) struct ExtractionRule {
    /// Human readable kind, used in logs
    pub(crate) kind: &'static str,
    /// Glob pattern matched against normalized file names
    pub(crate) pattern: &'static str,
    /// Sheet holding the data rows and the label header
    pub(crate) data_sheet: SheetChoice,
    /// Sheet holding the key cell and the lead row
    pub(crate) header_sheet: SheetChoice,
    pub(crate) columns: ColumnSelection,
    /// First data row (1-based)
    pub(crate) data_row: usize,
    pub(crate) truncate: Option<Truncation>,
    pub(crate) empty_rows: EmptyRows,
    pub(crate) key: Option<KeyCell>,
    /// Row (1-based) read across the same columns and prepended for the first file only
    pub(crate) lead_row: Option<usize>,
    /// Canonical output columns; selected values fill them from the left,
    /// followed by the key, and any remaining columns stay blank
    pub(crate) output_columns: Vec<String>,
}

impl ExtractionRule {
    /// Extracts the records of a single file.
    ///
    /// # Arguments
    /// * `path` - Matched input file
    /// * `is_first` - Whether this is the first matched file of its kind
    ///
    /// # Returns
    /// Records already laid out in `output_columns` order
    pub(crate) fn extract_file(&self, path: &Path, is_first: bool) -> Result<Vec<Record>, CustomsError> {
        let mut spreadsheet = XlsxSpreadsheet::open(path)?;
        let data_name = sheet_name(&spreadsheet, self.data_sheet)?;
        let header_name = sheet_name(&spreadsheet, self.header_sheet)?;
        let data = spreadsheet.read_sheet(&data_name)?;
        if data.is_empty() {
            debug!("Sheet '{}' of {} holds no values", data.name, data.file_name);
        }
        if header_name == data_name {
            return self.extract_sheets(&data, &data, is_first);
        }
        let header = spreadsheet.read_sheet(&header_name)?;
        self.extract_sheets(&data, &header, is_first)
    }

    /// Applies the rule to a sheet already read into memory.
    pub(crate) fn extract_sheet(&self, sheet: &Sheet, is_first: bool) -> Result<Vec<Record>, CustomsError> {
        self.extract_sheets(sheet, sheet, is_first)
    }

    /// Applies the rule with data rows taken from `data` and the key cell
    /// and lead row taken from `header`.
    pub(crate) fn extract_sheets(&self, data: &Sheet, header: &Sheet, is_first: bool) -> Result<Vec<Record>, CustomsError> {
        let key = self.key.as_ref().map(|key| read_key(header, key)).transpose()?;
        let columns = self.column_indexes(data)?;

        let mut rows: Vec<Record> = data.rows(&Range::default().from_row(self.data_row - 1))
            .into_iter()
            .map(|row| pick(&row, &columns))
            .collect();

        if let Some(truncate) = &self.truncate {
            let needle = truncate.needle.to_uppercase();
            if let Some(position) = rows.iter().position(|row| {
                row.get(truncate.column)
                    .map(|value| value.to_string().to_uppercase().contains(&needle))
                    .unwrap_or(false)
            }) {
                rows.truncate(position);
            }
        }

        if self.empty_rows == EmptyRows::Drop {
            rows.retain(|row| !is_empty_row(row));
        }

        if is_first {
            if let Some(lead_row) = self.lead_row {
                let lead = header.row(lead_row - 1, &Range::default());
                rows.insert(0, pick(&lead, &columns));
            }
        }

        Ok(rows.into_iter().map(|row| self.layout(row, key.as_ref())).collect())
    }

    /// Resolves the 0-based sheet columns read by this rule.
    fn column_indexes(&self, sheet: &Sheet) -> Result<Vec<usize>, CustomsError> {
        match &self.columns {
            ColumnSelection::Window(window) => {
                let range = Range::try_from(*window)?;
                let lower = range.col_lower_bound.unwrap_or(0);
                let upper = range.col_upper_bound.unwrap_or(lower);
                Ok((lower..=upper).collect())
            }
            ColumnSelection::Labels { header_row, labels } => {
                let header = sheet.row(header_row - 1, &Range::default());
                labels.iter()
                    .map(|label| {
                        header.iter()
                            .position(|value| value.to_string().trim() == *label)
                            .ok_or_else(|| ExtractError::MissingColumnError(label.to_string(), sheet.file_name.to_owned()).into())
                    })
                    .collect()
            }
        }
    }

    /// Places selected values, then the key, into the canonical column order.
    fn layout(&self, mut row: Record, key: Option<&Value>) -> Record {
        if let Some(key) = key {
            row.push(key.clone());
        }
        row.resize(self.output_columns.len(), Value::Empty);
        row
    }
}

/// Resolves `choice` to a sheet name of `spreadsheet`.
fn sheet_name(spreadsheet: &XlsxSpreadsheet, choice: SheetChoice) -> Result<String, CustomsError> {
    match choice {
        SheetChoice::Active => spreadsheet.active_sheet_name(),
        SheetChoice::First => spreadsheet.sheet_name_at(0),
    }
    .map(|name| name.to_owned())
    .ok_or_else(|| SpreadsheetError::SpreadsheetEmptyError(spreadsheet.name.to_owned()).into())
}

/// Reads the per-file key value described by `key`.
fn read_key(sheet: &Sheet, key: &KeyCell) -> Result<Value, CustomsError> {
    let cell = |reference: &str| -> Result<Value, CustomsError> {
        let (row, col) = reference_to_index(reference)
            .ok_or_else(|| RangeError::FormatError(reference.to_owned()))?;
        Ok(sheet.get(row, col))
    };
    if let Some(guard) = key.guard {
        if !cell(guard)?.is_truthy() {
            return Ok(Value::Text(String::new()));
        }
    }
    let value = cell(key.cell)?;
    let value = match (key.strip, value) {
        (_, Value::Empty) => Value::Text(String::new()),
        (Some(label), value) => Value::Text(value.to_string().replace(label, "").trim().to_owned()),
        (None, value) => value,
    };
    Ok(value)
}

/// Picks `columns` out of a full sheet row.
fn pick(row: &[Value], columns: &[usize]) -> Record {
    columns.iter()
        .map(|col| row.get(*col).cloned().unwrap_or_default())
        .collect()
}

fn is_empty_row(row: &[Value]) -> bool {
    row.iter().all(Value::is_blank)
}
