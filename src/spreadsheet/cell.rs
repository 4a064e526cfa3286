use crate::error::CustomsError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Value;
use chrono::NaiveDate;
use chrono::TimeDelta;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Analyzes format codes for date/time patterns.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    /// Maps the `t` attribute of a `<c>` element to a cell type.
    pub(crate) fn from_type_attribute(kind: &str) -> Self {
        match kind {
            "inlineStr" | "str" => Self::InlineString,
            "s" => Self::SharedString,
            "d" => Self::IsoDateTime,
            "b" => Self::Boolean,
            "e" => Self::Error,
            _ => Self::Number,
        }
    }
}

/// A single raw cell read from a worksheet.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Cell value as stored in the sheet XML
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Converts the stored text into a typed value.
    /// Shared string indexes are resolved against `shared_strings`;
    /// date and time serials become their ISO text form.
    pub(crate) fn to_value(&self, file_name: &str, sheet_name: &str, shared_strings: &[String]) -> Result<Value, CustomsError> {
        let invalid = || SpreadsheetError::CellValueError(
            file_name.to_owned(),
            sheet_name.to_owned(),
            self.reference(),
            self.value.to_owned(),
        );
        let value = match self.kind {
            CellType::Empty => Value::Empty,
            CellType::Boolean => Value::Bool(self.value == "1" || self.value.eq_ignore_ascii_case("true")),
            CellType::Number => Value::Number(self.value.trim().parse::<f64>().map_err(|_| invalid())?),
            CellType::NumberDate1900 => Value::Text(to_date_string(&self.value, false).map_err(|_| invalid())?),
            CellType::NumberDate1904 => Value::Text(to_date_string(&self.value, true).map_err(|_| invalid())?),
            CellType::NumberDateTime1900 => Value::Text(to_datetime_string(&self.value, false).map_err(|_| invalid())?),
            CellType::NumberDateTime1904 => Value::Text(to_datetime_string(&self.value, true).map_err(|_| invalid())?),
            CellType::NumberTime1900 | CellType::NumberTime1904 => Value::Text(to_time_string(&self.value).map_err(|_| invalid())?),
            CellType::IsoDateTime => Value::Text(self.value.replace('T', " ")),
            CellType::InlineString | CellType::Error => Value::Text(self.value.to_owned()),
            CellType::SharedString => {
                let index = self.value.trim().parse::<usize>()?;
                let text = shared_strings.get(index).ok_or_else(invalid)?;
                Value::Text(text.to_owned())
            }
        };
        Ok(value)
    }
}

/// Converts Excel numeric date to ISO date string.
/// Handles Lotus 1-2-3 leap year bug for 1900 epoch.
fn to_date_string(value: &str, is_1904: bool) -> Result<String, CustomsError> {
    let out_of_range = || CustomsError::WithContextError(format!("date serial '{value}' out of range"));
    let serial = value.trim().parse::<f64>()?;
    if !serial.is_finite() {
        return Err(out_of_range());
    }
    let days = serial.trunc() as i64;
    let offset = days.checked_add(if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    })
    .ok_or_else(out_of_range)?;
    let date = NaiveDate::from_ymd_opt(1899, 12, 30)
        .zip(TimeDelta::try_days(offset))
        .and_then(|(epoch, delta)| epoch.checked_add_signed(delta))
        .ok_or_else(out_of_range)?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Converts Excel numeric time to ISO time string.
fn to_time_string(value: &str) -> Result<String, CustomsError> {
    let factor = value.trim().parse::<f64>()?.fract();
    let mut hours = (factor * 86_400_000f64).round() as i64;
    let milliseconds = hours % 1_000; hours /= 1_000;
    let seconds = hours % 60; hours /= 60;
    let minutes = hours % 60; hours /= 60;
    let timestamp = if milliseconds > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    };
    Ok(timestamp)
}

/// Converts Excel numeric datetime to ISO datetime string.
fn to_datetime_string(value: &str, is_1904: bool) -> Result<String, CustomsError> {
    let date = to_date_string(value, is_1904)?;
    let time = to_time_string(value)?;
    Ok(format!("{date} {time}"))
}
