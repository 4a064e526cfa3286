//! # Table Model
//!
//! Cell values, records and tables exchanged between extraction and rendering.
//! A [`Table`] owns a fixed column set; every record carries exactly one value
//! per column, so an empty table still knows its schema.
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

pub(crate) mod range;

/// One cell value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Value {
    /// Returns true for an absent value or empty text.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// Truthiness of a value: blank, zero and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Empty => false,
            Value::Text(text) => !text.is_empty(),
            Value::Number(number) => *number != 0.0 && !number.is_nan(),
            Value::Bool(flag) => *flag,
        }
    }
}

impl Display for Value {
    /// Renders integral numbers without a fractional part ("12", not "12.0").
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(text) => write!(f, "{text}"),
            Value::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => write!(f, "{}", *number as i64),
            Value::Number(number) => write!(f, "{number}"),
            Value::Bool(true) => write!(f, "TRUE"),
            Value::Bool(false) => write!(f, "FALSE"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

/// An ordered list of values, one per table column.
pub type Record = Vec<Value>;

/// Ordered records sharing one canonical column set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    /// Creates an empty table with the given columns.
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Table {
            columns: columns.iter().map(|column| column.as_ref().to_owned()).collect(),
            records: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a record, padding or cutting it to the column count.
    pub fn push(&mut self, mut record: Record) {
        record.resize(self.columns.len(), Value::Empty);
        self.records.push(record);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Value at `row` under the column named `column`.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.records.get(row)?.get(index)
    }

    /// Projects the table onto `columns` (in that order), renaming each
    /// selected column to the name paired with it.
    /// Unknown source columns yield blank values.
    pub fn select(&self, columns: &[(&str, &str)]) -> Table {
        let positions: Vec<Option<usize>> = columns.iter()
            .map(|(source, _)| self.column_index(source))
            .collect();
        let mut table = Table::new(&columns.iter().map(|(_, target)| *target).collect::<Vec<_>>());
        for record in &self.records {
            table.records.push(positions.iter()
                .map(|position| position.and_then(|index| record.get(index).cloned()).unwrap_or_default())
                .collect());
        }
        table
    }

    /// Inserts a column holding `value` in every record at 0-based `position`.
    pub fn insert_column(&mut self, position: usize, name: &str, value: Value) {
        let position = position.min(self.columns.len());
        self.columns.insert(position, name.to_owned());
        for record in &mut self.records {
            record.insert(position, value.clone());
        }
    }

    /// Values of `column` in record order; empty when the column is unknown.
    pub fn key_values(&self, column: &str) -> Vec<Value> {
        match self.column_index(column) {
            Some(index) => self.records.iter().map(|record| record[index].clone()).collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let mut table = Table::new(&["P/N", "NAME", "BOL"]);
        table.push(vec!["A-1".into(), "Widget".into(), "B1".into()]);
        table.push(vec!["A-2".into()]);
        table
    }

    #[test]
    fn records_match_the_column_count() {
        let table = table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[1], vec!["A-2".into(), Value::Empty, Value::Empty]);
        assert_eq!(table.value(0, "NAME"), Some(&Value::from("Widget")));
        assert_eq!(table.value(0, "missing"), None);
    }

    #[test]
    fn select_renames_and_insert_column() {
        let mut selected = table().select(&[("P/N", "品名"), ("NAME", "料号")]);
        selected.insert_column(2, "单位", Value::Empty);
        assert_eq!(selected.columns(), ["品名", "料号", "单位"]);
        assert_eq!(selected.records()[0], vec!["A-1".into(), "Widget".into(), Value::Empty]);
    }

    #[test]
    fn key_values_follow_record_order() {
        let table = table();
        assert_eq!(table.key_values("BOL"), vec![Value::from("B1"), Value::Empty]);
        assert_eq!(table.key_values("P/N"), vec![Value::from("A-1"), Value::from("A-2")]);
        assert!(table.key_values("missing").is_empty());
    }

    #[test]
    fn empty_table_keeps_columns() {
        let empty = Table::new(&["a", "b"]);
        assert!(empty.is_empty());
        assert_eq!(empty.select(&[("b", "c")]).columns(), ["c"]);
    }

    #[test]
    fn value_display_and_truthiness() {
        assert_eq!(Value::Number(12.0).to_string(), "12");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Empty.to_string(), "");
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("SEA-1").is_truthy());
        assert!(Value::from("").is_blank());
    }
}
