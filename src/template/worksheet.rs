//! Editable model of a worksheet part.
//!
//! Only `<sheetData>`, `<mergeCells>`, `<dimension>` and `<drawing>` are
//! interpreted; every other element is carried through byte for byte.
use crate::error::CustomsError;
use crate::helpers::xml::read_events;
use crate::helpers::xml::XmlError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlWriter;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::table::range::CellRange;
use crate::table::range::RangeError;
use crate::table::Value;
use crate::template::package::REL_OFFICE_NAMESPACE;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::vec::IntoIter;

/// Order of the worksheet children that may follow `<sheetData>`.
const TRAILING_ELEMENTS: [&str; 33] = [
    "sheetCalcPr", "sheetProtection", "protectedRanges", "scenarios", "autoFilter",
    "sortState", "dataConsolidate", "customSheetViews", "mergeCells", "phoneticPr",
    "conditionalFormatting", "dataValidations", "hyperlinks", "printOptions", "pageMargins",
    "pageSetup", "headerFooter", "rowBreaks", "colBreaks", "customProperties",
    "cellWatches", "ignoredErrors", "smartTags", "drawing", "legacyDrawing",
    "legacyDrawingHF", "drawingHF", "picture", "oleObjects", "controls",
    "webPublishItems", "tableParts", "extLst",
];

/// A direct child of `<worksheet>` kept as raw events.
struct Element {
    name: String,
    events: Vec<Event<'static>>,
}

/// A `<c>` element: its attributes (without `r`) and inner content.
#[derive(Default)]
struct CellXml {
    attributes: Vec<(String, String)>,
    content: Vec<Event<'static>>,
}

/// A `<row>` element: its attributes (without `r` and `spans`) and cells by column.
#[derive(Default)]
struct RowXml {
    attributes: Vec<(String, String)>,
    cells: BTreeMap<usize, CellXml>,
}

pub(crate) struct Worksheet {
    /// Events up to and including the `<worksheet>` start tag
    prolog: Vec<Event<'static>>,
    /// Children preceding `<sheetData>`
    leading: Vec<Element>,
    /// Rows by 0-based index
    rows: BTreeMap<usize, RowXml>,
    /// Children following `<sheetData>`, without `<mergeCells>`
    trailing: Vec<Element>,
    /// Events from the `</worksheet>` end tag on
    epilog: Vec<Event<'static>>,
    merges: Vec<CellRange>,
}

fn local_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Collects `start` and every event up to its matching end tag.
fn collect_element(start: Event<'static>, events: &mut Peekable<IntoIter<Event<'static>>>) -> Vec<Event<'static>> {
    let is_start = matches!(start, Event::Start(_));
    let mut collected = vec![start];
    if !is_start {
        return collected;
    }
    let mut depth = 1usize;
    for event in events.by_ref() {
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            _ => (),
        }
        collected.push(event);
        if depth == 0 {
            break;
        }
    }
    collected
}

impl Worksheet {
    /// Parses a worksheet part.
    ///
    /// # Arguments
    /// * `part` - Part name, used in error messages
    /// * `bytes` - Raw XML of the part
    pub(crate) fn parse(part: &str, bytes: &[u8]) -> Result<Worksheet, CustomsError> {
        let mut events = read_events(bytes)?.into_iter().peekable();
        let mut prolog = Vec::new();
        loop {
            let event = events.next()
                .ok_or_else(|| XmlError::MissingRootError(part.to_owned()))?;
            let is_root = matches!(&event, Event::Start(element) if element.local_name().as_ref() == b"worksheet");
            prolog.push(event);
            if is_root {
                break;
            }
        }

        let mut worksheet = Worksheet {
            prolog,
            leading: Vec::new(),
            rows: BTreeMap::new(),
            trailing: Vec::new(),
            epilog: Vec::new(),
            merges: Vec::new(),
        };
        let mut after_sheet_data = false;
        while let Some(event) = events.next() {
            let (is_start, name) = match &event {
                Event::Start(element) => (true, local_name(element)),
                Event::Empty(element) => (false, local_name(element)),
                Event::End(_) => {
                    worksheet.epilog.push(event);
                    worksheet.epilog.extend(events.by_ref());
                    break;
                }
                _ => continue,
            };
            match name.as_str() {
                "sheetData" => {
                    if is_start {
                        worksheet.parse_rows(&mut events)?;
                    }
                    after_sheet_data = true;
                }
                "mergeCells" => {
                    for event in collect_element(event, &mut events) {
                        if let Event::Empty(element) | Event::Start(element) = &event {
                            if element.local_name().as_ref() == b"mergeCell" {
                                if let Some(reference) = element.get_attribute_value("ref")? {
                                    worksheet.merges.push(CellRange::try_from(reference.as_ref())?);
                                }
                            }
                        }
                    }
                }
                _ => {
                    let element = Element { name, events: collect_element(event, &mut events) };
                    if after_sheet_data {
                        worksheet.trailing.push(element);
                    } else {
                        worksheet.leading.push(element);
                    }
                }
            }
        }
        Ok(worksheet)
    }

    fn parse_rows(&mut self, events: &mut Peekable<IntoIter<Event<'static>>>) -> Result<(), CustomsError> {
        let mut next_row = 0usize;
        while let Some(event) = events.next() {
            let (element, is_start) = match event {
                Event::Start(element) if element.local_name().as_ref() == b"row" => (element, true),
                Event::Empty(element) if element.local_name().as_ref() == b"row" => (element, false),
                Event::End(element) if element.local_name().as_ref() == b"sheetData" => break,
                _ => continue,
            };
            let row_index = element.parse_attribute_value::<usize>("r")?
                .filter(|row| *row > 0)
                .map(|row| row - 1)
                .unwrap_or(next_row);
            next_row = row_index + 1;
            let mut row = RowXml {
                attributes: element.attribute_pairs()?
                    .into_iter()
                    .filter(|(key, _)| key != "r" && key != "spans")
                    .collect(),
                cells: BTreeMap::new(),
            };
            if is_start {
                let mut next_col = 0usize;
                while let Some(event) = events.next() {
                    let (element, is_start) = match event {
                        Event::Start(element) if element.local_name().as_ref() == b"c" => (element, true),
                        Event::Empty(element) if element.local_name().as_ref() == b"c" => (element, false),
                        Event::End(element) if element.local_name().as_ref() == b"row" => break,
                        _ => continue,
                    };
                    let col_index = element.get_attribute_value("r")?
                        .and_then(|reference| reference_to_index(&reference))
                        .map(|(_, col)| col)
                        .unwrap_or(next_col);
                    next_col = col_index + 1;
                    let mut cell = CellXml {
                        attributes: element.attribute_pairs()?
                            .into_iter()
                            .filter(|(key, _)| key != "r")
                            .collect(),
                        content: Vec::new(),
                    };
                    if is_start {
                        for event in events.by_ref() {
                            if matches!(&event, Event::End(element) if element.local_name().as_ref() == b"c") {
                                break;
                            }
                            cell.content.push(event);
                        }
                    }
                    row.cells.insert(col_index, cell);
                }
            }
            self.rows.insert(row_index, row);
        }
        Ok(())
    }

    /// Replaces the content of the cell at 0-based (row, col), keeping its style.
    /// A blank value leaves an empty styled cell.
    pub(crate) fn set_value(&mut self, row: usize, col: usize, value: &Value) {
        let cell = self.rows.entry(row).or_default()
            .cells.entry(col).or_default();
        cell.attributes.retain(|(key, _)| key != "t" && key != "cm" && key != "vm");
        cell.content.clear();
        let text = match value {
            Value::Empty => return,
            Value::Text(text) if text.is_empty() => return,
            Value::Number(number) if number.is_finite() => {
                cell.content = value_events(&number.to_string());
                return;
            }
            Value::Bool(flag) => {
                cell.attributes.push(("t".to_owned(), "b".to_owned()));
                cell.content = value_events(if *flag { "1" } else { "0" });
                return;
            }
            Value::Text(text) => text.to_owned(),
            Value::Number(number) => number.to_string(),
        };
        cell.attributes.push(("t".to_owned(), "inlineStr".to_owned()));
        let mut element = BytesStart::new("t");
        if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
            element.push_attribute(("xml:space", "preserve"));
        }
        cell.content = vec![
            Event::Start(BytesStart::new("is")),
            Event::Start(element),
            Event::Text(BytesText::new(&text).into_owned()),
            Event::End(BytesEnd::new("t")),
            Event::End(BytesEnd::new("is")),
        ];
    }

    /// Same as [`Worksheet::set_value`] with an A1 reference.
    pub(crate) fn set(&mut self, reference: &str, value: &Value) -> Result<(), CustomsError> {
        let (row, col) = reference_to_index(reference)
            .ok_or_else(|| RangeError::FormatError(reference.to_owned()))?;
        self.set_value(row, col, value);
        Ok(())
    }

    fn clear_value(&mut self, row: usize, col: usize) {
        let exists = self.rows.get(&row).map(|it| it.cells.contains_key(&col)).unwrap_or(false);
        if exists {
            self.set_value(row, col, &Value::Empty);
        }
    }

    pub(crate) fn merges(&self) -> &[CellRange] {
        &self.merges
    }

    /// Merges `range`; every cell but the top-left one loses its content.
    pub(crate) fn merge(&mut self, range: CellRange) {
        for row in range.first_row..=range.last_row {
            for col in range.first_col..=range.last_col {
                if (row, col) != (range.first_row, range.first_col) {
                    self.clear_value(row, col);
                }
            }
        }
        self.merges.push(range);
    }

    /// Removes every merged range touching a 0-based row in `lower..=upper`.
    /// Returns the removed ranges.
    pub(crate) fn unmerge_overlapping(&mut self, lower: usize, upper: usize) -> Vec<CellRange> {
        let (removed, kept): (Vec<CellRange>, Vec<CellRange>) = self.merges.iter()
            .copied()
            .partition(|range| range.overlaps_rows(lower, upper));
        self.merges = kept;
        removed
    }

    /// Relationship id of the sheet's `<drawing>` element, if any.
    pub(crate) fn drawing_relationship(&self) -> Result<Option<String>, CustomsError> {
        let Some(element) = self.trailing.iter().find(|element| element.name == "drawing") else {
            return Ok(None);
        };
        for event in &element.events {
            if let Event::Empty(start) | Event::Start(start) = event {
                for (key, value) in start.attribute_pairs()? {
                    if key == "id" || key.ends_with(":id") {
                        return Ok(Some(value));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Points the sheet at the drawing part registered under `relationship_id`.
    pub(crate) fn set_drawing(&mut self, relationship_id: &str) {
        self.trailing.retain(|element| element.name != "drawing");
        let element = BytesStart::new("drawing")
            .with_attributes([("xmlns:r", REL_OFFICE_NAMESPACE), ("r:id", relationship_id)]);
        let position = insertion_index(&self.trailing, "drawing");
        self.trailing.insert(position, Element {
            name: "drawing".to_owned(),
            events: vec![Event::Empty(element.into_owned())],
        });
    }

    /// Bounding range of every cell present in the sheet.
    pub(crate) fn dimension(&self) -> Option<CellRange> {
        let mut bounds: Option<CellRange> = None;
        for (row, cells) in &self.rows {
            let (Some(first), Some(last)) = (cells.cells.keys().next(), cells.cells.keys().next_back()) else {
                continue;
            };
            bounds = Some(match bounds {
                None => CellRange::new(*row, *first, *row, *last),
                Some(range) => CellRange::new(
                    range.first_row.min(*row),
                    range.first_col.min(*first),
                    range.last_row.max(*row),
                    range.last_col.max(*last),
                ),
            });
        }
        bounds
    }

    /// Serializes the worksheet back to XML.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, CustomsError> {
        let mut writer = XmlWriter::new();
        writer.write_all(&self.prolog)?;
        for element in &self.leading {
            if element.name == "dimension" {
                let reference = self.dimension()
                    .map(|range| range.to_string())
                    .unwrap_or_else(|| "A1".to_owned());
                writer.empty("dimension", &[("ref", reference.as_str())])?;
            } else {
                writer.write_all(&element.events)?;
            }
        }

        if self.rows.is_empty() {
            writer.empty("sheetData", &[])?;
        } else {
            writer.start("sheetData", &[])?;
            for (row_index, row) in &self.rows {
                self.write_row(&mut writer, *row_index, row)?;
            }
            writer.end("sheetData")?;
        }

        let merge_position = insertion_index(&self.trailing, "mergeCells");
        for (index, element) in self.trailing.iter().enumerate() {
            if index == merge_position {
                self.write_merges(&mut writer)?;
            }
            writer.write_all(&element.events)?;
        }
        if merge_position == self.trailing.len() {
            self.write_merges(&mut writer)?;
        }
        writer.write_all(&self.epilog)?;
        Ok(writer.into_bytes())
    }

    fn write_row(&self, writer: &mut XmlWriter, row_index: usize, row: &RowXml) -> Result<(), CustomsError> {
        let number = (row_index + 1).to_string();
        let mut attributes: Vec<(&str, &str)> = vec![("r", number.as_str())];
        attributes.extend(row.attributes.iter().map(|(key, value)| (key.as_str(), value.as_str())));
        if row.cells.is_empty() {
            return writer.empty("row", &attributes);
        }
        writer.start("row", &attributes)?;
        for (col_index, cell) in &row.cells {
            let reference = index_to_reference(row_index, *col_index);
            let mut attributes: Vec<(&str, &str)> = vec![("r", reference.as_str())];
            attributes.extend(cell.attributes.iter().map(|(key, value)| (key.as_str(), value.as_str())));
            if cell.content.is_empty() {
                writer.empty("c", &attributes)?;
            } else {
                writer.start("c", &attributes)?;
                writer.write_all(&cell.content)?;
                writer.end("c")?;
            }
        }
        writer.end("row")
    }

    fn write_merges(&self, writer: &mut XmlWriter) -> Result<(), CustomsError> {
        if self.merges.is_empty() {
            return Ok(());
        }
        let count = self.merges.len().to_string();
        writer.start("mergeCells", &[("count", count.as_str())])?;
        for range in &self.merges {
            writer.empty("mergeCell", &[("ref", range.to_string().as_str())])?;
        }
        writer.end("mergeCells")
    }
}

fn value_events(text: &str) -> Vec<Event<'static>> {
    vec![
        Event::Start(BytesStart::new("v")),
        Event::Text(BytesText::new(text).into_owned()),
        Event::End(BytesEnd::new("v")),
    ]
}

/// Index at which an element called `name` belongs among `elements`.
fn insertion_index(elements: &[Element], name: &str) -> usize {
    let order = |name: &str| TRAILING_ELEMENTS.iter().position(|it| *it == name).unwrap_or(TRAILING_ELEMENTS.len());
    let rank = order(name);
    elements.iter()
        .position(|element| order(&element.name) > rank)
        .unwrap_or(elements.len())
}
