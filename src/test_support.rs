//! Workbook fixtures written from minimal SpreadsheetML parts.
use crate::helpers::zip::write_parts;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use quick_xml::escape::escape;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

const MAIN_NAMESPACE: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIP_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const RELATIONSHIP_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

enum FixtureValue {
    Inline(String),
    Shared(String),
    Number(f64),
}

/// One worksheet of a fixture workbook.
pub(crate) struct SheetFixture {
    name: String,
    cells: BTreeMap<(usize, usize), FixtureValue>,
    merges: Vec<String>,
}

impl SheetFixture {
    pub(crate) fn new(name: &str) -> Self {
        SheetFixture {
            name: name.to_owned(),
            cells: BTreeMap::new(),
            merges: Vec::new(),
        }
    }

    fn cell(mut self, reference: &str, value: FixtureValue) -> Self {
        let position = reference_to_index(reference).unwrap();
        self.cells.insert(position, value);
        self
    }

    /// Inline string cell.
    pub(crate) fn text(self, reference: &str, value: &str) -> Self {
        self.cell(reference, FixtureValue::Inline(value.to_owned()))
    }

    /// Shared string cell.
    pub(crate) fn shared(self, reference: &str, value: &str) -> Self {
        self.cell(reference, FixtureValue::Shared(value.to_owned()))
    }

    pub(crate) fn number(self, reference: &str, value: f64) -> Self {
        self.cell(reference, FixtureValue::Number(value))
    }

    pub(crate) fn merge(mut self, reference: &str) -> Self {
        self.merges.push(reference.to_owned());
        self
    }

    fn to_xml(&self, shared_strings: &mut Vec<String>) -> String {
        let mut rows: BTreeMap<usize, String> = BTreeMap::new();
        for ((row, col), value) in &self.cells {
            let reference = index_to_reference(*row, *col);
            let cell = match value {
                FixtureValue::Inline(text) => format!(r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#, escape(text.as_str())),
                FixtureValue::Shared(text) => {
                    shared_strings.push(text.to_owned());
                    format!(r#"<c r="{reference}" t="s"><v>{}</v></c>"#, shared_strings.len() - 1)
                }
                FixtureValue::Number(number) => format!(r#"<c r="{reference}" s="1"><v>{number}</v></c>"#),
            };
            rows.entry(*row).or_default().push_str(&cell);
        }
        let mut xml = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN_NAMESPACE}" xmlns:r="{RELATIONSHIP_NAMESPACE}"><dimension ref="A1"/><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetFormatPr defaultRowHeight="15"/>"#);
        xml.push_str("<sheetData>");
        for (row, cells) in rows {
            xml.push_str(&format!(r#"<row r="{}" spans="1:20">{cells}</row>"#, row + 1));
        }
        xml.push_str("</sheetData>");
        if !self.merges.is_empty() {
            xml.push_str(&format!(r#"<mergeCells count="{}">"#, self.merges.len()));
            for merge in &self.merges {
                xml.push_str(&format!(r#"<mergeCell ref="{merge}"/>"#));
            }
            xml.push_str("</mergeCells>");
        }
        xml.push_str(r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#);
        xml
    }
}

/// A workbook assembled from sheet fixtures.
pub(crate) struct WorkbookFixture {
    sheets: Vec<SheetFixture>,
    active_tab: usize,
    calc_chain: bool,
}

impl WorkbookFixture {
    pub(crate) fn new() -> Self {
        WorkbookFixture {
            sheets: Vec::new(),
            active_tab: 0,
            calc_chain: false,
        }
    }

    pub(crate) fn sheet(mut self, sheet: SheetFixture) -> Self {
        self.sheets.push(sheet);
        self
    }

    pub(crate) fn active_tab(mut self, index: usize) -> Self {
        self.active_tab = index;
        self
    }

    /// Adds a calculation chain part.
    pub(crate) fn calc_chain(mut self) -> Self {
        self.calc_chain = true;
        self
    }

    pub(crate) fn write(&self, path: &Path) {
        let mut shared_strings = Vec::new();
        let mut parts: Vec<(String, Vec<u8>)> = Vec::new();
        let mut overrides = String::new();
        let mut sheets = String::new();
        let mut relationships = String::new();

        for (index, sheet) in self.sheets.iter().enumerate() {
            let number = index + 1;
            let part = format!("xl/worksheets/sheet{number}.xml");
            parts.push((part.to_owned(), sheet.to_xml(&mut shared_strings).into_bytes()));
            overrides.push_str(&format!(r#"<Override PartName="/{part}" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#));
            sheets.push_str(&format!(r#"<sheet name="{}" sheetId="{number}" r:id="rId{number}"/>"#, escape(sheet.name.as_str())));
            relationships.push_str(&format!(r#"<Relationship Id="rId{number}" Type="{RELATIONSHIP_TYPE}/worksheet" Target="worksheets/sheet{number}.xml"/>"#));
        }

        let count = self.sheets.len();
        relationships.push_str(&format!(r#"<Relationship Id="rId{}" Type="{RELATIONSHIP_TYPE}/styles" Target="styles.xml"/>"#, count + 1));
        overrides.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
        parts.push(("xl/styles.xml".to_owned(), format!(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="{}">"#,
            r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#,
            r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
            r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
            r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
            r#"<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
            r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0" applyAlignment="1"><alignment horizontal="left"/></xf></cellXfs>"#,
            r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#,
        ), MAIN_NAMESPACE).into_bytes()));

        if !shared_strings.is_empty() {
            relationships.push_str(&format!(r#"<Relationship Id="rId{}" Type="{RELATIONSHIP_TYPE}/sharedStrings" Target="sharedStrings.xml"/>"#, count + 2));
            overrides.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
            let items: String = shared_strings.iter()
                .map(|text| format!("<si><t>{}</t></si>", escape(text.as_str())))
                .collect();
            parts.push(("xl/sharedStrings.xml".to_owned(), format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{MAIN_NAMESPACE}" count="{0}" uniqueCount="{0}">{items}</sst>"#,
                shared_strings.len(),
            ).into_bytes()));
        }

        if self.calc_chain {
            relationships.push_str(&format!(r#"<Relationship Id="rId{}" Type="{RELATIONSHIP_TYPE}/calcChain" Target="calcChain.xml"/>"#, count + 3));
            overrides.push_str(r#"<Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/>"#);
            parts.push(("xl/calcChain.xml".to_owned(), format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><calcChain xmlns="{MAIN_NAMESPACE}"><c r="A1" i="1"/></calcChain>"#,
            ).into_bytes()));
        }

        parts.push(("xl/workbook.xml".to_owned(), format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NAMESPACE}" xmlns:r="{RELATIONSHIP_NAMESPACE}"><workbookPr/><bookViews><workbookView activeTab="{}"/></bookViews><sheets>{sheets}</sheets></workbook>"#,
            self.active_tab,
        ).into_bytes()));
        parts.push(("xl/_rels/workbook.xml.rels".to_owned(), format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#,
        ).into_bytes()));
        parts.push(("_rels/.rels".to_owned(), format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{RELATIONSHIP_TYPE}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
        ).into_bytes()));
        parts.insert(0, ("[Content_Types].xml".to_owned(), format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{overrides}</Types>"#,
        ).into_bytes()));

        write_parts(File::create(path).unwrap(), &parts).unwrap();
    }
}

/// The four-sheet declaration template, with a merged range below the packing list header.
pub(crate) fn template() -> WorkbookFixture {
    WorkbookFixture::new()
        .sheet(SheetFixture::new("PKL ")
            .shared("A1", "PACKING LIST")
            .text("A15", "placeholder")
            .merge("A15:C15"))
        .sheet(SheetFixture::new("INV")
            .shared("A1", "COMMERCIAL INVOICE")
            .number("G14", 0.0))
        .sheet(SheetFixture::new("合同 ")
            .text("A1", "合同"))
        .sheet(SheetFixture::new("申报要素"))
}

/// A PNG header of the given size; only the IHDR chunk is meaningful.
pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(b"IEND");
    bytes.extend_from_slice(&[0xAE, 0x42, 0x60, 0x82]);
    bytes
}
