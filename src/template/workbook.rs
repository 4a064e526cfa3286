use crate::error::CustomsError;
use crate::helpers::xml::read_events;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlWriter;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::xlsx::load_workbook;
use crate::template::drawing;
use crate::template::package::resolve_target;
use crate::template::package::Package;
use crate::template::package::REL_CALC_CHAIN;
use crate::template::package::REL_STYLES;
use crate::template::worksheet::Worksheet;
use crate::template::TemplateError;
use log::debug;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use zip::ZipArchive;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const STYLES_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const MINIMAL_STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
    r#"</styleSheet>"#,
);

/// A template workbook opened for editing.
pub(crate) struct TemplateWorkbook {
    /// Template location, used in error messages
    path: String,
    package: Package,
    /// Worksheets as (name, part) pairs in workbook order
    sheets: Vec<(String, String)>,
    /// Worksheets parsed so far, by name
    worksheets: HashMap<String, Worksheet>,
}

impl TemplateWorkbook {
    /// Opens the template at `path`.
    ///
    /// A missing file and an unreadable package are reported separately.
    pub(crate) fn open(path: &Path) -> Result<TemplateWorkbook, CustomsError> {
        let display = path.display().to_string();
        if !path.is_file() {
            Err(TemplateError::TemplateNotFoundError(display.to_owned()))?
        }
        let load = || -> Result<(Package, Vec<(String, String)>), CustomsError> {
            let mut zip = ZipArchive::new(BufReader::new(File::open(path)?))?;
            let info = load_workbook(&mut zip)?;
            Ok((Package::new(zip.read_parts()?), info.sheets))
        };
        let (package, sheets) = load()
            .map_err(|error| TemplateError::TemplateLoadError(display.to_owned(), error.to_string()))?;
        let mut workbook = TemplateWorkbook {
            path: display,
            package,
            sheets,
            worksheets: HashMap::new(),
        };
        workbook.drop_calc_chain()?;
        Ok(workbook)
    }

    pub(crate) fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    fn sheet_part(&self, name: &str) -> Result<String, CustomsError> {
        match self.sheets.iter().find(|(sheet, _)| sheet == name) {
            Some((_, part)) => Ok(part.to_owned()),
            None => Err(TemplateError::SheetNotFoundError {
                sheet: name.to_owned(),
                template: self.path.to_owned(),
                available: self.sheet_names(),
            })?,
        }
    }

    /// Worksheet called `name`, parsed on first access.
    pub(crate) fn worksheet_mut(&mut self, name: &str) -> Result<&mut Worksheet, CustomsError> {
        if !self.worksheets.contains_key(name) {
            let part = self.sheet_part(name)?;
            let worksheet = Worksheet::parse(&part, self.package.required_part(&part)?)?;
            self.worksheets.insert(name.to_owned(), worksheet);
        }
        self.worksheets.get_mut(name)
            .ok_or_else(|| TemplateError::MissingPartError(name.to_owned()).into())
    }

    /// Overlays a picture on sheet `name`, anchored at `anchor`.
    pub(crate) fn add_image(&mut self, name: &str, image_path: &Path, anchor: &str) -> Result<(), CustomsError> {
        let part = self.sheet_part(name)?;
        self.worksheet_mut(name)?;
        let worksheet = self.worksheets.get_mut(name)
            .ok_or_else(|| TemplateError::MissingPartError(part.to_owned()))?;
        drawing::add_image(&mut self.package, &part, worksheet, image_path, anchor)
    }

    /// Centers every cell of every sheet by giving each cell format a centered alignment.
    pub(crate) fn center_all_cells(&mut self) -> Result<(), CustomsError> {
        let mut relationships = self.package.relationships(WORKBOOK_PART)?;
        let styles_part = match relationships.find_kind(REL_STYLES) {
            Some(relationship) => resolve_target(WORKBOOK_PART, &relationship.target),
            None => {
                relationships.add(REL_STYLES, "styles.xml");
                self.package.set_relationships(WORKBOOK_PART, &relationships)?;
                self.package.add_override_content_type("xl/styles.xml", STYLES_CONTENT_TYPE)?;
                "xl/styles.xml".to_owned()
            }
        };
        let centered = match self.package.part(&styles_part) {
            Some(bytes) => center_styles(bytes)?,
            None => center_styles(MINIMAL_STYLES.as_bytes())?,
        };
        self.package.set_part(&styles_part, centered);
        Ok(())
    }

    /// Writes the edited workbook to `path`.
    pub(crate) fn save(mut self, path: &Path) -> Result<(), CustomsError> {
        for (name, worksheet) in &self.worksheets {
            let part = self.sheet_part(name)?;
            self.package.set_part(&part, worksheet.to_bytes()?);
        }
        self.package.save(path)
    }

    /// Removes the calculation chain; it goes stale once cells are overwritten
    /// and spreadsheet applications rebuild it on load.
    fn drop_calc_chain(&mut self) -> Result<(), CustomsError> {
        let mut relationships = self.package.relationships(WORKBOOK_PART)?;
        let removed = relationships.remove_kind(REL_CALC_CHAIN);
        if removed.is_empty() {
            return Ok(());
        }
        self.package.set_relationships(WORKBOOK_PART, &relationships)?;
        for relationship in removed {
            let part = resolve_target(WORKBOOK_PART, &relationship.target);
            debug!("Dropping {part}");
            self.package.remove_part(&part);
            self.package.remove_override_content_type(&part)?;
        }
        Ok(())
    }
}

/// Rewrites a styles part so that every `cellXfs` entry is centered both ways.
fn center_styles(bytes: &[u8]) -> Result<Vec<u8>, CustomsError> {
    let mut writer = XmlWriter::new();
    let mut in_cell_formats = false;
    let mut in_format = false;
    let mut in_alignment = false;
    for event in read_events(bytes)? {
        match event {
            Event::Start(element) if element.local_name().as_ref() == b"cellXfs" => {
                in_cell_formats = true;
                writer.write(&Event::Start(element))?;
            }
            Event::End(element) if element.local_name().as_ref() == b"cellXfs" => {
                in_cell_formats = false;
                writer.write(&Event::End(element))?;
            }
            Event::Empty(element) if in_cell_formats && element.local_name().as_ref() == b"xf" => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                writer.write(&Event::Start(with_alignment_flag(&element)?))?;
                write_alignment(&mut writer, &name)?;
                writer.write(&Event::End(BytesEnd::new(name)))?;
            }
            Event::Start(element) if in_cell_formats && element.local_name().as_ref() == b"xf" => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                in_format = true;
                writer.write(&Event::Start(with_alignment_flag(&element)?))?;
                write_alignment(&mut writer, &name)?;
            }
            Event::End(element) if in_format && element.local_name().as_ref() == b"xf" => {
                in_format = false;
                writer.write(&Event::End(element))?;
            }
            Event::Empty(element) if in_format && element.local_name().as_ref() == b"alignment" => (),
            Event::Start(element) if in_format && element.local_name().as_ref() == b"alignment" => in_alignment = true,
            Event::End(element) if in_alignment && element.local_name().as_ref() == b"alignment" => in_alignment = false,
            _ if in_alignment => (),
            event => writer.write(&event)?,
        }
    }
    Ok(writer.into_bytes())
}

/// Copy of an `xf` start tag with `applyAlignment="1"`.
fn with_alignment_flag(element: &BytesStart) -> Result<BytesStart<'static>, CustomsError> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut attributes = element.attribute_pairs()?;
    attributes.retain(|(key, _)| key != "applyAlignment");
    attributes.push(("applyAlignment".to_owned(), "1".to_owned()));
    let mut start = BytesStart::new(name);
    for (key, value) in &attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    Ok(start)
}

/// Writes the centered `<alignment>` child, reusing the prefix of the `xf` tag.
fn write_alignment(writer: &mut XmlWriter, format_name: &str) -> Result<(), CustomsError> {
    let name = match format_name.split_once(':') {
        Some((prefix, _)) => format!("{prefix}:alignment"),
        None => "alignment".to_owned(),
    };
    writer.empty(&name, &[("horizontal", "center"), ("vertical", "center")])
}
