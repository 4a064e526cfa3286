//! In-memory Office Open XML package: parts, content types and relationships.
use crate::error::CustomsError;
use crate::helpers::xml::read_events;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlWriter;
use crate::helpers::zip::write_parts;
use crate::template::TemplateError;
use quick_xml::events::BytesDecl;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

pub(crate) const REL_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub(crate) const REL_OFFICE_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const REL_DRAWING: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";
pub(crate) const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub(crate) const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
pub(crate) const REL_CALC_CHAIN: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";

/// All parts of a package, kept in archive order.
pub(crate) struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub(crate) fn new(parts: Vec<(String, Vec<u8>)>) -> Self {
        Package { parts }
    }

    /// Reads every part of the archive at `path`.
    #[cfg(test)]
    pub(crate) fn open(path: &Path) -> Result<Package, CustomsError> {
        use crate::helpers::zip::ZipHelper;
        use std::io::BufReader;
        use zip::ZipArchive;

        let mut zip = ZipArchive::new(BufReader::new(File::open(path)?))?;
        Ok(Package::new(zip.read_parts()?))
    }

    pub(crate) fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.iter()
            .find(|(part, _)| part.eq_ignore_ascii_case(name))
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// Like [`Package::part`] but a missing part is an error.
    pub(crate) fn required_part(&self, name: &str) -> Result<&[u8], CustomsError> {
        self.part(name)
            .ok_or_else(|| TemplateError::MissingPartError(name.to_owned()).into())
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    /// Replaces the content of `name`, adding the part when it does not exist.
    pub(crate) fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        match self.parts.iter_mut().find(|(part, _)| part.eq_ignore_ascii_case(name)) {
            Some((_, content)) => *content = bytes,
            None => self.parts.push((name.to_owned(), bytes)),
        }
    }

    pub(crate) fn remove_part(&mut self, name: &str) -> bool {
        let before = self.parts.len();
        self.parts.retain(|(part, _)| !part.eq_ignore_ascii_case(name));
        before != self.parts.len()
    }

    /// First free `{prefix}{N}{suffix}` part name, counting from 1.
    pub(crate) fn next_part_name(&self, prefix: &str, suffix: &str) -> String {
        (1..)
            .map(|index| format!("{prefix}{index}{suffix}"))
            .find(|name| !self.contains(name))
            .unwrap_or_default()
    }

    /// Relationships of `part`; empty when the part has no relationship file.
    pub(crate) fn relationships(&self, part: &str) -> Result<Relationships, CustomsError> {
        match self.part(&rels_path(part)) {
            Some(bytes) => Relationships::parse(bytes),
            None => Ok(Relationships::default()),
        }
    }

    pub(crate) fn set_relationships(&mut self, part: &str, relationships: &Relationships) -> Result<(), CustomsError> {
        let bytes = relationships.to_bytes()?;
        self.set_part(&rels_path(part), bytes);
        Ok(())
    }

    /// Registers a default content type for a file extension when none exists.
    pub(crate) fn add_default_content_type(&mut self, extension: &str, content_type: &str) -> Result<(), CustomsError> {
        self.patch_content_types("Default", "Extension", extension, content_type)
    }

    /// Registers a content type override for a part (`name` without leading slash).
    pub(crate) fn add_override_content_type(&mut self, name: &str, content_type: &str) -> Result<(), CustomsError> {
        self.patch_content_types("Override", "PartName", &format!("/{name}"), content_type)
    }

    /// Drops the content type override of a part.
    pub(crate) fn remove_override_content_type(&mut self, name: &str) -> Result<(), CustomsError> {
        let part_name = format!("/{name}");
        let events = read_events(self.required_part(CONTENT_TYPES_PART)?)?;
        let mut writer = XmlWriter::new();
        for event in &events {
            if let Event::Empty(element) = event {
                if element.local_name().as_ref() == b"Override"
                    && element.get_attribute_value("PartName")?.map(|value| value.eq_ignore_ascii_case(&part_name)).unwrap_or(false) {
                    continue;
                }
            }
            writer.write(event)?;
        }
        self.set_part(CONTENT_TYPES_PART, writer.into_bytes());
        Ok(())
    }

    fn patch_content_types(&mut self, tag: &str, key: &str, value: &str, content_type: &str) -> Result<(), CustomsError> {
        let events = read_events(self.required_part(CONTENT_TYPES_PART)?)?;
        for event in &events {
            if let Event::Empty(element) | Event::Start(element) = event {
                if element.local_name().as_ref() == tag.as_bytes()
                    && element.get_attribute_value(key)?.map(|it| it.eq_ignore_ascii_case(value)).unwrap_or(false) {
                    return Ok(());
                }
            }
        }
        let mut writer = XmlWriter::new();
        for event in &events {
            if let Event::End(element) = event {
                if element.local_name().as_ref() == b"Types" {
                    writer.empty(tag, &[(key, value), ("ContentType", content_type)])?;
                }
            }
            writer.write(event)?;
        }
        self.set_part(CONTENT_TYPES_PART, writer.into_bytes());
        Ok(())
    }

    /// Writes the package next to `path` first and renames it into place,
    /// so an interrupted save never leaves a truncated file behind.
    pub(crate) fn save(&self, path: &Path) -> Result<(), CustomsError> {
        let temporary = temporary_path(path);
        let result = (|| -> Result<(), CustomsError> {
            let file = File::create(&temporary)?;
            let mut writer = write_parts(BufWriter::new(file), &self.parts)?;
            writer.flush()?;
            Ok(())
        })();
        match result.and_then(|_| Ok(fs::rename(&temporary, path)?)) {
            Ok(()) => Ok(()),
            Err(error) => {
                let _ = fs::remove_file(&temporary);
                Err(error)
            }
        }
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let name = path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

/// Path of the relationship part belonging to `part`.
pub(crate) fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((directory, file)) => format!("{directory}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the part that owns the relationship.
pub(crate) fn resolve_target(base_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_owned();
    }
    let mut segments: Vec<&str> = match base_part.rsplit_once('/') {
        Some((directory, _)) => directory.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    segments.join("/")
}

/// One `<Relationship>` entry.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Relationship {
    pub(crate) id: String,
    pub(crate) kind: String,
    pub(crate) target: String,
    pub(crate) target_mode: Option<String>,
}

/// The relationships declared by one part.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Relationships {
    entries: Vec<Relationship>,
}

impl Relationships {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Relationships, CustomsError> {
        let mut entries = Vec::new();
        for event in read_events(bytes)? {
            if let Event::Empty(element) | Event::Start(element) = &event {
                if element.local_name().as_ref() == b"Relationship" {
                    let id = element.get_attribute_value("Id")?;
                    let kind = element.get_attribute_value("Type")?;
                    let target = element.get_attribute_value("Target")?;
                    if let Some(((id, kind), target)) = id.zip(kind).zip(target) {
                        entries.push(Relationship {
                            id: id.into_owned(),
                            kind: kind.into_owned(),
                            target: target.into_owned(),
                            target_mode: element.get_attribute_value("TargetMode")?.map(|mode| mode.into_owned()),
                        });
                    }
                }
            }
        }
        Ok(Relationships { entries })
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Relationship> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub(crate) fn find_kind(&self, kind: &str) -> Option<&Relationship> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }

    /// Adds a relationship under the first free `rIdN` and returns that id.
    pub(crate) fn add(&mut self, kind: &str, target: &str) -> String {
        let id = (1..)
            .map(|index| format!("rId{index}"))
            .find(|id| self.get(id).is_none())
            .unwrap_or_default();
        self.entries.push(Relationship {
            id: id.to_owned(),
            kind: kind.to_owned(),
            target: target.to_owned(),
            target_mode: None,
        });
        id
    }

    /// Removes every relationship of `kind`, returning the removed entries.
    pub(crate) fn remove_kind(&mut self, kind: &str) -> Vec<Relationship> {
        let (removed, kept): (Vec<_>, Vec<_>) = self.entries.drain(..).partition(|entry| entry.kind == kind);
        self.entries = kept;
        removed
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, CustomsError> {
        let mut writer = XmlWriter::new();
        writer.write(&Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        writer.start("Relationships", &[("xmlns", REL_NAMESPACE)])?;
        for entry in &self.entries {
            let mut element = BytesStart::new("Relationship");
            element.push_attribute(("Id", entry.id.as_str()));
            element.push_attribute(("Type", entry.kind.as_str()));
            element.push_attribute(("Target", entry.target.as_str()));
            if let Some(mode) = &entry.target_mode {
                element.push_attribute(("TargetMode", mode.as_str()));
            }
            writer.write(&Event::Empty(element))?;
        }
        writer.end("Relationships")?;
        Ok(writer.into_bytes())
    }
}
