//! Picture overlays anchored to a worksheet cell.
use crate::error::CustomsError;
use crate::helpers::xml::read_events;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlWriter;
use crate::spreadsheet::reference::reference_to_index;
use crate::table::range::RangeError;
use crate::template::package::resolve_target;
use crate::template::package::Package;
use crate::template::package::REL_DRAWING;
use crate::template::package::REL_IMAGE;
use crate::template::package::REL_OFFICE_NAMESPACE;
use crate::template::worksheet::Worksheet;
use crate::template::TemplateError;
use quick_xml::events::BytesDecl;
use quick_xml::events::Event;
use std::path::Path;

const DRAWING_NAMESPACE: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
const MAIN_NAMESPACE: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const DRAWING_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.drawing+xml";
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// EMUs per pixel at 96 DPI
const EMU_PER_PIXEL: u64 = 9525;

/// Supported picture encodings.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Encoding and pixel size of a picture, read from its header.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct ImageInfo {
    pub(crate) format: ImageFormat,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

/// Reads the format and pixel dimensions of a PNG or JPEG image.
pub(crate) fn image_info(name: &str, bytes: &[u8]) -> Result<ImageInfo, CustomsError> {
    if bytes.starts_with(&PNG_SIGNATURE) && bytes.len() >= 24 && &bytes[12..16] == b"IHDR" {
        let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        return Ok(ImageInfo { format: ImageFormat::Png, width, height });
    }
    if bytes.starts_with(&[0xFF, 0xD8]) {
        let mut offset = 2usize;
        while offset + 4 <= bytes.len() {
            if bytes[offset] != 0xFF {
                break;
            }
            let marker = bytes[offset + 1];
            let length = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
            // Start-of-frame markers carry the dimensions; C4, C8 and CC are not frames
            let is_frame = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
            if is_frame && offset + 9 <= bytes.len() {
                let height = u16::from_be_bytes([bytes[offset + 5], bytes[offset + 6]]) as u32;
                let width = u16::from_be_bytes([bytes[offset + 7], bytes[offset + 8]]) as u32;
                return Ok(ImageInfo { format: ImageFormat::Jpeg, width, height });
            }
            offset += 2 + length;
        }
    }
    Err(TemplateError::ImageFormatError(name.to_owned()))?
}

/// Places the picture at `image_path` on the sheet with its top-left corner in
/// `anchor`, at its native pixel size.
///
/// # Arguments
/// * `package` - Package receiving the media, drawing and relationship parts
/// * `sheet_part` - Part name of the worksheet, e.g. `xl/worksheets/sheet1.xml`
/// * `worksheet` - Worksheet model, updated when it has no drawing yet
/// * `image_path` - Picture file on disk
/// * `anchor` - A1 reference of the anchor cell
pub(crate) fn add_image(
    package: &mut Package,
    sheet_part: &str,
    worksheet: &mut Worksheet,
    image_path: &Path,
    anchor: &str,
) -> Result<(), CustomsError> {
    let (row, col) = reference_to_index(anchor)
        .ok_or_else(|| RangeError::FormatError(anchor.to_owned()))?;
    let bytes = std::fs::read(image_path)?;
    let info = image_info(&image_path.display().to_string(), &bytes)?;

    let media_part = package.next_part_name("xl/media/image", &format!(".{}", info.format.extension()));
    package.set_part(&media_part, bytes);
    package.add_default_content_type(info.format.extension(), info.format.content_type())?;

    let mut sheet_relationships = package.relationships(sheet_part)?;
    let existing = match worksheet.drawing_relationship()? {
        Some(id) => sheet_relationships.get(&id)
            .filter(|relationship| relationship.kind == REL_DRAWING)
            .map(|relationship| resolve_target(sheet_part, &relationship.target))
            .filter(|drawing_part| package.contains(drawing_part)),
        None => None,
    };
    let drawing_part = match existing {
        Some(drawing_part) => drawing_part,
        None => {
            let drawing_part = package.next_part_name("xl/drawings/drawing", ".xml");
            package.set_part(&drawing_part, empty_drawing()?);
            package.add_override_content_type(&drawing_part, DRAWING_CONTENT_TYPE)?;
            let file_name = drawing_part.rsplit('/').next().unwrap_or_default();
            let id = sheet_relationships.add(REL_DRAWING, &format!("../drawings/{file_name}"));
            package.set_relationships(sheet_part, &sheet_relationships)?;
            worksheet.set_drawing(&id);
            drawing_part
        }
    };

    let mut drawing_relationships = package.relationships(&drawing_part)?;
    let media_name = media_part.rsplit('/').next().unwrap_or_default();
    let embed = drawing_relationships.add(REL_IMAGE, &format!("../media/{media_name}"));
    package.set_relationships(&drawing_part, &drawing_relationships)?;

    let drawing = append_anchor(package.required_part(&drawing_part)?, row, col, &info, &embed)?;
    package.set_part(&drawing_part, drawing);
    Ok(())
}

fn empty_drawing() -> Result<Vec<u8>, CustomsError> {
    let mut writer = XmlWriter::new();
    writer.write(&Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.empty("xdr:wsDr", &[("xmlns:xdr", DRAWING_NAMESPACE), ("xmlns:a", MAIN_NAMESPACE)])?;
    Ok(writer.into_bytes())
}

/// Adds a one-cell anchor holding the picture to a drawing part.
fn append_anchor(drawing: &[u8], row: usize, col: usize, info: &ImageInfo, embed: &str) -> Result<Vec<u8>, CustomsError> {
    let events = read_events(drawing)?;
    let mut next_id = 1u32;
    for event in &events {
        if let Event::Empty(element) | Event::Start(element) = event {
            if element.local_name().as_ref() == b"cNvPr" {
                if let Some(id) = element.parse_attribute_value::<u32>("id")? {
                    next_id = next_id.max(id + 1);
                }
            }
        }
    }

    let mut writer = XmlWriter::new();
    for event in events {
        match event {
            Event::Empty(element) if element.local_name().as_ref() == b"wsDr" => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                writer.write(&Event::Start(element))?;
                write_anchor(&mut writer, row, col, info, embed, next_id)?;
                writer.end(&name)?;
            }
            Event::End(element) if element.local_name().as_ref() == b"wsDr" => {
                write_anchor(&mut writer, row, col, info, embed, next_id)?;
                writer.write(&Event::End(element))?;
            }
            event => writer.write(&event)?,
        }
    }
    Ok(writer.into_bytes())
}

fn write_anchor(writer: &mut XmlWriter, row: usize, col: usize, info: &ImageInfo, embed: &str, id: u32) -> Result<(), CustomsError> {
    let cx = (info.width as u64 * EMU_PER_PIXEL).to_string();
    let cy = (info.height as u64 * EMU_PER_PIXEL).to_string();
    let id = id.to_string();
    let name = format!("Picture {id}");

    writer.start("xdr:oneCellAnchor", &[
        ("xmlns:xdr", DRAWING_NAMESPACE),
        ("xmlns:a", MAIN_NAMESPACE),
        ("xmlns:r", REL_OFFICE_NAMESPACE),
    ])?;
    writer.start("xdr:from", &[])?;
    for (tag, value) in [("xdr:col", col.to_string()), ("xdr:colOff", "0".to_owned()), ("xdr:row", row.to_string()), ("xdr:rowOff", "0".to_owned())] {
        writer.start(tag, &[])?;
        writer.text(&value)?;
        writer.end(tag)?;
    }
    writer.end("xdr:from")?;
    writer.empty("xdr:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;

    writer.start("xdr:pic", &[])?;
    writer.start("xdr:nvPicPr", &[])?;
    writer.empty("xdr:cNvPr", &[("id", id.as_str()), ("name", name.as_str())])?;
    writer.start("xdr:cNvPicPr", &[])?;
    writer.empty("a:picLocks", &[("noChangeAspect", "1")])?;
    writer.end("xdr:cNvPicPr")?;
    writer.end("xdr:nvPicPr")?;

    writer.start("xdr:blipFill", &[])?;
    writer.empty("a:blip", &[("r:embed", embed)])?;
    writer.start("a:stretch", &[])?;
    writer.empty("a:fillRect", &[])?;
    writer.end("a:stretch")?;
    writer.end("xdr:blipFill")?;

    writer.start("xdr:spPr", &[])?;
    writer.start("a:xfrm", &[])?;
    writer.empty("a:off", &[("x", "0"), ("y", "0")])?;
    writer.empty("a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    writer.end("a:xfrm")?;
    writer.start("a:prstGeom", &[("prst", "rect")])?;
    writer.empty("a:avLst", &[])?;
    writer.end("a:prstGeom")?;
    writer.end("xdr:spPr")?;
    writer.end("xdr:pic")?;

    writer.empty("xdr:clientData", &[])?;
    writer.end("xdr:oneCellAnchor")
}
