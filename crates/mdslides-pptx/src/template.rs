//! Reference template loading.
//!
//! This module loads PowerPoint templates (`.pptx` or `.potx`) and extracts
//! the layout information the renderer needs. The unpacked package is kept
//! so slides can be injected into it.

use std::collections::HashMap;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info};

use crate::constants::{
    DEFAULT_SLIDE_HEIGHT_EMU, DEFAULT_SLIDE_WIDTH_EMU, REL_TYPE_NOTES_MASTER, REL_TYPE_THEME,
};
use crate::default_template;
use crate::error::{PptxError, Result};
use crate::layout::{LayoutType, PlaceholderInfo, PlaceholderType, SlideLayout};
use crate::package::{resolve_target, Package, PRESENTATION_PART};

/// A loaded PPTX/POTX template
#[derive(Debug, Clone)]
pub struct PotxTemplate {
    /// Template file path (if loaded from file)
    pub path: Option<String>,

    /// Slide layouts, sorted by index
    layouts: Vec<SlideLayout>,

    /// Theme information
    pub theme: Option<ThemeInfo>,

    /// Slide dimensions (width, height) in EMU
    pub slide_size: (i64, i64),

    /// Notes master part, when the template has one
    pub notes_master: Option<String>,

    /// Unpacked template package
    package: Package,
}

/// Theme information from the template
#[derive(Debug, Clone)]
pub struct ThemeInfo {
    /// Theme name
    pub name: String,

    /// Major font (headings)
    pub major_font: String,

    /// Minor font (body)
    pub minor_font: String,

    /// Color scheme (`accent1` -> `4472C4`)
    pub colors: HashMap<String, String>,
}

impl Default for ThemeInfo {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            major_font: "Calibri Light".to_string(),
            minor_font: "Calibri".to_string(),
            colors: HashMap::new(),
        }
    }
}

impl PotxTemplate {
    /// Load a template from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PptxError::template_not_found(path.display().to_string()),
            _ => PptxError::IoError(e),
        })?;
        let mut template = Self::from_bytes(&data)?;
        template.path = Some(path.display().to_string());
        info!(
            path = %path.display(),
            layouts = template.layouts.len(),
            "loaded template"
        );
        Ok(template)
    }

    /// Load a template from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let package = Package::from_bytes(data)
            .map_err(|e| PptxError::invalid_template(format!("not a ZIP package: {}", e)))?;

        let presentation = package
            .get(PRESENTATION_PART)
            .ok_or_else(|| PptxError::invalid_template("missing ppt/presentation.xml"))?;
        let slide_size = extract_slide_size(presentation)?;

        let layouts = extract_layouts(&package)?;
        if layouts.is_empty() {
            return Err(PptxError::invalid_template("template has no slide layouts"));
        }

        let pres_rels = package.relationships(PRESENTATION_PART)?;
        let notes_master = pres_rels
            .find_type(REL_TYPE_NOTES_MASTER)
            .map(|rel| resolve_target(PRESENTATION_PART, &rel.target))
            .filter(|part| package.contains(part));

        // Theme is optional
        let theme = pres_rels
            .find_type(REL_TYPE_THEME)
            .map(|rel| resolve_target(PRESENTATION_PART, &rel.target))
            .or_else(|| Some("ppt/theme/theme1.xml".to_string()))
            .and_then(|part| package.get(&part).map(extract_theme))
            .and_then(|r| r.ok());

        debug!(
            layouts = layouts.len(),
            width = slide_size.0,
            height = slide_size.1,
            notes_master = notes_master.is_some(),
            "parsed template"
        );

        Ok(Self {
            path: None,
            layouts,
            theme,
            slide_size,
            notes_master,
            package,
        })
    }

    /// The built-in five-layout 16:9 template
    pub fn builtin() -> Result<Self> {
        Self::from_bytes(&default_template::bytes()?)
    }

    /// Get all layouts
    pub fn layouts(&self) -> &[SlideLayout] {
        &self.layouts
    }

    /// Get a layout by index (1-based)
    pub fn get_layout(&self, index: u32) -> Option<&SlideLayout> {
        self.layouts.iter().find(|l| l.index == index)
    }

    /// Get the number of layouts
    pub fn layout_count(&self) -> usize {
        self.layouts.len()
    }

    /// The unpacked template package
    pub fn package(&self) -> &Package {
        &self.package
    }
}

fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn attr_i64(e: &BytesStart, key: &[u8]) -> Option<i64> {
    attr_string(e, key).and_then(|v| v.parse().ok())
}

/// Extract slide size from presentation.xml
fn extract_slide_size(xml: &[u8]) -> Result<(i64, i64)> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut width = DEFAULT_SLIDE_WIDTH_EMU;
    let mut height = DEFAULT_SLIDE_HEIGHT_EMU;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.local_name().as_ref() == b"sldSz" =>
            {
                width = attr_i64(e, b"cx").unwrap_or(width);
                height = attr_i64(e, b"cy").unwrap_or(height);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(PptxError::invalid_template(format!("presentation.xml: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok((width, height))
}

/// Extract layouts from the slideLayouts directory
fn extract_layouts(package: &Package) -> Result<Vec<SlideLayout>> {
    let mut layouts = Vec::new();

    let layout_parts: Vec<(u32, String)> = package
        .part_names()
        .filter_map(|name| {
            let index = name
                .strip_prefix("ppt/slideLayouts/slideLayout")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((index, name.to_string()))
        })
        .collect();

    for (index, part) in layout_parts {
        let Some(xml) = package.get(&part) else {
            continue;
        };
        let mut layout = parse_layout_xml(index, xml)
            .map_err(|e| PptxError::invalid_template(format!("{}: {}", part, e)))?;
        layout.part = part;
        layouts.push(layout);
    }

    layouts.sort_by_key(|l| l.index);
    Ok(layouts)
}

/// Parse a single layout part
fn parse_layout_xml(index: u32, xml: &[u8]) -> Result<SlideLayout> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut layout_type = None;
    let mut layout_name = format!("Layout {}", index);
    let mut placeholders = Vec::new();

    // Placeholder of the current p:sp and whether its xfrm was seen
    let mut current: Option<PlaceholderInfo> = None;
    let mut in_sp_pr = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"sldLayout" => {
                    layout_type = attr_string(e, b"type").map(|t| LayoutType::from_ooxml_type(&t));
                }
                b"cSld" => {
                    if let Some(name) = attr_string(e, b"name") {
                        layout_name = name;
                    }
                }
                b"ph" => {
                    let ph_type = attr_string(e, b"type")
                        .map(|t| PlaceholderType::from_ooxml_type(&t))
                        .unwrap_or(PlaceholderType::Object);
                    let idx = attr_i64(e, b"idx").unwrap_or(0) as u32;
                    current = Some(PlaceholderInfo::new(idx, ph_type));
                }
                b"spPr" => in_sp_pr = true,
                b"off" if in_sp_pr => {
                    if let Some(ph) = current.as_mut() {
                        if let (Some(x), Some(y)) = (attr_i64(e, b"x"), attr_i64(e, b"y")) {
                            ph.position = Some((x, y));
                        }
                    }
                }
                b"ext" if in_sp_pr => {
                    if let Some(ph) = current.as_mut() {
                        if let (Some(cx), Some(cy)) = (attr_i64(e, b"cx"), attr_i64(e, b"cy")) {
                            ph.size = Some((cx, cy));
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"spPr" => in_sp_pr = false,
                b"sp" | b"pic" | b"graphicFrame" => {
                    if let Some(ph) = current.take() {
                        placeholders.push(ph);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(PptxError::XmlError(e)),
            _ => {}
        }
        buf.clear();
    }

    // Infer layout type from name if the attribute is missing
    let layout_type = match layout_type {
        Some(t) if t != LayoutType::Custom => t,
        _ => LayoutType::infer_from_name(&layout_name),
    };

    let mut layout = SlideLayout::new(index, layout_name, layout_type);
    for ph in placeholders {
        layout.add_placeholder(ph);
    }

    Ok(layout)
}

/// Extract theme information
fn extract_theme(xml: &[u8]) -> Result<ThemeInfo> {
    let mut theme = ThemeInfo::default();
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    // Which font group / color slot we are inside
    let mut font_group: Option<&'static str> = None;
    let mut color_slot: Option<String> = None;
    let mut in_clr_scheme = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"theme" => {
                    if let Some(name) = attr_string(e, b"name") {
                        theme.name = name;
                    }
                }
                b"clrScheme" => in_clr_scheme = true,
                b"majorFont" => font_group = Some("major"),
                b"minorFont" => font_group = Some("minor"),
                b"latin" => match font_group {
                    Some("major") => {
                        if let Some(face) = attr_string(e, b"typeface") {
                            theme.major_font = face;
                        }
                    }
                    Some(_) => {
                        if let Some(face) = attr_string(e, b"typeface") {
                            theme.minor_font = face;
                        }
                    }
                    None => {}
                },
                b"srgbClr" | b"sysClr" => {
                    if let Some(slot) = color_slot.clone() {
                        let value = attr_string(e, b"val")
                            .filter(|_| e.local_name().as_ref() == b"srgbClr")
                            .or_else(|| attr_string(e, b"lastClr"));
                        if let Some(value) = value {
                            theme.colors.insert(slot, value);
                        }
                    }
                }
                other if in_clr_scheme => {
                    color_slot = Some(String::from_utf8_lossy(other).into_owned());
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"clrScheme" => {
                    in_clr_scheme = false;
                    color_slot = None;
                }
                b"majorFont" | b"minorFont" => font_group = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(PptxError::XmlError(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(theme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{WIDESCREEN_SLIDE_HEIGHT_EMU, WIDESCREEN_SLIDE_WIDTH_EMU};

    #[test]
    fn test_builtin_template() {
        let template = PotxTemplate::builtin().unwrap();

        assert_eq!(template.layout_count(), 5);
        assert_eq!(
            template.slide_size,
            (WIDESCREEN_SLIDE_WIDTH_EMU, WIDESCREEN_SLIDE_HEIGHT_EMU)
        );
        assert_eq!(
            template.notes_master.as_deref(),
            Some("ppt/notesMasters/notesMaster1.xml")
        );

        let names: Vec<&str> = template.layouts().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Title Slide",
                "Title and Content",
                "Section Header",
                "Two Content",
                "Content with Caption"
            ]
        );
    }

    #[test]
    fn test_builtin_layout_types_and_placeholders() {
        let template = PotxTemplate::builtin().unwrap();

        let title = template.get_layout(1).unwrap();
        assert_eq!(title.layout_type, LayoutType::Title);
        assert_eq!(
            title.title_placeholder().unwrap().placeholder_type,
            PlaceholderType::CenterTitle
        );

        let two = template.get_layout(4).unwrap();
        assert_eq!(two.layout_type, LayoutType::TwoContent);
        let content = two.content_placeholders();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0].position, Some((838_200, 1_825_625)));
        assert_eq!(content[1].size, Some((5_181_600, 4_351_338)));
        assert_eq!(two.part, "ppt/slideLayouts/slideLayout4.xml");

        let caption = template.get_layout(5).unwrap();
        assert_eq!(caption.layout_type, LayoutType::ContentWithCaption);
        assert!(caption
            .placeholders
            .iter()
            .any(|p| p.placeholder_type == PlaceholderType::Body));
    }

    #[test]
    fn test_theme_extraction() {
        let template = PotxTemplate::builtin().unwrap();
        let theme = template.theme.as_ref().unwrap();

        assert_eq!(theme.name, "mdslides");
        assert_eq!(theme.major_font, "Calibri Light");
        assert_eq!(theme.minor_font, "Calibri");
        assert_eq!(theme.colors.get("accent1").map(String::as_str), Some("4472C4"));
        assert_eq!(theme.colors.get("dk1").map(String::as_str), Some("000000"));
    }

    #[test]
    fn test_parse_layout_without_type_attribute() {
        let xml = br#"<p:sldLayout xmlns:p="urn:p" xmlns:a="urn:a"><p:cSld name="Section Break"><p:spTree>
            <p:sp><p:nvSpPr><p:cNvPr id="2" name="T"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
            <p:sp><p:nvSpPr><p:cNvPr id="3" name="B"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="13"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
        </p:spTree></p:cSld></p:sldLayout>"#;

        let layout = parse_layout_xml(7, xml).unwrap();
        assert_eq!(layout.name, "Section Break");
        assert_eq!(layout.layout_type, LayoutType::SectionHeader);
        assert_eq!(layout.placeholders.len(), 2);
        assert_eq!(layout.placeholders[1].index, 13);
        assert_eq!(layout.placeholders[1].position, None);
    }

    #[test]
    fn test_invalid_bytes() {
        let err = PotxTemplate::from_bytes(b"not a zip").unwrap_err();
        assert_eq!(err.code(), "PPTX002");
    }

    #[test]
    fn test_missing_presentation_part() {
        let mut package = Package::new();
        package.set_string("ppt/slideLayouts/slideLayout1.xml", "<p:sldLayout/>");
        let err = PotxTemplate::from_bytes(&package.to_bytes().unwrap()).unwrap_err();
        assert!(err.to_string().contains("ppt/presentation.xml"));
    }

    #[test]
    fn test_no_layouts() {
        let mut package = default_template::package();
        let layout_parts: Vec<String> = package
            .part_names()
            .filter(|p| p.starts_with("ppt/slideLayouts/"))
            .map(str::to_string)
            .collect();
        for part in layout_parts {
            package.remove(&part);
        }
        let err = PotxTemplate::from_bytes(&package.to_bytes().unwrap()).unwrap_err();
        assert!(matches!(err, PptxError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = PotxTemplate::from_file("/no/such/template.potx").unwrap_err();
        assert_eq!(err.code(), "PPTX001");
    }
}
