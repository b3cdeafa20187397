//! OPC package handling for PPTX/POTX files.
//!
//! A presentation is a ZIP archive of XML parts tied together by
//! relationship parts (`_rels/*.rels`) and `[Content_Types].xml`.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use zip::read::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::constants::{NS_CONTENT_TYPES, NS_PACKAGE_RELATIONSHIPS};
use crate::error::Result;

/// Content types part name
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Main presentation part
pub const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Relationships of the main presentation part
pub const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";

/// Content type of the main part in a `.pptx`
pub const CT_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";

/// Content type of the main part in a `.potx`
pub const CT_TEMPLATE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.template.main+xml";

/// An unpacked package, parts keyed by name
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    /// Create an empty package
    pub fn new() -> Self {
        Self::default()
    }

    /// Unpack a package from ZIP bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let mut parts = BTreeMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if name.ends_with('/') {
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            parts.insert(name, contents);
        }

        Ok(Self { parts })
    }

    /// Get a part's contents
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(|v| v.as_slice())
    }

    /// Get a part's contents as a string
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.parts
            .get(name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Set or replace a part
    pub fn set(&mut self, name: impl Into<String>, contents: Vec<u8>) {
        self.parts.insert(name.into(), contents);
    }

    /// Set a part from a string
    pub fn set_string(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.parts.insert(name.into(), contents.into().into_bytes());
    }

    /// Remove a part
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.remove(name)
    }

    /// Check if a part exists
    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    /// All part names in sorted order
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(|s| s.as_str())
    }

    /// Relationships of a part, empty when the part has none
    pub fn relationships(&self, part: &str) -> Result<Relationships> {
        match self.get(&rels_part_for(part)) {
            Some(xml) => Relationships::parse(xml),
            None => Ok(Relationships::new()),
        }
    }

    /// Store relationships for a part
    pub fn set_relationships(&mut self, part: &str, rels: &Relationships) {
        self.set_string(rels_part_for(part), rels.to_xml());
    }

    /// Pack into ZIP bytes. Parts are written in sorted order so equal
    /// packages give equal bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // `[Content_Types].xml` sorts first already ('[' < 'd', 'p')
        for (name, contents) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(contents)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Name of the relationships part belonging to `part`
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that owns the relationship
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// A single relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// Parsed relationships from a .rels part, in document order
#[derive(Debug, Clone)]
pub struct Relationships {
    entries: Vec<Relationship>,
    next_id: u32,
}

impl Default for Relationships {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }
}

impl Relationships {
    /// Create an empty relationships list
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse relationships from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Self::new();
        let mut max_id = 0u32;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(ref e) | Event::Start(ref e)
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut target = None;
                    let mut rel_type = String::new();
                    let mut external = false;

                    for attr in e.attributes().flatten() {
                        let value = attr.unescape_value()?.into_owned();
                        match attr.key.as_ref() {
                            b"Id" => id = Some(value),
                            b"Target" => target = Some(value),
                            b"Type" => rel_type = value,
                            b"TargetMode" => external = value == "External",
                            _ => {}
                        }
                    }

                    if let (Some(id), Some(target)) = (id, target) {
                        if let Some(num) = extract_id_number(&id) {
                            max_id = max_id.max(num);
                        }
                        rels.entries.push(Relationship {
                            id,
                            rel_type,
                            target,
                            external,
                        });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        rels.next_id = max_id + 1;
        Ok(rels)
    }

    /// Add an internal relationship and return its id
    pub fn add(&mut self, rel_type: &str, target: impl Into<String>) -> String {
        self.push(rel_type, target.into(), false)
    }

    /// Add an external relationship (`TargetMode="External"`) and return its id
    pub fn add_external(&mut self, rel_type: &str, target: impl Into<String>) -> String {
        self.push(rel_type, target.into(), true)
    }

    fn push(&mut self, rel_type: &str, target: String, external: bool) -> String {
        let id = format!("rId{}", self.next_id);
        self.next_id += 1;
        self.entries.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target,
            external,
        });
        id
    }

    /// Remove every relationship of the given type, returning the removed ones
    pub fn remove_type(&mut self, rel_type: &str) -> Vec<Relationship> {
        let (removed, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|r| r.rel_type == rel_type);
        self.entries = kept;
        removed
    }

    /// First relationship of a type
    pub fn find_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.entries.iter().find(|r| r.rel_type == rel_type)
    }

    /// Relationship by id
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.entries.iter().find(|r| r.id == id)
    }

    /// Iterate in document order
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to a .rels part
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, NS_PACKAGE_RELATIONSHIPS));

        for rel in &self.entries {
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}""#,
                escape_xml(&rel.id),
                escape_xml(&rel.rel_type),
                escape_xml(&rel.target)
            ));
            if rel.external {
                xml.push_str(r#" TargetMode="External""#);
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }
}

/// Extract the numeric portion from a relationship id (e.g. "rId5" -> 5)
fn extract_id_number(id: &str) -> Option<u32> {
    id.strip_prefix("rId")
        .or_else(|| id.strip_prefix("RId"))
        .or_else(|| id.strip_prefix("rid"))
        .and_then(|num| num.parse().ok())
}

/// Parsed `[Content_Types].xml`
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    /// Parse from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut types = Self::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(ref e) | Event::Start(ref e) => {
                    let mut key = None;
                    let mut content_type = None;
                    for attr in e.attributes().flatten() {
                        let value = attr.unescape_value()?.into_owned();
                        match attr.key.as_ref() {
                            b"Extension" | b"PartName" => key = Some(value),
                            b"ContentType" => content_type = Some(value),
                            _ => {}
                        }
                    }
                    if let (Some(key), Some(ct)) = (key, content_type) {
                        match e.local_name().as_ref() {
                            b"Default" => types.defaults.push((key.to_lowercase(), ct)),
                            b"Override" => types.overrides.push((key, ct)),
                            _ => {}
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(types)
    }

    /// Register a default for a file extension unless one exists
    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        let ext = extension.to_lowercase();
        if !self.defaults.iter().any(|(e, _)| *e == ext) {
            self.defaults.push((ext, content_type.to_string()));
        }
    }

    /// Set the override for a part (`part` without leading slash)
    pub fn set_override(&mut self, part: &str, content_type: &str) {
        let name = format!("/{}", part);
        match self.overrides.iter_mut().find(|(p, _)| *p == name) {
            Some(entry) => entry.1 = content_type.to_string(),
            None => self.overrides.push((name, content_type.to_string())),
        }
    }

    /// Remove the override for a part
    pub fn remove_override(&mut self, part: &str) {
        let name = format!("/{}", part);
        self.overrides.retain(|(p, _)| *p != name);
    }

    /// Override content type of a part
    pub fn override_for(&self, part: &str) -> Option<&str> {
        let name = format!("/{}", part);
        self.overrides
            .iter()
            .find(|(p, _)| *p == name)
            .map(|(_, ct)| ct.as_str())
    }

    /// Serialize to XML
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Types xmlns="{}">"#, NS_CONTENT_TYPES));
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(ct)
            ));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(part),
                escape_xml(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

/// Children of `p:presentation` that follow `p:sldIdLst`
const AFTER_SLIDE_LIST: &[&[u8]] = &[
    b"sldSz",
    b"notesSz",
    b"smartTags",
    b"embeddedFontLst",
    b"custShowLst",
    b"photoAlbum",
    b"custDataLst",
    b"kinsoku",
    b"defaultTextStyle",
    b"modifyVerifier",
    b"extLst",
];

/// Replace the slide id list of `presentation.xml`.
///
/// `slides` holds `(id, relationship id)` pairs. Every other element is
/// passed through unchanged.
pub fn rewrite_presentation(xml: &[u8], slides: &[(u32, String)]) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();

    let mut depth = 0usize;
    let mut skipping: Option<usize> = None;
    let mut inserted = false;
    let mut prefix = String::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        if matches!(event, Event::Eof) {
            break;
        }

        let keep = if let Some(level) = skipping {
            match &event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == level {
                        skipping = None;
                    }
                }
                _ => {}
            }
            false
        } else {
            match &event {
                Event::Start(e) | Event::Empty(e) => {
                    let is_start = matches!(event, Event::Start(_));
                    let mut keep = true;
                    if depth == 0 {
                        prefix = e
                            .name()
                            .prefix()
                            .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
                            .unwrap_or_default();
                    } else if depth == 1 {
                        let local = e.local_name();
                        if local.as_ref() == b"sldIdLst" {
                            keep = false;
                            if is_start {
                                skipping = Some(depth);
                            }
                        } else if !inserted
                            && AFTER_SLIDE_LIST.iter().any(|name| *name == local.as_ref())
                        {
                            write_slide_list(&mut writer, &prefix, slides)?;
                            inserted = true;
                        }
                    }
                    if is_start {
                        depth += 1;
                    }
                    keep
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && !inserted {
                        write_slide_list(&mut writer, &prefix, slides)?;
                        inserted = true;
                    }
                    true
                }
                _ => true,
            }
        };

        if keep {
            writer.write_event(event)?;
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

fn write_slide_list<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    slides: &[(u32, String)],
) -> Result<()> {
    if slides.is_empty() {
        return Ok(());
    }

    let list = qualified(prefix, "sldIdLst");
    writer.write_event(Event::Start(BytesStart::new(list.as_str())))?;
    for (id, rid) in slides {
        let mut element = BytesStart::new(qualified(prefix, "sldId"));
        element.push_attribute(("id", id.to_string().as_str()));
        element.push_attribute(("r:id", rid.as_str()));
        writer.write_event(Event::Empty(element))?;
    }
    writer.write_event(Event::End(BytesEnd::new(list)))?;
    Ok(())
}

/// Escape special XML characters
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
