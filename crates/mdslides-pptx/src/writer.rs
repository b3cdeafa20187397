//! PPTX generation from slide documents.
//!
//! Slides are injected into a copy of the template package. Every part of
//! the template except its slides is kept byte-for-byte; slides, notes,
//! media and the slide list of `presentation.xml` are regenerated.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use mdslides_ast::{Block, SlideDocument, SlideRecord, TextRun};
use tracing::{debug, info, warn};

use crate::constants::*;
use crate::error::{PptxError, Result};
use crate::layout::{select_layout, PlaceholderInfo, SlideLayout};
use crate::package::{
    escape_xml, rewrite_presentation, ContentTypes, Package, Relationships, CONTENT_TYPES_PART,
    CT_PRESENTATION, PRESENTATION_PART,
};
use crate::presentation::Presentation;
use crate::slide_contract::SlideContract;
use crate::template::PotxTemplate;

/// `x, y, cx, cy` in EMU
type Rect = (i64, i64, i64, i64);

const NO_BULLET: &str = r#"<a:pPr marL="0" indent="0"><a:buNone/></a:pPr>"#;

/// Renders slide documents against a template
#[derive(Debug, Clone)]
pub struct PptxRenderer {
    template: PotxTemplate,
    contract: SlideContract,
}

impl PptxRenderer {
    /// Create a renderer for a template and contract
    pub fn new(template: PotxTemplate, contract: SlideContract) -> Self {
        Self { template, contract }
    }

    /// Create a renderer for the built-in template
    pub fn builtin(contract: SlideContract) -> Result<Self> {
        Ok(Self::new(PotxTemplate::builtin()?, contract))
    }

    pub fn template(&self) -> &PotxTemplate {
        &self.template
    }

    pub fn contract(&self) -> &SlideContract {
        &self.contract
    }

    /// Render a slide document into a presentation, one slide per record
    pub fn render(&self, doc: &SlideDocument) -> Result<Presentation> {
        let mut package = self.template.package().clone();
        let mut content_types = ContentTypes::parse(
            package
                .get(CONTENT_TYPES_PART)
                .ok_or_else(|| PptxError::invalid_template("missing [Content_Types].xml"))?,
        )?;
        let mut pres_rels = package.relationships(PRESENTATION_PART)?;

        strip_slides(&mut package, &mut content_types, &mut pres_rels);
        content_types.set_override(PRESENTATION_PART, CT_PRESENTATION);

        let base_dir = doc
            .source
            .as_deref()
            .and_then(|s| Path::new(s).parent())
            .map(Path::to_path_buf);
        let mut media = MediaStore::new(&package, base_dir);
        let mut slide_list = Vec::with_capacity(doc.slides.len());

        for (n, record) in doc.slides.iter().enumerate() {
            let number = n + 1;
            let part = format!("ppt/slides/slide{}.xml", number);

            let layout = select_layout(self.template.layouts(), record, &self.contract)
                .ok_or_else(|| PptxError::invalid_template("template has no slide layouts"))?;
            debug!(slide = record.index, layout = %layout.name, part = %part, "rendering slide");

            let mut rels = Relationships::new();
            rels.add(REL_TYPE_SLIDE_LAYOUT, sibling_target(&layout.part));

            let xml = SlideBuilder::new(self, record, &mut rels, &mut media).build(layout)?;
            package.set_string(part.as_str(), xml);
            content_types.set_override(&part, CT_SLIDE);

            if record.has_notes() {
                self.write_notes(&mut package, &mut content_types, &mut rels, record, number);
            }

            package.set_relationships(&part, &rels);
            let rid = pres_rels.add(REL_TYPE_SLIDE, format!("slides/slide{}.xml", number));
            slide_list.push((FIRST_SLIDE_ID + n as u32, rid));
        }

        media.write_into(&mut package, &mut content_types);

        let presentation = package
            .get(PRESENTATION_PART)
            .ok_or_else(|| PptxError::invalid_template("missing ppt/presentation.xml"))?;
        let presentation = rewrite_presentation(presentation, &slide_list)?;
        package.set(PRESENTATION_PART, presentation);
        package.set_relationships(PRESENTATION_PART, &pres_rels);
        package.set_string(CONTENT_TYPES_PART, content_types.to_xml());

        let bytes = package.to_bytes()?;
        info!(slides = slide_list.len(), bytes = bytes.len(), "rendered presentation");
        Ok(Presentation::new(bytes, slide_list.len()))
    }

    /// Write the notes slide for a record, or drop its notes with a warning
    fn write_notes(
        &self,
        package: &mut Package,
        content_types: &mut ContentTypes,
        slide_rels: &mut Relationships,
        record: &SlideRecord,
        number: usize,
    ) {
        if !self.contract.notes.enabled {
            debug!(slide = record.index, "speaker notes disabled by contract");
            return;
        }
        let Some(master) = self.template.notes_master.as_deref() else {
            warn!(
                slide = record.index,
                notes = record.notes.len(),
                "template has no notes master, dropping speaker notes"
            );
            return;
        };

        let part = format!("ppt/notesSlides/notesSlide{}.xml", number);
        package.set_string(part.as_str(), self.notes_xml(&record.notes));

        let mut rels = Relationships::new();
        rels.add(REL_TYPE_NOTES_MASTER, sibling_target(master));
        rels.add(REL_TYPE_SLIDE, format!("../slides/slide{}.xml", number));
        package.set_relationships(&part, &rels);
        content_types.set_override(&part, CT_NOTES_SLIDE);

        slide_rels.add(
            REL_TYPE_NOTES_SLIDE,
            format!("../notesSlides/notesSlide{}.xml", number),
        );
    }

    fn notes_xml(&self, notes: &[String]) -> String {
        let locale = escape_xml(&self.contract.meta.locale);
        let paragraphs: String = notes
            .iter()
            .map(|note| {
                format!(
                    r#"<a:p><a:r><a:rPr lang="{}" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                    locale,
                    escape_xml(note)
                )
            })
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image Placeholder 1"/><p:cNvSpPr><a:spLocks noGrp="1" noRot="1" noChangeAspect="1"/></p:cNvSpPr><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes Placeholder 2"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:notes>"#,
            NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION, paragraphs
        )
    }
}

/// Remove the template's own slides, notes slides and their bookkeeping
fn strip_slides(
    package: &mut Package,
    content_types: &mut ContentTypes,
    pres_rels: &mut Relationships,
) {
    let removed = pres_rels.remove_type(REL_TYPE_SLIDE);
    let stale: Vec<String> = package
        .part_names()
        .filter(|p| p.starts_with("ppt/slides/") || p.starts_with("ppt/notesSlides/"))
        .map(str::to_string)
        .collect();

    for part in &stale {
        package.remove(part);
        content_types.remove_override(part);
    }

    if !removed.is_empty() {
        info!(
            slides = removed.len(),
            parts = stale.len(),
            "removed existing template slides"
        );
    }
}

/// Target of `part` seen from another directory under `ppt/`
fn sibling_target(part: &str) -> String {
    format!("../{}", part.strip_prefix("ppt/").unwrap_or(part))
}

/// A media part shared by all slides
#[derive(Debug, Clone)]
struct MediaItem {
    part: String,
    dimensions: Option<(u32, u32)>,
}

/// Collects image files embedded into the package, one part per file
struct MediaStore {
    base_dir: Option<PathBuf>,
    taken: HashSet<String>,
    by_path: HashMap<PathBuf, MediaItem>,
    parts: Vec<(String, Vec<u8>, String, &'static str)>,
    counter: u32,
}

impl MediaStore {
    fn new(package: &Package, base_dir: Option<PathBuf>) -> Self {
        Self {
            base_dir,
            taken: package
                .part_names()
                .filter(|p| p.starts_with("ppt/media/"))
                .map(str::to_string)
                .collect(),
            by_path: HashMap::new(),
            parts: Vec::new(),
            counter: 0,
        }
    }

    /// Local path of an image URL
    fn resolve(&self, slide: u32, url: &str) -> Result<PathBuf> {
        let url = url.trim();
        if url.is_empty() {
            return Err(PptxError::render(slide, "image has an empty URL"));
        }

        let lower = url.to_ascii_lowercase();
        if ["http://", "https://", "data:"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
        {
            return Err(PptxError::render(
                slide,
                format!("remote image URLs are not supported: {}", url),
            ));
        }

        let raw = url.strip_prefix("file://").unwrap_or(url);
        let decoded = urlencoding::decode(raw).map_err(|e| {
            PptxError::render(slide, format!("invalid image URL {}: {}", url, e))
        })?;
        let path = PathBuf::from(&*decoded);

        Ok(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        })
    }

    fn embed(&mut self, slide: u32, url: &str) -> Result<MediaItem> {
        let path = self.resolve(slide, url)?;
        if let Some(item) = self.by_path.get(&path) {
            return Ok(item.clone());
        }

        let data = std::fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                PptxError::render(slide, format!("image not found: {}", path.display()))
            }
            _ => PptxError::render(
                slide,
                format!("cannot read image {}: {}", path.display(), e),
            ),
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let content_type = image_content_type(&ext).ok_or_else(|| {
            PptxError::render(
                slide,
                format!("unsupported image type: {}", path.display()),
            )
        })?;

        let dimensions = match image::image_dimensions(&path) {
            Ok(dims) => Some(dims),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "image size unknown, stretching");
                None
            }
        };

        let part = self.allocate(&ext);
        debug!(path = %path.display(), part = %part, "embedding image");

        let item = MediaItem {
            part: part.clone(),
            dimensions,
        };
        self.parts.push((part, data, ext, content_type));
        self.by_path.insert(path, item.clone());
        Ok(item)
    }

    fn allocate(&mut self, ext: &str) -> String {
        loop {
            self.counter += 1;
            let part = format!("ppt/media/mdslides_image{}.{}", self.counter, ext);
            if self.taken.insert(part.clone()) {
                return part;
            }
        }
    }

    fn write_into(self, package: &mut Package, content_types: &mut ContentTypes) {
        for (part, data, ext, content_type) in self.parts {
            content_types.ensure_default(&ext, content_type);
            package.set(part, data);
        }
    }
}

fn image_content_type(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "svg" => Some("image/svg+xml"),
        "emf" => Some("image/x-emf"),
        "wmf" => Some("image/x-wmf"),
        _ => None,
    }
}

/// Builds the XML of one slide
struct SlideBuilder<'a> {
    renderer: &'a PptxRenderer,
    record: &'a SlideRecord,
    rels: &'a mut Relationships,
    media: &'a mut MediaStore,
    image_rels: HashMap<String, String>,
    link_rels: HashMap<String, String>,
    next_id: u32,
    shapes: String,
}

impl<'a> SlideBuilder<'a> {
    fn new(
        renderer: &'a PptxRenderer,
        record: &'a SlideRecord,
        rels: &'a mut Relationships,
        media: &'a mut MediaStore,
    ) -> Self {
        Self {
            renderer,
            record,
            rels,
            media,
            image_rels: HashMap::new(),
            link_rels: HashMap::new(),
            // 1 is the shape tree
            next_id: 2,
            shapes: String::new(),
        }
    }

    fn build(mut self, layout: &SlideLayout) -> Result<String> {
        let record = self.record;
        let slide_size = self.renderer.template.slide_size;

        if let Some(title) = record.title.as_deref() {
            let title_runs = [TextRun::plain(title)];
            match layout.title_placeholder() {
                Some(ph) => {
                    let paragraph = format!("<a:p>{}</a:p>", self.runs(&title_runs, false, false));
                    self.push_placeholder_shape(ph, "Title", &paragraph);
                }
                None => {
                    debug!(slide = record.index, "no title placeholder, using text box");
                    let paragraph = format!(
                        "<a:p>{}{}</a:p>",
                        NO_BULLET,
                        self.runs(&title_runs, true, false)
                    );
                    self.push_text_box(title_band(slide_size), &paragraph);
                }
            }
        }

        let groups = record.placeholder_groups();
        let content = layout.content_placeholders();
        let pictures = layout.picture_placeholders();

        let mut next_content = content.iter();
        let mut next_picture = pictures.iter();
        let targets: Vec<Option<&PlaceholderInfo>> = groups
            .iter()
            .map(|group| {
                let is_image = matches!(group.as_slice(), [Block::Image { .. }]);
                let picture = if is_image { next_picture.next() } else { None };
                picture.or_else(|| next_content.next()).copied()
            })
            .collect();

        let free = targets.iter().filter(|t| t.is_none()).count();
        if free > 0 {
            warn!(
                slide = record.index,
                layout = %layout.name,
                groups = free,
                "no placeholder left, placing content in free shapes"
            );
        }

        let mut column = 0;
        for (group, target) in groups.iter().zip(targets) {
            match target {
                Some(ph) => self.push_group_in_placeholder(group, ph)?,
                None => {
                    let area = column_rect(slide_size, column, free);
                    column += 1;
                    self.push_free_group(group, area)?;
                }
            }
        }

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
            NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION, self.shapes
        ))
    }

    fn next_shape_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn push_group_in_placeholder(&mut self, group: &[&Block], ph: &PlaceholderInfo) -> Result<()> {
        if let [Block::Image { url, alt }] = group {
            let area = ph
                .position
                .zip(ph.size)
                .map(|((x, y), (cx, cy))| (x, y, cx, cy));
            return self.push_picture(url, alt.as_deref(), Some(ph), area);
        }
        if let [Block::Table { headers, rows }] = group {
            let area = ph
                .position
                .zip(ph.size)
                .map(|((x, y), (cx, cy))| (x, y, cx, cy))
                .unwrap_or_else(|| column_rect(self.renderer.template.slide_size, 0, 1));
            self.push_table(headers, rows, Some(ph), area);
            return Ok(());
        }

        let paragraphs = self.paragraphs(group, false);
        self.push_placeholder_shape(ph, "Content", &paragraphs);
        Ok(())
    }

    fn push_free_group(&mut self, group: &[&Block], area: Rect) -> Result<()> {
        if let [Block::Image { url, alt }] = group {
            return self.push_picture(url, alt.as_deref(), None, Some(area));
        }
        if let [Block::Table { headers, rows }] = group {
            self.push_table(headers, rows, None, area);
            return Ok(());
        }

        let paragraphs = self.paragraphs(group, true);
        self.push_text_box(area, &paragraphs);
        Ok(())
    }

    fn push_placeholder_shape(&mut self, ph: &PlaceholderInfo, name: &str, paragraphs: &str) {
        let id = self.next_shape_id();
        self.shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{} {}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp>"#,
            id,
            name,
            id,
            placeholder_tag(ph),
            paragraphs
        ));
    }

    fn push_text_box(&mut self, area: Rect, paragraphs: &str) {
        let id = self.next_shape_id();
        self.shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="TextBox {}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{}</p:txBody></p:sp>"#,
            id,
            id,
            xfrm(area),
            paragraphs
        ));
    }

    fn push_picture(
        &mut self,
        url: &str,
        alt: Option<&str>,
        ph: Option<&PlaceholderInfo>,
        area: Option<Rect>,
    ) -> Result<()> {
        let item = self.media.embed(self.record.index, url)?;
        let rid = match self.image_rels.get(&item.part) {
            Some(rid) => rid.clone(),
            None => {
                let rid = self.rels.add(REL_TYPE_IMAGE, sibling_target(&item.part));
                self.image_rels.insert(item.part.clone(), rid.clone());
                rid
            }
        };

        // Placeholder pictures without known geometry inherit it from the layout
        let geometry = area
            .map(|a| xfrm(fit(a, item.dimensions)))
            .unwrap_or_default();
        let nv_pr = ph.map(placeholder_tag).unwrap_or_default();

        let id = self.next_shape_id();
        self.shapes.push_str(&format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="Picture {}" descr="{}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr>{}</p:nvPr></p:nvPicPr><p:blipFill><a:blip r:embed="{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
            id,
            id,
            escape_xml(alt.unwrap_or_default()),
            nv_pr,
            rid,
            geometry
        ));
        Ok(())
    }

    /// Table in a graphic frame with a bold, centered header row and
    /// fixed-height rows.
    fn push_table(
        &mut self,
        headers: &[Vec<TextRun>],
        rows: &[Vec<Vec<TextRun>>],
        ph: Option<&PlaceholderInfo>,
        area: Rect,
    ) {
        if headers.is_empty() {
            debug!(slide = self.record.index, "table without columns skipped");
            return;
        }

        let (x, y, cx, _) = area;
        let columns = headers.len() as i64;
        let column_width = cx / columns;
        let height = TABLE_ROW_HEIGHT_EMU * (rows.len() as i64 + 1);

        let grid: String = (0..columns)
            .map(|_| format!(r#"<a:gridCol w="{}"/>"#, column_width))
            .collect();

        let mut body = String::new();
        body.push_str(&format!(r#"<a:tr h="{}">"#, TABLE_ROW_HEIGHT_EMU));
        for cell in headers {
            let paragraph = format!(
                r#"<a:p><a:pPr algn="ctr"/>{}</a:p>"#,
                self.runs(cell, true, false)
            );
            body.push_str(&table_cell(&paragraph));
        }
        body.push_str("</a:tr>");

        for row in rows {
            body.push_str(&format!(r#"<a:tr h="{}">"#, TABLE_ROW_HEIGHT_EMU));
            for column in 0..headers.len() {
                let cell = row.get(column).map(Vec::as_slice).unwrap_or_default();
                let paragraph = format!("<a:p>{}</a:p>", self.runs(cell, false, false));
                body.push_str(&table_cell(&paragraph));
            }
            body.push_str("</a:tr>");
        }

        let nv_pr = ph.map(placeholder_tag).unwrap_or_default();
        let id = self.next_shape_id();
        self.shapes.push_str(&format!(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{}" name="Table {}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr>{}</p:nvPr></p:nvGraphicFramePr><p:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></p:xfrm><a:graphic><a:graphicData uri="{}"><a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>{}</a:tblGrid>{}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
            id,
            id,
            nv_pr,
            x,
            y,
            column_width * columns,
            height,
            URI_TABLE,
            grid,
            body
        ));
    }

    /// Paragraphs of a text group. Free text boxes carry their own bullets.
    fn paragraphs(&mut self, blocks: &[&Block], free: bool) -> String {
        let mut xml = String::new();

        for block in blocks {
            match block {
                Block::Paragraph { runs } => {
                    xml.push_str(&format!("<a:p>{}{}</a:p>", NO_BULLET, self.runs(runs, false, false)));
                }
                Block::ListItem {
                    depth,
                    ordered,
                    runs,
                } => {
                    let ppr = list_properties(*depth, *ordered, free);
                    xml.push_str(&format!("<a:p>{}{}</a:p>", ppr, self.runs(runs, false, false)));
                }
                Block::Heading { runs, .. } => {
                    xml.push_str(&format!("<a:p>{}{}</a:p>", NO_BULLET, self.runs(runs, true, false)));
                }
                Block::Quote { runs } => {
                    xml.push_str(&format!("<a:p>{}{}</a:p>", NO_BULLET, self.runs(runs, false, true)));
                }
                Block::Code { raw, .. } => {
                    for line in raw.trim_end_matches('\n').split('\n') {
                        xml.push_str(&format!("<a:p>{}{}</a:p>", NO_BULLET, self.code_line(line)));
                    }
                }
                Block::Image { url, .. } => {
                    debug!(slide = self.record.index, url = %url, "image inside text group skipped");
                }
                Block::Table { .. } => {
                    debug!(slide = self.record.index, "table inside text group skipped");
                }
                Block::ColumnBreak => {}
            }
        }

        if xml.is_empty() {
            xml = format!(
                r#"<a:p><a:endParaRPr lang="{}" dirty="0"/></a:p>"#,
                escape_xml(&self.renderer.contract.meta.locale)
            );
        }
        xml
    }

    fn runs(&mut self, runs: &[TextRun], force_bold: bool, force_italic: bool) -> String {
        let locale = escape_xml(&self.renderer.contract.meta.locale);
        if runs.is_empty() {
            return format!(r#"<a:endParaRPr lang="{}" dirty="0"/>"#, locale);
        }

        let mut xml = String::new();
        for run in runs {
            let mut attrs = format!(r#" lang="{}""#, locale);
            if run.bold || force_bold {
                attrs.push_str(r#" b="1""#);
            }
            if run.italic || force_italic {
                attrs.push_str(r#" i="1""#);
            }
            attrs.push_str(r#" dirty="0""#);

            let mut children = String::new();
            if run.monospace {
                children.push_str(&self.code_font());
            }
            if let Some(url) = &run.hyperlink {
                let rid = self.link_rel(url);
                children.push_str(&format!(r#"<a:hlinkClick r:id="{}"/>"#, rid));
            }

            let rpr = if children.is_empty() {
                format!("<a:rPr{}/>", attrs)
            } else {
                format!("<a:rPr{}>{}</a:rPr>", attrs, children)
            };
            xml.push_str(&format!("<a:r>{}<a:t>{}</a:t></a:r>", rpr, escape_xml(&run.text)));
        }
        xml
    }

    fn code_line(&self, line: &str) -> String {
        let code = &self.renderer.contract.code;
        let locale = escape_xml(&self.renderer.contract.meta.locale);
        if line.is_empty() {
            return format!(
                r#"<a:endParaRPr lang="{}" sz="{}" dirty="0"/>"#,
                locale, code.font_size
            );
        }
        format!(
            r#"<a:r><a:rPr lang="{}" sz="{}" dirty="0">{}</a:rPr><a:t>{}</a:t></a:r>"#,
            locale,
            code.font_size,
            self.code_font(),
            escape_xml(line)
        )
    }

    fn code_font(&self) -> String {
        let face = escape_xml(&self.renderer.contract.code.font_family);
        format!(
            r#"<a:latin typeface="{}"/><a:cs typeface="{}"/>"#,
            face, face
        )
    }

    fn link_rel(&mut self, url: &str) -> String {
        if let Some(rid) = self.link_rels.get(url) {
            return rid.clone();
        }
        let rid = self.rels.add_external(REL_TYPE_HYPERLINK, url);
        self.link_rels.insert(url.to_string(), rid.clone());
        rid
    }
}

fn list_properties(depth: u32, ordered: bool, free: bool) -> String {
    let level = depth.min(8);
    let bullet = if ordered {
        r#"<a:buFont typeface="+mj-lt"/><a:buAutoNum type="arabicPeriod"/>"#
    } else if free {
        r#"<a:buFont typeface="Arial"/><a:buChar char="•"/>"#
    } else {
        ""
    };

    if free {
        let margin = 342_900 + i64::from(level) * EMU_PER_INCH / 2;
        format!(
            r#"<a:pPr marL="{}" lvl="{}" indent="-342900">{}</a:pPr>"#,
            margin, level, bullet
        )
    } else if bullet.is_empty() {
        format!(r#"<a:pPr lvl="{}"/>"#, level)
    } else {
        format!(r#"<a:pPr lvl="{}">{}</a:pPr>"#, level, bullet)
    }
}

fn placeholder_tag(ph: &PlaceholderInfo) -> String {
    let mut tag = String::from("<p:ph");
    if let Some(t) = ph.placeholder_type.ooxml_type() {
        tag.push_str(&format!(r#" type="{}""#, t));
    }
    if ph.index != 0 {
        tag.push_str(&format!(r#" idx="{}""#, ph.index));
    }
    tag.push_str("/>");
    tag
}

fn table_cell(paragraph: &str) -> String {
    format!(
        "<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr/></a:tc>",
        paragraph
    )
}

fn xfrm((x, y, cx, cy): Rect) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        x, y, cx, cy
    )
}

/// Top 15% of the slide, inset 5% left and right
fn title_band((width, height): (i64, i64)) -> Rect {
    (width * 5 / 100, 0, width * 90 / 100, height * 15 / 100)
}

/// Column `column` of `count` equal columns in the content area
/// (x 5%..95%, y 15%..95%)
fn column_rect((width, height): (i64, i64), column: usize, count: usize) -> Rect {
    let left = width * 5 / 100;
    let top = height * 15 / 100;
    let column_width = width * 90 / 100 / count.max(1) as i64;
    let column_height = height * 95 / 100 - top;
    (left + column_width * column as i64, top, column_width, column_height)
}

/// Largest rectangle with the image's aspect ratio, centered in `area`
fn fit(area: Rect, dimensions: Option<(u32, u32)>) -> Rect {
    let (x, y, cx, cy) = area;
    match dimensions {
        Some((w, h)) if w > 0 && h > 0 => {
            let scale = (cx as f64 / w as f64).min(cy as f64 / h as f64);
            let fitted_cx = (w as f64 * scale).round() as i64;
            let fitted_cy = (h as f64 * scale).round() as i64;
            (
                x + (cx - fitted_cx) / 2,
                y + (cy - fitted_cy) / 2,
                fitted_cx,
                fitted_cy,
            )
        }
        _ => area,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdslides_ast::LayoutHint;
    use tempfile::TempDir;

    fn render(doc: &SlideDocument) -> Package {
        let renderer = PptxRenderer::builtin(SlideContract::default()).unwrap();
        let presentation = renderer.render(doc).unwrap();
        assert_eq!(presentation.slide_count, doc.slides.len());
        Package::from_bytes(&presentation.bytes).unwrap()
    }

    fn deck(slides: Vec<SlideRecord>) -> SlideDocument {
        let mut doc = SlideDocument::new();
        for slide in slides {
            doc.push(slide);
        }
        doc
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::new(width, height).save(&path).unwrap();
        path
    }

    #[test]
    fn test_one_slide_per_record() {
        let doc = deck(vec![
            SlideRecord::titled(1, "One").with_block(Block::paragraph("a")),
            SlideRecord::titled(2, "Two").with_block(Block::paragraph("b")),
            SlideRecord::titled(3, "Three").with_block(Block::paragraph("c")),
        ]);
        let package = render(&doc);

        for n in 1..=3 {
            let slide = package.get_string(&format!("ppt/slides/slide{}.xml", n)).unwrap();
            assert!(slide.contains(["One", "Two", "Three"][n - 1]));

            let rels = package.relationships(&format!("ppt/slides/slide{}.xml", n)).unwrap();
            let layout = rels.find_type(REL_TYPE_SLIDE_LAYOUT).unwrap();
            assert!(layout.target.starts_with("../slideLayouts/slideLayout"));
        }
        assert!(!package.contains("ppt/slides/slide4.xml"));

        let presentation = package.get_string(PRESENTATION_PART).unwrap();
        assert_eq!(presentation.matches("<p:sldId ").count(), 3);
        assert!(presentation.contains(r#"<p:sldId id="256""#));
        assert!(presentation.contains(r#"<p:sldId id="258""#));

        let types = package.get_string(CONTENT_TYPES_PART).unwrap();
        assert!(types.contains("/ppt/slides/slide3.xml"));
    }

    #[test]
    fn test_layout_follows_hint() {
        let doc = deck(vec![
            SlideRecord::titled(1, "Split")
                .with_block(Block::paragraph("left"))
                .with_block(Block::ColumnBreak)
                .with_block(Block::paragraph("right"))
                .with_layout(LayoutHint::TwoContent),
        ]);
        let package = render(&doc);

        let rels = package.relationships("ppt/slides/slide1.xml").unwrap();
        assert_eq!(
            rels.find_type(REL_TYPE_SLIDE_LAYOUT).unwrap().target,
            "../slideLayouts/slideLayout4.xml"
        );

        let slide = package.get_string("ppt/slides/slide1.xml").unwrap();
        assert!(slide.contains(r#"<p:ph type="title"/>"#));
        assert!(slide.contains(r#"<p:ph idx="1"/>"#));
        assert!(slide.contains(r#"<p:ph idx="2"/>"#));
        assert!(!slide.contains("TextBox"));
    }

    #[test]
    fn test_block_and_run_mapping() {
        let doc = deck(vec![SlideRecord::titled(1, "Blocks")
            .with_block(Block::Paragraph {
                runs: vec![
                    TextRun::bold("Big"),
                    TextRun::plain(" & "),
                    TextRun::monospace("code"),
                    TextRun::link("docs", "https://example.com/a?b=1&c=2"),
                ],
            })
            .with_block(Block::ListItem {
                depth: 1,
                ordered: true,
                runs: vec![TextRun::plain("first")],
            })
            .with_block(Block::Code {
                lang: Some("rust".into()),
                raw: "fn main() {\n}\n".into(),
            })
            .with_block(Block::Quote {
                runs: vec![TextRun::plain("said")],
            })]);
        let package = render(&doc);
        let slide = package.get_string("ppt/slides/slide1.xml").unwrap();

        assert!(slide.contains(r#"<a:rPr lang="en-US" b="1" dirty="0"/><a:t>Big</a:t>"#));
        assert!(slide.contains("<a:t> &amp; </a:t>"));
        assert!(slide.contains(r#"<a:latin typeface="Consolas"/>"#));
        assert!(slide.contains(r#"<a:pPr lvl="1"><a:buFont typeface="+mj-lt"/><a:buAutoNum type="arabicPeriod"/></a:pPr>"#));
        assert!(slide.contains(r#"sz="1400""#));
        assert!(slide.contains("<a:t>fn main() {</a:t>"));
        assert!(slide.contains(r#"<a:rPr lang="en-US" i="1" dirty="0"/><a:t>said</a:t>"#));
        assert!(slide.contains("<a:buNone/>"));

        let rels = package.relationships("ppt/slides/slide1.xml").unwrap();
        let link = rels.find_type(REL_TYPE_HYPERLINK).unwrap();
        assert!(link.external);
        assert_eq!(link.target, "https://example.com/a?b=1&c=2");
        assert!(slide.contains(&format!(r#"<a:hlinkClick r:id="{}"/>"#, link.id)));
    }

    #[test]
    fn test_title_slide_uses_subtitle() {
        let mut lead = SlideRecord::new(0).with_layout(LayoutHint::Title);
        lead.title = Some("Launch".into());
        lead.body.push(Block::paragraph("Q3 review"));
        let package = render(&deck(vec![lead]));

        let slide = package.get_string("ppt/slides/slide1.xml").unwrap();
        assert!(slide.contains(r#"<p:ph type="ctrTitle"/>"#));
        assert!(slide.contains(r#"<p:ph type="subTitle" idx="1"/>"#));
        assert!(slide.contains("Q3 review"));
    }

    #[test]
    fn test_overflow_groups_become_free_shapes() {
        let dir = TempDir::new().unwrap();
        let image = write_png(dir.path(), "wide.png", 40, 20);

        let doc = deck(vec![SlideRecord::titled(1, "Busy")
            .with_layout(LayoutHint::TitleAndContent)
            .with_block(Block::paragraph("one"))
            .with_block(Block::ColumnBreak)
            .with_block(Block::list_item("two"))
            .with_block(Block::image(image.display().to_string()))]);
        let package = render(&doc);
        let slide = package.get_string("ppt/slides/slide1.xml").unwrap();

        // First group fills the placeholder, the rest float
        assert!(slide.contains(r#"<p:ph idx="1"/>"#));
        assert!(slide.contains(r#"<p:cNvSpPr txBox="1"/>"#));
        assert!(slide.contains(r#"<a:buChar char="•"/>"#));
        assert!(slide.contains("<p:pic>"));
        assert_eq!(slide.matches("<p:ph").count(), 2);
        assert!(package.contains("ppt/media/mdslides_image1.png"));

        let types = package.get_string(CONTENT_TYPES_PART).unwrap();
        assert!(types.contains(r#"Extension="png""#));
    }

    fn stock_table() -> Block {
        Block::Table {
            headers: vec![vec![TextRun::plain("Item")], vec![TextRun::plain("Qty")]],
            rows: vec![
                vec![vec![TextRun::italic("apples")], vec![TextRun::plain("3")]],
                vec![vec![TextRun::plain("pears")]],
            ],
        }
    }

    #[test]
    fn test_table_graphic_frame() {
        let doc = deck(vec![
            SlideRecord::titled(1, "Stock")
                .with_layout(LayoutHint::TitleAndContent)
                .with_block(stock_table()),
            SlideRecord::titled(2, "Notes and stock")
                .with_layout(LayoutHint::TitleAndContent)
                .with_block(Block::paragraph("intro"))
                .with_block(stock_table()),
        ]);
        let package = render(&doc);

        let slide = package.get_string("ppt/slides/slide1.xml").unwrap();
        assert_eq!(slide.matches("<p:graphicFrame>").count(), 1);
        assert!(slide.contains(URI_TABLE));
        assert!(slide.contains(r#"<p:nvPr><p:ph idx="1"/></p:nvPr></p:nvGraphicFramePr>"#));
        assert_eq!(slide.matches("<a:gridCol ").count(), 2);
        assert_eq!(slide.matches(r#"<a:tr h="365760">"#).count(), 3);
        // Header cells only are centered and bold
        assert_eq!(slide.matches(r#"<a:pPr algn="ctr"/>"#).count(), 2);
        assert_eq!(slide.matches(r#" b="1""#).count(), 2);
        assert!(slide.contains(r#" i="1""#));
        // Short row padded with an empty cell
        assert_eq!(slide.matches("<a:tc>").count(), 6);

        // Text took the placeholder, the table floats below the title
        let slide = package.get_string("ppt/slides/slide2.xml").unwrap();
        assert!(slide.contains("intro"));
        assert!(slide.contains(r#"<p:nvPr></p:nvPr></p:nvGraphicFramePr>"#));
        let (x, y, cx, _) = column_rect((WIDESCREEN_SLIDE_WIDTH_EMU, WIDESCREEN_SLIDE_HEIGHT_EMU), 0, 1);
        assert!(slide.contains(&format!(r#"<a:off x="{}" y="{}"/>"#, x, y)));
        assert!(slide.contains(&format!(r#"<a:gridCol w="{}"/>"#, cx / 2)));
    }

    #[test]
    fn test_table_without_columns_is_skipped() {
        let doc = deck(vec![SlideRecord::titled(1, "Empty").with_block(Block::Table {
            headers: Vec::new(),
            rows: Vec::new(),
        })]);
        let slide = render(&doc).get_string("ppt/slides/slide1.xml").unwrap();
        assert!(!slide.contains("<p:graphicFrame>"));
    }

    #[test]
    fn test_image_into_placeholder_is_fitted() {
        let dir = TempDir::new().unwrap();
        let image = write_png(dir.path(), "tall image.png", 10, 40);
        let url = image.display().to_string().replace(' ', "%20");

        let doc = deck(vec![
            SlideRecord::titled(1, "Pic").with_block(Block::image(url.clone())),
            SlideRecord::titled(2, "Again").with_block(Block::image(url)),
        ]);
        let package = render(&doc);
        let slide = package.get_string("ppt/slides/slide1.xml").unwrap();

        assert!(slide.contains(r#"<p:pic><p:nvPicPr>"#));
        assert!(slide.contains(r#"<p:nvPr><p:ph idx="1"/></p:nvPr>"#));
        // Placeholder is 4351338 high; a 1:4 image is a quarter as wide
        assert!(slide.contains(r#"cy="4351338""#));
        assert!(slide.contains(r#"cx="1087835""#) || slide.contains(r#"cx="1087834""#));

        // Same file is stored once
        let media: Vec<&str> = package
            .part_names()
            .filter(|p| p.starts_with("ppt/media/"))
            .collect();
        assert_eq!(media.len(), 1);
    }

    #[test]
    fn test_relative_image_uses_source_dir() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "a.png", 4, 4);

        let mut doc = deck(vec![SlideRecord::titled(1, "Rel").with_block(Block::image("a.png"))]);
        doc.source = Some(dir.path().join("deck.md").display().to_string());
        let package = render(&doc);
        assert!(package.contains("ppt/media/mdslides_image1.png"));
    }

    #[test]
    fn test_image_errors_name_the_slide() {
        let renderer = PptxRenderer::builtin(SlideContract::default()).unwrap();

        let doc = deck(vec![SlideRecord::titled(7, "Remote")
            .with_block(Block::image("https://example.com/a.png"))]);
        let err = renderer.render(&doc).unwrap_err();
        assert!(matches!(err, PptxError::Render { slide: 7, .. }));

        let doc = deck(vec![SlideRecord::titled(3, "Missing")
            .with_block(Block::image("/definitely/not/here.png"))]);
        let err = renderer.render(&doc).unwrap_err();
        assert_eq!(err.code(), "PPTX003");
        assert!(err.to_string().contains("image not found"));
    }

    #[test]
    fn test_speaker_notes() {
        let mut slide = SlideRecord::titled(1, "Talk");
        slide.notes = vec!["Remember the demo".into(), "Smile".into()];
        let package = render(&deck(vec![slide.clone()]));

        let notes = package.get_string("ppt/notesSlides/notesSlide1.xml").unwrap();
        assert!(notes.contains("Remember the demo"));
        assert!(notes.contains("Smile"));

        let rels = package.relationships("ppt/notesSlides/notesSlide1.xml").unwrap();
        assert_eq!(
            rels.find_type(REL_TYPE_NOTES_MASTER).unwrap().target,
            "../notesMasters/notesMaster1.xml"
        );
        let slide_rels = package.relationships("ppt/slides/slide1.xml").unwrap();
        assert!(slide_rels.find_type(REL_TYPE_NOTES_SLIDE).is_some());

        // Disabled by contract
        let mut contract = SlideContract::default();
        contract.notes.enabled = false;
        let renderer = PptxRenderer::builtin(contract).unwrap();
        let out = renderer.render(&deck(vec![slide])).unwrap();
        let package = Package::from_bytes(&out.bytes).unwrap();
        assert!(!package.contains("ppt/notesSlides/notesSlide1.xml"));
    }

    #[test]
    fn test_empty_deck() {
        let package = render(&SlideDocument::new());
        let presentation = package.get_string(PRESENTATION_PART).unwrap();
        assert!(!presentation.contains("sldId "));
        assert!(package.contains("ppt/slideLayouts/slideLayout1.xml"));
    }

    #[test]
    fn test_geometry_helpers() {
        let size = (WIDESCREEN_SLIDE_WIDTH_EMU, WIDESCREEN_SLIDE_HEIGHT_EMU);
        assert_eq!(title_band(size), (609_600, 0, 10_972_800, 1_028_700));

        let (x0, y0, w0, _) = column_rect(size, 0, 2);
        let (x1, _, w1, _) = column_rect(size, 1, 2);
        assert_eq!(x0, 609_600);
        assert_eq!(y0, 1_028_700);
        assert_eq!(w0, w1);
        assert_eq!(x1, x0 + w0);

        assert_eq!(fit((0, 0, 100, 100), Some((200, 100))), (0, 25, 100, 50));
        assert_eq!(fit((0, 0, 100, 100), None), (0, 0, 100, 100));
    }

    #[test]
    fn test_list_properties() {
        assert_eq!(list_properties(0, false, false), r#"<a:pPr lvl="0"/>"#);
        assert!(list_properties(2, false, true).contains(r#"marL="1257300""#));
        assert!(list_properties(12, true, false).contains(r#"lvl="8""#));
    }
}
