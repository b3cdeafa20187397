//! Slide layouts and layout selection.
//!
//! This module describes the layouts found in a template and picks the one
//! each slide record is rendered with.

use mdslides_ast::{LayoutHint, SlideRecord};
use tracing::{debug, warn};

use crate::slide_contract::SlideContract;

/// Represents a slide layout from a PPTX template
#[derive(Debug, Clone)]
pub struct SlideLayout {
    /// Layout index (1-based, matching slideLayoutN.xml)
    pub index: u32,

    /// Layout name (from `p:cSld name`)
    pub name: String,

    /// Part name inside the package (e.g. `ppt/slideLayouts/slideLayout2.xml`)
    pub part: String,

    /// Layout type (from the `type` attribute of `p:sldLayout`)
    pub layout_type: LayoutType,

    /// Placeholders available in this layout
    pub placeholders: Vec<PlaceholderInfo>,
}

/// Standard layout types in PPTX
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutType {
    /// Title slide (title)
    Title,

    /// Title and content (obj)
    TitleAndContent,

    /// Section header (secHead)
    SectionHeader,

    /// Two content (twoObj)
    TwoContent,

    /// Comparison (twoTxTwoObj)
    Comparison,

    /// Title only (titleOnly)
    TitleOnly,

    /// Blank
    Blank,

    /// Picture with caption (picTx)
    PictureWithCaption,

    /// Content with caption (objTx)
    ContentWithCaption,

    /// Custom layout
    Custom,
}

impl LayoutType {
    /// Get the OOXML type attribute value
    pub fn ooxml_type(&self) -> Option<&'static str> {
        match self {
            Self::Title => Some("title"),
            Self::TitleAndContent => Some("obj"),
            Self::SectionHeader => Some("secHead"),
            Self::TwoContent => Some("twoObj"),
            Self::Comparison => Some("twoTxTwoObj"),
            Self::TitleOnly => Some("titleOnly"),
            Self::Blank => Some("blank"),
            Self::PictureWithCaption => Some("picTx"),
            Self::ContentWithCaption => Some("objTx"),
            Self::Custom => None,
        }
    }

    /// Parse from OOXML type attribute
    pub fn from_ooxml_type(s: &str) -> Self {
        match s {
            "title" | "ctrTitle" => Self::Title,
            "obj" | "tx" => Self::TitleAndContent,
            "secHead" => Self::SectionHeader,
            "twoObj" | "twoColTx" => Self::TwoContent,
            "twoTxTwoObj" => Self::Comparison,
            "titleOnly" => Self::TitleOnly,
            "blank" => Self::Blank,
            "picTx" => Self::PictureWithCaption,
            "objTx" => Self::ContentWithCaption,
            _ => Self::Custom,
        }
    }

    /// Layout type matching a slide layout hint
    pub fn for_hint(hint: LayoutHint) -> Self {
        match hint {
            LayoutHint::Title => Self::Title,
            LayoutHint::TitleAndContent => Self::TitleAndContent,
            LayoutHint::SectionHeader => Self::SectionHeader,
            LayoutHint::TwoContent => Self::TwoContent,
            LayoutHint::ContentWithCaption => Self::ContentWithCaption,
        }
    }

    /// Infer layout type from a layout name
    pub fn infer_from_name(name: &str) -> Self {
        let name_lower = name.to_lowercase();

        if name_lower.contains("title slide") {
            Self::Title
        } else if name_lower.contains("section") {
            Self::SectionHeader
        } else if name_lower.contains("comparison") {
            Self::Comparison
        } else if name_lower.contains("two") {
            Self::TwoContent
        } else if name_lower.contains("blank") {
            Self::Blank
        } else if name_lower.contains("title only") {
            Self::TitleOnly
        } else if name_lower.contains("picture") {
            Self::PictureWithCaption
        } else if name_lower.contains("caption") {
            Self::ContentWithCaption
        } else if name_lower.contains("content") {
            Self::TitleAndContent
        } else {
            Self::Custom
        }
    }
}

/// Information about a placeholder in a layout
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderInfo {
    /// Placeholder index (idx attribute, 0 when absent)
    pub index: u32,

    /// Placeholder type
    pub placeholder_type: PlaceholderType,

    /// Position (x, y) in EMU, `None` when inherited from the master
    pub position: Option<(i64, i64)>,

    /// Size (width, height) in EMU, `None` when inherited from the master
    pub size: Option<(i64, i64)>,
}

/// Types of placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderType {
    /// Title placeholder
    Title,

    /// Center title (for title slides)
    CenterTitle,

    /// Subtitle
    Subtitle,

    /// Body text
    Body,

    /// Object (content); also used for placeholders without a type
    Object,

    /// Picture
    Picture,

    /// Date/time
    DateTime,

    /// Footer
    Footer,

    /// Slide number
    SlideNumber,

    /// Chart, table, diagram, media and other special placeholders
    Other,
}

impl PlaceholderType {
    /// Get the OOXML type attribute value (`None` for the untyped default)
    pub fn ooxml_type(&self) -> Option<&'static str> {
        match self {
            Self::Title => Some("title"),
            Self::CenterTitle => Some("ctrTitle"),
            Self::Subtitle => Some("subTitle"),
            Self::Body => Some("body"),
            Self::Object => None,
            Self::Picture => Some("pic"),
            Self::DateTime => Some("dt"),
            Self::Footer => Some("ftr"),
            Self::SlideNumber => Some("sldNum"),
            Self::Other => None,
        }
    }

    /// Parse from OOXML type attribute
    pub fn from_ooxml_type(s: &str) -> Self {
        match s {
            "title" => Self::Title,
            "ctrTitle" => Self::CenterTitle,
            "subTitle" => Self::Subtitle,
            "body" => Self::Body,
            "obj" => Self::Object,
            "pic" => Self::Picture,
            "dt" => Self::DateTime,
            "ftr" => Self::Footer,
            "sldNum" => Self::SlideNumber,
            _ => Self::Other,
        }
    }

    /// Whether this is a title placeholder
    pub fn is_title(&self) -> bool {
        matches!(self, Self::Title | Self::CenterTitle)
    }
}

impl SlideLayout {
    /// Create a new slide layout
    pub fn new(index: u32, name: impl Into<String>, layout_type: LayoutType) -> Self {
        Self {
            index,
            name: name.into(),
            part: format!("ppt/slideLayouts/slideLayout{}.xml", index),
            layout_type,
            placeholders: Vec::new(),
        }
    }

    /// Add a placeholder to this layout
    pub fn add_placeholder(&mut self, placeholder: PlaceholderInfo) {
        self.placeholders.push(placeholder);
    }

    /// Add a placeholder (builder form)
    pub fn with_placeholder(mut self, placeholder: PlaceholderInfo) -> Self {
        self.placeholders.push(placeholder);
        self
    }

    /// Get the title placeholder if present
    pub fn title_placeholder(&self) -> Option<&PlaceholderInfo> {
        self.placeholders
            .iter()
            .find(|p| p.placeholder_type.is_title())
    }

    /// Placeholders that accept body content, ordered by index.
    ///
    /// Subtitles count as content on title layouts only.
    pub fn content_placeholders(&self) -> Vec<&PlaceholderInfo> {
        let mut found: Vec<&PlaceholderInfo> = self
            .placeholders
            .iter()
            .filter(|p| match p.placeholder_type {
                PlaceholderType::Body | PlaceholderType::Object => true,
                PlaceholderType::Subtitle => self.layout_type == LayoutType::Title,
                _ => false,
            })
            .collect();
        found.sort_by_key(|p| p.index);
        found
    }

    /// Picture placeholders, ordered by index
    pub fn picture_placeholders(&self) -> Vec<&PlaceholderInfo> {
        let mut found: Vec<&PlaceholderInfo> = self
            .placeholders
            .iter()
            .filter(|p| p.placeholder_type == PlaceholderType::Picture)
            .collect();
        found.sort_by_key(|p| p.index);
        found
    }
}

impl PlaceholderInfo {
    /// Create a placeholder whose geometry is inherited
    pub fn new(index: u32, placeholder_type: PlaceholderType) -> Self {
        Self {
            index,
            placeholder_type,
            position: None,
            size: None,
        }
    }

    /// Set explicit geometry
    pub fn with_geometry(mut self, position: (i64, i64), size: (i64, i64)) -> Self {
        self.position = Some(position);
        self.size = Some(size);
        self
    }
}

/// Normalize a layout name for comparison: uppercase, every
/// non-alphanumeric character becomes `_`
pub fn normalize_layout_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn find_by_name<'a>(layouts: &'a [SlideLayout], name: &str) -> Option<&'a SlideLayout> {
    let wanted = normalize_layout_name(name);
    layouts
        .iter()
        .find(|l| normalize_layout_name(&l.name) == wanted)
}

/// Pick the layout for a slide.
///
/// Order: explicit `layout_name`, contract name for the hint, layout type
/// for the hint, the `obj` layout, the first layout. Returns `None` only
/// when `layouts` is empty.
pub fn select_layout<'a>(
    layouts: &'a [SlideLayout],
    slide: &SlideRecord,
    contract: &SlideContract,
) -> Option<&'a SlideLayout> {
    if let Some(name) = slide.layout_name.as_deref() {
        if let Some(layout) = find_by_name(layouts, name) {
            debug!(slide = slide.index, layout = %layout.name, "explicit layout");
            return Some(layout);
        }
        warn!(slide = slide.index, name, "layout name not in template, using hint");
    }

    let contract_name = contract.layout_for_hint(slide.layout);
    if let Some(layout) = find_by_name(layouts, contract_name) {
        debug!(slide = slide.index, layout = %layout.name, "layout from contract");
        return Some(layout);
    }

    let wanted = LayoutType::for_hint(slide.layout);
    if let Some(layout) = layouts.iter().find(|l| l.layout_type == wanted) {
        debug!(slide = slide.index, layout = %layout.name, "layout by type");
        return Some(layout);
    }

    if let Some(layout) = layouts
        .iter()
        .find(|l| l.layout_type == LayoutType::TitleAndContent)
    {
        warn!(
            slide = slide.index,
            hint = ?slide.layout,
            layout = %layout.name,
            "no layout for hint, using title and content"
        );
        return Some(layout);
    }

    let first = layouts.first()?;
    warn!(
        slide = slide.index,
        hint = ?slide.layout,
        layout = %first.name,
        "no layout for hint, using first layout"
    );
    Some(first)
}
