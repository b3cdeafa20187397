//! # mdslides-pptx
//!
//! PowerPoint (PPTX) rendering of slide documents.
//!
//! Every slide record becomes one slide built on a layout of a reference
//! template (`.pptx` or `.potx`). The template's masters, layouts and theme
//! are kept as they are; existing slides are dropped.
//!
//! ## Features
//!
//! - **Template Injection**: slides are written into the template package
//! - **Built-in Template**: a five-layout package when no template is given
//! - **Layout Selection**: explicit layout names, hint mapping, fallbacks
//! - **Placeholder Mapping**: title and body groups go to placeholders,
//!   overflow becomes free text boxes and pictures
//! - **Speaker Notes**: written when the template has a notes master
//! - **SlideContract**: TOML configuration of layout names and code fonts
//!
//! ## Example
//!
//! ```rust,ignore
//! use mdslides_pptx::{PotxTemplate, PptxRenderer, SlideContract};
//!
//! let template = PotxTemplate::from_file("corporate.potx")?;
//! let renderer = PptxRenderer::new(template, SlideContract::default());
//! let presentation = renderer.render(&slide_document)?;
//! std::fs::write("deck.pptx", &presentation.bytes)?;
//! ```

pub mod default_template;
pub mod error;
pub mod layout;
pub mod package;
pub mod presentation;
pub mod slide_contract;
pub mod template;
pub mod writer;

// Re-exports
pub use error::{PptxError, Result};
pub use layout::{select_layout, LayoutType, PlaceholderInfo, PlaceholderType, SlideLayout};
pub use package::Package;
pub use presentation::Presentation;
pub use slide_contract::SlideContract;
pub use template::PotxTemplate;
pub use writer::PptxRenderer;

/// PPTX-related constants
pub mod constants {
    /// Default slide width in EMU (914400 EMU = 1 inch, standard 10" width)
    pub const DEFAULT_SLIDE_WIDTH_EMU: i64 = 9_144_000;

    /// Default slide height in EMU (standard 7.5" height for 4:3)
    pub const DEFAULT_SLIDE_HEIGHT_EMU: i64 = 6_858_000;

    /// Widescreen 16:9 slide width in EMU (13.333" width)
    pub const WIDESCREEN_SLIDE_WIDTH_EMU: i64 = 12_192_000;

    /// Widescreen 16:9 slide height in EMU (7.5" height)
    pub const WIDESCREEN_SLIDE_HEIGHT_EMU: i64 = 6_858_000;

    /// EMU per inch
    pub const EMU_PER_INCH: i64 = 914_400;

    /// EMU per point
    pub const EMU_PER_POINT: i64 = 12_700;

    /// Table row height in EMU (0.4")
    pub const TABLE_ROW_HEIGHT_EMU: i64 = 365_760;

    /// First id in `p:sldIdLst`
    pub const FIRST_SLIDE_ID: u32 = 256;

    /// PresentationML namespace
    pub const NS_PRESENTATION: &str =
        "http://schemas.openxmlformats.org/presentationml/2006/main";

    /// DrawingML namespace
    pub const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

    /// `a:graphicData` URI of DrawingML tables
    pub const URI_TABLE: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

    /// Relationships namespace (r: prefix in parts)
    pub const NS_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    /// Package relationships namespace (.rels parts)
    pub const NS_PACKAGE_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";

    /// Content Types namespace
    pub const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

    /// Office document relationship type
    pub const REL_TYPE_OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

    /// Slide relationship type
    pub const REL_TYPE_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

    /// Slide layout relationship type
    pub const REL_TYPE_SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";

    /// Slide master relationship type
    pub const REL_TYPE_SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";

    /// Notes master relationship type
    pub const REL_TYPE_NOTES_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster";

    /// Notes slide relationship type
    pub const REL_TYPE_NOTES_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";

    /// Theme relationship type
    pub const REL_TYPE_THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

    /// Image relationship type
    pub const REL_TYPE_IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

    /// Hyperlink relationship type
    pub const REL_TYPE_HYPERLINK: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

    /// Slide part content type
    pub const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

    /// Notes slide part content type
    pub const CT_NOTES_SLIDE: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
