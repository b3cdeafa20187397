//! Slide document data structures.
//!
//! This module defines the intermediate representation for slides,
//! used between Markdown conversion and PPTX rendering.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An ordered deck of slide records plus deck-level metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlideDocument {
    /// Deck title (frontmatter `title` or first level-1 heading)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Path of the Markdown source the deck was built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Frontmatter carried over from the Markdown document
    #[serde(default)]
    pub frontmatter: Map<String, Value>,

    /// Slides in presentation order
    #[serde(default)]
    pub slides: Vec<SlideRecord>,
}

/// A single slide
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlideRecord {
    /// Order index; 0 is reserved for the implicit leading slide
    pub index: u32,

    /// Slide title (displayed in the title placeholder)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Layout computed from the slide content
    #[serde(default)]
    pub layout: LayoutHint,

    /// Explicit template layout name from a `[layout]` directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_name: Option<String>,

    /// Body content in source order
    #[serde(default)]
    pub body: Vec<Block>,

    /// Speaker notes, one entry per `[note]` directive
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Hint for layout selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutHint {
    /// Title slide (centered, large text)
    Title,

    /// Standard title and content
    #[default]
    TitleAndContent,

    /// Section header slide (no body placeholders used)
    SectionHeader,

    /// Two side-by-side content areas
    TwoContent,

    /// One content area plus a caption
    ContentWithCaption,
}

/// Content elements within a slide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Plain text paragraph
    Paragraph { runs: Vec<TextRun> },

    /// One list item; nesting is flattened into `depth`
    ListItem {
        depth: u32,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        ordered: bool,
        runs: Vec<TextRun>,
    },

    /// Image reference (absolute path after flattening)
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },

    /// In-slide heading (any level except 2)
    Heading { level: u8, runs: Vec<TextRun> },

    /// Code block
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        raw: String,
    },

    /// Block quote
    Quote { runs: Vec<TextRun> },

    /// Table with a header row; each cell is a list of runs
    Table {
        headers: Vec<Vec<TextRun>>,
        #[serde(default)]
        rows: Vec<Vec<Vec<TextRun>>>,
    },

    /// Placeholder separator (`***`)
    ColumnBreak,
}

/// A run of text with consistent formatting
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextRun {
    /// The text content
    pub text: String,

    /// Bold formatting
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,

    /// Italic formatting
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,

    /// Monospace (code) formatting
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub monospace: bool,

    /// Hyperlink URL (if this is a link)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
}

impl TextRun {
    /// Create a plain text run
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Create a bold text run
    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            ..Default::default()
        }
    }

    /// Create an italic text run
    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            italic: true,
            ..Default::default()
        }
    }

    /// Create a monospace text run
    pub fn monospace(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            monospace: true,
            ..Default::default()
        }
    }

    /// Create a hyperlink text run
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hyperlink: Some(url.into()),
            ..Default::default()
        }
    }
}

impl Block {
    /// Paragraph with a single plain run
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph {
            runs: vec![TextRun::plain(text)],
        }
    }

    /// Top-level bullet item with a single plain run
    pub fn list_item(text: impl Into<String>) -> Self {
        Block::ListItem {
            depth: 0,
            ordered: false,
            runs: vec![TextRun::plain(text)],
        }
    }

    /// Image without alt text
    pub fn image(url: impl Into<String>) -> Self {
        Block::Image {
            url: url.into(),
            alt: None,
        }
    }

    /// Whether this block is an image
    pub fn is_image(&self) -> bool {
        matches!(self, Block::Image { .. })
    }

    /// Whether this block needs a placeholder group of its own
    pub fn is_standalone(&self) -> bool {
        matches!(self, Block::Image { .. } | Block::Table { .. })
    }

    /// Text of the block without formatting
    pub fn plain_text(&self) -> String {
        match self {
            Block::Paragraph { runs }
            | Block::ListItem { runs, .. }
            | Block::Heading { runs, .. }
            | Block::Quote { runs } => runs.iter().map(|r| r.text.as_str()).collect(),
            Block::Code { raw, .. } => raw.clone(),
            Block::Image { alt, .. } => alt.clone().unwrap_or_default(),
            Block::Table { headers, rows } => headers
                .iter()
                .chain(rows.iter().flatten())
                .map(|cell| cell.iter().map(|r| r.text.as_str()).collect::<String>())
                .collect::<Vec<_>>()
                .join(" "),
            Block::ColumnBreak => String::new(),
        }
    }
}

impl SlideRecord {
    /// Create an empty slide
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Create a slide with a title
    pub fn titled(index: u32, title: impl Into<String>) -> Self {
        Self {
            index,
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Add a block to the body
    pub fn with_block(mut self, block: Block) -> Self {
        self.body.push(block);
        self
    }

    /// Set the layout hint
    pub fn with_layout(mut self, hint: LayoutHint) -> Self {
        self.layout = hint;
        self
    }

    /// Split the body into placeholder groups.
    ///
    /// Groups are separated by column breaks and every image or table forms
    /// a group of its own. Empty groups are never produced.
    pub fn placeholder_groups(&self) -> Vec<Vec<&Block>> {
        let mut groups = Vec::new();
        let mut current: Vec<&Block> = Vec::new();

        for block in &self.body {
            match block {
                Block::ColumnBreak => {
                    if !current.is_empty() {
                        groups.push(std::mem::take(&mut current));
                    }
                }
                _ if block.is_standalone() => {
                    if !current.is_empty() {
                        groups.push(std::mem::take(&mut current));
                    }
                    groups.push(vec![block]);
                }
                _ => current.push(block),
            }
        }

        if !current.is_empty() {
            groups.push(current);
        }

        groups
    }

    /// Check if this slide has speaker notes
    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }
}

impl SlideDocument {
    /// Create an empty deck
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slide to the deck
    pub fn push(&mut self, slide: SlideRecord) {
        self.slides.push(slide);
    }

    /// Get the number of slides
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Check if the deck is empty
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}
