//! Tokenized Markdown document
//!
//! Stage 1 emits a [`MarkdownDocument`]: the YAML frontmatter converted to
//! a JSON object and the flattened source classified into block tokens.
//! Inline markup is kept verbatim in the token text; stage 2 resolves it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A flattened, tokenized Markdown source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkdownDocument {
    /// Path of the root Markdown file, if the document came from disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// YAML frontmatter as a JSON object (empty when absent)
    #[serde(default)]
    pub frontmatter: Map<String, Value>,

    /// Block tokens in source order
    #[serde(default)]
    pub tokens: Vec<Token>,
}

/// A classified block of Markdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Token {
    /// ATX heading (`#` to `######`)
    Heading { level: u8, text: String },

    /// Paragraph; continuation lines are joined with a single space
    Paragraph { text: String },

    /// Bullet (`-`, `*`, `+`) or numbered (`1.`, `1)`) list item
    ListItem {
        depth: u32,
        ordered: bool,
        text: String,
    },

    /// Image occupying a whole line: `![alt](url)`
    Image { url: String, alt: String },

    /// Fenced code block
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        raw: String,
    },

    /// Block quote (`>` lines), markers stripped
    Quote { text: String },

    /// Pipe table; every row has as many cells as the header
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },

    /// `---` or `___`
    ThematicBreak,

    /// `***`
    ColumnBreak,

    /// Comment directive: `[key]: # (value)`
    Directive { key: String, value: String },
}

impl MarkdownDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a string value in the frontmatter
    pub fn frontmatter_str(&self, key: &str) -> Option<&str> {
        self.frontmatter.get(key).and_then(Value::as_str)
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the document has no tokens
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Token {
    /// Whether this token is a level-2 heading (a slide boundary)
    pub fn is_slide_boundary(&self) -> bool {
        matches!(self, Token::Heading { level: 2, .. })
    }
}
