//! mdslides-ast - Intermediate representations
//!
//! This crate holds the two serialized artifacts exchanged between the
//! pipeline stages:
//!
//! - [`MarkdownDocument`]: frontmatter plus classified block tokens
//!   (`md2json` output, `json2slide` input)
//! - [`SlideDocument`]: ordered slide records (`json2slide` output,
//!   `json2pptx` input)
//!
//! Field names and `type` tags are part of the file format and must stay
//! stable.

pub mod markdown;
pub mod slide;

pub use markdown::{MarkdownDocument, Token};
pub use slide::{Block, LayoutHint, SlideDocument, SlideRecord, TextRun};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
