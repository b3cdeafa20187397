//! mdslides-core - Markdown slide decks to slide documents
//!
//! Implements the first two pipeline stages:
//!
//! 1. [`flatten`] + [`markdown`]: inline embedded Markdown files, absolutize
//!    image paths and tokenize the result into a [`MarkdownDocument`]
//! 2. [`slides`]: split the tokens into a [`SlideDocument`]
//!
//! # Example
//!
//! ```
//! use mdslides_core::{tokenize, SlideConverter};
//!
//! let doc = tokenize("## Title\nHello\n\n## Next\n- item one\n").unwrap();
//! let deck = SlideConverter::convert(&doc).unwrap();
//!
//! assert_eq!(deck.slides.len(), 2);
//! assert_eq!(deck.slides[1].title.as_deref(), Some("Next"));
//! ```

pub mod error;
pub mod flatten;
pub mod inline;
pub mod io;
pub mod markdown;
pub mod pipeline;
pub mod slides;

pub use error::{PipelineError, Result};
pub use flatten::{flatten_file, DocumentLoader, Flattener, FsLoader, MemoryLoader};
pub use inline::parse_runs;
pub use io::{
    default_output_path, Artifact, FileSink, FileSource, MemorySink, MemorySource, Sink, Source,
    Stage,
};
pub use markdown::tokenize;
pub use pipeline::Pipeline;
pub use slides::{layout_hint, SlideConverter};

pub use mdslides_ast::{MarkdownDocument, SlideDocument};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }
}
