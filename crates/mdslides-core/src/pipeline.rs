//! In-process composition of the Markdown stages.

use std::path::Path;

use mdslides_ast::{MarkdownDocument, SlideDocument};
use tracing::info;

use crate::error::Result;
use crate::flatten::{DocumentLoader, Flattener, FsLoader};
use crate::io::{Sink, Source};
use crate::markdown::tokenize;
use crate::slides::SlideConverter;

/// Runs stage 1 (Markdown to Markdown Document) and stage 2 (Markdown
/// Document to Slide Document)
pub struct Pipeline<L = FsLoader> {
    flattener: Flattener<L>,
    loader: L,
}

impl Pipeline<FsLoader> {
    /// Pipeline reading Markdown from the file system
    pub fn new() -> Self {
        Self::with_loader(FsLoader)
    }
}

impl Default for Pipeline<FsLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: DocumentLoader + Clone> Pipeline<L> {
    /// Pipeline over a custom document loader
    pub fn with_loader(loader: L) -> Self {
        Self {
            flattener: Flattener::new(loader.clone()),
            loader,
        }
    }

    /// Stage 1: flatten and tokenize the Markdown file at `path`
    pub fn markdown_document(&self, path: &Path) -> Result<MarkdownDocument> {
        let text = self.flattener.flatten(path)?;
        let mut doc = tokenize(&text)?;
        doc.source = Some(
            self.loader
                .resolve(path)
                .to_string_lossy()
                .replace('\\', "/"),
        );
        info!(
            input = %path.display(),
            tokens = doc.tokens.len(),
            "tokenized markdown"
        );
        Ok(doc)
    }

    /// Stage 2: split a Markdown Document into slides
    pub fn slide_document(&self, doc: &MarkdownDocument) -> Result<SlideDocument> {
        let slides = SlideConverter::convert(doc)?;
        info!(slides = slides.len(), "built slide document");
        Ok(slides)
    }

    /// Stages 1 and 2 in one call
    pub fn markdown_to_slides(&self, path: &Path) -> Result<SlideDocument> {
        let doc = self.markdown_document(path)?;
        self.slide_document(&doc)
    }

    /// Stage 1 into a sink
    pub fn run_md2json<S: Sink<MarkdownDocument>>(&self, path: &Path, sink: &mut S) -> Result<()> {
        let doc = self.markdown_document(path)?;
        sink.write(&doc)
    }

    /// Stage 2 from a source into a sink
    pub fn run_json2slide<I, S>(&self, source: &I, sink: &mut S) -> Result<()>
    where
        I: Source<MarkdownDocument>,
        S: Sink<SlideDocument>,
    {
        let doc = source.read()?;
        let slides = self.slide_document(&doc)?;
        sink.write(&slides)
    }
}
