//! Markdown Document to Slide Document conversion.
//!
//! Rules:
//!
//! - `## Heading` starts a new slide and becomes its title
//! - Other heading levels stay inside the slide as `heading` blocks
//! - `---` starts a continuation slide carrying the previous title
//! - `***` separates placeholder groups
//! - `[layout]: # (name)` and `[note]: # (text)` set the layout name and
//!   add speaker notes
//! - Content before the first `##` becomes an implicit title slide (index 0)
//!   only when it produces at least one block or note

use mdslides_ast::{Block, LayoutHint, MarkdownDocument, SlideDocument, SlideRecord, Token};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::inline::{parse_runs, plain_text};

/// Converts a token stream into slide records
pub struct SlideConverter {
    slides: Vec<SlideRecord>,
    current: SlideRecord,
    in_leading: bool,
    next_index: u32,
    first_h1: Option<String>,
}

impl SlideConverter {
    fn new(leading_title: Option<String>) -> Self {
        let mut leading = SlideRecord::new(0).with_layout(LayoutHint::Title);
        leading.title = leading_title;
        Self {
            slides: Vec::new(),
            current: leading,
            in_leading: true,
            next_index: 1,
            first_h1: None,
        }
    }

    /// Convert a Markdown Document into a Slide Document
    pub fn convert(doc: &MarkdownDocument) -> Result<SlideDocument> {
        let fm_title = doc.frontmatter_str("title").map(str::to_string);
        let mut converter = Self::new(fm_title.clone());

        for (position, token) in doc.tokens.iter().enumerate() {
            converter.process_token(position, token)?;
        }
        converter.flush_current_slide();

        let slides = converter.slides;
        debug!(slides = slides.len(), "converted slide document");

        Ok(SlideDocument {
            title: fm_title.or(converter.first_h1),
            source: doc.source.clone(),
            frontmatter: doc.frontmatter.clone(),
            slides,
        })
    }

    fn process_token(&mut self, position: usize, token: &Token) -> Result<()> {
        match token {
            Token::Heading { text, .. } if token.is_slide_boundary() => {
                self.start_slide(Some(plain_text(text)))
            }
            Token::Heading { level, text } => self.handle_heading(position, *level, text)?,
            Token::Paragraph { text } => self.current.body.push(Block::Paragraph {
                runs: parse_runs(text),
            }),
            Token::ListItem {
                depth,
                ordered,
                text,
            } => self.current.body.push(Block::ListItem {
                depth: *depth,
                ordered: *ordered,
                runs: parse_runs(text),
            }),
            Token::Image { url, alt } => {
                if url.trim().is_empty() {
                    return Err(PipelineError::parse(format!(
                        "token {}: image has an empty URL",
                        position
                    )));
                }
                self.current.body.push(Block::Image {
                    url: url.clone(),
                    alt: Some(alt.clone()).filter(|a| !a.is_empty()),
                });
            }
            Token::Code { lang, raw } => self.current.body.push(Block::Code {
                lang: lang.clone(),
                raw: raw.clone(),
            }),
            Token::Quote { text } => self.current.body.push(Block::Quote {
                runs: parse_runs(text),
            }),
            Token::Table { headers, rows } => self.current.body.push(Block::Table {
                headers: headers.iter().map(|cell| parse_runs(cell)).collect(),
                rows: rows
                    .iter()
                    .map(|row| row.iter().map(|cell| parse_runs(cell)).collect())
                    .collect(),
            }),
            Token::ThematicBreak => {
                let title = self.current.title.clone();
                self.start_slide(title);
            }
            Token::ColumnBreak => self.current.body.push(Block::ColumnBreak),
            Token::Directive { key, value } => match key.as_str() {
                "layout" => self.current.layout_name = Some(value.clone()),
                "note" => self.current.notes.push(value.clone()),
                other => debug!(key = other, "ignoring unknown directive"),
            },
        }
        Ok(())
    }

    fn handle_heading(&mut self, position: usize, level: u8, text: &str) -> Result<()> {
        match level {
            1 | 3..=6 => {
                if level == 1 && self.first_h1.is_none() {
                    self.first_h1 = Some(plain_text(text));
                }
                self.current.body.push(Block::Heading {
                    level,
                    runs: parse_runs(text),
                });
            }
            _ => {
                return Err(PipelineError::parse(format!(
                    "token {}: heading level {} outside 1..=6",
                    position, level
                )))
            }
        }
        Ok(())
    }

    /// Close the current slide and open the next numbered one
    fn start_slide(&mut self, title: Option<String>) {
        self.flush_current_slide();
        let mut slide = SlideRecord::new(self.next_index);
        slide.title = title;
        self.next_index += 1;
        self.current = slide;
    }

    /// Push the current slide to the deck
    fn flush_current_slide(&mut self) {
        let mut slide = std::mem::take(&mut self.current);

        if self.in_leading {
            self.in_leading = false;
            if slide.body.is_empty() && slide.notes.is_empty() {
                debug!("no leading content, skipping title slide");
                return;
            }
        } else {
            slide.layout = layout_hint(&slide);
        }

        debug!(index = slide.index, layout = ?slide.layout, "slide ready");
        self.slides.push(slide);
    }
}

/// Layout hint from the number and kind of placeholder groups
pub fn layout_hint(slide: &SlideRecord) -> LayoutHint {
    let groups = slide.placeholder_groups();
    match groups.len() {
        0 => LayoutHint::SectionHeader,
        1 => LayoutHint::TitleAndContent,
        2 => {
            let has_image = groups.iter().any(|g| g.iter().any(|b| b.is_image()));
            if has_image {
                LayoutHint::ContentWithCaption
            } else {
                LayoutHint::TwoContent
            }
        }
        _ => LayoutHint::TitleAndContent,
    }
}

/// Convert a Markdown Document into a Slide Document
pub fn convert(doc: &MarkdownDocument) -> Result<SlideDocument> {
    SlideConverter::convert(doc)
}
