//! Markdown tokenizer
//!
//! Splits flattened Markdown into YAML frontmatter and classified block
//! tokens. Inline markup is left in the token text.
//!
//! # Supported Syntax
//!
//! - Frontmatter: `---` ... `---` at the very start; a leading `---`
//!   with no closing line is an ordinary thematic break
//! - ATX headings: `#` to `######`
//! - Paragraphs: consecutive non-blank lines
//! - Lists: `-`, `*`, `+` bullets and `1.` / `1)` numbers, nested by
//!   indentation (two spaces or one tab per level)
//! - Images: a line consisting solely of `![alt](url)`
//! - Fenced code: ```` ``` ```` or `~~~`
//! - Block quotes: `>` lines
//! - Pipe tables: a `|` header line, a `|---|:--:|` separator with the
//!   same cell count, then `|` rows up to the next blank line or block
//! - Breaks: `---` / `___` (thematic), `***` (column)
//! - Directives: `[key]: # (value)`
//!
//! Setext headings are not recognized; `---` under a paragraph is a
//! thematic break.

use std::sync::LazyLock;

use mdslides_ast::{MarkdownDocument, Token};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PipelineError, Result};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?(?:[ \t]+#+)?[ \t]*$").unwrap());

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<key>[^\]]+)\]:\s*#\s*\((?P<value>[^)]+)\)\s*$").unwrap()
});

static THEMATIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:---|___)\s*$").unwrap());

static COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*\*\*\s*$").unwrap());

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*!\[(?P<alt>[^\]]*)\]\((?P<url>.*)\)\s*$").unwrap());

static LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)(?:[-*+]|(?P<num>\d{1,9})[.)])[ \t]+(?P<text>.*)$").unwrap()
});

static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {0,3}>[ ]?(?P<text>.*)$").unwrap());

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(?P<fence>```|~~~)[`~]*\s*(?P<lang>[^\s`]*)").unwrap());

static TABLE_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\|?\s*:?-+:?\s*(?:\|\s*:?-+:?\s*)*\|?\s*$").unwrap()
});

static HTML_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<!--.*-->\s*$").unwrap());

/// Block being accumulated
#[derive(Debug, Clone, PartialEq)]
enum TokenizerState {
    /// Between blocks
    Root,
    /// Paragraph lines
    Paragraph(Vec<String>),
    /// List item with continuation lines
    ListItem {
        depth: u32,
        ordered: bool,
        lines: Vec<String>,
    },
    /// Block quote lines
    Quote(Vec<String>),
    /// Pipe table below its separator line
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Fenced code, with the opening line for error reporting
    Code {
        fence: &'static str,
        lang: Option<String>,
        lines: Vec<String>,
        start: usize,
    },
}

/// Line-oriented block tokenizer
struct Tokenizer {
    tokens: Vec<Token>,
    state: TokenizerState,
}

impl Tokenizer {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            state: TokenizerState::Root,
        }
    }

    fn run<'a>(mut self, lines: impl Iterator<Item = (usize, &'a str)>) -> Result<Vec<Token>> {
        for (number, line) in lines {
            self.process_line(number, line);
        }

        if let TokenizerState::Code { start, .. } = self.state {
            return Err(PipelineError::parse_at(start, "unterminated code fence"));
        }
        self.flush_state();

        Ok(self.tokens)
    }

    fn process_line(&mut self, number: usize, line: &str) {
        // Code fences swallow everything up to the closing fence
        if let TokenizerState::Code { fence, lines, .. } = &mut self.state {
            if line.trim_start().starts_with(*fence) && line.trim().trim_start_matches(['`', '~']).is_empty() {
                self.flush_state();
            } else {
                lines.push(line.to_string());
            }
            return;
        }

        if line.trim().is_empty() {
            self.flush_state();
            return;
        }

        if let Some(caps) = FENCE_RE.captures(line) {
            self.flush_state();
            let fence = if &caps["fence"] == "```" { "```" } else { "~~~" };
            let lang = Some(caps["lang"].to_string()).filter(|l| !l.is_empty());
            self.state = TokenizerState::Code {
                fence,
                lang,
                lines: Vec::new(),
                start: number,
            };
            return;
        }

        if let Some(caps) = DIRECTIVE_RE.captures(line) {
            self.flush_state();
            self.tokens.push(Token::Directive {
                key: caps["key"].trim().to_string(),
                value: caps["value"].trim().to_string(),
            });
            return;
        }

        if let Some(caps) = HEADING_RE.captures(line) {
            self.flush_state();
            let level = caps[1].len() as u8;
            let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            self.tokens.push(Token::Heading {
                level,
                text: text.to_string(),
            });
            return;
        }

        if let TokenizerState::Table { headers, rows } = &mut self.state {
            if line.contains('|') {
                let mut cells = split_cells(line);
                cells.resize(headers.len(), String::new());
                rows.push(cells);
                return;
            }
            self.flush_state();
        }

        if line.contains('|') && TABLE_SEPARATOR_RE.is_match(line) {
            // A single-line paragraph directly above is the header row
            let headers = match &self.state {
                TokenizerState::Paragraph(lines) if lines.len() == 1 && lines[0].contains('|') => {
                    Some(split_cells(&lines[0]))
                }
                _ => None,
            };
            if let Some(headers) = headers.filter(|h| h.len() == split_cells(line).len()) {
                self.state = TokenizerState::Table {
                    headers,
                    rows: Vec::new(),
                };
                return;
            }
        }

        if COLUMN_RE.is_match(line) {
            self.flush_state();
            self.tokens.push(Token::ColumnBreak);
            return;
        }

        if THEMATIC_RE.is_match(line) {
            self.flush_state();
            self.tokens.push(Token::ThematicBreak);
            return;
        }

        if HTML_COMMENT_RE.is_match(line) {
            self.flush_state();
            debug!(line = number, "skipping HTML comment");
            return;
        }

        if let Some(caps) = IMAGE_RE.captures(line) {
            self.flush_state();
            self.tokens.push(Token::Image {
                url: caps["url"].trim().to_string(),
                alt: caps["alt"].to_string(),
            });
            return;
        }

        if let Some(caps) = LIST_RE.captures(line) {
            self.flush_state();
            self.state = TokenizerState::ListItem {
                depth: indent_depth(&caps["indent"]),
                ordered: caps.name("num").is_some(),
                lines: vec![caps["text"].trim().to_string()],
            };
            return;
        }

        if let Some(caps) = QUOTE_RE.captures(line) {
            let text = caps["text"].trim().to_string();
            match &mut self.state {
                TokenizerState::Quote(lines) => lines.push(text),
                _ => {
                    self.flush_state();
                    self.state = TokenizerState::Quote(vec![text]);
                }
            }
            return;
        }

        let text = line.trim().to_string();
        match &mut self.state {
            TokenizerState::Paragraph(lines)
            | TokenizerState::ListItem { lines, .. }
            | TokenizerState::Quote(lines) => lines.push(text),
            _ => self.state = TokenizerState::Paragraph(vec![text]),
        }
    }

    /// Emit the block being accumulated, if any
    fn flush_state(&mut self) {
        let state = std::mem::replace(&mut self.state, TokenizerState::Root);
        match state {
            TokenizerState::Root => {}
            TokenizerState::Paragraph(lines) => self.tokens.push(Token::Paragraph {
                text: lines.join(" "),
            }),
            TokenizerState::ListItem {
                depth,
                ordered,
                lines,
            } => self.tokens.push(Token::ListItem {
                depth,
                ordered,
                text: lines.join(" "),
            }),
            TokenizerState::Quote(lines) => self.tokens.push(Token::Quote {
                text: lines.join(" "),
            }),
            TokenizerState::Code { lang, lines, .. } => self.tokens.push(Token::Code {
                lang,
                raw: lines.join("\n"),
            }),
            TokenizerState::Table { headers, rows } => {
                self.tokens.push(Token::Table { headers, rows })
            }
        }
    }
}

/// Cells of a pipe table line, outer pipes optional
fn split_cells(line: &str) -> Vec<String> {
    let line = line.trim();
    let line = line.strip_prefix('|').unwrap_or(line);
    let line = line.strip_suffix('|').unwrap_or(line);
    line.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// Nesting depth of a list marker: two spaces or one tab per level
fn indent_depth(indent: &str) -> u32 {
    let width: u32 = indent
        .chars()
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum();
    width / 2
}

/// Split leading YAML frontmatter from the body.
///
/// Returns the parsed mapping, the body text and the 1-based line number
/// the body starts at.
fn split_frontmatter(text: &str) -> Result<(Map<String, Value>, &str, usize)> {
    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok((Map::new(), text, 1));
    };
    if first.trim_end() != "---" {
        return Ok((Map::new(), text, 1));
    }

    let mut offset = first.len();
    let mut line_count = 1;
    for line in lines {
        line_count += 1;
        if line.trim_end() == "---" {
            let yaml = &text[first.len()..offset];
            let body = &text[offset + line.len()..];
            return Ok((parse_frontmatter(yaml)?, body, line_count + 1));
        }
        offset += line.len();
    }

    debug!("no closing frontmatter delimiter, treating --- as a break");
    Ok((Map::new(), text, 1))
}

fn parse_frontmatter(yaml: &str) -> Result<Map<String, Value>> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }
    let value: Value = serde_yaml::from_str(yaml).map_err(|e| PipelineError::Parse {
        line: e.location().map(|loc| loc.line() + 1),
        reason: format!("invalid frontmatter: {}", e),
    })?;

    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        _ => Err(PipelineError::parse_at(2, "frontmatter must be a mapping")),
    }
}

/// Tokenize flattened Markdown into a [`MarkdownDocument`]
pub fn tokenize(text: &str) -> Result<MarkdownDocument> {
    let text = text.replace("\r\n", "\n");
    let (frontmatter, body, first_line) = split_frontmatter(&text)?;

    let lines = body.lines().enumerate().map(|(i, l)| (i + first_line, l));
    let tokens = Tokenizer::new().run(lines)?;
    debug!(tokens = tokens.len(), "tokenized markdown");

    Ok(MarkdownDocument {
        source: None,
        frontmatter,
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        tokenize(text).unwrap().tokens
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let toks = tokens("# Deck\n\n## Title\nHello\nworld\n\n### Sub ###\n");
        assert_eq!(
            toks,
            vec![
                Token::Heading { level: 1, text: "Deck".into() },
                Token::Heading { level: 2, text: "Title".into() },
                Token::Paragraph { text: "Hello world".into() },
                Token::Heading { level: 3, text: "Sub".into() },
            ]
        );
    }

    #[test]
    fn test_seven_hashes_is_paragraph() {
        let toks = tokens("####### nope");
        assert_eq!(toks, vec![Token::Paragraph { text: "####### nope".into() }]);
    }

    #[test]
    fn test_frontmatter() {
        let doc = tokenize("---\ntitle: My Deck\ntags: [a, b]\n---\n## One\n").unwrap();
        assert_eq!(doc.frontmatter_str("title"), Some("My Deck"));
        assert_eq!(doc.frontmatter["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(doc.tokens.len(), 1);
    }

    #[test]
    fn test_empty_frontmatter() {
        let doc = tokenize("---\n---\ntext\n").unwrap();
        assert!(doc.frontmatter.is_empty());
        assert_eq!(doc.tokens, vec![Token::Paragraph { text: "text".into() }]);
    }

    #[test]
    fn test_unterminated_frontmatter_is_a_break() {
        let doc = tokenize("---\n## A\ntext\n").unwrap();
        assert!(doc.frontmatter.is_empty());
        assert_eq!(
            doc.tokens,
            vec![
                Token::ThematicBreak,
                Token::Heading { level: 2, text: "A".into() },
                Token::Paragraph { text: "text".into() },
            ]
        );
    }

    #[test]
    fn test_pipe_table() {
        let toks = tokens("| Name | Qty |\n|:-----|----:|\n| apples | 3 |\npears | 4 | extra\n| plums |\nafter\n");
        assert_eq!(
            toks,
            vec![
                Token::Table {
                    headers: vec!["Name".into(), "Qty".into()],
                    rows: vec![
                        vec!["apples".into(), "3".into()],
                        vec!["pears".into(), "4".into()],
                        vec!["plums".into(), String::new()],
                    ],
                },
                Token::Paragraph { text: "after".into() },
            ]
        );
    }

    #[test]
    fn test_table_needs_matching_separator() {
        // Cell counts differ, so both lines stay paragraph text
        let toks = tokens("a | b\n|---|---|---|\n");
        assert_eq!(toks, vec![Token::Paragraph { text: "a | b |---|---|---|".into() }]);

        // Header only, no rows
        let toks = tokens("a | b\n--- | ---\n\n## Next\n");
        assert_eq!(
            toks,
            vec![
                Token::Table { headers: vec!["a".into(), "b".into()], rows: vec![] },
                Token::Heading { level: 2, text: "Next".into() },
            ]
        );
    }

    #[test]
    fn test_frontmatter_not_mapping() {
        let err = tokenize("---\n- a\n- b\n---\n").unwrap_err();
        assert_eq!(err.code(), "MDS003");
    }

    #[test]
    fn test_lists() {
        let toks = tokens("- one\n  - nested\n\t\t- deep\n1. first\n2) second\n   wrapped\n");
        assert_eq!(
            toks,
            vec![
                Token::ListItem { depth: 0, ordered: false, text: "one".into() },
                Token::ListItem { depth: 1, ordered: false, text: "nested".into() },
                Token::ListItem { depth: 2, ordered: false, text: "deep".into() },
                Token::ListItem { depth: 0, ordered: true, text: "first".into() },
                Token::ListItem { depth: 0, ordered: true, text: "second wrapped".into() },
            ]
        );
    }

    #[test]
    fn test_breaks() {
        let toks = tokens("a\n---\nb\n***\nc\n___\n");
        assert_eq!(
            toks,
            vec![
                Token::Paragraph { text: "a".into() },
                Token::ThematicBreak,
                Token::Paragraph { text: "b".into() },
                Token::ColumnBreak,
                Token::Paragraph { text: "c".into() },
                Token::ThematicBreak,
            ]
        );
    }

    #[test]
    fn test_code_fence() {
        let toks = tokens("```rust\nfn main() {\n\n    # not a heading\n}\n```\nafter");
        assert_eq!(
            toks,
            vec![
                Token::Code {
                    lang: Some("rust".into()),
                    raw: "fn main() {\n\n    # not a heading\n}".into(),
                },
                Token::Paragraph { text: "after".into() },
            ]
        );
    }

    #[test]
    fn test_unterminated_fence_reports_line() {
        let err = tokenize("---\ntitle: x\n---\n## A\n\n~~~\ncode\n").unwrap_err();
        match err {
            PipelineError::Parse { line, .. } => assert_eq!(line, Some(6)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_image_quote_directive() {
        let toks = tokens(
            "![Chart](/abs/chart.png)\n> quoted\n> more\n[note]: # (Say hello)\n<!-- Embedded file not found: x.md -->\n",
        );
        assert_eq!(
            toks,
            vec![
                Token::Image { url: "/abs/chart.png".into(), alt: "Chart".into() },
                Token::Quote { text: "quoted more".into() },
                Token::Directive { key: "note".into(), value: "Say hello".into() },
            ]
        );
    }

    #[test]
    fn test_crlf_input() {
        let toks = tokens("## A\r\ntext\r\n");
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[1], Token::Paragraph { text: "text".into() });
    }
}
