//! Inline markup to formatted text runs.
//!
//! Recognizes `**bold**` / `__bold__`, `*italic*` / `_italic_`,
//! `` `code` `` and `[text](url)`. Bold and italic nest; code spans and
//! link text are taken literally. An italic marker followed or preceded by
//! whitespace is a literal character, so `2 * 3 * 4` stays plain.

use std::sync::LazyLock;

use mdslides_ast::TextRun;
use regex::Regex;

static INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        `(?P<code>[^`]+)`
        | \[(?P<ltext>[^\]]+)\]\((?P<url>[^)\s]+)\)
        | \*\*(?P<bold1>.+?)\*\*
        | __(?P<bold2>.+?)__
        | \*(?P<ital1>[^*\s](?:[^*]*[^*\s])?)\*
        | _(?P<ital2>[^_\s](?:[^_]*[^_\s])?)_
        ",
    )
    .unwrap()
});

/// Parse inline markup into text runs.
///
/// Adjacent runs with identical formatting are merged.
pub fn parse_runs(text: &str) -> Vec<TextRun> {
    let mut runs = Vec::new();
    push_runs(text, &TextRun::default(), &mut runs);
    runs
}

/// Text of inline markup with the markers removed
pub fn plain_text(text: &str) -> String {
    parse_runs(text).into_iter().map(|r| r.text).collect()
}

fn push_runs(text: &str, style: &TextRun, runs: &mut Vec<TextRun>) {
    let mut literal_start = 0;
    let mut pos = 0;

    while let Some(caps) = INLINE_RE.captures_at(text, pos) {
        let Some(whole) = caps.get(0) else { break };

        // `snake_case_words` are not emphasis
        if caps.name("ital2").is_some() && is_intraword(text, whole.start(), whole.end()) {
            pos = whole.start() + 1;
            continue;
        }

        push_text(&text[literal_start..whole.start()], style, runs);

        if let Some(code) = caps.name("code") {
            push_text(
                code.as_str(),
                &TextRun {
                    monospace: true,
                    ..style.clone()
                },
                runs,
            );
        } else if let (Some(label), Some(url)) = (caps.name("ltext"), caps.name("url")) {
            push_text(
                label.as_str(),
                &TextRun {
                    hyperlink: Some(url.as_str().to_string()),
                    ..style.clone()
                },
                runs,
            );
        } else if let Some(inner) = caps.name("bold1").or_else(|| caps.name("bold2")) {
            let bold = TextRun {
                bold: true,
                ..style.clone()
            };
            push_runs(inner.as_str(), &bold, runs);
        } else if let Some(inner) = caps.name("ital1").or_else(|| caps.name("ital2")) {
            let italic = TextRun {
                italic: true,
                ..style.clone()
            };
            push_runs(inner.as_str(), &italic, runs);
        }

        literal_start = whole.end();
        pos = whole.end();
    }

    push_text(&text[literal_start..], style, runs);
}

fn push_text(text: &str, style: &TextRun, runs: &mut Vec<TextRun>) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = runs.last_mut() {
        if same_format(last, style) {
            last.text.push_str(text);
            return;
        }
    }
    runs.push(TextRun {
        text: text.to_string(),
        ..style.clone()
    });
}

fn same_format(a: &TextRun, b: &TextRun) -> bool {
    a.bold == b.bold && a.italic == b.italic && a.monospace == b.monospace && a.hyperlink == b.hyperlink
}

fn is_intraword(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.is_some_and(char::is_alphanumeric) || after.is_some_and(char::is_alphanumeric)
}
