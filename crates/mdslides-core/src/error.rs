//! Error types for the Markdown stages.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by the flattener, tokenizer, converter and artifact I/O
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Root document or artifact file does not exist
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// A document embeds itself, directly or transitively
    #[error("Cyclic embed: {}", format_chain(chain))]
    CyclicEmbed { chain: Vec<PathBuf> },

    /// Malformed Markdown, frontmatter or intermediate JSON
    #[error("Parse error{}: {reason}", format_line(*line))]
    Parse { line: Option<usize>, reason: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn format_line(line: Option<usize>) -> String {
    match line {
        Some(n) => format!(" at line {}", n),
        None => String::new(),
    }
}

impl PipelineError {
    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a parse error tied to a source line
    pub fn parse_at(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            line: Some(line),
            reason: reason.into(),
        }
    }

    /// Create a parse error without position
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            line: None,
            reason: reason.into(),
        }
    }

    /// Get the error code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "MDS001",
            Self::CyclicEmbed { .. } => "MDS002",
            Self::Parse { .. } => "MDS003",
            Self::Io(_) => "MDS004",
            Self::Json(_) => "MDS005",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = PipelineError::file_not_found("deck.md");
        assert_eq!(err.code(), "MDS001");
        assert!(err.to_string().contains("deck.md"));

        let err = PipelineError::parse("bad token");
        assert_eq!(err.code(), "MDS003");
        assert_eq!(err.to_string(), "Parse error: bad token");
    }

    #[test]
    fn test_parse_error_line() {
        let err = PipelineError::parse_at(12, "unterminated code fence");
        assert_eq!(
            err.to_string(),
            "Parse error at line 12: unterminated code fence"
        );
    }

    #[test]
    fn test_cycle_display() {
        let err = PipelineError::CyclicEmbed {
            chain: vec![
                PathBuf::from("/d/a.md"),
                PathBuf::from("/d/b.md"),
                PathBuf::from("/d/a.md"),
            ],
        };
        assert_eq!(err.code(), "MDS002");
        assert!(err
            .to_string()
            .contains("/d/a.md -> /d/b.md -> /d/a.md"));
    }
}
