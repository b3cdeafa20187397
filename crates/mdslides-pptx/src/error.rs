//! Error types for PPTX rendering.

use thiserror::Error;

/// Result type for PPTX operations
pub type Result<T> = std::result::Result<T, PptxError>;

/// Errors that can occur while loading templates or rendering slides
#[derive(Error, Debug)]
pub enum PptxError {
    /// Template file not found or inaccessible
    #[error("Template not found: {path}")]
    TemplateNotFound { path: String },

    /// Template is not a usable presentation package
    #[error("Invalid template: {reason}")]
    InvalidTemplate { reason: String },

    /// A slide could not be rendered
    #[error("Render error on slide {slide}: {reason}")]
    Render { slide: u32, reason: String },

    /// SlideContract configuration error
    #[error("SlideContract error: {reason}")]
    ContractError { reason: String },

    /// XML generation or parsing error
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// ZIP archive error
    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error (for SlideContract)
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl PptxError {
    /// Create a template not found error
    pub fn template_not_found(path: impl Into<String>) -> Self {
        Self::TemplateNotFound { path: path.into() }
    }

    /// Create an invalid template error
    pub fn invalid_template(reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            reason: reason.into(),
        }
    }

    /// Create a render error for a slide index
    pub fn render(slide: u32, reason: impl Into<String>) -> Self {
        Self::Render {
            slide,
            reason: reason.into(),
        }
    }

    /// Create a contract error
    pub fn contract_error(reason: impl Into<String>) -> Self {
        Self::ContractError {
            reason: reason.into(),
        }
    }

    /// Get the error code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            Self::TemplateNotFound { .. } => "PPTX001",
            Self::InvalidTemplate { .. } => "PPTX002",
            Self::Render { .. } => "PPTX003",
            Self::ContractError { .. } => "PPTX004",
            Self::XmlError(_) => "PPTX005",
            Self::ZipError(_) => "PPTX006",
            Self::IoError(_) => "PPTX007",
            Self::TomlError(_) => "PPTX008",
        }
    }
}
