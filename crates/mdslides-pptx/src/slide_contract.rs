//! SlideContract configuration for PPTX rendering.
//!
//! A SlideContract maps slide layout hints to the layout names of a
//! template and configures code blocks and speaker notes. Every field has a
//! default, so an empty file is a valid contract.

use std::path::Path;

use mdslides_ast::LayoutHint;
use serde::{Deserialize, Serialize};

use crate::error::{PptxError, Result};

/// SlideContract configuration for PPTX rendering
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideContract {
    /// Metadata about the contract
    #[serde(default)]
    pub meta: ContractMeta,

    /// Layout names per hint
    #[serde(default)]
    pub layouts: LayoutNames,

    /// Code block styling
    #[serde(default)]
    pub code: CodeConfig,

    /// Speaker notes configuration
    #[serde(default)]
    pub notes: NotesConfig,
}

/// Contract metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractMeta {
    /// Locale code used as the `lang` of generated text runs
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "en-US".to_string()
}

/// Template layout name for each layout hint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutNames {
    /// Title slide
    #[serde(default = "default_title_layout")]
    pub title: String,

    /// Title and content (the common case)
    #[serde(default = "default_content_layout")]
    pub content: String,

    /// Section header (title without body)
    #[serde(default = "default_section_layout")]
    pub section: String,

    /// Two content placeholders side by side
    #[serde(default = "default_two_content_layout")]
    pub two_content: String,

    /// Content with caption (picture plus text)
    #[serde(default = "default_caption_layout")]
    pub content_with_caption: String,
}

fn default_title_layout() -> String {
    "Title Slide".to_string()
}
fn default_content_layout() -> String {
    "Title and Content".to_string()
}
fn default_section_layout() -> String {
    "Section Header".to_string()
}
fn default_two_content_layout() -> String {
    "Two Content".to_string()
}
fn default_caption_layout() -> String {
    "Content with Caption".to_string()
}

/// Code block styling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Font family for code blocks and inline code
    #[serde(default = "default_code_font")]
    pub font_family: String,

    /// Font size of code blocks in hundredths of a point
    #[serde(default = "default_code_font_size")]
    pub font_size: u32,
}

fn default_code_font() -> String {
    "Consolas".to_string()
}
fn default_code_font_size() -> u32 {
    1400
}

/// Speaker notes configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Write speaker notes
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ContractMeta {
    fn default() -> Self {
        Self {
            locale: default_locale(),
        }
    }
}

impl Default for LayoutNames {
    fn default() -> Self {
        Self {
            title: default_title_layout(),
            content: default_content_layout(),
            section: default_section_layout(),
            two_content: default_two_content_layout(),
            content_with_caption: default_caption_layout(),
        }
    }
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            font_family: default_code_font(),
            font_size: default_code_font_size(),
        }
    }
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl SlideContract {
    /// Load a SlideContract from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PptxError::contract_error(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse a SlideContract from a TOML string and validate it
    pub fn parse(toml_content: &str) -> Result<Self> {
        let contract: SlideContract = toml::from_str(toml_content)?;
        contract.validate()?;
        Ok(contract)
    }

    /// Template layout name for a layout hint
    pub fn layout_for_hint(&self, hint: LayoutHint) -> &str {
        match hint {
            LayoutHint::Title => &self.layouts.title,
            LayoutHint::TitleAndContent => &self.layouts.content,
            LayoutHint::SectionHeader => &self.layouts.section,
            LayoutHint::TwoContent => &self.layouts.two_content,
            LayoutHint::ContentWithCaption => &self.layouts.content_with_caption,
        }
    }

    /// Check values the renderer cannot work with
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("title", &self.layouts.title),
            ("content", &self.layouts.content),
            ("section", &self.layouts.section),
            ("two_content", &self.layouts.two_content),
            ("content_with_caption", &self.layouts.content_with_caption),
        ];

        for (key, name) in names {
            if name.trim().is_empty() {
                return Err(PptxError::contract_error(format!(
                    "layout '{}' must not be empty",
                    key
                )));
            }
        }

        if self.code.font_family.trim().is_empty() {
            return Err(PptxError::contract_error("code font_family must not be empty"));
        }

        // DrawingML accepts 1pt..4000pt
        if !(100..=400_000).contains(&self.code.font_size) {
            return Err(PptxError::contract_error(format!(
                "code font_size {} outside 100..=400000",
                self.code.font_size
            )));
        }

        Ok(())
    }
}
