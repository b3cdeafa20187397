//! Artifact sources and sinks.
//!
//! Every stage reads one artifact and writes the next. Reading and writing
//! go through [`Source`] and [`Sink`] so stages run the same against files
//! and in-memory buffers.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mdslides_ast::{MarkdownDocument, SlideDocument};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// A value that can be stored between stages
pub trait Artifact: Sized {
    /// Serialize to bytes
    fn encode(&self) -> Result<Vec<u8>>;

    /// Deserialize from bytes
    fn decode(bytes: &[u8]) -> Result<Self>;
}

fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| PipelineError::Parse {
        line: Some(e.line()).filter(|l| *l > 0),
        reason: format!("invalid JSON: {}", e),
    })
}

impl Artifact for MarkdownDocument {
    fn encode(&self) -> Result<Vec<u8>> {
        encode_json(self)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        decode_json(bytes)
    }
}

impl Artifact for SlideDocument {
    fn encode(&self) -> Result<Vec<u8>> {
        encode_json(self)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        decode_json(bytes)
    }
}

/// Where a stage reads its input
pub trait Source<T> {
    /// Read and decode the artifact
    fn read(&self) -> Result<T>;
}

/// Where a stage writes its output
pub trait Sink<T> {
    /// Encode and store the artifact
    fn write(&mut self, value: &T) -> Result<()>;
}

/// Reads an artifact from a file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Artifact> Source<T> for FileSource {
    fn read(&self) -> Result<T> {
        let bytes = fs::read(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PipelineError::file_not_found(&self.path),
            _ => PipelineError::Io(e),
        })?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "read artifact");
        T::decode(&bytes)
    }
}

/// Writes an artifact to a file.
///
/// Data goes to a temporary sibling first and is renamed into place, so a
/// failed write leaves no partial output.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
    }
}

impl<T: Artifact> Sink<T> for FileSink {
    fn write(&mut self, value: &T) -> Result<()> {
        let bytes = value.encode()?;
        let temp = self.temp_path();

        let result = fs::File::create(&temp)
            .and_then(|mut file| {
                file.write_all(&bytes)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp, &self.path));

        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        debug!(path = %self.path.display(), bytes = bytes.len(), "wrote artifact");
        Ok(())
    }
}

/// Reads an artifact from a byte buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl<T: Artifact> Source<T> for MemorySource {
    fn read(&self) -> Result<T> {
        T::decode(&self.bytes)
    }
}

/// Collects an encoded artifact in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    bytes: Option<Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded bytes of the last write
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// Take the encoded bytes, leaving the sink empty
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        self.bytes
    }
}

impl<T: Artifact> Sink<T> for MemorySink {
    fn write(&mut self, value: &T) -> Result<()> {
        self.bytes = Some(value.encode()?);
        Ok(())
    }
}

/// Pipeline stage, used to derive output file names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Markdown to Markdown Document (`.json`)
    Md2Json,
    /// Markdown Document to Slide Document (`.slides.json`)
    Json2Slide,
    /// Slide Document to presentation (`.pptx`)
    Json2Pptx,
}

/// Output path next to `input` when no explicit output is given
pub fn default_output_path(input: &Path, stage: Stage) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_stem = || {
        input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let file_name = match stage {
        Stage::Md2Json => format!("{}.json", file_stem()),
        Stage::Json2Slide => {
            let stem = name
                .strip_suffix(".json")
                .map(str::to_string)
                .unwrap_or_else(file_stem);
            format!("{}.slides.json", stem)
        }
        Stage::Json2Pptx => {
            let stem = name
                .strip_suffix(".slides.json")
                .or_else(|| name.strip_suffix(".json"))
                .map(str::to_string)
                .unwrap_or_else(file_stem);
            format!("{}.pptx", stem)
        }
    };

    input.with_file_name(file_name)
}
