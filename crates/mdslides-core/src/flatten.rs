//! Embedded document flattening.
//!
//! Resolves embed markers (a line consisting solely of `![alt](other.md)`)
//! by splicing in the referenced file, and rewrites relative image lines
//! (`![alt](img/a.png)`) to absolute paths rooted at the directory of the
//! file that contains them.
//!
//! # Example
//!
//! ```
//! use mdslides_core::flatten::{Flattener, MemoryLoader};
//!
//! let mut loader = MemoryLoader::new();
//! loader.insert("/deck/main.md", "## Intro\n![part](part.md)\n");
//! loader.insert("/deck/part.md", "![chart](img/chart.png)\n");
//!
//! let text = Flattener::new(loader).flatten("/deck/main.md").unwrap();
//! assert_eq!(text, "## Intro\n![chart](/deck/img/chart.png)\n");
//! ```

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

static EMBED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\[.*\]\((?P<path>.*\.md)\)$").unwrap());

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^!\[(?P<alt>.*)\]\((?P<path>.*\.(?i:png|jpg|jpeg|gif|svg|webp|bmp))\)$").unwrap()
});

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

/// Read-only access to Markdown documents
pub trait DocumentLoader {
    /// Resolve a path to the identity used for cycle detection and for
    /// resolving paths relative to the document
    fn resolve(&self, path: &Path) -> PathBuf;

    /// Read the full text of a document
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Loads documents from the file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl DocumentLoader for FsLoader {
    fn resolve(&self, path: &Path) -> PathBuf {
        match std::path::absolute(path) {
            Ok(abs) => normalize_path(&abs),
            Err(_) => normalize_path(path),
        }
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Loads documents from an in-memory map
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document
    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files
            .insert(normalize_path(path.as_ref()), text.into());
    }
}

impl DocumentLoader for MemoryLoader {
    fn resolve(&self, path: &Path) -> PathBuf {
        normalize_path(path)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no document registered at {}", path.display()),
            )
        })
    }
}

/// One document being walked
struct Frame {
    path: PathBuf,
    dir: PathBuf,
    lines: Vec<String>,
    cursor: usize,
    fence: Option<String>,
}

impl Frame {
    fn new(path: PathBuf, text: &str) -> Self {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            path,
            dir,
            lines: text.lines().map(str::to_string).collect(),
            cursor: 0,
            fence: None,
        }
    }
}

/// Inlines embedded documents and absolutizes image paths
pub struct Flattener<L> {
    loader: L,
}

impl<L: DocumentLoader> Flattener<L> {
    /// Create a flattener over a loader
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Flatten the document at `root`
    pub fn flatten(&self, root: impl AsRef<Path>) -> Result<String> {
        let root = self.loader.resolve(root.as_ref());
        let text = match self.loader.read(&root) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PipelineError::file_not_found(root))
            }
            Err(e) => return Err(e.into()),
        };

        let mut out: Vec<String> = Vec::new();
        let mut in_progress: HashSet<PathBuf> = HashSet::new();
        in_progress.insert(root.clone());
        let mut stack = vec![Frame::new(root, &text)];

        while let Some(frame) = stack.last_mut() {
            let Some(line) = frame.lines.get(frame.cursor).cloned() else {
                in_progress.remove(&frame.path);
                stack.pop();
                continue;
            };
            frame.cursor += 1;

            if let Some(marker) = fence_marker(&line) {
                if frame.fence.as_deref() == Some(marker) {
                    frame.fence = None;
                } else if frame.fence.is_none() {
                    frame.fence = Some(marker.to_string());
                }
                out.push(line);
                continue;
            }
            if frame.fence.is_some() {
                out.push(line);
                continue;
            }

            if let Some(caps) = EMBED_RE.captures(&line) {
                let decoded = percent_decode(&caps["path"]);
                let target = self.loader.resolve(&frame.dir.join(&decoded));
                let from = frame.path.clone();

                if in_progress.contains(&target) {
                    let mut chain: Vec<PathBuf> = stack.iter().map(|f| f.path.clone()).collect();
                    chain.push(target);
                    return Err(PipelineError::CyclicEmbed { chain });
                }

                match self.loader.read(&target) {
                    Ok(text) => {
                        debug!(path = %target.display(), "embedding document");
                        in_progress.insert(target.clone());
                        stack.push(Frame::new(target, &text));
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        warn!(path = %decoded, from = %from.display(), "embedded file not found");
                        out.push(format!("<!-- Embedded file not found: {} -->", decoded));
                    }
                    Err(e) => return Err(e.into()),
                }
                continue;
            }

            if let Some(caps) = IMAGE_RE.captures(&line) {
                let raw = &caps["path"];
                match absolutize_image(&frame.dir, raw) {
                    Some(url) => out.push(format!("![{}]({})", &caps["alt"], url)),
                    None => out.push(line),
                }
                continue;
            }

            out.push(line);
        }

        let mut text = out.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        Ok(text)
    }
}

/// Flatten a file on disk
pub fn flatten_file(path: impl AsRef<Path>) -> Result<String> {
    Flattener::new(FsLoader).flatten(path)
}

fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

fn percent_decode(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Absolute, forward-slash form of a relative image path.
///
/// Returns `None` for URLs and paths that are already absolute.
fn absolutize_image(dir: &Path, raw: &str) -> Option<String> {
    if SCHEME_RE.is_match(raw) && !is_windows_drive(raw) {
        return None;
    }
    let decoded = percent_decode(raw);
    if decoded.starts_with('/') || Path::new(&decoded).is_absolute() {
        return None;
    }

    let abs = normalize_path(&dir.join(&decoded));
    Some(abs.to_string_lossy().replace('\\', "/").replace(' ', "%20"))
}

fn is_windows_drive(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

/// Lexically remove `.` and `..` components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
