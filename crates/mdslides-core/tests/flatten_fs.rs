//! Flattening against real files
//!
//! Covers embed resolution, image path rewriting and cycle detection on
//! the file system.

use std::fs;
use std::path::Path;

use mdslides_core::{flatten_file, Pipeline, PipelineError};
use tempfile::TempDir;

fn write(dir: &Path, rel: &str, text: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

#[test]
fn test_relative_image_becomes_absolute() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "docs/main.md", "## Slide\n![](sub/file.md)\n");
    write(root, "docs/sub/file.md", "![a](./img/a.png)\n");

    let text = flatten_file(root.join("docs/main.md")).unwrap();
    let expected_path = root.join("docs/sub/img/a.png");
    let expected = format!(
        "![a]({})",
        expected_path.to_string_lossy().replace('\\', "/").replace(' ', "%20")
    );
    assert!(
        text.lines().any(|l| l == expected),
        "missing {expected} in:\n{text}"
    );
}

#[test]
fn test_self_embed_detected() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "loop.md", "## A\n![again](loop.md)\n");

    let err = flatten_file(temp.path().join("loop.md")).unwrap_err();
    assert!(matches!(err, PipelineError::CyclicEmbed { .. }));
}

#[test]
fn test_missing_root_file() {
    let temp = TempDir::new().unwrap();
    let err = flatten_file(temp.path().join("absent.md")).unwrap_err();
    assert_eq!(err.code(), "MDS001");
}

#[test]
fn test_embedded_slides_counted() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "deck.md",
        "Opening words\n\n![](chapters/one.md)\n![](chapters/two.md)\n",
    );
    write(root, "chapters/one.md", "## One\ntext\n## Two\n- a\n");
    write(root, "chapters/two.md", "## Three\n![](missing.md)\n");

    let deck = Pipeline::new()
        .markdown_to_slides(&root.join("deck.md"))
        .unwrap();

    let titles: Vec<_> = deck.slides.iter().map(|s| s.title.clone()).collect();
    assert_eq!(
        titles,
        vec![
            None,
            Some("One".to_string()),
            Some("Two".to_string()),
            Some("Three".to_string()),
        ]
    );
    assert!(deck.slides[3].body.is_empty());
}
