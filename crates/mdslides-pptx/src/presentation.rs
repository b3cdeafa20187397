//! The rendered presentation artifact.

use mdslides_core::{Artifact, PipelineError};

use crate::package::Package;

/// A rendered `.pptx` package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    /// ZIP bytes of the package
    pub bytes: Vec<u8>,

    /// Number of slides in the package
    pub slide_count: usize,
}

impl Presentation {
    pub fn new(bytes: Vec<u8>, slide_count: usize) -> Self {
        Self { bytes, slide_count }
    }
}

fn is_slide_part(name: &str) -> bool {
    name.strip_prefix("ppt/slides/slide")
        .and_then(|rest| rest.strip_suffix(".xml"))
        .is_some_and(|n| n.parse::<u32>().is_ok())
}

impl Artifact for Presentation {
    fn encode(&self) -> mdslides_core::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn decode(bytes: &[u8]) -> mdslides_core::Result<Self> {
        let package = Package::from_bytes(bytes)
            .map_err(|e| PipelineError::parse(format!("invalid presentation package: {}", e)))?;
        let slide_count = package.part_names().filter(|p| is_slide_part(p)).count();
        Ok(Self::new(bytes.to_vec(), slide_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slide_part_names() {
        assert!(is_slide_part("ppt/slides/slide1.xml"));
        assert!(is_slide_part("ppt/slides/slide12.xml"));
        assert!(!is_slide_part("ppt/slides/_rels/slide1.xml.rels"));
        assert!(!is_slide_part("ppt/slideLayouts/slideLayout1.xml"));
    }

    #[test]
    fn test_decode_counts_slides() {
        let mut package = Package::new();
        package.set_string("ppt/presentation.xml", "<p:presentation/>");
        package.set_string("ppt/slides/slide1.xml", "<p:sld/>");
        package.set_string("ppt/slides/slide2.xml", "<p:sld/>");
        package.set_string("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>");
        let bytes = package.to_bytes().unwrap();

        let presentation = Presentation::decode(&bytes).unwrap();
        assert_eq!(presentation.slide_count, 2);
        assert_eq!(presentation.encode().unwrap(), bytes);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = Presentation::decode(b"plain text").unwrap_err();
        assert_eq!(err.code(), "MDS003");
    }
}
