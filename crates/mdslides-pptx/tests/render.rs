//! Rendering against user-supplied templates.

use std::io::{Cursor, Write};

use mdslides_ast::{Block, LayoutHint, SlideDocument, SlideRecord, TextRun};
use mdslides_pptx::constants::*;
use mdslides_pptx::{Package, PotxTemplate, PptxError, PptxRenderer, SlideContract};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CT_LAYOUT: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";

/// A minimal template with one master, two layouts and one leftover slide.
/// The layouts use non-default names and there is no notes master.
fn create_test_template() -> Vec<u8> {
    let parts: Vec<(&str, String)> = vec![
        (
            "[Content_Types].xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.template.main+xml"/>
<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="{ct}"/>
<Override PartName="/ppt/slideLayouts/slideLayout2.xml" ContentType="{ct}"/>
<Override PartName="/ppt/slides/slide1.xml" ContentType="{slide}"/>
</Types>"#,
                ct = CT_LAYOUT,
                slide = CT_SLIDE
            ),
        ),
        (
            "_rels/.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}" Target="ppt/presentation.xml"/></Relationships>"#,
                NS_PACKAGE_RELATIONSHIPS, REL_TYPE_OFFICE_DOCUMENT
            ),
        ),
        (
            "ppt/presentation.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
                NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
            ),
        ),
        (
            "ppt/_rels/presentation.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="{}" Target="slides/slide1.xml"/></Relationships>"#,
                NS_PACKAGE_RELATIONSHIPS, REL_TYPE_SLIDE_MASTER, REL_TYPE_SLIDE
            ),
        ),
        (
            "ppt/slideMasters/slideMaster1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:spTree/></p:cSld></p:sldMaster>"#,
                NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
            ),
        ),
        (
            "ppt/slideLayouts/slideLayout1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" type="obj"><p:cSld name="Corporate Content"><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Content 2"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="457200" y="1600200"/><a:ext cx="8229600" cy="4525963"/></a:xfrm></p:spPr></p:sp></p:spTree></p:cSld></p:sldLayout>"#,
                NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
            ),
        ),
        (
            "ppt/slideLayouts/slideLayout2.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" type="blank"><p:cSld name="Empty"><p:spTree/></p:cSld></p:sldLayout>"#,
                NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
            ),
        ),
        (
            "ppt/slides/slide1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:spTree/></p:cSld></p:sld>"#,
                NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
            ),
        ),
        (
            "ppt/slides/_rels/slide1.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#,
                NS_PACKAGE_RELATIONSHIPS, REL_TYPE_SLIDE_LAYOUT
            ),
        ),
    ];

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, content) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

fn corporate_contract() -> SlideContract {
    SlideContract::parse(
        r#"
[layouts]
content = "Corporate Content"
"#,
    )
    .unwrap()
}

fn deck() -> SlideDocument {
    let mut doc = SlideDocument::new();
    doc.title = Some("Quarterly".into());

    let mut first = SlideRecord::titled(1, "Results")
        .with_block(Block::paragraph("Revenue up"))
        .with_block(Block::Paragraph {
            runs: vec![TextRun::link("details", "https://example.com/q3")],
        });
    first.notes.push("mention churn".into());
    doc.push(first);

    doc.push(SlideRecord::titled(2, "Outlook").with_block(Block::list_item("hiring")));
    doc
}

#[test]
fn test_template_slides_are_replaced() {
    let template = PotxTemplate::from_bytes(&create_test_template()).unwrap();
    assert_eq!(template.layout_count(), 2);
    assert_eq!(template.slide_size, (9_144_000, 6_858_000));
    assert!(template.notes_master.is_none());

    let renderer = PptxRenderer::new(template, corporate_contract());
    let presentation = renderer.render(&deck()).unwrap();
    assert_eq!(presentation.slide_count, 2);

    let package = Package::from_bytes(&presentation.bytes).unwrap();
    let first = package.get_string("ppt/slides/slide1.xml").unwrap();
    assert!(first.contains("Results"));
    assert!(first.contains(r#"<p:ph idx="1"/>"#));
    assert!(package.contains("ppt/slides/slide2.xml"));

    let xml = package.get_string("ppt/presentation.xml").unwrap();
    assert_eq!(xml.matches("<p:sldId ").count(), 2);
    assert!(xml.find("<p:sldIdLst>").unwrap() < xml.find("<p:sldSz").unwrap());

    // The leftover slide relationship is gone and new ids do not collide
    let rels = package.relationships("ppt/presentation.xml").unwrap();
    let slides: Vec<_> = rels.iter().filter(|r| r.rel_type == REL_TYPE_SLIDE).collect();
    assert_eq!(slides.len(), 2);
    assert!(slides.iter().all(|r| r.id != "rId1"));

    // A template becomes a presentation
    let types = package.get_string("[Content_Types].xml").unwrap();
    assert!(types.contains("presentationml.presentation.main+xml"));
    assert!(!types.contains("template.main+xml"));
}

#[test]
fn test_notes_dropped_without_notes_master() {
    let template = PotxTemplate::from_bytes(&create_test_template()).unwrap();
    let renderer = PptxRenderer::new(template, corporate_contract());
    let presentation = renderer.render(&deck()).unwrap();

    let package = Package::from_bytes(&presentation.bytes).unwrap();
    assert!(!package
        .part_names()
        .any(|p| p.starts_with("ppt/notesSlides/")));

    let rels = package.relationships("ppt/slides/slide1.xml").unwrap();
    assert!(rels.find_type(REL_TYPE_NOTES_SLIDE).is_none());
    assert!(rels.find_type(REL_TYPE_HYPERLINK).is_some());
}

#[test]
fn test_unknown_layout_falls_back() {
    let template = PotxTemplate::from_bytes(&create_test_template()).unwrap();
    // Default contract names "Title and Content", which this template lacks
    let renderer = PptxRenderer::new(template, SlideContract::default());

    let mut doc = SlideDocument::new();
    doc.push(
        SlideRecord::titled(1, "Section")
            .with_layout(LayoutHint::SectionHeader)
            .with_block(Block::paragraph("body")),
    );
    let mut named = SlideRecord::titled(2, "Named").with_block(Block::paragraph("x"));
    named.layout_name = Some("empty".into());
    doc.push(named);

    let presentation = renderer.render(&doc).unwrap();
    let package = Package::from_bytes(&presentation.bytes).unwrap();

    let rels = package.relationships("ppt/slides/slide1.xml").unwrap();
    assert_eq!(
        rels.find_type(REL_TYPE_SLIDE_LAYOUT).unwrap().target,
        "../slideLayouts/slideLayout1.xml"
    );

    // Explicit names match case-insensitively; a blank layout gets free shapes
    let rels = package.relationships("ppt/slides/slide2.xml").unwrap();
    assert_eq!(
        rels.find_type(REL_TYPE_SLIDE_LAYOUT).unwrap().target,
        "../slideLayouts/slideLayout2.xml"
    );
    let second = package.get_string("ppt/slides/slide2.xml").unwrap();
    assert!(!second.contains("<p:ph"));
    assert_eq!(second.matches(r#"txBox="1""#).count(), 2);
}

#[test]
fn test_template_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corporate.potx");
    std::fs::write(&path, create_test_template()).unwrap();

    let template = PotxTemplate::from_file(&path).unwrap();
    assert_eq!(template.path.as_deref(), Some(path.to_string_lossy().as_ref()));
    assert!(template.get_layout(2).is_some());
}

#[test]
fn test_template_errors() {
    let err = PotxTemplate::from_file("/no/such/template.potx").unwrap_err();
    assert!(matches!(err, PptxError::TemplateNotFound { .. }));
    assert_eq!(err.code(), "PPTX001");

    let err = PotxTemplate::from_bytes(b"not a zip").unwrap_err();
    assert_eq!(err.code(), "PPTX002");

    // A ZIP without presentation.xml
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buffer);
        zip.start_file("hello.txt", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"hi").unwrap();
        zip.finish().unwrap();
    }
    let err = PotxTemplate::from_bytes(&buffer.into_inner()).unwrap_err();
    assert!(err.to_string().contains("presentation.xml"));
}

#[test]
fn test_free_picture_on_blank_layout() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("chart.png");
    image::RgbImage::new(30, 30).save(&image).unwrap();

    let template = PotxTemplate::from_bytes(&create_test_template()).unwrap();
    let renderer = PptxRenderer::new(template, corporate_contract());

    let mut slide = SlideRecord::new(1).with_block(Block::Image {
        url: image.to_string_lossy().into_owned(),
        alt: Some("Chart & axes".into()),
    });
    slide.layout_name = Some("Empty".into());
    let mut doc = SlideDocument::new();
    doc.push(slide);

    let presentation = renderer.render(&doc).unwrap();
    let package = Package::from_bytes(&presentation.bytes).unwrap();
    let xml = package.get_string("ppt/slides/slide1.xml").unwrap();

    assert!(xml.contains(r#"descr="Chart &amp; axes""#));
    assert!(xml.contains("<a:xfrm>"));
    assert!(!xml.contains("<p:ph"));

    let rels = package.relationships("ppt/slides/slide1.xml").unwrap();
    let image_rel = rels.find_type(REL_TYPE_IMAGE).unwrap();
    assert_eq!(image_rel.target, "../media/mdslides_image1.png");
    assert!(package.contains("ppt/media/mdslides_image1.png"));
}
