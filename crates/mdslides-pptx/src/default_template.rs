//! Built-in 16:9 template.
//!
//! Used when no reference template is given. The package has one slide
//! master with one theme, a notes master and five layouts. It contains no
//! slides and is loaded through [`PotxTemplate::from_bytes`] like any user
//! template.
//!
//! [`PotxTemplate::from_bytes`]: crate::template::PotxTemplate::from_bytes

use crate::constants::*;
use crate::error::Result;
use crate::package::{escape_xml, Package, Relationships, CONTENT_TYPES_PART, CT_PRESENTATION};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const REL_TYPE_PRES_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps";
const REL_TYPE_VIEW_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/viewProps";
const REL_TYPE_TABLE_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/tableStyles";
const REL_TYPE_CORE_PROPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_TYPE_EXTENDED_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";

const CT_PRESENTATIONML: &str = "application/vnd.openxmlformats-officedocument.presentationml";

/// A placeholder in a generated layout
struct PlaceholderSpec {
    ph_type: Option<&'static str>,
    idx: Option<u32>,
    name: &'static str,
    geometry: (i64, i64, i64, i64),
}

/// A generated layout
struct LayoutSpec {
    name: &'static str,
    ooxml_type: &'static str,
    placeholders: &'static [PlaceholderSpec],
}

const TITLE_BAND: (i64, i64, i64, i64) = (838_200, 365_125, 10_515_600, 1_325_563);
const BODY_AREA: (i64, i64, i64, i64) = (838_200, 1_825_625, 10_515_600, 4_351_338);

const LAYOUTS: &[LayoutSpec] = &[
    LayoutSpec {
        name: "Title Slide",
        ooxml_type: "title",
        placeholders: &[
            PlaceholderSpec {
                ph_type: Some("ctrTitle"),
                idx: None,
                name: "Title 1",
                geometry: (1_524_000, 1_122_363, 9_144_000, 2_387_600),
            },
            PlaceholderSpec {
                ph_type: Some("subTitle"),
                idx: Some(1),
                name: "Subtitle 2",
                geometry: (1_524_000, 3_602_038, 9_144_000, 1_655_762),
            },
        ],
    },
    LayoutSpec {
        name: "Title and Content",
        ooxml_type: "obj",
        placeholders: &[
            PlaceholderSpec {
                ph_type: Some("title"),
                idx: None,
                name: "Title 1",
                geometry: TITLE_BAND,
            },
            PlaceholderSpec {
                ph_type: None,
                idx: Some(1),
                name: "Content Placeholder 2",
                geometry: BODY_AREA,
            },
        ],
    },
    LayoutSpec {
        name: "Section Header",
        ooxml_type: "secHead",
        placeholders: &[
            PlaceholderSpec {
                ph_type: Some("title"),
                idx: None,
                name: "Title 1",
                geometry: (831_850, 1_709_738, 10_515_600, 2_852_737),
            },
            PlaceholderSpec {
                ph_type: Some("body"),
                idx: Some(1),
                name: "Text Placeholder 2",
                geometry: (831_850, 4_589_463, 10_515_600, 1_500_187),
            },
        ],
    },
    LayoutSpec {
        name: "Two Content",
        ooxml_type: "twoObj",
        placeholders: &[
            PlaceholderSpec {
                ph_type: Some("title"),
                idx: None,
                name: "Title 1",
                geometry: TITLE_BAND,
            },
            PlaceholderSpec {
                ph_type: None,
                idx: Some(1),
                name: "Content Placeholder 2",
                geometry: (838_200, 1_825_625, 5_181_600, 4_351_338),
            },
            PlaceholderSpec {
                ph_type: None,
                idx: Some(2),
                name: "Content Placeholder 3",
                geometry: (6_172_200, 1_825_625, 5_181_600, 4_351_338),
            },
        ],
    },
    LayoutSpec {
        name: "Content with Caption",
        ooxml_type: "objTx",
        placeholders: &[
            PlaceholderSpec {
                ph_type: Some("title"),
                idx: None,
                name: "Title 1",
                geometry: (839_788, 457_200, 3_932_237, 1_600_200),
            },
            PlaceholderSpec {
                ph_type: None,
                idx: Some(1),
                name: "Content Placeholder 2",
                geometry: (5_183_188, 987_425, 6_172_200, 4_873_625),
            },
            PlaceholderSpec {
                ph_type: Some("body"),
                idx: Some(2),
                name: "Text Placeholder 3",
                geometry: (839_788, 2_057_400, 3_932_237, 3_811_588),
            },
        ],
    },
];

/// Build the built-in template package
pub fn package() -> Package {
    let mut package = Package::new();

    package.set_string(CONTENT_TYPES_PART, content_types_xml());
    package.set_string("_rels/.rels", root_rels().to_xml());
    package.set_string("docProps/app.xml", app_xml());
    package.set_string("docProps/core.xml", core_xml());

    package.set_string("ppt/presentation.xml", presentation_xml());
    package.set_string("ppt/_rels/presentation.xml.rels", presentation_rels().to_xml());
    package.set_string("ppt/presProps.xml", pres_props_xml());
    package.set_string("ppt/viewProps.xml", view_props_xml());
    package.set_string("ppt/tableStyles.xml", table_styles_xml());

    package.set_string("ppt/theme/theme1.xml", theme_xml("mdslides"));
    package.set_string("ppt/theme/theme2.xml", theme_xml("mdslides notes"));

    package.set_string("ppt/slideMasters/slideMaster1.xml", slide_master_xml());
    let mut master_rels = Relationships::new();
    for number in 1..=LAYOUTS.len() {
        master_rels.add(
            REL_TYPE_SLIDE_LAYOUT,
            format!("../slideLayouts/slideLayout{}.xml", number),
        );
    }
    master_rels.add(REL_TYPE_THEME, "../theme/theme1.xml");
    package.set_string(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        master_rels.to_xml(),
    );

    let mut layout_rels = Relationships::new();
    layout_rels.add(REL_TYPE_SLIDE_MASTER, "../slideMasters/slideMaster1.xml");
    let layout_rels = layout_rels.to_xml();
    for (i, spec) in LAYOUTS.iter().enumerate() {
        let number = i + 1;
        package.set_string(
            format!("ppt/slideLayouts/slideLayout{}.xml", number),
            layout_xml(spec),
        );
        package.set_string(
            format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", number),
            layout_rels.clone(),
        );
    }

    package.set_string("ppt/notesMasters/notesMaster1.xml", notes_master_xml());
    let mut notes_rels = Relationships::new();
    notes_rels.add(REL_TYPE_THEME, "../theme/theme2.xml");
    package.set_string(
        "ppt/notesMasters/_rels/notesMaster1.xml.rels",
        notes_rels.to_xml(),
    );

    package
}

/// Built-in template as ZIP bytes
pub fn bytes() -> Result<Vec<u8>> {
    package().to_bytes()
}

fn content_types_xml() -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(&format!(r#"<Types xmlns="{}">"#, NS_CONTENT_TYPES));
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);

    let mut push_override = |part: &str, content_type: &str| {
        xml.push_str(&format!(
            r#"<Override PartName="/{}" ContentType="{}"/>"#,
            part, content_type
        ));
    };

    push_override("ppt/presentation.xml", CT_PRESENTATION);
    push_override(
        "ppt/presProps.xml",
        &format!("{}.presProps+xml", CT_PRESENTATIONML),
    );
    push_override(
        "ppt/viewProps.xml",
        &format!("{}.viewProps+xml", CT_PRESENTATIONML),
    );
    push_override(
        "ppt/tableStyles.xml",
        &format!("{}.tableStyles+xml", CT_PRESENTATIONML),
    );
    for theme in ["ppt/theme/theme1.xml", "ppt/theme/theme2.xml"] {
        push_override(
            theme,
            "application/vnd.openxmlformats-officedocument.theme+xml",
        );
    }
    push_override(
        "ppt/slideMasters/slideMaster1.xml",
        &format!("{}.slideMaster+xml", CT_PRESENTATIONML),
    );
    for number in 1..=LAYOUTS.len() {
        push_override(
            &format!("ppt/slideLayouts/slideLayout{}.xml", number),
            &format!("{}.slideLayout+xml", CT_PRESENTATIONML),
        );
    }
    push_override(
        "ppt/notesMasters/notesMaster1.xml",
        &format!("{}.notesMaster+xml", CT_PRESENTATIONML),
    );
    push_override(
        "docProps/core.xml",
        "application/vnd.openxmlformats-package.core-properties+xml",
    );
    push_override(
        "docProps/app.xml",
        "application/vnd.openxmlformats-officedocument.extended-properties+xml",
    );

    xml.push_str("</Types>");
    xml
}

fn root_rels() -> Relationships {
    let mut rels = Relationships::new();
    rels.add(REL_TYPE_OFFICE_DOCUMENT, "ppt/presentation.xml");
    rels.add(REL_TYPE_CORE_PROPS, "docProps/core.xml");
    rels.add(REL_TYPE_EXTENDED_PROPS, "docProps/app.xml");
    rels
}

/// Presentation relationships; the notes master is `rId2`
fn presentation_rels() -> Relationships {
    let mut rels = Relationships::new();
    rels.add(REL_TYPE_SLIDE_MASTER, "slideMasters/slideMaster1.xml");
    rels.add(REL_TYPE_NOTES_MASTER, "notesMasters/notesMaster1.xml");
    rels.add(REL_TYPE_PRES_PROPS, "presProps.xml");
    rels.add(REL_TYPE_VIEW_PROPS, "viewProps.xml");
    rels.add(REL_TYPE_THEME, "theme/theme1.xml");
    rels.add(REL_TYPE_TABLE_STYLES, "tableStyles.xml");
    rels
}

fn app_xml() -> String {
    format!(
        r#"{}
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
  <Application>mdslides</Application>
  <PresentationFormat>Widescreen</PresentationFormat>
  <Slides>0</Slides>
  <Notes>0</Notes>
  <ScaleCrop>false</ScaleCrop>
  <LinksUpToDate>false</LinksUpToDate>
  <SharedDoc>false</SharedDoc>
  <HyperlinksChanged>false</HyperlinksChanged>
  <AppVersion>{}</AppVersion>
</Properties>"#,
        XML_DECL,
        escape_xml(crate::VERSION)
    )
}

fn core_xml() -> String {
    format!(
        r#"{}
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>Presentation</dc:title>
  <dc:creator>mdslides</dc:creator>
</cp:coreProperties>"#,
        XML_DECL
    )
}

fn presentation_xml() -> String {
    format!(
        r#"{}
<p:presentation xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" saveSubsetFonts="1">
  <p:sldMasterIdLst>
    <p:sldMasterId id="2147483648" r:id="rId1"/>
  </p:sldMasterIdLst>
  <p:notesMasterIdLst>
    <p:notesMasterId r:id="rId2"/>
  </p:notesMasterIdLst>
  <p:sldSz cx="{}" cy="{}"/>
  <p:notesSz cx="{}" cy="{}"/>
  <p:defaultTextStyle>
    <a:lvl1pPr marL="0" algn="l" defTabSz="914400">
      <a:defRPr sz="1800" kern="1200">
        <a:solidFill><a:schemeClr val="tx1"/></a:solidFill>
        <a:latin typeface="+mn-lt"/>
        <a:ea typeface="+mn-ea"/>
        <a:cs typeface="+mn-cs"/>
      </a:defRPr>
    </a:lvl1pPr>
  </p:defaultTextStyle>
</p:presentation>"#,
        XML_DECL,
        NS_DRAWING,
        NS_RELATIONSHIPS,
        NS_PRESENTATION,
        WIDESCREEN_SLIDE_WIDTH_EMU,
        WIDESCREEN_SLIDE_HEIGHT_EMU,
        WIDESCREEN_SLIDE_HEIGHT_EMU, // Notes are portrait
        WIDESCREEN_SLIDE_WIDTH_EMU
    )
}

fn pres_props_xml() -> String {
    format!(
        r#"{}
<p:presentationPr xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"/>"#,
        XML_DECL, NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
    )
}

fn view_props_xml() -> String {
    format!(
        r#"{}
<p:viewPr xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">
  <p:normalViewPr>
    <p:restoredLeft sz="15620"/>
    <p:restoredTop sz="94660"/>
  </p:normalViewPr>
  <p:gridSpacing cx="76200" cy="76200"/>
</p:viewPr>"#,
        XML_DECL, NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
    )
}

fn table_styles_xml() -> String {
    format!(
        r#"{}
<a:tblStyleLst xmlns:a="{}" def="{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}"/>"#,
        XML_DECL, NS_DRAWING
    )
}

fn theme_xml(name: &str) -> String {
    format!(
        r#"{}
<a:theme xmlns:a="{}" name="{}">
  <a:themeElements>
    <a:clrScheme name="Office">
      <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
      <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
      <a:dk2><a:srgbClr val="44546A"/></a:dk2>
      <a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>
      <a:accent1><a:srgbClr val="4472C4"/></a:accent1>
      <a:accent2><a:srgbClr val="ED7D31"/></a:accent2>
      <a:accent3><a:srgbClr val="A5A5A5"/></a:accent3>
      <a:accent4><a:srgbClr val="FFC000"/></a:accent4>
      <a:accent5><a:srgbClr val="5B9BD5"/></a:accent5>
      <a:accent6><a:srgbClr val="70AD47"/></a:accent6>
      <a:hlink><a:srgbClr val="0563C1"/></a:hlink>
      <a:folHlink><a:srgbClr val="954F72"/></a:folHlink>
    </a:clrScheme>
    <a:fontScheme name="Office">
      <a:majorFont>
        <a:latin typeface="Calibri Light"/>
        <a:ea typeface=""/>
        <a:cs typeface=""/>
      </a:majorFont>
      <a:minorFont>
        <a:latin typeface="Calibri"/>
        <a:ea typeface=""/>
        <a:cs typeface=""/>
      </a:minorFont>
    </a:fontScheme>
    <a:fmtScheme name="Office">
      <a:fillStyleLst>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
      </a:fillStyleLst>
      <a:lnStyleLst>
        <a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
      </a:lnStyleLst>
      <a:effectStyleLst>
        <a:effectStyle><a:effectLst/></a:effectStyle>
        <a:effectStyle><a:effectLst/></a:effectStyle>
        <a:effectStyle><a:effectLst/></a:effectStyle>
      </a:effectStyleLst>
      <a:bgFillStyleLst>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
      </a:bgFillStyleLst>
    </a:fmtScheme>
  </a:themeElements>
</a:theme>"#,
        XML_DECL,
        NS_DRAWING,
        escape_xml(name)
    )
}

const CLR_MAP: &str = r#"bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink""#;

fn group_shape_header() -> &'static str {
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#
}

fn placeholder_sp(id: u32, spec: &PlaceholderSpec) -> String {
    let mut ph = String::from("<p:ph");
    if let Some(t) = spec.ph_type {
        ph.push_str(&format!(r#" type="{}""#, t));
    }
    if let Some(idx) = spec.idx {
        ph.push_str(&format!(r#" idx="{}""#, idx));
    }
    ph.push_str("/>");

    let (x, y, cx, cy) = spec.geometry;
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:endParaRPr lang="en-US"/></a:p></p:txBody></p:sp>"#,
        id,
        escape_xml(spec.name),
        ph,
        x,
        y,
        cx,
        cy
    )
}

fn slide_master_xml() -> String {
    let title = PlaceholderSpec {
        ph_type: Some("title"),
        idx: None,
        name: "Title Placeholder 1",
        geometry: TITLE_BAND,
    };
    let body = PlaceholderSpec {
        ph_type: Some("body"),
        idx: Some(1),
        name: "Text Placeholder 2",
        geometry: BODY_AREA,
    };

    let layout_ids: String = (1..=LAYOUTS.len())
        .map(|n| {
            format!(
                r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#,
                2_147_483_648u64 + n as u64,
                n
            )
        })
        .collect();

    format!(
        r#"{}
<p:sldMaster xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{}{}{}</p:spTree></p:cSld><p:clrMap {}/><p:sldLayoutIdLst>{}</p:sldLayoutIdLst><p:txStyles><p:titleStyle><a:lvl1pPr algn="l"><a:defRPr sz="4400" kern="1200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mj-lt"/></a:defRPr></a:lvl1pPr></p:titleStyle><p:bodyStyle>{}</p:bodyStyle><p:otherStyle><a:lvl1pPr marL="0" algn="l"><a:defRPr sz="1800" kern="1200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr></p:otherStyle></p:txStyles></p:sldMaster>"#,
        XML_DECL,
        NS_DRAWING,
        NS_RELATIONSHIPS,
        NS_PRESENTATION,
        group_shape_header(),
        placeholder_sp(2, &title),
        placeholder_sp(3, &body),
        CLR_MAP,
        layout_ids,
        body_levels()
    )
}

/// Bulleted body levels 1 to 5, each indented by 0.5"
fn body_levels() -> String {
    (1..=5)
        .map(|level: i64| {
            let size = (2800 - (level - 1) * 200).max(1800);
            format!(
                r#"<a:lvl{lvl}pPr marL="{mar}" indent="-228600" algn="l"><a:buFont typeface="Arial"/><a:buChar char="•"/><a:defRPr sz="{sz}" kern="1200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl{lvl}pPr>"#,
                lvl = level,
                mar = 228_600 + (level - 1) * EMU_PER_INCH / 2,
                sz = size
            )
        })
        .collect()
}

fn layout_xml(spec: &LayoutSpec) -> String {
    let shapes: String = spec
        .placeholders
        .iter()
        .enumerate()
        .map(|(i, ph)| placeholder_sp(i as u32 + 2, ph))
        .collect();

    format!(
        r#"{}
<p:sldLayout xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" type="{}" preserve="1"><p:cSld name="{}"><p:spTree>{}{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        XML_DECL,
        NS_DRAWING,
        NS_RELATIONSHIPS,
        NS_PRESENTATION,
        spec.ooxml_type,
        escape_xml(spec.name),
        group_shape_header(),
        shapes
    )
}

fn notes_master_xml() -> String {
    let slide_image = PlaceholderSpec {
        ph_type: Some("sldImg"),
        idx: Some(2),
        name: "Slide Image Placeholder 1",
        geometry: (685_800, 1_143_000, 5_486_400, 3_086_100),
    };
    let body = PlaceholderSpec {
        ph_type: Some("body"),
        idx: Some(3),
        name: "Notes Placeholder 2",
        geometry: (685_800, 4_400_550, 5_486_400, 3_600_450),
    };

    format!(
        r#"{}
<p:notesMaster xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{}{}{}</p:spTree></p:cSld><p:clrMap {}/><p:notesStyle><a:lvl1pPr marL="0" algn="l"><a:defRPr sz="1200" kern="1200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr></p:notesStyle></p:notesMaster>"#,
        XML_DECL,
        NS_DRAWING,
        NS_RELATIONSHIPS,
        NS_PRESENTATION,
        group_shape_header(),
        placeholder_sp(2, &slide_image),
        placeholder_sp(3, &body),
        CLR_MAP
    )
}
