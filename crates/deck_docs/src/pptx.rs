//! Minimal OOXML presentation writer.
//!
//! Produces a single-master, single-layout deck where each slide carries a
//! title, optional body text and any number of charts. Every chart is written
//! as its own chart part with an embedded data workbook so the presentation
//! application can edit the numbers later.

use anyhow::{Context, Result};
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::chart::{ChartData, ChartFrame, SlideChart, chart_space_xml};
use crate::chart_select::ChartKind;
use crate::chart_workbook::generate_chart_workbook;

/// A single slide in a PPTX presentation.
#[derive(Debug, Clone, Default)]
pub struct PptxSlide {
    pub title: String,
    pub content: String,
    pub charts: Vec<SlideChart>,
}

impl PptxSlide {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            charts: Vec::new(),
        }
    }

    /// Place a chart on the slide and hand it back for formatting.
    pub fn add_chart(&mut self, kind: ChartKind, frame: ChartFrame, data: ChartData) -> &mut SlideChart {
        self.charts.push(SlideChart::new(kind, frame, data));
        let last = self.charts.len() - 1;
        &mut self.charts[last]
    }
}

/// Generate a PPTX (PowerPoint) file from a list of slides.
///
/// Charts are numbered across the whole deck: the first chart on slide 2
/// follows the last chart on slide 1.
pub fn generate_pptx(slides: &[PptxSlide]) -> Result<Vec<u8>> {
    let chart_count: usize = slides.iter().map(|s| s.charts.len()).sum();
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let fixed_parts = [
        ("[Content_Types].xml", content_types_xml(slides.len(), chart_count)),
        ("_rels/.rels", root_rels_xml()),
        ("ppt/presentation.xml", presentation_xml(slides.len())),
        ("ppt/_rels/presentation.xml.rels", presentation_rels_xml(slides.len())),
        ("ppt/slideMasters/slideMaster1.xml", slide_master_xml()),
        ("ppt/slideMasters/_rels/slideMaster1.xml.rels", slide_master_rels_xml()),
        ("ppt/slideLayouts/slideLayout1.xml", slide_layout_xml()),
        ("ppt/slideLayouts/_rels/slideLayout1.xml.rels", slide_layout_rels_xml()),
        ("ppt/theme/theme1.xml", theme_xml()),
    ];
    for (path, xml) in &fixed_parts {
        write_part(&mut zip, options, path, xml.as_bytes())?;
    }

    let mut chart_num = 0;
    for (i, slide) in slides.iter().enumerate() {
        let slide_num = i + 1;
        let first_chart = chart_num + 1;

        for chart in &slide.charts {
            chart_num += 1;
            write_part(
                &mut zip,
                options,
                &format!("ppt/charts/chart{chart_num}.xml"),
                chart_space_xml(chart).as_bytes(),
            )?;
            write_part(
                &mut zip,
                options,
                &format!("ppt/charts/_rels/chart{chart_num}.xml.rels"),
                chart_rels_xml(chart_num).as_bytes(),
            )?;
            let workbook = generate_chart_workbook(&chart.data)
                .with_context(|| format!("Failed to build data workbook for chart {chart_num}"))?;
            write_part(
                &mut zip,
                options,
                &format!("ppt/embeddings/Microsoft_Excel_Sheet{chart_num}.xlsx"),
                &workbook,
            )?;
        }

        write_part(
            &mut zip,
            options,
            &format!("ppt/slides/slide{slide_num}.xml"),
            slide_xml(slide, first_chart).as_bytes(),
        )?;
        write_part(
            &mut zip,
            options,
            &format!("ppt/slides/_rels/slide{slide_num}.xml.rels"),
            slide_rels_xml(first_chart, slide.charts.len()).as_bytes(),
        )?;
    }

    let cursor = zip.finish().context("Failed to finalize PPTX zip")?;
    debug!(slides = slides.len(), charts = chart_count, "PPTX package built");
    Ok(cursor.into_inner())
}

/// Generate the presentation and write it to `path`, creating missing parent
/// directories.
pub fn write_pptx(path: &Path, slides: &[PptxSlide]) -> Result<()> {
    let bytes = generate_pptx(slides)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, &bytes)
        .with_context(|| format!("Failed to write presentation: {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "Presentation written");
    Ok(())
}

fn write_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    path: &str,
    bytes: &[u8],
) -> Result<()> {
    zip.start_file(path, options)
        .with_context(|| format!("Failed to create {path}"))?;
    zip.write_all(bytes)
        .with_context(|| format!("Failed to write {path}"))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// XML template functions
// ---------------------------------------------------------------------------

pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn content_types_xml(slide_count: usize, chart_count: usize) -> String {
    let mut overrides = String::new();
    for i in 1..=slide_count {
        overrides.push_str(&format!(
            r#"  <Override PartName="/ppt/slides/slide{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        ));
        overrides.push('\n');
    }
    for i in 1..=chart_count {
        overrides.push_str(&format!(
            r#"  <Override PartName="/ppt/charts/chart{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.drawingml.chart+xml"/>"#
        ));
        overrides.push('\n');
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="xlsx" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"/>
  <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
  <Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
  <Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
  <Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>
{overrides}</Types>"#
    )
}

fn root_rels_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
</Relationships>"#
        .to_string()
}

fn presentation_xml(slide_count: usize) -> String {
    let mut slide_list = String::new();
    for i in 1..=slide_count {
        slide_list.push_str(&format!(
            r#"    <p:sldId id="{}" r:id="rId{}"/>"#,
            255 + i,
            i + 2 // rId1=slideMaster, rId2=theme, slides start at rId3
        ));
        slide_list.push('\n');
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
  xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
  xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:sldMasterIdLst>
    <p:sldMasterId id="2147483648" r:id="rId1"/>
  </p:sldMasterIdLst>
  <p:sldIdLst>
{slide_list}  </p:sldIdLst>
  <p:sldSz cx="9144000" cy="6858000" type="screen4x3"/>
  <p:notesSz cx="6858000" cy="9144000"/>
</p:presentation>"#
    )
}

fn presentation_rels_xml(slide_count: usize) -> String {
    let mut rels = String::new();
    // rId1 = slideMaster
    rels.push_str(
        r#"  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
    );
    rels.push('\n');
    // rId2 = theme
    rels.push_str(
        r#"  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>"#,
    );
    rels.push('\n');
    // rId3+ = slides
    for i in 1..=slide_count {
        rels.push_str(&format!(
            r#"  <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{i}.xml"/>"#,
            i + 2
        ));
        rels.push('\n');
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
{rels}</Relationships>"#
    )
}

fn slide_master_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
  xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
  xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld>
    <p:spTree>
      <p:nvGrpSpPr>
        <p:cNvPr id="1" name=""/>
        <p:cNvGrpSpPr/>
        <p:nvPr/>
      </p:nvGrpSpPr>
      <p:grpSpPr/>
    </p:spTree>
  </p:cSld>
  <p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
  <p:sldLayoutIdLst>
    <p:sldLayoutId id="2147483649" r:id="rId1"/>
  </p:sldLayoutIdLst>
</p:sldMaster>"#
        .to_string()
}

fn slide_master_rels_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/>
</Relationships>"#
        .to_string()
}

fn slide_layout_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
  xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
  xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank">
  <p:cSld>
    <p:spTree>
      <p:nvGrpSpPr>
        <p:cNvPr id="1" name=""/>
        <p:cNvGrpSpPr/>
        <p:nvPr/>
      </p:nvGrpSpPr>
      <p:grpSpPr/>
    </p:spTree>
  </p:cSld>
</p:sldLayout>"#
        .to_string()
}

fn slide_layout_rels_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/>
</Relationships>"#
        .to_string()
}

fn theme_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Default Theme">
  <a:themeElements>
    <a:clrScheme name="Default">
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
    <a:fontScheme name="Default">
      <a:majorFont><a:latin typeface="Calibri"/></a:majorFont>
      <a:minorFont><a:latin typeface="Calibri"/></a:minorFont>
    </a:fontScheme>
    <a:fmtScheme name="Default">
      <a:fillStyleLst>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
      </a:fillStyleLst>
      <a:lnStyleLst>
        <a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
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
</a:theme>"#
        .to_string()
}

fn slide_xml(slide: &PptxSlide, first_chart: usize) -> String {
    let escaped_title = xml_escape(&slide.title);

    // Charts take the body area; skip the empty text box under them.
    let body = if slide.content.is_empty() && !slide.charts.is_empty() {
        String::new()
    } else {
        content_shape_xml(&slide.content)
    };

    let mut frames = String::new();
    for (j, chart) in slide.charts.iter().enumerate() {
        frames.push_str(&graphic_frame_xml(chart, 4 + j, first_chart + j, 2 + j));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
  xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
  xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld>
    <p:spTree>
      <p:nvGrpSpPr>
        <p:cNvPr id="1" name=""/>
        <p:cNvGrpSpPr/>
        <p:nvPr/>
      </p:nvGrpSpPr>
      <p:grpSpPr/>
      <p:sp>
        <p:nvSpPr>
          <p:cNvPr id="2" name="Title"/>
          <p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>
          <p:nvPr><p:ph type="title"/></p:nvPr>
        </p:nvSpPr>
        <p:spPr>
          <a:xfrm>
            <a:off x="457200" y="274638"/>
            <a:ext cx="8229600" cy="1143000"/>
          </a:xfrm>
        </p:spPr>
        <p:txBody>
          <a:bodyPr/>
          <a:lstStyle/>
          <a:p>
            <a:r>
              <a:rPr lang="en-US" sz="3600" b="1" dirty="0"/>
              <a:t>{escaped_title}</a:t>
            </a:r>
          </a:p>
        </p:txBody>
      </p:sp>
{body}{frames}    </p:spTree>
  </p:cSld>
</p:sld>"#
    )
}

fn content_shape_xml(content: &str) -> String {
    // Each line becomes a separate <a:p> element
    let mut paragraphs = String::new();
    for line in xml_escape(content).lines() {
        paragraphs.push_str(&format!(
            r#"            <a:p><a:r><a:rPr lang="en-US" sz="1800" dirty="0"/><a:t>{line}</a:t></a:r></a:p>"#
        ));
        paragraphs.push('\n');
    }
    if content.is_empty() {
        paragraphs.push_str("            <a:p><a:endParaRPr lang=\"en-US\"/></a:p>\n");
    }

    format!(
        r#"      <p:sp>
        <p:nvSpPr>
          <p:cNvPr id="3" name="Content"/>
          <p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>
          <p:nvPr><p:ph idx="1"/></p:nvPr>
        </p:nvSpPr>
        <p:spPr>
          <a:xfrm>
            <a:off x="457200" y="1600200"/>
            <a:ext cx="8229600" cy="4525963"/>
          </a:xfrm>
        </p:spPr>
        <p:txBody>
          <a:bodyPr/>
          <a:lstStyle/>
{paragraphs}        </p:txBody>
      </p:sp>
"#
    )
}

fn graphic_frame_xml(chart: &SlideChart, shape_id: usize, chart_num: usize, rel_id: usize) -> String {
    let frame = chart.frame;
    format!(
        r#"      <p:graphicFrame>
        <p:nvGraphicFramePr>
          <p:cNvPr id="{shape_id}" name="Chart {chart_num}"/>
          <p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr>
          <p:nvPr/>
        </p:nvGraphicFramePr>
        <p:xfrm>
          <a:off x="{}" y="{}"/>
          <a:ext cx="{}" cy="{}"/>
        </p:xfrm>
        <a:graphic>
          <a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart">
            <c:chart xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" r:id="rId{rel_id}"/>
          </a:graphicData>
        </a:graphic>
      </p:graphicFrame>
"#,
        frame.left, frame.top, frame.width, frame.height
    )
}

fn slide_rels_xml(first_chart: usize, chart_count: usize) -> String {
    let mut rels = String::new();
    for j in 0..chart_count {
        rels.push_str(&format!(
            r#"  <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart" Target="../charts/chart{}.xml"/>"#,
            j + 2,
            first_chart + j
        ));
        rels.push('\n');
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
{rels}</Relationships>"#
    )
}

fn chart_rels_xml(chart_num: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/package" Target="../embeddings/Microsoft_Excel_Sheet{chart_num}.xlsx"/>
</Relationships>"#
    )
}
