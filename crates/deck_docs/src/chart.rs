//! Chart rendering: turn a [`ChartDecision`] plus the request it came from into a
//! chart on a slide, and serialize that chart as a DrawingML chart part.
//!
//! Data references in the generated XML point into `Sheet1` of the workbook
//! produced by [`crate::chart_workbook`], which the package writer embeds next
//! to each chart.

use anyhow::{Result, bail};
use tracing::debug;

use crate::chart_select::{ChartDecision, ChartKind, ChartRequest, DataShape, DataValue};
use crate::pptx::{PptxSlide, xml_escape};

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

const SHEET: &str = "Sheet1";

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Position and size of a chart on its slide, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartFrame {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl ChartFrame {
    /// The one layout every generated chart uses: 1in from the left, 2in from
    /// the top, 8in x 5in.
    pub const fn standard() -> Self {
        Self {
            left: EMU_PER_INCH,
            top: 2 * EMU_PER_INCH,
            width: 8 * EMU_PER_INCH,
            height: 5 * EMU_PER_INCH,
        }
    }
}

/// Where the legend sits relative to the plot area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendPosition {
    Bottom,
    #[default]
    Right,
}

impl LegendPosition {
    fn xml_value(&self) -> &'static str {
        match self {
            Self::Bottom => "b",
            Self::Right => "r",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Legend {
    pub position: LegendPosition,
}

// ---------------------------------------------------------------------------
// Chart data
// ---------------------------------------------------------------------------

/// A named series of values, one per category. `None` leaves a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryChartData {
    pub categories: Vec<String>,
    pub series: Vec<CategorySeries>,
}

impl CategoryChartData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_categories(&mut self, categories: Vec<String>) {
        self.categories = categories;
    }

    /// Add a series from raw request values. Nulls and anything that is not a
    /// number become gaps.
    pub fn add_series(&mut self, name: impl Into<String>, values: &[DataValue]) {
        self.series.push(CategorySeries {
            name: name.into(),
            values: values.iter().map(DataValue::to_number_lenient).collect(),
        });
    }
}

/// A named series of `(x, y)` points.
#[derive(Debug, Clone, PartialEq)]
pub struct XySeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

impl XySeries {
    pub fn add_data_point(&mut self, x: f64, y: f64) {
        self.points.push((x, y));
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XyChartData {
    pub series: Vec<XySeries>,
}

impl XyChartData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_series(&mut self, name: impl Into<String>) -> &mut XySeries {
        self.series.push(XySeries {
            name: name.into(),
            points: Vec::new(),
        });
        let last = self.series.len() - 1;
        &mut self.series[last]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Category(CategoryChartData),
    Xy(XyChartData),
}

impl ChartData {
    pub fn series_count(&self) -> usize {
        match self {
            Self::Category(data) => data.series.len(),
            Self::Xy(data) => data.series.len(),
        }
    }

    pub fn shape(&self) -> DataShape {
        match self {
            Self::Category(_) => DataShape::Category,
            Self::Xy(_) => DataShape::Xy,
        }
    }
}

/// Feed the request into the data container the decision's shape calls for.
pub fn build_chart_data(decision: &ChartDecision, request: &ChartRequest) -> Result<ChartData> {
    match decision.shape {
        DataShape::Category => {
            let mut data = CategoryChartData::new();
            data.set_categories(request.categories().iter().map(|c| c.label()).collect());
            for series in &request.series {
                data.add_series(series.name.clone(), &series.values);
            }
            Ok(ChartData::Category(data))
        }
        DataShape::Xy => {
            let mut data = XyChartData::new();
            for series in &request.series {
                let xy = data.add_series(series.name.clone());
                for (idx, value) in series.values.iter().enumerate() {
                    if value.is_null() {
                        continue;
                    }
                    let Some((x, y)) = value.as_point() else {
                        bail!(
                            "Series '{}' value {idx} is not an (x, y) pair: {value:?}",
                            series.name
                        );
                    };
                    xy.add_data_point(x, y);
                }
            }
            Ok(ChartData::Xy(data))
        }
    }
}

// ---------------------------------------------------------------------------
// Slide chart
// ---------------------------------------------------------------------------

/// A chart placed on a slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideChart {
    pub kind: ChartKind,
    pub frame: ChartFrame,
    pub data: ChartData,
    pub legend: Option<Legend>,
    pub category_axis_title: Option<String>,
    pub value_axis_title: Option<String>,
}

impl SlideChart {
    pub fn new(kind: ChartKind, frame: ChartFrame, data: ChartData) -> Self {
        Self {
            kind,
            frame,
            data,
            legend: None,
            category_axis_title: None,
            value_axis_title: None,
        }
    }

    pub fn has_legend(&self) -> bool {
        self.legend.is_some()
    }

    pub fn set_has_legend(&mut self, on: bool) {
        self.legend = on.then(Legend::default);
    }
}

/// Classifier output -> chart on `slide`.
///
/// Always shows a legend, moved to the bottom when there is more than one
/// series. Axis titles from the request are applied to charts that have
/// axes.
pub fn add_chart_to_slide<'a>(
    slide: &'a mut PptxSlide,
    decision: &ChartDecision,
    request: &ChartRequest,
) -> Result<&'a mut SlideChart> {
    let data = build_chart_data(decision, request)?;
    let series_count = data.series_count();
    let chart = slide.add_chart(decision.kind, ChartFrame::standard(), data);

    chart.set_has_legend(true);
    if series_count > 1
        && let Some(legend) = chart.legend.as_mut()
    {
        legend.position = LegendPosition::Bottom;
    }

    if chart.kind.has_axes() {
        chart.category_axis_title = request.x_axis.clone();
        chart.value_axis_title = request.y_axis.clone();
    } else if request.x_axis.is_some() || request.y_axis.is_some() {
        debug!(kind = chart.kind.as_str(), "chart has no axes, ignoring axis titles");
    }

    debug!(
        kind = chart.kind.as_str(),
        shape = decision.shape.as_str(),
        series_count,
        "chart added to slide"
    );
    Ok(chart)
}

// ---------------------------------------------------------------------------
// Chart part XML
// ---------------------------------------------------------------------------

/// Serialize `chart` as a `c:chartSpace` part whose data lives in the
/// embedded workbook referenced by relationship `rId1`.
pub fn chart_space_xml(chart: &SlideChart) -> String {
    let legend = match chart.legend {
        Some(legend) => format!(
            r#"<c:legend><c:legendPos val="{}"/><c:overlay val="0"/></c:legend>"#,
            legend.position.xml_value()
        ),
        None => String::new(),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <c:date1904 val="0"/>
  <c:roundedCorners val="0"/>
  <c:chart>
    <c:autoTitleDeleted val="0"/>
    <c:plotArea>
      <c:layout/>
{plot}
    </c:plotArea>
    {legend}
    <c:plotVisOnly val="1"/>
    <c:dispBlanksAs val="gap"/>
  </c:chart>
  <c:externalData r:id="rId1"><c:autoUpdate val="0"/></c:externalData>
</c:chartSpace>"#,
        plot = plot_area_xml(chart),
    )
}

fn plot_area_xml(chart: &SlideChart) -> String {
    let cat_title = chart.category_axis_title.as_deref();
    let val_title = chart.value_axis_title.as_deref();

    match (&chart.data, chart.kind) {
        (ChartData::Xy(data), _) => {
            let series: String = data
                .series
                .iter()
                .enumerate()
                .map(|(i, s)| xy_series_xml(i, s))
                .collect();
            format!(
                r#"<c:scatterChart><c:scatterStyle val="lineMarker"/><c:varyColors val="0"/>{series}<c:axId val="1"/><c:axId val="2"/></c:scatterChart>
{x_axis}
{y_axis}"#,
                x_axis = value_axis_xml(1, 2, "b", false, "midCat", cat_title),
                y_axis = value_axis_xml(2, 1, "l", true, "midCat", val_title),
            )
        }
        (ChartData::Category(data), ChartKind::Pie) => {
            let series: String = data
                .series
                .iter()
                .enumerate()
                .map(|(i, s)| category_series_xml(i, s, &data.categories, ChartKind::Pie))
                .collect();
            format!(
                r#"<c:pieChart><c:varyColors val="1"/>{series}<c:firstSliceAng val="0"/></c:pieChart>"#
            )
        }
        (ChartData::Category(data), kind) => {
            let series: String = data
                .series
                .iter()
                .enumerate()
                .map(|(i, s)| category_series_xml(i, s, &data.categories, kind))
                .collect();
            let (group, cat_pos, val_pos) = match kind {
                ChartKind::Line => (
                    format!(
                        r#"<c:lineChart><c:grouping val="standard"/><c:varyColors val="0"/>{series}<c:marker val="1"/><c:axId val="1"/><c:axId val="2"/></c:lineChart>"#
                    ),
                    "b",
                    "l",
                ),
                _ => {
                    let (dir, cat_pos, val_pos) = if kind == ChartKind::BarClustered {
                        ("bar", "l", "b")
                    } else {
                        ("col", "b", "l")
                    };
                    (
                        format!(
                            r#"<c:barChart><c:barDir val="{dir}"/><c:grouping val="clustered"/><c:varyColors val="0"/>{series}<c:gapWidth val="150"/><c:axId val="1"/><c:axId val="2"/></c:barChart>"#
                        ),
                        cat_pos,
                        val_pos,
                    )
                }
            };
            format!(
                "{group}\n{}\n{}",
                category_axis_xml(cat_pos, cat_title),
                value_axis_xml(2, 1, val_pos, true, "between", val_title),
            )
        }
    }
}

fn category_series_xml(
    idx: usize,
    series: &CategorySeries,
    categories: &[String],
    kind: ChartKind,
) -> String {
    let col = column_name(idx + 1);
    let mut xml = format!(r#"<c:ser><c:idx val="{idx}"/><c:order val="{idx}"/>"#);
    xml.push_str(&series_name_xml(&col, &series.name));

    match kind {
        ChartKind::BarClustered | ChartKind::ColumnClustered => {
            xml.push_str(r#"<c:invertIfNegative val="0"/>"#);
        }
        ChartKind::Line => {
            xml.push_str(r#"<c:marker><c:symbol val="circle"/></c:marker>"#);
        }
        _ => {}
    }

    if !categories.is_empty() {
        xml.push_str(&format!(
            "<c:cat>{}</c:cat>",
            str_ref_xml(&range_ref("A", 2, categories.len()), categories)
        ));
    }

    xml.push_str(&format!(
        "<c:val>{}</c:val>",
        num_ref_xml(
            &range_ref(&col, 2, series.values.len()),
            series.values.iter().copied()
        )
    ));

    if kind == ChartKind::Line {
        xml.push_str(r#"<c:smooth val="0"/>"#);
    }
    xml.push_str("</c:ser>");
    xml
}

fn xy_series_xml(idx: usize, series: &XySeries) -> String {
    let x_col = column_name(idx * 2);
    let y_col = column_name(idx * 2 + 1);
    let n = series.points.len();

    let mut xml = format!(r#"<c:ser><c:idx val="{idx}"/><c:order val="{idx}"/>"#);
    xml.push_str(&series_name_xml(&y_col, &series.name));
    // Markers only, no connecting line.
    xml.push_str(r#"<c:spPr><a:ln w="19050"><a:noFill/></a:ln></c:spPr>"#);
    xml.push_str(&format!(
        "<c:xVal>{}</c:xVal>",
        num_ref_xml(&range_ref(&x_col, 2, n), series.points.iter().map(|p| Some(p.0)))
    ));
    xml.push_str(&format!(
        "<c:yVal>{}</c:yVal>",
        num_ref_xml(&range_ref(&y_col, 2, n), series.points.iter().map(|p| Some(p.1)))
    ));
    xml.push_str(r#"<c:smooth val="0"/></c:ser>"#);
    xml
}

fn series_name_xml(col: &str, name: &str) -> String {
    format!(
        r#"<c:tx><c:strRef><c:f>{SHEET}!${col}$1</c:f><c:strCache><c:ptCount val="1"/><c:pt idx="0"><c:v>{}</c:v></c:pt></c:strCache></c:strRef></c:tx>"#,
        xml_escape(name)
    )
}

fn str_ref_xml(formula: &str, values: &[String]) -> String {
    let mut points = String::new();
    for (i, v) in values.iter().enumerate() {
        points.push_str(&format!(
            r#"<c:pt idx="{i}"><c:v>{}</c:v></c:pt>"#,
            xml_escape(v)
        ));
    }
    format!(
        r#"<c:strRef><c:f>{formula}</c:f><c:strCache><c:ptCount val="{}"/>{points}</c:strCache></c:strRef>"#,
        values.len()
    )
}

fn num_ref_xml(formula: &str, values: impl Iterator<Item = Option<f64>>) -> String {
    let mut count = 0;
    let mut points = String::new();
    for (i, v) in values.enumerate() {
        count = i + 1;
        if let Some(v) = v {
            points.push_str(&format!(r#"<c:pt idx="{i}"><c:v>{v}</c:v></c:pt>"#));
        }
    }
    format!(
        r#"<c:numRef><c:f>{formula}</c:f><c:numCache><c:formatCode>General</c:formatCode><c:ptCount val="{count}"/>{points}</c:numCache></c:numRef>"#
    )
}

fn axis_title_xml(title: Option<&str>) -> String {
    match title {
        Some(text) => format!(
            r#"<c:title><c:tx><c:rich><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></c:rich></c:tx><c:overlay val="0"/></c:title>"#,
            xml_escape(text)
        ),
        None => String::new(),
    }
}

fn category_axis_xml(position: &str, title: Option<&str>) -> String {
    format!(
        r#"<c:catAx><c:axId val="1"/><c:scaling><c:orientation val="minMax"/></c:scaling><c:delete val="0"/><c:axPos val="{position}"/>{title}<c:majorTickMark val="out"/><c:minorTickMark val="none"/><c:tickLblPos val="nextTo"/><c:crossAx val="2"/><c:crosses val="autoZero"/><c:auto val="1"/><c:lblAlgn val="ctr"/><c:lblOffset val="100"/><c:noMultiLvlLbl val="0"/></c:catAx>"#,
        title = axis_title_xml(title),
    )
}

fn value_axis_xml(
    id: u32,
    cross_id: u32,
    position: &str,
    gridlines: bool,
    cross_between: &str,
    title: Option<&str>,
) -> String {
    format!(
        r#"<c:valAx><c:axId val="{id}"/><c:scaling><c:orientation val="minMax"/></c:scaling><c:delete val="0"/><c:axPos val="{position}"/>{grid}{title}<c:numFmt formatCode="General" sourceLinked="1"/><c:majorTickMark val="out"/><c:minorTickMark val="none"/><c:tickLblPos val="nextTo"/><c:crossAx val="{cross_id}"/><c:crosses val="autoZero"/><c:crossBetween val="{cross_between}"/></c:valAx>"#,
        grid = if gridlines { "<c:majorGridlines/>" } else { "" },
        title = axis_title_xml(title),
    )
}

/// Absolute reference to `len` cells of `col` starting at `first_row`.
fn range_ref(col: &str, first_row: usize, len: usize) -> String {
    let last_row = first_row + len.max(1) - 1;
    format!("{SHEET}!${col}${first_row}:${col}${last_row}")
}

/// Spreadsheet column letters for a zero-based index (0 -> A, 26 -> AA).
pub(crate) fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
