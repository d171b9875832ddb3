//! Chart-type selection for tabular slide data.
//!
//! [`determine_chart_type`] walks a fixed list of heuristics and returns the
//! first match. It never fails: anything it cannot make sense of ends up as a
//! clustered column chart.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Category labels containing any of these (case-insensitive) mark the data
/// as a time series.
const TIME_TERMS: &[&str] = &[
    "date", "time", "year", "month", "day", "quarter", "q1", "q2", "q3", "q4", "jan", "feb",
    "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Pie charts stop being readable past this many slices.
const MAX_PIE_CATEGORIES: usize = 8;

/// Above this many categories the volume rules kick in.
const MANY_CATEGORIES: usize = 10;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A single cell in a series: a number, a coordinate pair, or something the
/// caller sent that we only partially understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Number(f64),
    Bool(bool),
    Text(String),
    List(Vec<DataValue>),
    Null,
}

impl DataValue {
    /// The value as a plain number, if it is one. Booleans count as 1 and 0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    /// Numeric conversion used by the pie rule: numbers pass through and
    /// numeric strings are parsed. `None` means "not convertible", which
    /// includes strings such as `"nan"` or `"inf"` that parse to non-finite
    /// values.
    pub fn to_number_lenient(&self) -> Option<f64> {
        match self {
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            other => other.as_number(),
        }
    }

    /// `Some((x, y))` when this is a two-element list of numbers.
    pub fn as_point(&self) -> Option<(f64, f64)> {
        match self {
            Self::List(items) if items.len() == 2 => {
                Some((items[0].as_number()?, items[1].as_number()?))
            }
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn is_pair_shaped(&self) -> bool {
        matches!(self, Self::List(items) if items.len() == 2)
    }
}

/// A label on the category axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryLabel {
    Integer(i64),
    Number(f64),
    Text(String),
    /// A `null` slot. Renders as an empty label.
    Null,
}

impl CategoryLabel {
    /// Label text as it appears on the chart.
    pub fn label(&self) -> String {
        match self {
            Self::Integer(i) => i.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::Null => String::new(),
        }
    }

    fn mentions_time(&self) -> bool {
        let text = match self {
            Self::Integer(i) => i.to_string(),
            Self::Text(s) => s.to_lowercase(),
            Self::Number(_) | Self::Null => return false,
        };
        TIME_TERMS.iter().any(|term| text.contains(term))
    }
}

impl From<&str> for CategoryLabel {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One named list of values plotted together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub values: Vec<DataValue>,
}

/// `"values": null` reads the same as a missing key.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<DataValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<DataValue>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChartSeries {
    pub fn new(name: impl Into<String>, values: Vec<DataValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Convenience constructor for a series of plain numbers.
    pub fn numbers(name: impl Into<String>, values: &[f64]) -> Self {
        Self::new(name, values.iter().map(|v| DataValue::Number(*v)).collect())
    }

    /// Convenience constructor for a series of `(x, y)` points.
    pub fn points(name: impl Into<String>, points: &[(f64, f64)]) -> Self {
        Self::new(
            name,
            points
                .iter()
                .map(|(x, y)| DataValue::List(vec![DataValue::Number(*x), DataValue::Number(*y)]))
                .collect(),
        )
    }
}

/// Data for one chart, as sent by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub series: Vec<ChartSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CategoryLabel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
}

impl ChartRequest {
    pub fn new(series: Vec<ChartSeries>) -> Self {
        Self {
            series,
            ..Default::default()
        }
    }

    pub fn with_categories<I, C>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CategoryLabel>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_axis_titles(mut self, x_axis: Option<String>, y_axis: Option<String>) -> Self {
        self.x_axis = x_axis;
        self.y_axis = y_axis;
        self
    }

    /// Categories, or an empty slice when none were given.
    pub fn categories(&self) -> &[CategoryLabel] {
        self.categories.as_deref().unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Decision types
// ---------------------------------------------------------------------------

/// The chart types the selector can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    ColumnClustered,
    BarClustered,
    Line,
    Pie,
    XyScatter,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColumnClustered => "column_clustered",
            Self::BarClustered => "bar_clustered",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::XyScatter => "xy_scatter",
        }
    }

    /// Whether the chart has category/value axes at all.
    pub fn has_axes(&self) -> bool {
        !matches!(self, Self::Pie)
    }
}

/// How series data has to be handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataShape {
    /// Category labels plus one value per category per series.
    Category,
    /// Series of `(x, y)` points.
    Xy,
}

impl DataShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Xy => "xy",
        }
    }
}

/// Result of [`determine_chart_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDecision {
    pub kind: ChartKind,
    pub shape: DataShape,
}

impl ChartDecision {
    pub const fn category(kind: ChartKind) -> Self {
        Self {
            kind,
            shape: DataShape::Category,
        }
    }

    pub const fn xy_scatter() -> Self {
        Self {
            kind: ChartKind::XyScatter,
            shape: DataShape::Xy,
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Pick the chart type that best fits `request`.
///
/// Rules are checked in order and the first match wins:
///
/// 1. missing data -> column
/// 2. first series is all `[x, y]` pairs -> XY scatter
/// 3. one series over 1-8 categories that look like shares -> pie
/// 4. time-like category labels -> line
/// 5. volume rules on category and series counts
/// 6. bar for several series, column otherwise
pub fn determine_chart_type(request: &ChartRequest) -> ChartDecision {
    let series_count = request.series.len();
    let categories = request.categories();
    let category_count = categories.len();

    if request.series.is_empty() || request.series.iter().any(|s| s.values.is_empty()) {
        debug!(series_count, "chart data incomplete, using column chart");
        return ChartDecision::category(ChartKind::ColumnClustered);
    }

    if is_xy_series(&request.series[0]) {
        debug!(series_count, "coordinate pairs detected, using scatter chart");
        return ChartDecision::xy_scatter();
    }

    if series_count == 1
        && (1..=MAX_PIE_CATEGORIES).contains(&category_count)
        && suits_pie(&request.series[0].values)
    {
        debug!(category_count, "single proportional series, using pie chart");
        return ChartDecision::category(ChartKind::Pie);
    }

    if categories.iter().any(CategoryLabel::mentions_time) {
        debug!(category_count, "time-like categories, using line chart");
        return ChartDecision::category(ChartKind::Line);
    }

    if category_count > 0 {
        if category_count > MANY_CATEGORIES && series_count == 1 {
            return ChartDecision::category(ChartKind::ColumnClustered);
        }
        if series_count > 3 && category_count <= MANY_CATEGORIES {
            return ChartDecision::category(ChartKind::BarClustered);
        }
        if category_count > MANY_CATEGORIES && series_count > 1 {
            return ChartDecision::category(ChartKind::Line);
        }
    }

    if series_count > 1 {
        ChartDecision::category(ChartKind::BarClustered)
    } else {
        ChartDecision::category(ChartKind::ColumnClustered)
    }
}

/// The first value must look like a pair, and every non-null value must be a
/// numeric pair.
fn is_xy_series(series: &ChartSeries) -> bool {
    match series.values.first() {
        Some(first) if first.is_pair_shaped() => series
            .values
            .iter()
            .filter(|v| !v.is_null())
            .all(|v| v.as_point().is_some()),
        _ => false,
    }
}

/// Percentages (sum within 95..=105) or values of similar magnitude
/// (max/min < 10, all positive). The sum check goes first.
fn suits_pie(values: &[DataValue]) -> bool {
    let Some(numbers) = numeric_values(values) else {
        return false;
    };
    if numbers.is_empty() {
        return false;
    }

    let total: f64 = numbers.iter().sum();
    if (95.0..=105.0).contains(&total) {
        return true;
    }

    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
    min > 0.0 && max / min < 10.0
}

/// Non-null values converted to numbers, or `None` if any of them is not
/// numeric.
fn numeric_values(values: &[DataValue]) -> Option<Vec<f64>> {
    values
        .iter()
        .filter(|v| !v.is_null())
        .map(DataValue::to_number_lenient)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Item {i}")).collect()
    }

    fn request(series: Vec<ChartSeries>, categories: &[String]) -> ChartRequest {
        ChartRequest::new(series).with_categories(categories.iter().map(String::as_str))
    }

    #[test]
    fn empty_series_defaults_to_column() {
        let decision = determine_chart_type(&ChartRequest::default());
        assert_eq!(decision, ChartDecision::category(ChartKind::ColumnClustered));
    }

    #[test]
    fn series_without_values_defaults_to_column() {
        let req = ChartRequest::new(vec![
            ChartSeries::numbers("A", &[1.0, 2.0]),
            ChartSeries::new("B", vec![]),
        ])
        .with_categories(["x", "y"]);
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::ColumnClustered)
        );
    }

    #[test]
    fn coordinate_pairs_become_scatter() {
        let req = ChartRequest::new(vec![ChartSeries::points(
            "Points",
            &[(1.0, 2.0), (3.0, 4.0), (5.0, 6.5)],
        )]);
        assert_eq!(determine_chart_type(&req), ChartDecision::xy_scatter());
    }

    #[test]
    fn null_entries_are_skipped_in_pair_check() {
        let mut series = ChartSeries::points("P", &[(1.0, 2.0), (3.0, 4.0)]);
        series.values.push(DataValue::Null);
        let req = ChartRequest::new(vec![series]);
        assert_eq!(determine_chart_type(&req), ChartDecision::xy_scatter());
    }

    #[test]
    fn one_malformed_pair_falls_through() {
        let mut series = ChartSeries::points("P", &[(1.0, 2.0), (3.0, 4.0)]);
        series.values.push(DataValue::List(vec![
            DataValue::Number(5.0),
            DataValue::Text("six".into()),
        ]));
        let req = ChartRequest::new(vec![series.clone(), series]);
        // Two series, no categories: ends at the default rule.
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::BarClustered)
        );
    }

    #[test]
    fn only_first_series_is_sampled_for_pairs() {
        let req = ChartRequest::new(vec![
            ChartSeries::numbers("Scalars", &[1.0, 2.0]),
            ChartSeries::points("Points", &[(1.0, 2.0)]),
        ]);
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::BarClustered)
        );
    }

    #[test]
    fn percentages_become_pie() {
        let req = ChartRequest::new(vec![ChartSeries::numbers("Share", &[50.0, 30.0, 20.0])])
            .with_categories(["A", "B", "C"]);
        assert_eq!(determine_chart_type(&req), ChartDecision::category(ChartKind::Pie));
    }

    #[test]
    fn similar_magnitudes_become_pie() {
        let req = ChartRequest::new(vec![ChartSeries::numbers("Units", &[10.0, 15.0, 12.0])])
            .with_categories(["A", "B", "C"]);
        assert_eq!(determine_chart_type(&req), ChartDecision::category(ChartKind::Pie));
    }

    #[test]
    fn sum_check_wins_over_spread() {
        // Sum 97 but ratio 96/1 is far above 10.
        let req = ChartRequest::new(vec![ChartSeries::numbers("Share", &[96.0, 1.0])])
            .with_categories(["A", "B"]);
        assert_eq!(determine_chart_type(&req), ChartDecision::category(ChartKind::Pie));
    }

    #[test]
    fn wide_spread_is_not_pie() {
        let req = ChartRequest::new(vec![ChartSeries::numbers("Sales", &[1.0, 500.0, 20.0])])
            .with_categories(["A", "B", "C"]);
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::ColumnClustered)
        );
    }

    #[test]
    fn numeric_strings_count_for_pie() {
        let req = ChartRequest::new(vec![ChartSeries::new(
            "Share",
            vec![
                DataValue::Text("60".into()),
                DataValue::Null,
                DataValue::Number(40.0),
            ],
        )])
        .with_categories(["A", "B", "C"]);
        assert_eq!(determine_chart_type(&req), ChartDecision::category(ChartKind::Pie));
    }

    #[test]
    fn non_numeric_values_skip_pie() {
        let req = ChartRequest::new(vec![ChartSeries::new(
            "Mixed",
            vec![DataValue::Text("n/a".into()), DataValue::Number(50.0)],
        )])
        .with_categories(["A", "B"]);
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::ColumnClustered)
        );
    }

    #[test]
    fn pie_needs_at_most_eight_categories() {
        let values = [10.0; 9];
        let req = request(vec![ChartSeries::numbers("S", &values)], &labels(9));
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::ColumnClustered)
        );
    }

    #[test]
    fn pie_needs_categories() {
        let req = ChartRequest::new(vec![ChartSeries::numbers("S", &[50.0, 50.0])]);
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::ColumnClustered)
        );
    }

    #[test]
    fn zero_minimum_is_not_pie() {
        let req = ChartRequest::new(vec![ChartSeries::numbers("S", &[0.0, 3.0, 4.0])])
            .with_categories(["A", "B", "C"]);
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::ColumnClustered)
        );
    }

    #[test]
    fn month_labels_become_line() {
        let req = ChartRequest::new(vec![
            ChartSeries::numbers("2023", &[1.0, 5.0, 2.0]),
            ChartSeries::numbers("2024", &[3.0, 1.0, 9.0]),
        ])
        .with_categories(["Jan", "Feb", "Mar"]);
        assert_eq!(determine_chart_type(&req), ChartDecision::category(ChartKind::Line));
    }

    #[test]
    fn time_terms_match_case_insensitively() {
        let req = ChartRequest::new(vec![
            ChartSeries::numbers("A", &[1.0, 100.0]),
            ChartSeries::numbers("B", &[3.0, 1.0]),
        ])
        .with_categories(["FISCAL QUARTER 1", "Fiscal Quarter 2"]);
        assert_eq!(determine_chart_type(&req), ChartDecision::category(ChartKind::Line));
    }

    #[test]
    fn time_detection_beats_volume_rules() {
        let cats: Vec<String> = (1..=12).map(|m| format!("Month {m}")).collect();
        let req = request(vec![ChartSeries::numbers("S", &[1.0; 12])], &cats);
        assert_eq!(determine_chart_type(&req), ChartDecision::category(ChartKind::Line));
    }

    #[test]
    fn integer_and_float_labels_are_not_time() {
        let req = ChartRequest {
            series: vec![
                ChartSeries::numbers("A", &[1.0, 2.0]),
                ChartSeries::numbers("B", &[2.0, 1.0]),
            ],
            categories: Some(vec![CategoryLabel::Integer(2023), CategoryLabel::Number(1.5)]),
            ..Default::default()
        };
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::BarClustered)
        );
    }

    #[test]
    fn many_categories_single_series_is_column() {
        let values: Vec<f64> = (1..=12).map(|v| (v * v) as f64).collect();
        let req = request(vec![ChartSeries::numbers("S", &values)], &labels(12));
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::ColumnClustered)
        );
    }

    #[test]
    fn many_categories_several_series_is_line() {
        let values: Vec<f64> = (1..=12).map(|v| v as f64).collect();
        let req = request(
            vec![ChartSeries::numbers("A", &values), ChartSeries::numbers("B", &values)],
            &labels(12),
        );
        assert_eq!(determine_chart_type(&req), ChartDecision::category(ChartKind::Line));
    }

    #[test]
    fn many_series_few_categories_is_bar() {
        let series = (0..4)
            .map(|i| ChartSeries::numbers(format!("S{i}"), &[1.0, 2.0, 3.0, 4.0, 5.0]))
            .collect();
        let req = request(series, &labels(5));
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::BarClustered)
        );
    }

    #[test]
    fn default_rule_depends_on_series_count() {
        let two = ChartRequest::new(vec![
            ChartSeries::numbers("A", &[1.0, 2.0]),
            ChartSeries::numbers("B", &[2.0, 3.0]),
        ])
        .with_categories(["North", "South"]);
        assert_eq!(
            determine_chart_type(&two),
            ChartDecision::category(ChartKind::BarClustered)
        );

        let one = ChartRequest::new(vec![ChartSeries::numbers("A", &[1.0, 200.0])])
            .with_categories(["North", "South"]);
        assert_eq!(
            determine_chart_type(&one),
            ChartDecision::category(ChartKind::ColumnClustered)
        );
    }

    #[test]
    fn request_deserializes_from_json() {
        let json = r#"{
            "series": [{"name": "Share", "values": [50, 30, null, "20"]}],
            "categories": ["A", "B", 3],
            "x_axis": "Segment"
        }"#;
        let req: ChartRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.series[0].values[2], DataValue::Null);
        assert_eq!(req.series[0].values[3], DataValue::Text("20".into()));
        assert_eq!(req.categories()[2], CategoryLabel::Integer(3));
        assert_eq!(req.x_axis.as_deref(), Some("Segment"));
        assert!(req.y_axis.is_none());
    }

    #[test]
    fn series_without_values_key_deserializes_empty() {
        let req: ChartRequest = serde_json::from_str(r#"{"series": [{"name": "A"}]}"#).unwrap();
        assert!(req.series[0].values.is_empty());
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::ColumnClustered)
        );
    }

    #[test]
    fn null_values_key_defaults_to_column() {
        let req: ChartRequest =
            serde_json::from_str(r#"{"series": [{"name": "A", "values": null}]}"#).unwrap();
        assert!(req.series[0].values.is_empty());
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::ColumnClustered)
        );
    }

    #[test]
    fn null_category_is_accepted_and_not_time() {
        let req: ChartRequest = serde_json::from_str(
            r#"{"series": [{"name": "A", "values": [1, 500, 20]},
                           {"name": "B", "values": [2, 3, 4]}],
                "categories": ["North", null, "South"]}"#,
        )
        .unwrap();
        assert_eq!(req.categories()[1], CategoryLabel::Null);
        assert_eq!(req.categories()[1].label(), "");
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::BarClustered)
        );
    }

    #[test]
    fn bool_values_count_as_numbers() {
        let req: ChartRequest = serde_json::from_str(
            r#"{"series": [{"name": "Flags", "values": [true, false, 98]}],
                "categories": ["A", "B", "C"]}"#,
        )
        .unwrap();
        assert_eq!(req.series[0].values[0], DataValue::Bool(true));
        assert_eq!(req.series[0].values[1].to_number_lenient(), Some(0.0));
        // 1 + 0 + 98 lands in the percentage window.
        assert_eq!(determine_chart_type(&req), ChartDecision::category(ChartKind::Pie));
    }

    #[test]
    fn non_finite_strings_skip_pie() {
        let req = ChartRequest::new(vec![ChartSeries::new(
            "Share",
            vec![
                DataValue::Text("nan".into()),
                DataValue::Number(10.0),
                DataValue::Number(12.0),
            ],
        )])
        .with_categories(["A", "B", "C"]);
        assert_eq!(
            determine_chart_type(&req),
            ChartDecision::category(ChartKind::ColumnClustered)
        );
        assert_eq!(DataValue::Text("inf".into()).to_number_lenient(), None);
        assert_eq!(DataValue::Text(" 2.5 ".into()).to_number_lenient(), Some(2.5));
    }

    #[test]
    fn decision_serializes_as_tags() {
        let json = serde_json::to_value(ChartDecision::xy_scatter()).unwrap();
        assert_eq!(json["kind"], "xy_scatter");
        assert_eq!(json["shape"], "xy");
    }
}
