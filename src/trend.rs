use crate::coerce::parse_number;
use crate::dataset::{Dataset, KeyValue, LabelValue};
use crate::encoding::{AxisEncoding, ChartMode};
use crate::regression::{
    self, parse_date, ExponentialFit, LinearFit, LogarithmicFit, Point, PolynomialFit, RegressionError,
};
use indexmap::IndexSet;
use serde::Serialize;
use tracing::debug;

/// Which curve to fit for an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendKind {
    Linear,
    Logarithmic,
    Exponential,
    Polynomial(usize),
}

/// A fitted overlay, whichever fitter produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Trend {
    Linear(LinearFit),
    Logarithmic(LogarithmicFit),
    Exponential(ExponentialFit),
    Polynomial(PolynomialFit),
}

impl Trend {
    pub fn predict(&self, x: f64) -> f64 {
        match self {
            Trend::Linear(fit) => fit.predict(x),
            Trend::Logarithmic(fit) => fit.predict(x),
            Trend::Exponential(fit) => fit.predict(x),
            Trend::Polynomial(fit) => fit.predict(x),
        }
    }

    pub fn equation(&self) -> &str {
        match self {
            Trend::Linear(fit) => &fit.equation,
            Trend::Logarithmic(fit) => &fit.equation,
            Trend::Exponential(fit) => &fit.equation,
            Trend::Polynomial(fit) => &fit.equation,
        }
    }

    pub fn r_squared(&self) -> f64 {
        match self {
            Trend::Linear(fit) => fit.r_squared,
            Trend::Logarithmic(fit) => fit.r_squared,
            Trend::Exponential(fit) => fit.r_squared,
            Trend::Polynomial(fit) => fit.r_squared,
        }
    }
}

pub fn fit_trend(kind: TrendKind, points: &[Point]) -> Result<Trend, RegressionError> {
    Ok(match kind {
        TrendKind::Linear => Trend::Linear(regression::linear_regression(points)?),
        TrendKind::Logarithmic => Trend::Logarithmic(regression::logarithmic(points)?),
        TrendKind::Exponential => Trend::Exponential(regression::exponential(points)?),
        TrendKind::Polynomial(degree) => Trend::Polynomial(regression::polynomial(points, degree)?),
    })
}

/// Numbers as-is; numeric text (every CSV cell) parsed.
fn label_number(value: &LabelValue) -> Option<f64> {
    match value {
        LabelValue::Number(n) => Some(*n),
        LabelValue::Text(s) => parse_number(s),
    }
}

fn label_date(value: &LabelValue) -> Option<f64> {
    match value {
        LabelValue::Text(s) => parse_date(s).ok(),
        LabelValue::Number(_) => None,
    }
}

type RawPoint<'d> = (Option<&'d LabelValue>, Option<f64>);

fn raw_points(dataset: &Dataset) -> impl Iterator<Item = RawPoint<'_>> + '_ {
    dataset
        .data
        .iter()
        .enumerate()
        .map(move |(i, y)| (dataset.label.get(i).and_then(|l| l.first()).map(|kv| &kv.value), *y))
}

/// x comes from the first label value of each point: numbers (or numeric
/// text) as-is, ISO dates as epoch milliseconds, anything else falls back
/// to the point's position in the series. Null points are dropped.
fn to_points(raw: &[RawPoint<'_>]) -> Vec<Point> {
    let all = |f: fn(&LabelValue) -> Option<f64>| -> Option<Vec<f64>> {
        raw.iter().map(|(label, _)| label.and_then(f)).collect()
    };
    let xs = all(label_number)
        .or_else(|| all(label_date))
        .unwrap_or_else(|| (0..raw.len()).map(|i| i as f64).collect());

    xs.into_iter()
        .zip(raw)
        .filter_map(|(x, (_, y))| y.map(|y| Point::new(x, y)))
        .collect()
}

/// Derive an `{x, y}` series by pooling every dataset carrying `data_key`.
///
/// Suited to aggregated output, where each dataset is a single point.
pub fn series_points(datasets: &[Dataset], data_key: &str) -> Vec<Point> {
    let raw: Vec<RawPoint<'_>> = datasets
        .iter()
        .filter(|d| d.data_key == data_key)
        .flat_map(raw_points)
        .collect();
    to_points(&raw)
}

/// Derive an `{x, y}` series from one dataset.
pub fn dataset_points(dataset: &Dataset) -> Vec<Point> {
    let raw: Vec<RawPoint<'_>> = raw_points(dataset).collect();
    to_points(&raw)
}

/// The series an overlay was fitted to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesKey {
    pub data_key: String,
    /// Category pairs of a split scatter series; empty otherwise.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<KeyValue>,
}

impl SeriesKey {
    fn metric(data_key: &str) -> Self {
        Self {
            data_key: data_key.to_string(),
            category: Vec::new(),
        }
    }
}

/// Fit one overlay per series.
///
/// Scatter datasets are fitted one by one, keyed by metric and category.
/// Aggregated datasets hold one point each, so all datasets of a metric are
/// pooled along the x columns. Aggregation split by `category` labels its
/// points with category values rather than x, and gets no overlay.
pub fn fit_overlays(
    datasets: &[Dataset],
    encoding: &AxisEncoding,
    kind: TrendKind,
) -> Vec<(SeriesKey, Result<Trend, RegressionError>)> {
    match encoding.mode() {
        ChartMode::Scatter => datasets
            .iter()
            .map(|d| {
                // Category pairs always lead each tooltip.
                let category: Vec<KeyValue> = d
                    .tooltip_data
                    .first()
                    .map(|tip| tip.iter().take(encoding.category.len()).cloned().collect())
                    .unwrap_or_default();
                let key = SeriesKey {
                    data_key: d.data_key.clone(),
                    category,
                };
                (key, fit_trend(kind, &dataset_points(d)))
            })
            .collect(),
        ChartMode::Aggregate if !encoding.category.is_empty() => {
            debug!("aggregated categories carry no x; skipping trend overlays");
            Vec::new()
        }
        ChartMode::Aggregate => {
            let keys: IndexSet<&str> = datasets.iter().map(|d| d.data_key.as_str()).collect();
            keys.into_iter()
                .map(|key| (SeriesKey::metric(key), fit_trend(kind, &series_points(datasets, key))))
                .collect()
        }
    }
}
