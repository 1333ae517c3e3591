// Library exports for chartset

pub mod coerce;
pub mod data;
pub mod dataset;
pub mod encoding;
pub mod grouping;
pub mod regression;
pub mod tooltip;
pub mod transform;
pub mod trend;

pub use data::{Cell, Row, RowSet};
pub use dataset::{Dataset, KeyValue, LabelValue};
pub use encoding::{AxisEncoding, AxisType, ChartConfig, ChartMode, ColumnFormat, ColumnFormats, Replacement};
pub use regression::{Point, RegressionError};
pub use transform::build_datasets;
pub use trend::{dataset_points, fit_overlays, fit_trend, series_points, SeriesKey, Trend, TrendKind};
