use indexmap::IndexSet;
use serde::de::{Deserializer, Error as DeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Which of the two value axes a metric is plotted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    Y,
    Y2,
}

/// Declarative mapping of column names onto chart roles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisEncoding {
    pub x: Vec<String>,
    pub y: Vec<String>,
    #[serde(default)]
    pub y2: Vec<String>,
    /// Only the first entry is honored.
    #[serde(default)]
    pub size: Vec<String>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub tooltip: Option<Vec<String>>,
    #[serde(default)]
    pub scatter_plot: bool,
}

/// A value column together with the axis it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metric<'a> {
    pub column: &'a str,
    pub axis: AxisType,
}

/// Selected once at the top of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartMode {
    /// Rows are summed per dimension-combination.
    Aggregate,
    /// Every row becomes one point.
    Scatter,
}

#[derive(Error, Debug, PartialEq)]
pub enum EncodingError {
    #[error("Axis encoding role `{0}` must name at least one column")]
    EmptyRole(&'static str),

    #[error("Column `{column}` used as `{role}` is not present in the data")]
    UnknownColumn { role: &'static str, column: String },
}

impl AxisEncoding {
    pub fn new<S: Into<String>>(x: impl IntoIterator<Item = S>, y: impl IntoIterator<Item = S>) -> Self {
        Self {
            x: x.into_iter().map(Into::into).collect(),
            y: y.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn mode(&self) -> ChartMode {
        if self.scatter_plot {
            ChartMode::Scatter
        } else {
            ChartMode::Aggregate
        }
    }

    /// `y` metrics in declared order, followed by `y2` metrics.
    pub fn metrics(&self) -> Vec<Metric<'_>> {
        let primary = self.y.iter().map(|c| Metric { column: c, axis: AxisType::Y });
        let secondary = self.y2.iter().map(|c| Metric { column: c, axis: AxisType::Y2 });
        primary.chain(secondary).collect()
    }

    pub fn size_column(&self) -> Option<&str> {
        self.size.first().map(String::as_str)
    }

    /// Explicit tooltip fields; an empty list counts as none.
    pub fn tooltip_fields(&self) -> Option<&[String]> {
        self.tooltip.as_deref().filter(|fields| !fields.is_empty())
    }

    /// Check the encoding against the column names actually present in the rows.
    /// Done at the boundary so the engine itself never has to.
    pub fn validate(&self, columns: &IndexSet<String>) -> Result<(), EncodingError> {
        if self.x.is_empty() {
            return Err(EncodingError::EmptyRole("x"));
        }
        if self.y.is_empty() {
            return Err(EncodingError::EmptyRole("y"));
        }

        let tooltip: &[String] = self.tooltip.as_deref().unwrap_or(&[]);
        let roles: [(&'static str, &[String]); 6] = [
            ("x", &self.x),
            ("y", &self.y),
            ("y2", &self.y2),
            ("size", &self.size[..self.size.len().min(1)]),
            ("category", &self.category),
            ("tooltip", tooltip),
        ];
        for (role, names) in roles {
            if let Some(column) = names.iter().find(|c| !columns.contains(*c)) {
                return Err(EncodingError::UnknownColumn {
                    role,
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }
}

/// What a missing cell is replaced with.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    /// Explicit "no data": the point is null rather than zero.
    Null,
    Number(f64),
    Text(String),
}

impl Default for Replacement {
    fn default() -> Self {
        Replacement::Number(0.0)
    }
}

impl Serialize for Replacement {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Replacement::Null => serializer.serialize_none(),
            Replacement::Number(n) => serializer.serialize_f64(*n),
            Replacement::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Per-column label format. Only the missing-data policy matters here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFormat {
    /// `None` when the key is absent; `Some(Replacement::Null)` for an explicit JSON null.
    #[serde(default, deserialize_with = "deserialize_replacement", skip_serializing_if = "Option::is_none")]
    pub replace_missing_data_with: Option<Replacement>,
}

impl ColumnFormat {
    pub fn with_replacement(replacement: Replacement) -> Self {
        Self {
            replace_missing_data_with: Some(replacement),
        }
    }

    pub fn replacement(&self) -> Replacement {
        self.replace_missing_data_with.clone().unwrap_or_default()
    }
}

fn deserialize_replacement<'de, D>(deserializer: D) -> Result<Option<Replacement>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let replacement = match value {
        Value::Null => Replacement::Null,
        Value::Number(n) => Replacement::Number(
            n.as_f64()
                .ok_or_else(|| D::Error::custom("replaceMissingDataWith number out of range"))?,
        ),
        Value::String(s) => Replacement::Text(s),
        other => {
            return Err(D::Error::custom(format!(
                "replaceMissingDataWith must be a number, string or null, got {}",
                other
            )))
        }
    };
    Ok(Some(replacement))
}

/// Column name to format lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnFormats(HashMap<String, ColumnFormat>);

impl ColumnFormats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, format: ColumnFormat) -> Self {
        self.0.insert(column.into(), format);
        self
    }

    /// Replacement policy for a column, defaulting to the literal `0`.
    pub fn replacement(&self, column: &str) -> Replacement {
        self.0
            .get(column)
            .map(ColumnFormat::replacement)
            .unwrap_or_default()
    }
}

/// Everything the engine needs besides the rows themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub encoding: AxisEncoding,
    #[serde(default)]
    pub column_formats: ColumnFormats,
}
