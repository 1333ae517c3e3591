use crate::encoding::AxisType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value half of a label or tooltip pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    Number(f64),
    Text(String),
}

impl LabelValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            LabelValue::Number(n) => Some(*n),
            LabelValue::Text(_) => None,
        }
    }
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelValue::Number(n) => write!(f, "{}", n),
            LabelValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for LabelValue {
    fn from(value: f64) -> Self {
        LabelValue::Number(value)
    }
}

impl From<&str> for LabelValue {
    fn from(value: &str) -> Self {
        LabelValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: LabelValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<LabelValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One series handed to the chart renderer.
///
/// `label`, `data`, `tooltip_data` and `size_data` (when present) are
/// index-aligned: entry `i` of each describes point `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: Vec<Vec<KeyValue>>,
    pub data: Vec<Option<f64>>,
    /// Metric column that produced this series.
    pub data_key: String,
    pub axis_type: AxisType,
    pub tooltip_data: Vec<Vec<KeyValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_data: Option<Vec<Option<f64>>>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when every per-point array has the same length.
    pub fn is_aligned(&self) -> bool {
        let n = self.data.len();
        self.label.len() == n
            && self.tooltip_data.len() == n
            && self.size_data.as_ref().map_or(true, |s| s.len() == n)
    }
}
