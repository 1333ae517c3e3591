use crate::coerce::tooltip_value;
use crate::data::{cell, Row};
use crate::dataset::{KeyValue, LabelValue};
use crate::encoding::{AxisEncoding, ColumnFormats};

/// Builds the per-point tooltip payload.
#[derive(Debug, Clone, Copy)]
pub struct TooltipAssembler<'a> {
    fields: Option<&'a [String]>,
    formats: &'a ColumnFormats,
}

impl<'a> TooltipAssembler<'a> {
    pub fn new(encoding: &'a AxisEncoding, formats: &'a ColumnFormats) -> Self {
        Self {
            fields: encoding.tooltip_fields(),
            formats,
        }
    }

    /// Tooltip entries for one point.
    ///
    /// With explicit fields configured, each field is read from `row`.
    /// Otherwise the entry is just the metric and its value. `category`
    /// pairs, when given, always come first.
    pub fn assemble(
        &self,
        row: &Row,
        metric: &str,
        metric_value: LabelValue,
        category: Option<&[KeyValue]>,
    ) -> Vec<KeyValue> {
        let mut entries: Vec<KeyValue> = category.map(<[KeyValue]>::to_vec).unwrap_or_default();
        match self.fields {
            Some(fields) => entries.extend(fields.iter().map(|field| KeyValue {
                key: field.clone(),
                value: tooltip_value(cell(row, field), &self.formats.replacement(field)),
            })),
            None => entries.push(KeyValue {
                key: metric.to_string(),
                value: metric_value,
            }),
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Cell;
    use crate::encoding::{ColumnFormat, Replacement};

    fn sample_row() -> Row {
        [
            ("region".to_string(), Cell::from("North")),
            ("sales".to_string(), Cell::from(100.0)),
            ("notes".to_string(), Cell::Null),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_fallback_to_metric() {
        let enc = AxisEncoding::new(["region"], ["sales"]);
        let formats = ColumnFormats::new();
        let tips = TooltipAssembler::new(&enc, &formats);
        let entries = tips.assemble(&sample_row(), "sales", LabelValue::Number(100.0), None);
        assert_eq!(entries, vec![KeyValue::new("sales", 100.0)]);
    }

    #[test]
    fn test_explicit_fields() {
        let mut enc = AxisEncoding::new(["region"], ["sales"]);
        enc.tooltip = Some(vec!["region".to_string(), "notes".to_string()]);
        let formats = ColumnFormats::new().with("notes", ColumnFormat::with_replacement(Replacement::Null));
        let tips = TooltipAssembler::new(&enc, &formats);
        let entries = tips.assemble(&sample_row(), "sales", LabelValue::Number(100.0), None);
        assert_eq!(
            entries,
            vec![KeyValue::new("region", "North"), KeyValue::new("notes", "")]
        );
    }

    #[test]
    fn test_category_prefix() {
        let enc = AxisEncoding::new(["region"], ["sales"]);
        let formats = ColumnFormats::new();
        let tips = TooltipAssembler::new(&enc, &formats);
        let category = vec![KeyValue::new("segment", "Retail")];
        let entries = tips.assemble(&sample_row(), "sales", LabelValue::Number(1.0), Some(&category));
        assert_eq!(
            entries,
            vec![KeyValue::new("segment", "Retail"), KeyValue::new("sales", 1.0)]
        );
    }
}
