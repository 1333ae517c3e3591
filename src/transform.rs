use crate::coerce::{resolve, resolve_number, resolved_label, Resolved};
use crate::data::{cell, Row};
use crate::dataset::{Dataset, KeyValue, LabelValue};
use crate::encoding::{AxisEncoding, ChartMode, ColumnFormats, Metric};
use crate::grouping::{group_rows, project, Combination, Group};
use crate::tooltip::TooltipAssembler;
use tracing::{debug, trace};

/// Main entry point: turn query rows and an axis encoding into renderable datasets.
///
/// Pure and infallible. Identical inputs always give identical output,
/// including dataset order.
pub fn build_datasets(rows: &[Row], encoding: &AxisEncoding, formats: &ColumnFormats) -> Vec<Dataset> {
    let mode = encoding.mode();
    debug!(?mode, rows = rows.len(), "building datasets");

    let datasets = match mode {
        ChartMode::Aggregate => aggregate_datasets(rows, encoding, formats),
        ChartMode::Scatter => scatter_datasets(rows, encoding, formats),
    };

    debug!(datasets = datasets.len(), "datasets built");
    datasets
}

/// Sum resolved cells. A single null contribution nulls the whole group.
fn sum_group<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Resolved>,
{
    let mut total = 0.0;
    for value in values {
        total += value.as_number()?;
    }
    Some(total)
}

fn point_label(value: Option<f64>) -> LabelValue {
    match value {
        Some(n) => LabelValue::Number(n),
        None => LabelValue::Text(String::new()),
    }
}

/// One single-point dataset per (metric, dimension-combination).
///
/// Dimensions are the `category` columns when set, otherwise the `x` columns.
/// Metrics form the outer loop, combinations the inner loop.
pub fn aggregate_datasets(rows: &[Row], encoding: &AxisEncoding, formats: &ColumnFormats) -> Vec<Dataset> {
    let dimensions = if encoding.category.is_empty() {
        &encoding.x
    } else {
        &encoding.category
    };

    let groups = group_rows(rows, dimensions);
    trace!(combinations = groups.len(), "aggregate dimensions enumerated");

    let tooltips = TooltipAssembler::new(encoding, formats);
    let metrics = encoding.metrics();
    let mut datasets = Vec::with_capacity(metrics.len() * groups.len());

    for metric in &metrics {
        let replacement = formats.replacement(metric.column);

        for group in &groups {
            // Groups come from the rows themselves, so this never skips.
            let Some(first) = group.rows.first() else { continue };

            let value = sum_group(
                group
                    .rows
                    .iter()
                    .map(|row| resolve(cell(row, metric.column), &replacement)),
            );
            let tooltip = tooltips.assemble(first, metric.column, point_label(value), None);

            datasets.push(Dataset {
                label: vec![group.combination.values.clone()],
                data: vec![value],
                data_key: metric.column.to_string(),
                axis_type: metric.axis,
                tooltip_data: vec![tooltip],
                size_data: None,
            });
        }
    }

    datasets
}

/// Rows sharing one category combination, in row order.
struct ScatterGroup<'r> {
    category: Option<Combination>,
    members: Vec<&'r Row>,
}

fn scatter_groups<'r>(rows: &'r [Row], categories: &[String]) -> Vec<ScatterGroup<'r>> {
    if categories.is_empty() {
        return vec![ScatterGroup {
            category: None,
            members: rows.iter().collect(),
        }];
    }

    group_rows(rows, categories)
        .into_iter()
        .map(|Group { combination, rows }| ScatterGroup {
            category: Some(combination),
            members: rows,
        })
        .collect()
}

fn scatter_dataset(
    group: &ScatterGroup<'_>,
    metric: &Metric<'_>,
    encoding: &AxisEncoding,
    formats: &ColumnFormats,
    tooltips: &TooltipAssembler<'_>,
) -> Dataset {
    let replacement = formats.replacement(metric.column);
    let category: Option<&[KeyValue]> = group.category.as_ref().map(|c| c.values.as_slice());

    let mut label = Vec::with_capacity(group.members.len());
    let mut data = Vec::with_capacity(group.members.len());
    let mut tooltip_data = Vec::with_capacity(group.members.len());

    for row in &group.members {
        let resolved = resolve(cell(row, metric.column), &replacement);
        label.push(project(&encoding.x, row));
        data.push(resolved.as_number());
        tooltip_data.push(tooltips.assemble(row, metric.column, resolved_label(resolved), category));
    }

    let size_data = encoding.size_column().map(|column| {
        let size_replacement = formats.replacement(column);
        group
            .members
            .iter()
            .map(|row| resolve_number(cell(row, column), &size_replacement))
            .collect()
    });

    Dataset {
        label,
        data,
        data_key: metric.column.to_string(),
        axis_type: metric.axis,
        tooltip_data,
        size_data,
    }
}

/// One dataset per (metric, category-combination), one point per row.
pub fn scatter_datasets(rows: &[Row], encoding: &AxisEncoding, formats: &ColumnFormats) -> Vec<Dataset> {
    let groups = scatter_groups(rows, &encoding.category);
    trace!(groups = groups.len(), "scatter groups enumerated");

    let tooltips = TooltipAssembler::new(encoding, formats);
    let metrics = encoding.metrics();
    let mut datasets = Vec::with_capacity(metrics.len() * groups.len());

    for metric in &metrics {
        for group in &groups {
            datasets.push(scatter_dataset(group, metric, encoding, formats, &tooltips));
        }
    }

    datasets
}
