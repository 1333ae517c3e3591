use chartset::grouping::unique_combinations;
use chartset::regression::{exponential, Point};
use chartset::regression::{linear_regression, polynomial};
use chartset::{
    build_datasets, dataset_points, fit_overlays, fit_trend, series_points, AxisEncoding, ColumnFormat,
    ColumnFormats, KeyValue, Replacement, Row, RowSet, TrendKind,
};
use serde_json::json;
use std::f64::consts::E;

fn rows(value: serde_json::Value) -> Vec<Row> {
    serde_json::from_value(value).expect("rows fixture")
}

fn orders() -> Vec<Row> {
    rows(json!([
        {"month": "Jan", "region": "North", "segment": "Retail", "sales": 100, "units": 3},
        {"month": "Jan", "region": "South", "segment": "Retail", "sales": 80, "units": 1},
        {"month": "Feb", "region": "North", "segment": "Online", "sales": 120, "units": 4},
        {"month": "Feb", "region": "South", "segment": "Retail", "sales": null, "units": 2},
        {"month": "Mar", "region": "North", "segment": "Online", "sales": "95", "units": null}
    ]))
}

#[test]
fn test_sum_correctness() {
    let data = rows(json!([
        {"region": "North", "sales": 100},
        {"region": "North", "sales": 150},
        {"region": "South", "sales": 200}
    ]));
    let enc = AxisEncoding::new(["region"], ["sales"]);
    let datasets = build_datasets(&data, &enc, &ColumnFormats::new());

    let north = datasets
        .iter()
        .find(|d| d.label[0][0] == KeyValue::new("region", "North"))
        .unwrap();
    let south = datasets
        .iter()
        .find(|d| d.label[0][0] == KeyValue::new("region", "South"))
        .unwrap();
    assert_eq!(north.data, vec![Some(250.0)]);
    assert_eq!(south.data, vec![Some(200.0)]);
}

#[test]
fn test_aggregate_cardinality_and_alignment() {
    let data = orders();
    let mut enc = AxisEncoding::new(["month", "region"], ["sales"]);
    enc.y2 = vec!["units".to_string()];
    let datasets = build_datasets(&data, &enc, &ColumnFormats::new());

    let combos = unique_combinations(&data, &enc.x);
    assert_eq!(combos.len(), 5);
    assert_eq!(datasets.len(), 2 * combos.len());
    for d in &datasets {
        assert!(d.is_aligned());
        assert_eq!(d.len(), 1);
        assert_eq!(d.label[0].len(), 2);
    }
}

#[test]
fn test_aggregate_repeats_combination_order_across_metrics() {
    let mut enc = AxisEncoding::new(["region"], ["sales"]);
    enc.y2 = vec!["units".to_string()];
    let datasets = build_datasets(&orders(), &enc, &ColumnFormats::new());

    let labels: Vec<_> = datasets.iter().map(|d| d.label.clone()).collect();
    assert_eq!(labels[0], labels[2]);
    assert_eq!(labels[1], labels[3]);
}

#[test]
fn test_scatter_cardinality() {
    let data = orders();
    let mut enc = AxisEncoding::new(["month"], ["sales", "units"]);
    enc.scatter_plot = true;
    enc.category = vec!["segment".to_string()];
    let datasets = build_datasets(&data, &enc, &ColumnFormats::new());

    // two metrics x two segments
    assert_eq!(datasets.len(), 4);
    assert_eq!(datasets[0].len(), 3);
    assert_eq!(datasets[1].len(), 2);
    assert!(datasets.iter().all(|d| d.is_aligned()));

    enc.category.clear();
    let flat = build_datasets(&data, &enc, &ColumnFormats::new());
    assert_eq!(flat.len(), 2);
    assert!(flat.iter().all(|d| d.len() == data.len()));
}

#[test]
fn test_missing_data_substitution_in_scatter() {
    let data = rows(json!([
        {"x": 1, "y": 100},
        {"x": 2, "y": null},
        {"x": 3}
    ]));
    let mut enc = AxisEncoding::new(["x"], ["y"]);
    enc.scatter_plot = true;
    let formats = ColumnFormats::new().with("y", ColumnFormat::with_replacement(Replacement::Number(0.0)));
    let datasets = build_datasets(&data, &enc, &formats);
    assert_eq!(datasets[0].data, vec![Some(100.0), Some(0.0), Some(0.0)]);
}

#[test]
fn test_tooltip_fallback_is_metric_value() {
    let mut enc = AxisEncoding::new(["month"], ["sales"]);
    enc.scatter_plot = true;
    let datasets = build_datasets(&orders(), &enc, &ColumnFormats::new());

    let d = &datasets[0];
    for (i, tip) in d.tooltip_data.iter().enumerate() {
        let value = d.data[i].unwrap();
        assert_eq!(tip, &vec![KeyValue::new("sales", value)]);
    }
}

#[test]
fn test_text_numbers_are_coerced() {
    let mut enc = AxisEncoding::new(["region"], ["sales"]);
    enc.category = vec!["segment".to_string()];
    let datasets = build_datasets(&orders(), &enc, &ColumnFormats::new());
    // Retail: 100 + 80 + (null -> 0); Online: 120 + "95"
    assert_eq!(datasets[0].data, vec![Some(180.0)]);
    assert_eq!(datasets[1].data, vec![Some(215.0)]);
}

#[test]
fn test_enumerator_determinism() {
    let data = orders();
    let columns = vec!["segment".to_string(), "region".to_string()];
    let first = unique_combinations(&data, &columns);
    let second = unique_combinations(&data, &columns);
    assert_eq!(first, second);
    assert_eq!(first[0].values[0], KeyValue::new("segment", "Retail"));
    assert_eq!(first[0].values[1], KeyValue::new("region", "North"));
}

#[test]
fn test_exponential_round_trip() {
    let points: Vec<Point> = (0..4).map(|i| Point::new(i as f64, 2.0 * E.powi(i))).collect();
    let fit = exponential(&points).unwrap();
    assert!((fit.a - 2.0).abs() < 0.1);
    assert!((fit.b - 1.0).abs() < 0.1);
    let expected = 2.0 * E.powi(4);
    assert!((fit.predict(4.0) - expected).abs() / expected < 0.01);
}

#[test]
fn test_exponential_precondition_names_positive() {
    let points = vec![Point::new(0.0, 1.0), Point::new(1.0, -1.0), Point::new(2.0, 3.0)];
    let err = exponential(&points).unwrap_err();
    assert!(err.to_string().contains("positive"));
}

#[test]
fn test_trend_over_scatter_series() {
    let data = rows(json!([
        {"t": 1, "v": 3},
        {"t": 2, "v": 5},
        {"t": 3, "v": null},
        {"t": 4, "v": 9}
    ]));
    let mut enc = AxisEncoding::new(["t"], ["v"]);
    enc.scatter_plot = true;
    let formats = ColumnFormats::new().with("v", ColumnFormat::with_replacement(Replacement::Null));
    let datasets = build_datasets(&data, &enc, &formats);

    let points = series_points(&datasets, "v");
    assert_eq!(points.len(), 3);
    let trend = fit_trend(TrendKind::Linear, &points).unwrap();
    assert!((trend.predict(5.0) - 11.0).abs() < 1e-9);
}

#[test]
fn test_trend_over_csv_scatter_uses_real_x() {
    let csv = "t,v\n10,1\n20,2\n40,4\n";
    let set = RowSet::from_csv(csv.as_bytes()).unwrap();
    let mut enc = AxisEncoding::new(["t"], ["v"]);
    enc.scatter_plot = true;
    let datasets = build_datasets(&set.rows, &enc, &ColumnFormats::new());

    let expected = vec![Point::new(10.0, 1.0), Point::new(20.0, 2.0), Point::new(40.0, 4.0)];
    assert_eq!(series_points(&datasets, "v"), expected);
    assert_eq!(dataset_points(&datasets[0]), expected);

    let trend = fit_trend(TrendKind::Linear, &expected).unwrap();
    assert!((trend.predict(50.0) - 5.0).abs() < 1e-9);
}

#[test]
fn test_trend_over_csv_aggregate_with_epoch_seconds() {
    let csv = "ts,v\n1700000000,3\n1700000001,5\n1700000002,7\n1700000001,0\n";
    let set = RowSet::from_csv(csv.as_bytes()).unwrap();
    let enc = AxisEncoding::new(["ts"], ["v"]);
    let datasets = build_datasets(&set.rows, &enc, &ColumnFormats::new());
    assert_eq!(datasets.len(), 3);

    let points = series_points(&datasets, "v");
    assert_eq!(points[0].x, 1.7e9);
    let fit = linear_regression(&points).unwrap();
    assert!((fit.slope - 2.0).abs() < 1e-9);

    let quadratic = polynomial(&points, 2).unwrap();
    assert!((quadratic.predict(1.7e9 + 3.0) - 9.0).abs() < 1e-6);
}

#[test]
fn test_scatter_trends_fit_each_category_separately() {
    let data = rows(json!([
        {"t": 0, "cohort": "a", "v": 1},
        {"t": 0, "cohort": "b", "v": 50},
        {"t": 1, "cohort": "a", "v": 4},
        {"t": 1, "cohort": "b", "v": 45},
        {"t": 2, "cohort": "a", "v": 7},
        {"t": 2, "cohort": "b", "v": 40}
    ]));
    let mut enc = AxisEncoding::new(["t"], ["v"]);
    enc.scatter_plot = true;
    enc.category = vec!["cohort".to_string()];
    let datasets = build_datasets(&data, &enc, &ColumnFormats::new());

    let overlays = fit_overlays(&datasets, &enc, TrendKind::Linear);
    assert_eq!(overlays.len(), 2);
    let slopes: Vec<(KeyValue, f64)> = overlays
        .iter()
        .map(|(key, trend)| {
            let trend = trend.as_ref().unwrap();
            (key.category[0].clone(), trend.predict(1.0) - trend.predict(0.0))
        })
        .collect();
    assert_eq!(slopes[0].0, KeyValue::new("cohort", "a"));
    assert!((slopes[0].1 - 3.0).abs() < 1e-9);
    assert_eq!(slopes[1].0, KeyValue::new("cohort", "b"));
    assert!((slopes[1].1 + 5.0).abs() < 1e-9);
}
