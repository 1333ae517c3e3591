use anyhow::{Context, Result};
use chartset::{build_datasets, fit_overlays, AxisEncoding, ChartConfig, Dataset, RowSet, SeriesKey, Trend, TrendKind};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TrendArg {
    Linear,
    Logarithmic,
    Exponential,
    Polynomial,
}

#[derive(Parser, Debug)]
#[command(name = "chartset")]
#[command(about = "Turn query rows into chart datasets and trend overlays", long_about = None)]
struct Args {
    /// Chart config JSON: {"encoding": {...}, "columnFormats": {...}}
    #[arg(short, long)]
    config: PathBuf,

    /// Row data file (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = InputFormat::Json)]
    format: InputFormat,

    /// Fit a trend overlay for every series
    #[arg(short, long, value_enum)]
    trend: Option<TrendArg>,

    /// Polynomial degree (1 or 2, default 2); only read by `--trend polynomial`
    #[arg(long, requires = "trend")]
    degree: Option<usize>,

    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendOutput {
    #[serde(flatten)]
    series: SeriesKey,
    #[serde(flatten)]
    trend: Trend,
}

#[derive(Serialize)]
struct Output {
    datasets: Vec<Dataset>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    trends: Vec<TrendOutput>,
}

fn read_rows(args: &Args) -> Result<RowSet> {
    let reader: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    match args.format {
        InputFormat::Csv => RowSet::from_csv(reader),
        InputFormat::Json => {
            let value: serde_json::Value =
                serde_json::from_reader(reader).context("Failed to parse JSON rows")?;
            RowSet::from_json(&value)
        }
    }
}

/// Fit one overlay per series; failures drop that overlay only.
fn fit_trends(datasets: &[Dataset], encoding: &AxisEncoding, kind: TrendKind) -> Vec<TrendOutput> {
    fit_overlays(datasets, encoding, kind)
        .into_iter()
        .filter_map(|(series, fitted)| match fitted {
            Ok(trend) => Some(TrendOutput { series, trend }),
            Err(e) => {
                let category: Vec<String> = series
                    .category
                    .iter()
                    .map(|kv| format!("{}={}", kv.key, kv.value))
                    .collect();
                tracing::warn!(
                    data_key = %series.data_key,
                    category = %category.join(","),
                    error = %e,
                    "omitting trend overlay"
                );
                None
            }
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config_text = fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read config {}", args.config.display()))?;
    let config: ChartConfig =
        serde_json::from_str(&config_text).context("Failed to parse chart config")?;

    let rows = read_rows(&args).context("Failed to read rows")?;
    config
        .encoding
        .validate(&rows.columns)
        .context("Axis encoding does not match the data")?;

    let datasets = build_datasets(&rows.rows, &config.encoding, &config.column_formats);

    let trends = match args.trend {
        Some(arg) => {
            let kind = match arg {
                TrendArg::Linear => TrendKind::Linear,
                TrendArg::Logarithmic => TrendKind::Logarithmic,
                TrendArg::Exponential => TrendKind::Exponential,
                TrendArg::Polynomial => TrendKind::Polynomial(args.degree.unwrap_or(2)),
            };
            fit_trends(&datasets, &config.encoding, kind)
        }
        None => Vec::new(),
    };

    let output = Output { datasets, trends };
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.pretty {
        serde_json::to_writer_pretty(&mut handle, &output)
    } else {
        serde_json::to_writer(&mut handle, &output)
    }
    .context("Failed to write datasets to stdout")?;
    writeln!(handle).context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
