//! Trend-line fitters.
//!
//! Every fitter is pure and strict: invalid numeric preconditions produce a
//! [`RegressionError`] instead of a degraded fit, so callers can drop the
//! overlay rather than draw a misleading line.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

pub const MS_PER_DAY: f64 = 86_400_000.0;

/// Normalized x spans larger than this are rescaled before exponential fits.
const RESCALE_THRESHOLD: f64 = 1_000.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegressionError {
    #[error("{model} regression requires at least {required} points, got {actual}")]
    InsufficientData {
        model: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Exponential regression requires all y values to be positive")]
    NonPositiveValues,

    #[error("{0} regression is degenerate: x values have no spread (zero denominator)")]
    Degenerate(&'static str),

    #[error("Logarithmic regression has no points at or after the first x value")]
    NoPointsAfterFilter,

    #[error("Polynomial degree must be 1 or 2, got {0}")]
    UnsupportedDegree(usize),

    #[error("Got {values} values but {dates} dates")]
    LengthMismatch { values: usize, dates: usize },

    #[error("Could not parse `{0}` as a date")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, RegressionError>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

fn require_points(model: &'static str, actual: usize, required: usize) -> Result<()> {
    if actual < required {
        return Err(RegressionError::InsufficientData {
            model,
            required,
            actual,
        });
    }
    Ok(())
}

/// Ordinary least squares, returning `(slope, intercept)`.
///
/// Uses centered sums so large x values (epoch milliseconds) keep their precision.
fn ols(model: &'static str, xs: &[f64], ys: &[f64]) -> Result<(f64, f64)> {
    if xs.is_empty() {
        return Err(RegressionError::InsufficientData {
            model,
            required: 2,
            actual: 0,
        });
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();

    // Identical x can still leave a nonzero sxx when the mean rounds.
    let spread = xs.iter().any(|x| *x != xs[0]);
    if !spread || sxx == 0.0 || !sxx.is_finite() {
        return Err(RegressionError::Degenerate(model));
    }

    let slope = sxy / sxx;
    Ok((slope, mean_y - slope * mean_x))
}

/// Coefficient of determination of `fitted` against `ys`.
fn r_squared(ys: &[f64], fitted: &[f64]) -> f64 {
    let n = ys.len() as f64;
    let mean = ys.iter().sum::<f64>() / n;
    let ss_tot: f64 = ys.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = ys.iter().zip(fitted).map(|(y, f)| (y - f).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

fn signed(value: f64) -> String {
    if value < 0.0 {
        format!("- {:.4}", value.abs())
    } else {
        format!("+ {:.4}", value)
    }
}

/// Shift x by `origin` and divide by `unit`. y is untouched.
pub fn normalize(points: &[Point], origin: f64, unit: f64) -> Vec<Point> {
    points
        .iter()
        .map(|p| Point::new((p.x - origin) / unit, p.y))
        .collect()
}

/// Divide x by its largest magnitude when that exceeds the stability
/// threshold. Returns the scaled points and the divisor used (1.0 when untouched).
pub fn rescale(points: &[Point]) -> (Vec<Point>, f64) {
    let max_abs = points.iter().fold(0.0f64, |acc, p| acc.max(p.x.abs()));
    if max_abs <= RESCALE_THRESHOLD {
        return (points.to_vec(), 1.0);
    }
    let scaled = points.iter().map(|p| Point::new(p.x / max_abs, p.y)).collect();
    (scaled, max_abs)
}

/// Parse an ISO-8601 date or date-time into epoch milliseconds (UTC when no
/// offset is given).
pub fn parse_date(input: &str) -> Result<f64> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis() as f64);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc().timestamp_millis() as f64);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis() as f64)
        .ok_or_else(|| RegressionError::InvalidDate(input.to_string()))
}

// =============================================================================
// Linear
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Fitted value for each input point, in input order.
    pub slope_data: Vec<f64>,
    pub equation: String,
}

impl LinearFit {
    fn from_xy(model: &'static str, xs: &[f64], ys: &[f64]) -> Result<Self> {
        require_points(model, xs.len(), 2)?;
        let (slope, intercept) = ols(model, xs, ys)?;
        let slope_data: Vec<f64> = xs.iter().map(|x| slope * x + intercept).collect();
        Ok(Self {
            slope,
            intercept,
            r_squared: r_squared(ys, &slope_data),
            equation: format!("y = {:.4}x {}", slope, signed(intercept)),
            slope_data,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Least squares with the array index as x.
pub fn linear_by_index(values: &[f64]) -> Result<LinearFit> {
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    LinearFit::from_xy("Linear", &xs, values)
}

/// Least squares over explicit x values.
pub fn linear_regression(points: &[Point]) -> Result<LinearFit> {
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    LinearFit::from_xy("Linear", &xs, &ys)
}

/// Linear fit over date-valued x.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateLinearFit {
    /// Change per millisecond.
    pub slope: f64,
    /// Value at the Unix epoch.
    pub intercept: f64,
    pub change_per_day: f64,
    pub r_squared: f64,
    pub slope_data: Vec<f64>,
    pub equation: String,
}

impl DateLinearFit {
    pub fn predict_millis(&self, millis: f64) -> f64 {
        self.slope * millis + self.intercept
    }

    pub fn predict(&self, date: &str) -> Result<f64> {
        Ok(self.predict_millis(parse_date(date)?))
    }
}

pub fn linear_by_date<S: AsRef<str>>(values: &[f64], dates: &[S]) -> Result<DateLinearFit> {
    if values.len() != dates.len() {
        return Err(RegressionError::LengthMismatch {
            values: values.len(),
            dates: dates.len(),
        });
    }
    let xs = dates
        .iter()
        .map(|d| parse_date(d.as_ref()))
        .collect::<Result<Vec<f64>>>()?;

    let fit = LinearFit::from_xy("Linear", &xs, values)?;
    let change_per_day = fit.slope * MS_PER_DAY;
    Ok(DateLinearFit {
        slope: fit.slope,
        intercept: fit.intercept,
        change_per_day,
        r_squared: fit.r_squared,
        slope_data: fit.slope_data,
        equation: format!("y = {:.4}/day", change_per_day),
    })
}

// =============================================================================
// Logarithmic: y = a + b * ln(x' + 1), x' = (x - x0) / day
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogarithmicFit {
    pub a: f64,
    pub b: f64,
    pub x_origin: f64,
    pub x_unit: f64,
    pub r_squared: f64,
    pub slope_data: Vec<Point>,
    pub equation: String,
}

impl LogarithmicFit {
    /// `NaN` for x at or beyond one unit before the origin, where the log is undefined.
    pub fn predict(&self, x: f64) -> f64 {
        let nx = (x - self.x_origin) / self.x_unit;
        self.a + self.b * nx.ln_1p()
    }
}

pub fn logarithmic(points: &[Point]) -> Result<LogarithmicFit> {
    let origin = points.first().ok_or(RegressionError::NoPointsAfterFilter)?.x;
    let kept: Vec<Point> = normalize(points, origin, MS_PER_DAY)
        .into_iter()
        .filter(|p| p.x >= 0.0)
        .collect();
    if kept.is_empty() {
        return Err(RegressionError::NoPointsAfterFilter);
    }

    let lx: Vec<f64> = kept.iter().map(|p| p.x.ln_1p()).collect();
    let ys: Vec<f64> = kept.iter().map(|p| p.y).collect();
    let (b, a) = ols("Logarithmic", &lx, &ys)?;

    let fitted: Vec<f64> = lx.iter().map(|l| a + b * l).collect();
    let mut fit = LogarithmicFit {
        a,
        b,
        x_origin: origin,
        x_unit: MS_PER_DAY,
        r_squared: r_squared(&ys, &fitted),
        slope_data: Vec::new(),
        equation: format!("y = {:.4} {} ln(x + 1)", a, signed(b)),
    };
    fit.slope_data = points.iter().map(|p| Point::new(p.x, fit.predict(p.x))).collect();
    Ok(fit)
}

// =============================================================================
// Exponential: y = a * e^(b * (x - x0))
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExponentialFit {
    /// Value at `x_origin`.
    pub a: f64,
    /// Growth rate in original x units.
    pub b: f64,
    pub x_origin: f64,
    pub r_squared: f64,
    pub slope_data: Vec<Point>,
    pub equation: String,
}

impl ExponentialFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.a * (self.b * (x - self.x_origin)).exp()
    }
}

pub fn exponential(points: &[Point]) -> Result<ExponentialFit> {
    require_points("Exponential", points.len(), 2)?;
    if points.iter().any(|p| !(p.y > 0.0)) {
        return Err(RegressionError::NonPositiveValues);
    }

    let origin = points[0].x;
    let (scaled, scale) = rescale(&normalize(points, origin, 1.0));
    trace!(origin, scale, "exponential x normalized");

    let xs: Vec<f64> = scaled.iter().map(|p| p.x).collect();
    let log_ys: Vec<f64> = scaled.iter().map(|p| p.y.ln()).collect();
    let (scaled_b, ln_a) = ols("Exponential", &xs, &log_ys)?;

    let a = ln_a.exp();
    let b = scaled_b / scale;
    let mut fit = ExponentialFit {
        a,
        b,
        x_origin: origin,
        r_squared: 0.0,
        slope_data: Vec::new(),
        equation: if origin == 0.0 {
            format!("y = {:.4}e^({:.6}x)", a, b)
        } else {
            format!("y = {:.4}e^({:.6}(x - {}))", a, b, origin)
        },
    };

    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let fitted: Vec<f64> = points.iter().map(|p| fit.predict(p.x)).collect();
    fit.r_squared = r_squared(&ys, &fitted);
    fit.slope_data = points
        .iter()
        .zip(fitted)
        .map(|(p, y)| Point::new(p.x, y))
        .collect();
    Ok(fit)
}

// =============================================================================
// Polynomial (degree 1 or 2)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolynomialFit {
    pub degree: usize,
    /// Ascending powers: `[c0, c1, c2]` means `c0 + c1*x + c2*x^2`.
    pub coefficients: Vec<f64>,
    /// Mean x the system was solved around.
    pub x_origin: f64,
    pub r_squared: f64,
    pub slope_data: Vec<Point>,
    pub equation: String,
    /// Same polynomial in powers of `x - x_origin`.
    #[serde(skip)]
    centred: Vec<f64>,
}

impl PolynomialFit {
    /// Evaluated around `x_origin`, so large x (epoch timestamps) do not
    /// cancel out the small terms.
    pub fn predict(&self, x: f64) -> f64 {
        let u = x - self.x_origin;
        self.centred.iter().rev().fold(0.0, |acc, c| acc * u + c)
    }
}

pub fn determinant3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Solve the quadratic normal equations with Cramer's rule.
///
/// Expects x already centred on its mean.
fn quadratic_coefficients(points: &[Point]) -> Result<Vec<f64>> {
    let mut distinct: Vec<f64> = points.iter().map(|p| p.x).collect();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    if distinct.len() < 3 {
        return Err(RegressionError::Degenerate("Polynomial"));
    }

    let mut s = [0.0f64; 5];
    let mut t = [0.0f64; 3];
    for p in points {
        let mut xp = 1.0;
        for (k, sk) in s.iter_mut().enumerate() {
            *sk += xp;
            if k < 3 {
                t[k] += xp * p.y;
            }
            xp *= p.x;
        }
    }

    let m = [[s[0], s[1], s[2]], [s[1], s[2], s[3]], [s[2], s[3], s[4]]];
    let det = determinant3(&m);
    if det == 0.0 || !det.is_finite() {
        return Err(RegressionError::Degenerate("Polynomial"));
    }

    let coefficients = (0..3)
        .map(|col| {
            let mut replaced = m;
            for (row, rhs) in t.iter().enumerate() {
                replaced[row][col] = *rhs;
            }
            determinant3(&replaced) / det
        })
        .collect();
    Ok(coefficients)
}

/// Re-express `sum(c_k * (x - origin)^k)` in plain powers of x.
fn expand_about(centred: &[f64], origin: f64) -> Vec<f64> {
    match centred {
        &[a0, a1] => vec![a0 - a1 * origin, a1],
        &[a0, a1, a2] => vec![
            a0 - a1 * origin + a2 * origin * origin,
            a1 - 2.0 * a2 * origin,
            a2,
        ],
        other => other.to_vec(),
    }
}

pub fn polynomial(points: &[Point], degree: usize) -> Result<PolynomialFit> {
    let origin = if points.is_empty() {
        0.0
    } else {
        points.iter().map(|p| p.x).sum::<f64>() / points.len() as f64
    };
    let shifted = normalize(points, origin, 1.0);
    trace!(origin, degree, "polynomial x centred");

    let centred = match degree {
        1 => {
            let fit = linear_regression(&shifted)?;
            vec![fit.intercept, fit.slope]
        }
        2 => {
            require_points("Polynomial", points.len(), 3)?;
            quadratic_coefficients(&shifted)?
        }
        other => return Err(RegressionError::UnsupportedDegree(other)),
    };
    let coefficients = expand_about(&centred, origin);

    let equation = match coefficients.as_slice() {
        [c0, c1] => format!("y = {:.4}x {}", c1, signed(*c0)),
        [c0, c1, c2] => format!("y = {:.4}x^2 {}x {}", c2, signed(*c1), signed(*c0)),
        _ => String::new(),
    };
    let mut fit = PolynomialFit {
        degree,
        coefficients,
        x_origin: origin,
        r_squared: 0.0,
        slope_data: Vec::new(),
        equation,
        centred,
    };

    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let fitted: Vec<f64> = points.iter().map(|p| fit.predict(p.x)).collect();
    fit.r_squared = r_squared(&ys, &fitted);
    fit.slope_data = points
        .iter()
        .zip(fitted)
        .map(|(p, y)| Point::new(p.x, y))
        .collect();
    Ok(fit)
}
