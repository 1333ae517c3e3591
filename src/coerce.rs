//! Numeric coercion and the missing-data resolver.
//!
//! Every numeric channel (aggregated sums, scatter points, bubble sizes)
//! goes through [`resolve`], so a given cell and policy always produce the
//! same value regardless of chart type.

use crate::data::Cell;
use crate::dataset::LabelValue;
use crate::encoding::Replacement;

/// Outcome of resolving one cell against its column's policy.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Number(f64),
    /// Explicit "no data".
    Null,
    /// Non-numeric replacement literal; numeric channels see it as null.
    Text(String),
}

impl Resolved {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Resolved::Number(n) => Some(*n),
            Resolved::Null | Resolved::Text(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Resolved::Null)
    }
}

/// Coerce a cell to a finite number. `None` means the cell is missing:
/// null, empty text, or text that does not parse.
pub fn to_number(cell: &Cell) -> Option<f64> {
    let n = match cell {
        Cell::Null => return None,
        Cell::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Cell::Number(n) => *n,
        Cell::Text(s) => return parse_number(s),
    };
    n.is_finite().then_some(n)
}

/// Parse numeric text (surrounding whitespace allowed) to a finite number.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn replacement_value(replacement: &Replacement) -> Resolved {
    match replacement {
        Replacement::Null => Resolved::Null,
        Replacement::Number(n) if n.is_finite() => Resolved::Number(*n),
        Replacement::Number(_) => Resolved::Null,
        Replacement::Text(s) => match to_number(&Cell::Text(s.clone())) {
            Some(n) => Resolved::Number(n),
            None => Resolved::Text(s.clone()),
        },
    }
}

pub fn resolve(cell: &Cell, replacement: &Replacement) -> Resolved {
    match to_number(cell) {
        Some(n) => Resolved::Number(n),
        None => replacement_value(replacement),
    }
}

/// Shorthand for the numeric channels.
pub fn resolve_number(cell: &Cell, replacement: &Replacement) -> Option<f64> {
    resolve(cell, replacement).as_number()
}

/// Render a cell as a label value. Labels keep text as-is.
pub fn label_value(cell: &Cell) -> LabelValue {
    match cell {
        Cell::Null => LabelValue::Text(String::new()),
        Cell::Bool(b) => LabelValue::Text(b.to_string()),
        Cell::Number(n) => LabelValue::Number(*n),
        Cell::Text(s) => LabelValue::Text(s.clone()),
    }
}

/// Render a resolved value for a tooltip. Null shows as an empty string.
pub fn resolved_label(resolved: Resolved) -> LabelValue {
    match resolved {
        Resolved::Number(n) => LabelValue::Number(n),
        Resolved::Text(s) => LabelValue::Text(s),
        Resolved::Null => LabelValue::Text(String::new()),
    }
}

/// Tooltip field value: numbers are coerced, other text is shown verbatim,
/// and missing cells fall back to the column's policy.
pub fn tooltip_value(cell: &Cell, replacement: &Replacement) -> LabelValue {
    match cell {
        Cell::Text(s) if !s.trim().is_empty() && to_number(cell).is_none() => {
            LabelValue::Text(s.clone())
        }
        _ => resolved_label(resolve(cell, replacement)),
    }
}
