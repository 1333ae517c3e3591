use anyhow::{anyhow, Context, Result};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;

/// A single primitive table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

/// One query result row. Columns may be absent on any given row.
pub type Row = HashMap<String, Cell>;

/// Look up a column, treating an absent key like an explicit null.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a Cell {
    static NULL: Cell = Cell::Null;
    row.get(column).unwrap_or(&NULL)
}

/// Materialized rows plus the column names discovered while loading them.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    pub columns: IndexSet<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn new(rows: Vec<Row>) -> Self {
        let columns = rows
            .iter()
            .flat_map(|row| row.keys().cloned())
            .collect::<IndexSet<_>>();
        Self { columns, rows }
    }

    /// Create a RowSet from a JSON Array of Objects
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

        let mut columns = IndexSet::new();
        let mut rows = Vec::with_capacity(array.len());
        for (idx, item) in array.iter().enumerate() {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Item {} in array must be an object", idx))?;

            let mut row = Row::with_capacity(obj.len());
            for (key, val) in obj {
                let cell = match val {
                    Value::Null => Cell::Null,
                    Value::Bool(b) => Cell::Bool(*b),
                    Value::Number(n) => n
                        .as_f64()
                        .map(Cell::Number)
                        .ok_or_else(|| anyhow!("Number out of range for field '{}'", key))?,
                    Value::String(s) => Cell::Text(s.clone()),
                    _ => return Err(anyhow!("Unsupported value type for field '{}'", key)),
                };
                columns.insert(key.clone());
                row.insert(key.clone(), cell);
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    /// Read CSV with a header row. Empty cells become nulls; everything
    /// else stays text and is coerced later by the resolver.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV record {}", idx + 1))?;
            let row = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| {
                    let cell = if v.is_empty() { Cell::Null } else { Cell::Text(v.to_string()) };
                    (h.clone(), cell)
                })
                .collect::<Row>();
            rows.push(row);
        }

        Ok(Self {
            columns: headers.into_iter().collect(),
            rows,
        })
    }
}
