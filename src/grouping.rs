use crate::coerce::label_value;
use crate::data::{cell, Cell, Row};
use crate::dataset::KeyValue;
use indexmap::IndexMap;

/// One typed component of a composite grouping key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Missing,
    Bool(bool),
    /// Canonical bit pattern; `-0.0` folds into `0.0`.
    Number(u64),
    Text(String),
}

impl From<&Cell> for KeyPart {
    fn from(cell: &Cell) -> Self {
        match cell {
            Cell::Null => KeyPart::Missing,
            Cell::Bool(b) => KeyPart::Bool(*b),
            Cell::Number(n) => {
                let n = if *n == 0.0 { 0.0 } else { *n };
                KeyPart::Number(n.to_bits())
            }
            Cell::Text(s) => KeyPart::Text(s.clone()),
        }
    }
}

/// Composite key compared part by part, so values containing any
/// delimiter character never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey(Vec<KeyPart>);

/// A distinct value combination over a set of grouping columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub key: GroupKey,
    /// Column/value pairs in grouping-column order.
    pub values: Vec<KeyValue>,
}

/// Build the key for a row's projection onto `columns`.
pub fn group_key(columns: &[String], row: &Row) -> GroupKey {
    GroupKey(columns.iter().map(|c| KeyPart::from(cell(row, c))).collect())
}

/// Column/value pairs for a row's projection onto `columns`.
pub fn project(columns: &[String], row: &Row) -> Vec<KeyValue> {
    columns
        .iter()
        .map(|c| KeyValue {
            key: c.clone(),
            value: label_value(cell(row, c)),
        })
        .collect()
}

/// Build both the key and the value record for a row.
pub fn combination(columns: &[String], row: &Row) -> Combination {
    Combination {
        key: group_key(columns, row),
        values: project(columns, row),
    }
}

/// Distinct combinations in first-occurrence order.
pub fn unique_combinations(rows: &[Row], columns: &[String]) -> Vec<Combination> {
    let mut seen: IndexMap<GroupKey, Combination> = IndexMap::new();
    for row in rows {
        let key = group_key(columns, row);
        if !seen.contains_key(&key) {
            let combo = combination(columns, row);
            seen.insert(key, combo);
        }
    }
    seen.into_values().collect()
}

/// Rows sharing one combination, in row order.
#[derive(Debug, Clone)]
pub struct Group<'r> {
    pub combination: Combination,
    pub rows: Vec<&'r Row>,
}

/// Bucket rows by their combination in a single pass.
///
/// Groups come out in the same first-occurrence order as
/// [`unique_combinations`].
pub fn group_rows<'r>(rows: &'r [Row], columns: &[String]) -> Vec<Group<'r>> {
    let mut groups: IndexMap<GroupKey, Group<'r>> = IndexMap::new();
    for row in rows {
        let key = group_key(columns, row);
        groups
            .entry(key)
            .or_insert_with(|| Group {
                combination: combination(columns, row),
                rows: Vec::new(),
            })
            .rows
            .push(row);
    }
    groups.into_values().collect()
}
