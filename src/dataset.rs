// Dataset descriptors, scalar cells and prepared rows

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chart::AxisKind;
use crate::data::PlotData;

/// A single dataset cell as delivered by the data collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view of the cell: numbers as-is, text only if it parses
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) if n.is_finite() => Some(*n),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Parse a raw text cell, preferring a number when the text is numeric
    pub fn from_text(raw: &str) -> Self {
        if raw.is_empty() {
            return Scalar::Null;
        }
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Scalar::Number(n),
            _ => Scalar::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

/// A raw dataset record keyed by column name.
pub type Row = BTreeMap<String, Scalar>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub dtype: String,
    #[serde(default)]
    pub description: Option<BTreeMap<String, Value>>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, dtype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
            description: None,
        }
    }

    /// Derived from `dtype` on every call; never cached.
    pub fn kind(&self) -> AxisKind {
        classify_dtype(&self.dtype)
    }
}

/// Polars-style dtype names: anything mentioning int, float or decimal is numeric.
pub fn classify_dtype(dtype: &str) -> AxisKind {
    let lower = dtype.to_lowercase();
    if ["int", "float", "decimal"].iter().any(|t| lower.contains(t)) {
        AxisKind::Numeric
    } else {
        AxisKind::Categorical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KindCounts {
    pub numeric: usize,
    pub categorical: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub columns: Vec<ColumnDescriptor>,
    pub row_count: usize,
}

impl DatasetDescriptor {
    pub fn new(columns: Vec<ColumnDescriptor>, row_count: usize) -> Self {
        Self { columns, row_count }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn counts_by_kind(&self) -> KindCounts {
        self.columns.iter().fold(KindCounts::default(), |mut acc, col| {
            match col.kind() {
                AxisKind::Numeric => acc.numeric += 1,
                AxisKind::Categorical => acc.categorical += 1,
            }
            acc
        })
    }

    /// Infer column dtypes from a raw table
    pub fn infer(table: &PlotData) -> Self {
        let columns = table
            .headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells = table.rows.iter().filter_map(|row| row.get(idx)).filter(|c| !c.is_empty());
                ColumnDescriptor::new(name.clone(), infer_dtype(cells))
            })
            .collect();
        Self::new(columns, table.rows.len())
    }
}

fn infer_dtype<'a>(cells: impl Iterator<Item = &'a String>) -> &'static str {
    let mut all_int = true;
    let mut seen = false;
    for cell in cells {
        seen = true;
        let cell = cell.trim();
        if cell.parse::<i64>().is_ok() {
            continue;
        }
        if cell.parse::<f64>().is_ok() {
            all_int = false;
            continue;
        }
        return "String";
    }
    match (seen, all_int) {
        (false, _) => "String",
        (true, true) => "Int64",
        (true, false) => "Float64",
    }
}

/// A row projected onto the renderer's semantic roles.
///
/// Category/value charts carry the category in `x` and the measure in `y`;
/// the wire names `category` and `value` are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedRow {
    #[serde(alias = "category")]
    pub x: Scalar,
    #[serde(alias = "value")]
    pub y: Scalar,
}

impl PreparedRow {
    pub fn new(x: impl Into<Scalar>, y: impl Into<Scalar>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }
}
