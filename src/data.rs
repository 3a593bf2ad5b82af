use std::io::Read;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use crate::dataset::{Row, Scalar};

/// A raw, untyped table: one header row plus text cells.
#[derive(Debug, Clone)]
pub struct PlotData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl PlotData {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Read a CSV document (header row required)
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = csv_reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in csv_reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV record {}", idx + 1))?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Create PlotData from a JSON Array of Objects
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

        let Some(first) = array.first() else {
            return Ok(Self::new(Vec::new(), Vec::new()));
        };

        // Headers come from the first object
        let first_obj = first
            .as_object()
            .ok_or_else(|| anyhow!("Items in array must be objects"))?;
        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Items in array must be objects"))?;

            let mut row = Vec::with_capacity(headers.len());
            for header in &headers {
                let cell = match obj.get(header) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Bool(b)) => b.to_string(),
                    Some(Value::Null) | None => String::new(),
                    _ => return Err(anyhow!("Unsupported value type for field '{}'", header)),
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Records keyed by column name, with numeric cells parsed as numbers
    pub fn records(&self) -> Vec<Row> {
        self.rows
            .iter()
            .map(|cells| {
                self.headers
                    .iter()
                    .zip(cells)
                    .map(|(header, cell)| (header.clone(), Scalar::from_text(cell)))
                    .collect()
            })
            .collect()
    }
}
