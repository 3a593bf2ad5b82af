// Chart identities, axis roles and the chart-capability table

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dataset::KindCounts;
use crate::error::ValidationError;

/// The closed set of chart families the renderer knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Scatter,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [ChartKind::Bar, ChartKind::Line, ChartKind::Pie, ChartKind::Scatter];

    pub fn id(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ChartKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            "pie" => Ok(ChartKind::Pie),
            "scatter" => Ok(ChartKind::Scatter),
            other => Err(ValidationError::UnknownChart(other.to_string())),
        }
    }
}

/// Semantic slot a chart requires a column to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisId {
    X,
    Y,
    Category,
    Value,
}

impl AxisId {
    pub fn as_str(self) -> &'static str {
        match self {
            AxisId::X => "x",
            AxisId::Y => "y",
            AxisId::Category => "category",
            AxisId::Value => "value",
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    Numeric,
    Categorical,
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisKind::Numeric => f.write_str("numeric"),
            AxisKind::Categorical => f.write_str("categorical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub id: AxisId,
    pub title: String,
    pub description: String,
    pub kind: AxisKind,
}

impl AxisSpec {
    fn new(id: AxisId, title: &str, description: &str, kind: AxisKind) -> Self {
        Self {
            id,
            title: title.to_string(),
            description: description.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    Mean,
    Sum,
    Count,
}

impl AggregationMethod {
    pub fn id(self) -> &'static str {
        match self {
            AggregationMethod::Mean => "mean",
            AggregationMethod::Sum => "sum",
            AggregationMethod::Count => "count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMethod {
    TopN,
    Systematic,
    Random,
}

impl SamplingMethod {
    pub fn id(self) -> &'static str {
        match self {
            SamplingMethod::TopN => "top_n",
            SamplingMethod::Systematic => "systematic",
            SamplingMethod::Random => "random",
        }
    }
}

/// Outcome of the sampling step: a method was chosen, or the user skipped it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingDecision {
    Apply(SamplingMethod),
    Skip,
}

impl SamplingDecision {
    pub fn method(self) -> Option<SamplingMethod> {
        match self {
            SamplingDecision::Apply(method) => Some(method),
            SamplingDecision::Skip => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDescriptor {
    pub id: ChartKind,
    pub name: String,
    pub required_axes: Vec<AxisSpec>,
    pub sampling_threshold: usize,
    pub supported_sampling_methods: Vec<SamplingMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_aggregations: Option<Vec<AggregationMethod>>,
}

impl ChartDescriptor {
    pub fn axis(&self, id: AxisId) -> Option<&AxisSpec> {
        self.required_axes.iter().find(|axis| axis.id == id)
    }

    pub fn supports_aggregation(&self) -> bool {
        self.supported_aggregations
            .as_ref()
            .is_some_and(|methods| !methods.is_empty())
    }

    pub fn supports_aggregation_method(&self, method: AggregationMethod) -> bool {
        self.supported_aggregations
            .as_ref()
            .is_some_and(|methods| methods.contains(&method))
    }

    pub fn needs_sampling(&self, row_count: usize) -> bool {
        row_count > self.sampling_threshold
    }

    /// Columns of each kind the chart consumes
    pub fn requirements(&self) -> KindCounts {
        self.required_axes.iter().fold(KindCounts::default(), |mut acc, axis| {
            match axis.kind {
                AxisKind::Numeric => acc.numeric += 1,
                AxisKind::Categorical => acc.categorical += 1,
            }
            acc
        })
    }

    /// Whether a dataset has enough columns of each kind to fill every axis
    pub fn is_compatible(&self, available: KindCounts) -> bool {
        let needed = self.requirements();
        available.numeric >= needed.numeric && available.categorical >= needed.categorical
    }
}

/// The chart-capability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartCatalog {
    charts: Vec<ChartDescriptor>,
}

impl ChartCatalog {
    pub fn new(charts: Vec<ChartDescriptor>) -> Self {
        Self { charts }
    }

    /// Load a capability table from a JSON array of chart descriptors
    pub fn from_json(input: &str) -> Result<Self> {
        let charts: Vec<ChartDescriptor> =
            serde_json::from_str(input).context("Failed to parse chart catalog")?;
        Ok(Self { charts })
    }

    pub fn get(&self, kind: ChartKind) -> Option<&ChartDescriptor> {
        self.charts.iter().find(|chart| chart.id == kind)
    }

    pub fn charts(&self) -> &[ChartDescriptor] {
        &self.charts
    }

    /// Replace (or add) the descriptor for one chart kind
    pub fn with_chart(mut self, descriptor: ChartDescriptor) -> Self {
        self.charts.retain(|chart| chart.id != descriptor.id);
        self.charts.push(descriptor);
        self
    }
}

impl Default for ChartCatalog {
    fn default() -> Self {
        let category = AxisSpec::new(
            AxisId::Category,
            "Category",
            "Groups the data into distinct bars or slices.",
            AxisKind::Categorical,
        );
        let value = AxisSpec::new(
            AxisId::Value,
            "Value",
            "The numeric measure shown for each category.",
            AxisKind::Numeric,
        );
        let x = AxisSpec::new(AxisId::X, "X-Axis", "Horizontal position.", AxisKind::Numeric);
        let y = AxisSpec::new(AxisId::Y, "Y-Axis", "Vertical position.", AxisKind::Numeric);
        let all_aggregations = vec![
            AggregationMethod::Mean,
            AggregationMethod::Sum,
            AggregationMethod::Count,
        ];

        Self::new(vec![
            ChartDescriptor {
                id: ChartKind::Bar,
                name: "Bar Chart".to_string(),
                required_axes: vec![category.clone(), value.clone()],
                sampling_threshold: 50,
                supported_sampling_methods: vec![SamplingMethod::TopN],
                supported_aggregations: Some(all_aggregations.clone()),
            },
            ChartDescriptor {
                id: ChartKind::Line,
                name: "Line Chart".to_string(),
                required_axes: vec![x.clone(), y.clone()],
                sampling_threshold: 1000,
                supported_sampling_methods: vec![SamplingMethod::Systematic, SamplingMethod::Random],
                supported_aggregations: None,
            },
            ChartDescriptor {
                id: ChartKind::Pie,
                name: "Pie Chart".to_string(),
                required_axes: vec![category, value],
                sampling_threshold: 10,
                supported_sampling_methods: vec![SamplingMethod::TopN],
                supported_aggregations: Some(all_aggregations),
            },
            ChartDescriptor {
                id: ChartKind::Scatter,
                name: "Scatter Plot".to_string(),
                required_axes: vec![x, y],
                sampling_threshold: 5000,
                supported_sampling_methods: vec![SamplingMethod::Random, SamplingMethod::Systematic],
                supported_aggregations: None,
            },
        ])
    }
}
