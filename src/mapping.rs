// Column-to-axis mapping and its single validation point

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chart::{AxisId, AxisKind, ChartDescriptor};
use crate::dataset::{ColumnDescriptor, DatasetDescriptor};
use crate::error::ValidationError;

/// Partial function from axis to column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    slots: BTreeMap<AxisId, Option<String>>,
}

impl ColumnMapping {
    /// An empty slot for every axis the chart requires
    pub fn for_chart(chart: &ChartDescriptor) -> Self {
        Self {
            slots: chart.required_axes.iter().map(|axis| (axis.id, None)).collect(),
        }
    }

    pub fn get(&self, axis: AxisId) -> Option<&str> {
        self.slots.get(&axis).and_then(|slot| slot.as_deref())
    }

    pub fn axis_of(&self, column: &str) -> Option<AxisId> {
        self.slots
            .iter()
            .find(|(_, slot)| slot.as_deref() == Some(column))
            .map(|(axis, _)| *axis)
    }

    pub fn assigned_columns(&self) -> impl Iterator<Item = &str> {
        self.slots.values().filter_map(|slot| slot.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.assigned_columns().next().is_none()
    }

    /// Column feeding the renderer's `x` role (`x` or `category`)
    pub fn x_column(&self) -> Option<&str> {
        self.get(AxisId::X).or_else(|| self.get(AxisId::Category))
    }

    /// Column feeding the renderer's `y` role (`y` or `value`)
    pub fn y_column(&self) -> Option<&str> {
        self.get(AxisId::Y).or_else(|| self.get(AxisId::Value))
    }

    pub fn is_complete(&self, chart: &ChartDescriptor) -> bool {
        chart.required_axes.iter().all(|axis| self.get(axis.id).is_some())
    }

    pub fn missing_axes(&self, chart: &ChartDescriptor) -> Vec<AxisId> {
        chart
            .required_axes
            .iter()
            .filter(|axis| self.get(axis.id).is_none())
            .map(|axis| axis.id)
            .collect()
    }

    /// Error unless every required axis is filled
    pub fn ensure_complete(&self, chart: &ChartDescriptor) -> Result<(), ValidationError> {
        let missing = self.missing_axes(chart);
        if missing.is_empty() {
            return Ok(());
        }
        Err(ValidationError::IncompleteMapping {
            chart: chart.id,
            missing: missing.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(", "),
        })
    }
}

/// Validates every assignment against the active chart and dataset.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMapper<'a> {
    chart: &'a ChartDescriptor,
    dataset: &'a DatasetDescriptor,
}

impl<'a> ColumnMapper<'a> {
    pub fn new(chart: &'a ChartDescriptor, dataset: &'a DatasetDescriptor) -> Self {
        Self { chart, dataset }
    }

    /// Place `column` on `axis`. On rejection `mapping` is left untouched.
    pub fn assign(
        &self,
        mapping: &mut ColumnMapping,
        axis: AxisId,
        column: &str,
    ) -> Result<(), ValidationError> {
        let spec = self.chart.axis(axis).ok_or(ValidationError::AxisNotRequired {
            axis,
            chart: self.chart.id,
        })?;
        let descriptor = self
            .dataset
            .column(column)
            .ok_or_else(|| ValidationError::UnknownColumn(column.to_string()))?;

        let actual = descriptor.kind();
        if actual != spec.kind {
            return Err(ValidationError::KindMismatch {
                axis,
                column: column.to_string(),
                expected: spec.kind,
                actual,
            });
        }

        if let Some(assigned_to) = mapping.axis_of(column) {
            if assigned_to != axis {
                return Err(ValidationError::ColumnInUse {
                    column: column.to_string(),
                    assigned_to,
                });
            }
        }

        mapping.slots.insert(axis, Some(column.to_string()));
        Ok(())
    }

    pub fn clear(&self, mapping: &mut ColumnMapping, axis: AxisId) {
        if let Some(slot) = mapping.slots.get_mut(&axis) {
            *slot = None;
        }
    }

    /// Unassigned columns of one kind, sorted by name
    pub fn available_columns(&self, mapping: &ColumnMapping, kind: AxisKind) -> Vec<&'a ColumnDescriptor> {
        let mut columns: Vec<&ColumnDescriptor> = self
            .dataset
            .columns
            .iter()
            .filter(|col| col.kind() == kind && mapping.axis_of(&col.name).is_none())
            .collect();
        columns.sort_by(|a, b| a.name.cmp(&b.name));
        columns
    }

    /// Re-check a mapping built elsewhere (e.g. deserialized) slot by slot
    pub fn validate(&self, mapping: &ColumnMapping) -> Result<(), ValidationError> {
        let mut replay = ColumnMapping::for_chart(self.chart);
        for (axis, column) in &mapping.slots {
            if let Some(column) = column {
                self.assign(&mut replay, *axis, column)?;
            }
        }
        Ok(())
    }
}
