// Session collaborators: row queries, persisted workflow state and lens lookup

use std::cell::RefCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chart::{AggregationMethod, ChartCatalog, ChartKind, SamplingDecision};
use crate::config::PrepareConfig;
use crate::data::PlotData;
use crate::dataset::{DatasetDescriptor, PreparedRow};
use crate::error::TransportError;
use crate::lens::{EvaluationContext, LensConfig};
use crate::mapping::ColumnMapping;
use crate::prepare;
use crate::workflow::WorkflowState;

/// Everything the data backend needs to produce render-ready rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowQuery {
    pub chart: ChartKind,
    pub mapping: ColumnMapping,
    pub aggregation: Option<AggregationMethod>,
    pub sampling: Option<SamplingDecision>,
}

/// The dataset service behind a session.
pub trait DataBackend {
    fn fetch_prepared_rows(&self, session_id: &str, query: &RowQuery) -> Result<Vec<PreparedRow>, TransportError>;

    /// `Ok(None)` when the session exists but nothing was persisted yet
    fn fetch_session_state(&self, session_id: &str) -> Result<Option<WorkflowState>, TransportError>;

    fn persist_session_state(&self, session_id: &str, state: &WorkflowState) -> Result<(), TransportError>;

    fn check_sampling_needed(&self, session_id: &str, chart: ChartKind) -> Result<bool, TransportError>;
}

pub trait LensBackend {
    fn fetch_compatible_lenses(&self, context: &EvaluationContext) -> Result<Vec<LensConfig>, TransportError>;
}

/// Sessions kept in process; rows are prepared locally.
///
/// Workflow snapshots are stored as JSON so a round trip exercises the same
/// encoding a remote store would see.
pub struct InMemoryBackend {
    tables: HashMap<String, PlotData>,
    catalog: ChartCatalog,
    config: PrepareConfig,
    snapshots: RefCell<HashMap<String, String>>,
}

impl InMemoryBackend {
    pub fn new(catalog: ChartCatalog, config: PrepareConfig) -> Self {
        Self {
            tables: HashMap::new(),
            catalog,
            config,
            snapshots: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>, table: PlotData) -> Self {
        self.tables.insert(session_id.into(), table);
        self
    }

    pub fn describe(&self, session_id: &str) -> Result<DatasetDescriptor, TransportError> {
        Ok(DatasetDescriptor::infer(self.table(session_id)?))
    }

    fn table(&self, session_id: &str) -> Result<&PlotData, TransportError> {
        self.tables
            .get(session_id)
            .ok_or_else(|| TransportError::SessionNotFound(session_id.to_string()))
    }
}

impl DataBackend for InMemoryBackend {
    fn fetch_prepared_rows(&self, session_id: &str, query: &RowQuery) -> Result<Vec<PreparedRow>, TransportError> {
        let table = self.table(session_id)?;
        let chart = self
            .catalog
            .get(query.chart)
            .ok_or_else(|| TransportError::Request(format!("Unknown chart type '{}'", query.chart)))?;
        let rows = prepare::prepare(&table.records(), chart, query, &self.config)
            .map_err(|err| TransportError::Request(err.to_string()))?;
        tracing::debug!(session_id, chart = %query.chart, rows = rows.len(), "Prepared rows");
        Ok(rows)
    }

    fn fetch_session_state(&self, session_id: &str) -> Result<Option<WorkflowState>, TransportError> {
        self.table(session_id)?;
        match self.snapshots.borrow().get(session_id) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn persist_session_state(&self, session_id: &str, state: &WorkflowState) -> Result<(), TransportError> {
        self.table(session_id)?;
        let json = serde_json::to_string(state)?;
        self.snapshots.borrow_mut().insert(session_id.to_string(), json);
        Ok(())
    }

    fn check_sampling_needed(&self, session_id: &str, chart: ChartKind) -> Result<bool, TransportError> {
        let table = self.table(session_id)?;
        let threshold = self
            .catalog
            .get(chart)
            .map(|descriptor| descriptor.sampling_threshold)
            .ok_or_else(|| TransportError::Request(format!("Unknown chart type '{chart}'")))?;
        Ok(table.rows.len() > threshold)
    }
}
