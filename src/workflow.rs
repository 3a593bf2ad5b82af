// Workflow state machine: chart -> mapping -> [aggregation] -> [sampling] -> visualization
//
// `reduce` is the only place state changes. `WorkflowMachine` wraps it with the
// sampling gate lookup and best-effort persistence.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::chart::{AggregationMethod, ChartCatalog, ChartDescriptor, ChartKind, SamplingDecision};
use crate::dataset::DatasetDescriptor;
use crate::error::{Result, TransportError, ValidationError};
use crate::mapping::{ColumnMapper, ColumnMapping};
use crate::session::{DataBackend, RowQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    ChartSelection,
    ColumnMapping,
    AggregationSelection,
    SamplingSelection,
    Visualization,
}

impl WorkflowStep {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStep::ChartSelection => "chart_selection",
            WorkflowStep::ColumnMapping => "column_mapping",
            WorkflowStep::AggregationSelection => "aggregation_selection",
            WorkflowStep::SamplingSelection => "sampling_selection",
            WorkflowStep::Visualization => "visualization",
        }
    }
}

/// Single source of truth for the user's progress through chart setup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowState {
    pub step: WorkflowStep,
    pub chart_type: Option<ChartKind>,
    #[serde(default)]
    pub column_mapping: ColumnMapping,
    pub aggregation_method: Option<AggregationMethod>,
    pub sampling_method: Option<SamplingDecision>,
    pub active_lens_id: Option<String>,
}

impl WorkflowState {
    /// The rows this state asks for, once a chart is chosen
    pub fn row_query(&self) -> Option<RowQuery> {
        Some(RowQuery {
            chart: self.chart_type?,
            mapping: self.column_mapping.clone(),
            aggregation: self.aggregation_method,
            sampling: self.sampling_method,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    SelectChart(ChartKind),
    SubmitMapping(ColumnMapping),
    SelectAggregation(AggregationMethod),
    SelectSampling(SamplingDecision),
    SelectLens(Option<String>),
    Back,
    Reset,
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::SelectChart(_) => "select_chart",
            WorkflowEvent::SubmitMapping(_) => "submit_mapping",
            WorkflowEvent::SelectAggregation(_) => "select_aggregation",
            WorkflowEvent::SelectSampling(_) => "select_sampling",
            WorkflowEvent::SelectLens(_) => "select_lens",
            WorkflowEvent::Back => "back",
            WorkflowEvent::Reset => "reset",
        }
    }
}

/// Facts the reducer needs but does not own.
#[derive(Debug, Clone, Copy)]
pub struct Gates<'a> {
    pub catalog: &'a ChartCatalog,
    /// The loaded dataset, for compatibility and column checks
    pub dataset: &'a DatasetDescriptor,
    /// Whether the active chart must pass through sampling
    pub needs_sampling: bool,
}

fn active_chart<'a>(state: &WorkflowState, gates: &Gates<'a>) -> Result<&'a ChartDescriptor, ValidationError> {
    let kind = state.chart_type.ok_or(ValidationError::NoChartSelected)?;
    gates
        .catalog
        .get(kind)
        .ok_or_else(|| ValidationError::UnknownChart(kind.id().to_string()))
}

fn after_preparation(gates: &Gates) -> WorkflowStep {
    if gates.needs_sampling {
        WorkflowStep::SamplingSelection
    } else {
        WorkflowStep::Visualization
    }
}

fn back_to_mapping(state: &WorkflowState, chart: &ChartDescriptor) -> WorkflowState {
    WorkflowState {
        step: WorkflowStep::ColumnMapping,
        chart_type: state.chart_type,
        column_mapping: ColumnMapping::for_chart(chart),
        ..WorkflowState::default()
    }
}

/// Next state for `event`, or why it is rejected. `state` is never modified.
pub fn reduce(state: &WorkflowState, event: WorkflowEvent, gates: &Gates) -> Result<WorkflowState, ValidationError> {
    let invalid = ValidationError::InvalidTransition {
        event: event.name(),
        step: state.step.as_str(),
    };
    let require = |step: WorkflowStep| {
        if state.step == step {
            Ok(())
        } else {
            Err(invalid.clone())
        }
    };

    match event {
        WorkflowEvent::Reset => Ok(WorkflowState::default()),

        WorkflowEvent::SelectChart(kind) => {
            require(WorkflowStep::ChartSelection)?;
            let chart = gates
                .catalog
                .get(kind)
                .ok_or_else(|| ValidationError::UnknownChart(kind.id().to_string()))?;
            if !chart.is_compatible(gates.dataset.counts_by_kind()) {
                return Err(ValidationError::IncompatibleChart(kind));
            }
            Ok(WorkflowState {
                step: WorkflowStep::ColumnMapping,
                chart_type: Some(kind),
                column_mapping: ColumnMapping::for_chart(chart),
                ..WorkflowState::default()
            })
        }

        WorkflowEvent::SubmitMapping(mapping) => {
            require(WorkflowStep::ColumnMapping)?;
            let chart = active_chart(state, gates)?;
            mapping.ensure_complete(chart)?;
            ColumnMapper::new(chart, gates.dataset).validate(&mapping)?;
            let step = if chart.supports_aggregation() {
                WorkflowStep::AggregationSelection
            } else {
                after_preparation(gates)
            };
            Ok(WorkflowState {
                step,
                chart_type: state.chart_type,
                column_mapping: mapping,
                ..WorkflowState::default()
            })
        }

        WorkflowEvent::SelectAggregation(method) => {
            require(WorkflowStep::AggregationSelection)?;
            let chart = active_chart(state, gates)?;
            if !chart.supports_aggregation_method(method) {
                return Err(ValidationError::UnsupportedMethod {
                    chart: chart.id,
                    method: method.id().to_string(),
                });
            }
            Ok(WorkflowState {
                step: after_preparation(gates),
                aggregation_method: Some(method),
                sampling_method: None,
                active_lens_id: None,
                ..state.clone()
            })
        }

        WorkflowEvent::SelectSampling(decision) => {
            require(WorkflowStep::SamplingSelection)?;
            let chart = active_chart(state, gates)?;
            if let Some(method) = decision.method() {
                if !chart.supported_sampling_methods.contains(&method) {
                    return Err(ValidationError::UnsupportedMethod {
                        chart: chart.id,
                        method: method.id().to_string(),
                    });
                }
            }
            Ok(WorkflowState {
                step: WorkflowStep::Visualization,
                sampling_method: Some(decision),
                active_lens_id: None,
                ..state.clone()
            })
        }

        WorkflowEvent::SelectLens(lens_id) => {
            require(WorkflowStep::Visualization)?;
            Ok(WorkflowState {
                active_lens_id: lens_id,
                ..state.clone()
            })
        }

        WorkflowEvent::Back => match state.step {
            WorkflowStep::Visualization | WorkflowStep::SamplingSelection => {
                let chart = active_chart(state, gates)?;
                if chart.supports_aggregation() {
                    Ok(WorkflowState {
                        step: WorkflowStep::AggregationSelection,
                        aggregation_method: None,
                        sampling_method: None,
                        active_lens_id: None,
                        ..state.clone()
                    })
                } else {
                    Ok(back_to_mapping(state, chart))
                }
            }
            WorkflowStep::AggregationSelection => {
                let chart = active_chart(state, gates)?;
                Ok(back_to_mapping(state, chart))
            }
            WorkflowStep::ChartSelection | WorkflowStep::ColumnMapping => Ok(WorkflowState::default()),
        },
    }
}

/// How the sampling gate is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// `row_count > sampling_threshold` from the capability table
    #[default]
    Threshold,
    /// Ask the data backend
    Remote,
}

/// The reducer plus its side effects: sampling lookup and persistence.
pub struct WorkflowMachine {
    state: WorkflowState,
    session_id: Option<String>,
    catalog: ChartCatalog,
    dataset: DatasetDescriptor,
    policy: SamplingPolicy,
    backend: Rc<dyn DataBackend>,
}

impl WorkflowMachine {
    pub fn new(catalog: ChartCatalog, dataset: DatasetDescriptor, backend: Rc<dyn DataBackend>) -> Self {
        Self {
            state: WorkflowState::default(),
            session_id: None,
            catalog,
            dataset,
            policy: SamplingPolicy::default(),
            backend,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_policy(mut self, policy: SamplingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Seed state from the last persisted snapshot.
    ///
    /// If the snapshot cannot be fetched the machine starts clean and forgets the
    /// session, so later transitions are not persisted against it.
    pub fn rehydrate(&mut self) {
        let Some(session_id) = self.session_id.clone() else {
            return;
        };
        match self.backend.fetch_session_state(&session_id) {
            Ok(Some(state)) => {
                tracing::info!(session_id, step = state.step.as_str(), "Rehydrated workflow state");
                self.state = state;
            }
            Ok(None) => {
                self.state = WorkflowState::default();
            }
            Err(err) => {
                tracing::warn!(session_id, error = %err, "Failed to rehydrate session, starting clean");
                self.state = WorkflowState::default();
                self.session_id = None;
            }
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn step(&self) -> WorkflowStep {
        self.state.step
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn catalog(&self) -> &ChartCatalog {
        &self.catalog
    }

    pub fn dataset(&self) -> &DatasetDescriptor {
        &self.dataset
    }

    pub fn active_chart(&self) -> Option<&ChartDescriptor> {
        self.state.chart_type.and_then(|kind| self.catalog.get(kind))
    }

    /// Apply `event`. A rejected event leaves state untouched and persists nothing.
    pub fn dispatch(&mut self, event: WorkflowEvent) -> Result<&WorkflowState> {
        let needs_sampling = self.sampling_needed(&event)?;
        let gates = Gates {
            catalog: &self.catalog,
            dataset: &self.dataset,
            needs_sampling,
        };
        let event_name = event.name();
        let next = reduce(&self.state, event, &gates)?;

        tracing::debug!(
            event = event_name,
            from = self.state.step.as_str(),
            to = next.step.as_str(),
            "Workflow transition"
        );
        self.state = next;
        self.persist();
        Ok(&self.state)
    }

    fn sampling_needed(&self, event: &WorkflowEvent) -> Result<bool, TransportError> {
        let consults_gate = match event {
            WorkflowEvent::SubmitMapping(_) => self.state.step == WorkflowStep::ColumnMapping,
            WorkflowEvent::SelectAggregation(_) => self.state.step == WorkflowStep::AggregationSelection,
            _ => false,
        };
        let Some(chart) = self.active_chart().filter(|_| consults_gate) else {
            return Ok(false);
        };

        match (self.policy, self.session_id.as_deref()) {
            (SamplingPolicy::Remote, Some(session_id)) => self.backend.check_sampling_needed(session_id, chart.id),
            _ => Ok(chart.needs_sampling(self.dataset.row_count)),
        }
    }

    /// Best-effort write of the full state; failures are only logged
    fn persist(&self) {
        let Some(session_id) = self.session_id.as_deref() else {
            return;
        };
        if let Err(err) = self.backend.persist_session_state(session_id, &self.state) {
            tracing::warn!(session_id, error = %err, "Failed to persist workflow state");
        }
    }

    pub fn select_chart(&mut self, kind: ChartKind) -> Result<&WorkflowState> {
        self.dispatch(WorkflowEvent::SelectChart(kind))
    }

    pub fn submit_mapping(&mut self, mapping: ColumnMapping) -> Result<&WorkflowState> {
        self.dispatch(WorkflowEvent::SubmitMapping(mapping))
    }

    pub fn select_aggregation(&mut self, method: AggregationMethod) -> Result<&WorkflowState> {
        self.dispatch(WorkflowEvent::SelectAggregation(method))
    }

    pub fn select_sampling(&mut self, decision: SamplingDecision) -> Result<&WorkflowState> {
        self.dispatch(WorkflowEvent::SelectSampling(decision))
    }

    pub fn select_lens(&mut self, lens_id: Option<String>) -> Result<&WorkflowState> {
        self.dispatch(WorkflowEvent::SelectLens(lens_id))
    }

    pub fn back(&mut self) -> Result<&WorkflowState> {
        self.dispatch(WorkflowEvent::Back)
    }

    pub fn reset(&mut self) -> Result<&WorkflowState> {
        self.dispatch(WorkflowEvent::Reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{AxisId, SamplingMethod};
    use crate::dataset::{ColumnDescriptor, PreparedRow};
    use crate::error::ChartflowError;
    use std::cell::RefCell;

    /// Records persisted states; optionally fails every call
    #[derive(Default)]
    struct RecordingBackend {
        persisted: RefCell<Vec<WorkflowState>>,
        snapshot: Option<WorkflowState>,
        failing: bool,
        remote_sampling: bool,
    }

    impl DataBackend for RecordingBackend {
        fn fetch_prepared_rows(&self, _: &str, _: &RowQuery) -> std::result::Result<Vec<PreparedRow>, TransportError> {
            Ok(Vec::new())
        }

        fn fetch_session_state(&self, session_id: &str) -> std::result::Result<Option<WorkflowState>, TransportError> {
            if self.failing {
                return Err(TransportError::SessionNotFound(session_id.to_string()));
            }
            Ok(self.snapshot.clone())
        }

        fn persist_session_state(&self, _: &str, state: &WorkflowState) -> std::result::Result<(), TransportError> {
            if self.failing {
                return Err(TransportError::Request("unavailable".into()));
            }
            self.persisted.borrow_mut().push(state.clone());
            Ok(())
        }

        fn check_sampling_needed(&self, _: &str, _: ChartKind) -> std::result::Result<bool, TransportError> {
            if self.failing {
                return Err(TransportError::Request("unavailable".into()));
            }
            Ok(self.remote_sampling)
        }
    }

    fn dataset(row_count: usize) -> DatasetDescriptor {
        DatasetDescriptor::new(
            vec![
                ColumnDescriptor::new("region", "String"),
                ColumnDescriptor::new("sales", "Float64"),
                ColumnDescriptor::new("units", "Int64"),
            ],
            row_count,
        )
    }

    fn bar_mapping(catalog: &ChartCatalog) -> ColumnMapping {
        let bar = catalog.get(ChartKind::Bar).unwrap();
        let data = dataset(0);
        let mut mapping = ColumnMapping::for_chart(bar);
        let mapper = crate::mapping::ColumnMapper::new(bar, &data);
        mapper.assign(&mut mapping, AxisId::Category, "region").unwrap();
        mapper.assign(&mut mapping, AxisId::Value, "sales").unwrap();
        mapping
    }

    /// Bar chart without aggregation support and a threshold of 1000
    fn plain_bar_catalog() -> ChartCatalog {
        let catalog = ChartCatalog::default();
        let mut bar = catalog.get(ChartKind::Bar).unwrap().clone();
        bar.supported_aggregations = None;
        bar.sampling_threshold = 1000;
        catalog.with_chart(bar)
    }

    fn machine(catalog: ChartCatalog, rows: usize, backend: Rc<RecordingBackend>) -> WorkflowMachine {
        WorkflowMachine::new(catalog, dataset(rows), backend).with_session("s1")
    }

    #[test]
    fn test_large_dataset_routes_through_sampling() {
        let catalog = plain_bar_catalog();
        let mapping = bar_mapping(&catalog);
        let backend = Rc::new(RecordingBackend::default());
        let mut wf = machine(catalog, 2000, backend);

        wf.select_chart(ChartKind::Bar).unwrap();
        assert_eq!(wf.step(), WorkflowStep::ColumnMapping);
        wf.submit_mapping(mapping).unwrap();
        assert_eq!(wf.step(), WorkflowStep::SamplingSelection);

        wf.back().unwrap();
        assert_eq!(wf.step(), WorkflowStep::ColumnMapping);
        assert!(wf.state().column_mapping.is_empty());
        assert_eq!(wf.state().chart_type, Some(ChartKind::Bar));
    }

    #[test]
    fn test_small_dataset_goes_straight_to_visualization() {
        let catalog = plain_bar_catalog();
        let mapping = bar_mapping(&catalog);
        let mut wf = machine(catalog, 10, Rc::new(RecordingBackend::default()));
        wf.select_chart(ChartKind::Bar).unwrap();
        wf.submit_mapping(mapping).unwrap();
        assert_eq!(wf.step(), WorkflowStep::Visualization);
    }

    #[test]
    fn test_aggregating_chart_back_returns_to_aggregation() {
        let catalog = ChartCatalog::default();
        let mapping = bar_mapping(&catalog);
        let mut wf = machine(catalog, 2000, Rc::new(RecordingBackend::default()));

        wf.select_chart(ChartKind::Bar).unwrap();
        wf.submit_mapping(mapping.clone()).unwrap();
        assert_eq!(wf.step(), WorkflowStep::AggregationSelection);

        // Default bar threshold is 50
        wf.select_aggregation(AggregationMethod::Sum).unwrap();
        assert_eq!(wf.step(), WorkflowStep::SamplingSelection);
        wf.select_sampling(SamplingDecision::Apply(SamplingMethod::TopN)).unwrap();
        assert_eq!(wf.step(), WorkflowStep::Visualization);

        wf.back().unwrap();
        assert_eq!(wf.step(), WorkflowStep::AggregationSelection);
        assert_eq!(wf.state().aggregation_method, None);
        assert_eq!(wf.state().sampling_method, None);
        assert_eq!(wf.state().column_mapping, mapping);

        wf.back().unwrap();
        assert_eq!(wf.step(), WorkflowStep::ColumnMapping);
        assert!(wf.state().column_mapping.is_empty());

        wf.back().unwrap();
        assert_eq!(wf.state(), &WorkflowState::default());
    }

    #[test]
    fn test_rejected_events_leave_state_untouched() {
        let catalog = ChartCatalog::default();
        let backend = Rc::new(RecordingBackend::default());
        let mut wf = machine(catalog.clone(), 10, Rc::clone(&backend));

        wf.back().unwrap();
        let err = wf.submit_mapping(ColumnMapping::default()).unwrap_err();
        assert!(matches!(
            err,
            ChartflowError::Validation(ValidationError::InvalidTransition { .. })
        ));

        wf.select_chart(ChartKind::Pie).unwrap();
        let before = wf.state().clone();
        let persisted = backend.persisted.borrow().len();

        let incomplete = ColumnMapping::for_chart(catalog.get(ChartKind::Pie).unwrap());
        assert!(wf.submit_mapping(incomplete).is_err());
        assert!(wf.select_chart(ChartKind::Bar).is_err());
        assert!(wf.select_aggregation(AggregationMethod::Mean).is_err());
        assert_eq!(wf.state(), &before);
        assert_eq!(backend.persisted.borrow().len(), persisted);
    }

    #[test]
    fn test_unsupported_sampling_method_rejected() {
        let catalog = plain_bar_catalog();
        let mapping = bar_mapping(&catalog);
        let mut wf = machine(catalog, 5000, Rc::new(RecordingBackend::default()));
        wf.select_chart(ChartKind::Bar).unwrap();
        wf.submit_mapping(mapping).unwrap();

        let err = wf
            .select_sampling(SamplingDecision::Apply(SamplingMethod::Random))
            .unwrap_err();
        assert!(matches!(
            err,
            ChartflowError::Validation(ValidationError::UnsupportedMethod { .. })
        ));
        wf.select_sampling(SamplingDecision::Skip).unwrap();
        assert_eq!(wf.step(), WorkflowStep::Visualization);
    }

    #[test]
    fn test_incompatible_chart_rejected() {
        let catalog = ChartCatalog::default();
        let only_text = DatasetDescriptor::new(vec![ColumnDescriptor::new("name", "String")], 3);
        let mut wf = WorkflowMachine::new(catalog, only_text, Rc::new(RecordingBackend::default()));
        let err = wf.select_chart(ChartKind::Scatter).unwrap_err();
        assert!(matches!(
            err,
            ChartflowError::Validation(ValidationError::IncompatibleChart(ChartKind::Scatter))
        ));
    }

    #[test]
    fn test_every_transition_persists_full_state() {
        let catalog = plain_bar_catalog();
        let mapping = bar_mapping(&catalog);
        let backend = Rc::new(RecordingBackend::default());
        let mut wf = machine(catalog, 10, Rc::clone(&backend));
        wf.select_chart(ChartKind::Bar).unwrap();
        wf.submit_mapping(mapping).unwrap();
        wf.select_lens(Some("trend".into())).unwrap();

        let persisted = backend.persisted.borrow();
        assert_eq!(persisted.len(), 3);
        assert_eq!(persisted.last(), Some(wf.state()));
        assert_eq!(persisted[2].active_lens_id.as_deref(), Some("trend"));
    }

    #[test]
    fn test_persistence_failure_does_not_block() {
        let backend = Rc::new(RecordingBackend {
            failing: true,
            ..Default::default()
        });
        let mut wf = machine(ChartCatalog::default(), 10, backend);
        wf.select_chart(ChartKind::Line).unwrap();
        assert_eq!(wf.step(), WorkflowStep::ColumnMapping);
    }

    #[test]
    fn test_rehydrate_seeds_state() {
        let snapshot = WorkflowState {
            step: WorkflowStep::ColumnMapping,
            chart_type: Some(ChartKind::Line),
            ..Default::default()
        };
        let backend = Rc::new(RecordingBackend {
            snapshot: Some(snapshot.clone()),
            ..Default::default()
        });
        let mut wf = machine(ChartCatalog::default(), 10, backend);
        wf.rehydrate();
        assert_eq!(wf.state(), &snapshot);
        assert_eq!(wf.session_id(), Some("s1"));
    }

    #[test]
    fn test_rehydrate_failure_drops_session() {
        let backend = Rc::new(RecordingBackend {
            failing: true,
            ..Default::default()
        });
        let mut wf = machine(ChartCatalog::default(), 10, backend);
        wf.rehydrate();
        assert_eq!(wf.state(), &WorkflowState::default());
        assert_eq!(wf.session_id(), None);
    }

    #[test]
    fn test_remote_sampling_policy() {
        let catalog = plain_bar_catalog();
        let mapping = bar_mapping(&catalog);
        let backend = Rc::new(RecordingBackend {
            remote_sampling: true,
            ..Default::default()
        });
        // Row count alone would skip sampling
        let mut wf = machine(catalog, 10, backend).with_policy(SamplingPolicy::Remote);
        wf.select_chart(ChartKind::Bar).unwrap();
        wf.submit_mapping(mapping).unwrap();
        assert_eq!(wf.step(), WorkflowStep::SamplingSelection);
    }

    #[test]
    fn test_remote_sampling_failure_keeps_step() {
        let catalog = plain_bar_catalog();
        let mapping = bar_mapping(&catalog);
        let backend = Rc::new(RecordingBackend {
            failing: true,
            remote_sampling: true,
            ..Default::default()
        });
        let mut wf = machine(catalog, 10, Rc::clone(&backend)).with_policy(SamplingPolicy::Remote);
        wf.select_chart(ChartKind::Bar).unwrap();

        let err = wf.submit_mapping(mapping).unwrap_err();
        assert!(matches!(err, ChartflowError::Transport(TransportError::Request(_))));
        assert_eq!(wf.step(), WorkflowStep::ColumnMapping);
        assert!(wf.state().column_mapping.is_empty());
        assert!(backend.persisted.borrow().is_empty());
    }

    #[test]
    fn test_submitted_mapping_is_revalidated() {
        let catalog = ChartCatalog::default();
        let backend = Rc::new(RecordingBackend::default());
        let mut wf = machine(catalog, 10, Rc::clone(&backend));
        wf.select_chart(ChartKind::Bar).unwrap();
        let before = wf.state().clone();

        let swapped: ColumnMapping = serde_json::from_str(r#"{"category": "sales", "value": "region"}"#).unwrap();
        let err = wf.submit_mapping(swapped).unwrap_err();
        assert!(matches!(
            err,
            ChartflowError::Validation(ValidationError::KindMismatch { .. })
        ));

        let unknown: ColumnMapping = serde_json::from_str(r#"{"category": "region", "value": "profit"}"#).unwrap();
        assert!(matches!(
            wf.submit_mapping(unknown).unwrap_err(),
            ChartflowError::Validation(ValidationError::UnknownColumn(_))
        ));

        let stray_axis: ColumnMapping =
            serde_json::from_str(r#"{"category": "region", "value": "sales", "x": "units"}"#).unwrap();
        assert!(matches!(
            wf.submit_mapping(stray_axis).unwrap_err(),
            ChartflowError::Validation(ValidationError::AxisNotRequired { .. })
        ));

        assert_eq!(wf.state(), &before);
        assert_eq!(backend.persisted.borrow().len(), 1);
    }

    #[test]
    fn test_state_round_trips_as_snake_case_json() {
        let state = WorkflowState {
            step: WorkflowStep::SamplingSelection,
            chart_type: Some(ChartKind::Scatter),
            sampling_method: Some(SamplingDecision::Apply(SamplingMethod::Random)),
            ..Default::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["step"], "sampling_selection");
        assert_eq!(json["chart_type"], "scatter");
        let back: WorkflowState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
