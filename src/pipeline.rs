// Visualization session: workflow, row loading, lenses and the chart surfaces

use std::rc::Rc;

use crate::chart::{AggregationMethod, AxisId, ChartKind, SamplingDecision};
use crate::dataset::PreparedRow;
use crate::error::{Result, TransportError, ValidationError};
use crate::ir::ChartTitles;
use crate::lens::{EvaluationContext, LensConfig};
use crate::mapping::{ColumnMapper, ColumnMapping};
use crate::render::{RenderOutcome, RenderRequest};
use crate::session::{DataBackend, LensBackend, RowQuery};
use crate::surface::HybridSurfaceController;
use crate::workflow::{WorkflowMachine, WorkflowState, WorkflowStep};

/// Identifies one row fetch. Only the newest ticket for the current query commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowTicket {
    generation: u64,
    key: RowQuery,
}

impl RowTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> &RowQuery {
        &self.key
    }
}

/// Everything one user sees while building and viewing a chart.
pub struct VisualizationSession {
    workflow: WorkflowMachine,
    surface: HybridSurfaceController,
    data: Rc<dyn DataBackend>,
    lenses: Rc<dyn LensBackend>,
    draft: ColumnMapping,
    generation: u64,
    loading: bool,
    rows: Option<Vec<PreparedRow>>,
    rows_key: Option<RowQuery>,
    error: Option<String>,
    available_lenses: Vec<LensConfig>,
    override_domain: Option<(f64, f64)>,
}

impl VisualizationSession {
    pub fn new(
        workflow: WorkflowMachine,
        surface: HybridSurfaceController,
        data: Rc<dyn DataBackend>,
        lenses: Rc<dyn LensBackend>,
    ) -> Self {
        let mut session = Self {
            workflow,
            surface,
            data,
            lenses,
            draft: ColumnMapping::default(),
            generation: 0,
            loading: false,
            rows: None,
            rows_key: None,
            error: None,
            available_lenses: Vec::new(),
            override_domain: None,
        };
        session.sync_draft();
        session
    }

    /// Restore persisted workflow state and start over on rows
    pub fn rehydrate(&mut self) -> Result<()> {
        self.workflow.rehydrate();
        self.sync_draft();
        self.invalidate_rows()
    }

    pub fn workflow(&self) -> &WorkflowMachine {
        &self.workflow
    }

    pub fn state(&self) -> &WorkflowState {
        self.workflow.state()
    }

    pub fn surface(&self) -> &HybridSurfaceController {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut HybridSurfaceController {
        &mut self.surface
    }

    /// The mapping being edited in the column mapping step
    pub fn draft(&self) -> &ColumnMapping {
        &self.draft
    }

    pub fn rows(&self) -> Option<&[PreparedRow]> {
        self.rows.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last transport failure, for display
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    // -- Workflow ------------------------------------------------------------

    pub fn select_chart(&mut self, kind: ChartKind) -> Result<()> {
        self.workflow.select_chart(kind)?;
        self.after_transition()
    }

    pub fn assign_column(&mut self, axis: AxisId, column: &str) -> Result<(), ValidationError> {
        let chart = self.workflow.active_chart().ok_or(ValidationError::NoChartSelected)?;
        ColumnMapper::new(chart, self.workflow.dataset()).assign(&mut self.draft, axis, column)
    }

    pub fn clear_column(&mut self, axis: AxisId) -> Result<(), ValidationError> {
        let chart = self.workflow.active_chart().ok_or(ValidationError::NoChartSelected)?;
        ColumnMapper::new(chart, self.workflow.dataset()).clear(&mut self.draft, axis);
        Ok(())
    }

    pub fn submit_mapping(&mut self) -> Result<()> {
        self.workflow.submit_mapping(self.draft.clone())?;
        self.after_transition()
    }

    pub fn select_aggregation(&mut self, method: AggregationMethod) -> Result<()> {
        self.workflow.select_aggregation(method)?;
        self.after_transition()
    }

    pub fn select_sampling(&mut self, decision: SamplingDecision) -> Result<()> {
        self.workflow.select_sampling(decision)?;
        self.after_transition()
    }

    pub fn back(&mut self) -> Result<()> {
        self.workflow.back()?;
        self.after_transition()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.workflow.reset()?;
        self.after_transition()
    }

    /// Drop everything derived from the previous step, unless the loaded rows still answer the current query
    fn after_transition(&mut self) -> Result<()> {
        self.sync_draft();
        let current = self.workflow.state().row_query();
        if self.workflow.step() == WorkflowStep::Visualization && self.rows_key.is_some() && self.rows_key == current {
            return Ok(());
        }
        self.invalidate_rows()
    }

    fn invalidate_rows(&mut self) -> Result<()> {
        self.generation += 1;
        self.loading = false;
        self.rows = None;
        self.rows_key = None;
        self.available_lenses.clear();
        self.override_domain = None;
        self.surface.clear()?;
        Ok(())
    }

    fn sync_draft(&mut self) {
        if self.workflow.step() != WorkflowStep::ColumnMapping {
            return;
        }
        self.draft = self.workflow.state().column_mapping.clone();
        if self.draft.is_empty() {
            if let Some(chart) = self.workflow.active_chart() {
                self.draft = ColumnMapping::for_chart(chart);
            }
        }
    }

    // -- Rows ----------------------------------------------------------------

    /// Start a row fetch for the current state, superseding any in flight.
    ///
    /// `None` outside the visualization step or while the mapping is incomplete.
    pub fn begin_row_fetch(&mut self) -> Option<RowTicket> {
        if self.workflow.step() != WorkflowStep::Visualization {
            return None;
        }
        let chart = self.workflow.active_chart()?;
        let key = self.workflow.state().row_query()?;
        if !key.mapping.is_complete(chart) {
            return None;
        }

        self.generation += 1;
        self.loading = true;
        self.error = None;
        Some(RowTicket {
            generation: self.generation,
            key,
        })
    }

    /// Ask the data backend for a ticket's rows
    pub fn fetch_rows(&self, ticket: &RowTicket) -> Result<Vec<PreparedRow>, TransportError> {
        let session_id = self
            .workflow
            .session_id()
            .ok_or_else(|| TransportError::Request("No active session".to_string()))?;
        self.data.fetch_prepared_rows(session_id, &ticket.key)
    }

    /// Commit a fetch result. Returns `false` if the ticket went stale.
    pub fn complete_row_fetch(
        &mut self,
        ticket: RowTicket,
        result: Result<Vec<PreparedRow>, TransportError>,
    ) -> Result<bool> {
        let current = self.workflow.state().row_query();
        if ticket.generation != self.generation || current.as_ref() != Some(&ticket.key) {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale row response"
            );
            return Ok(false);
        }

        self.loading = false;
        match result {
            Ok(rows) => {
                self.rows = Some(rows);
                self.rows_key = Some(ticket.key);
                self.render()?;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to fetch chart rows");
                self.error = Some(err.to_string());
            }
        }
        Ok(true)
    }

    /// Fetch and commit in one go
    pub fn load_rows(&mut self) -> Result<bool> {
        let Some(ticket) = self.begin_row_fetch() else {
            return Ok(false);
        };
        let result = self.fetch_rows(&ticket);
        self.complete_row_fetch(ticket, result)
    }

    // -- Rendering -----------------------------------------------------------

    /// Draw the loaded rows. Does nothing unless the mapping is complete.
    pub fn render(&mut self) -> Result<Option<RenderOutcome>> {
        if self.workflow.step() != WorkflowStep::Visualization {
            return Ok(None);
        }
        let Some(chart) = self.workflow.active_chart() else {
            return Ok(None);
        };
        let state = self.workflow.state();
        if !state.column_mapping.is_complete(chart) {
            return Ok(None);
        }
        let Some(rows) = &self.rows else {
            return Ok(None);
        };

        let titles = ChartTitles::new(
            chart.name.as_str(),
            state.column_mapping.x_column().unwrap_or_default(),
            state.column_mapping.y_column().unwrap_or_default(),
        );
        let request = RenderRequest::new(chart.id, rows.clone(), titles).with_override_domain(self.override_domain);
        Ok(Some(self.surface.render(request)?))
    }

    /// Apply a pending container resize, if any
    pub fn process_resize(&mut self) -> Result<bool> {
        Ok(self.surface.process_resize()?)
    }

    // -- Lenses --------------------------------------------------------------

    pub fn available_lenses(&self) -> &[LensConfig] {
        &self.available_lenses
    }

    pub fn active_lens(&self) -> Option<&LensConfig> {
        let id = self.workflow.state().active_lens_id.as_deref()?;
        self.available_lenses.iter().find(|lens| lens.id == id)
    }

    pub fn override_domain(&self) -> Option<(f64, f64)> {
        self.override_domain
    }

    /// Ask the lens backend which lenses fit the current chart
    pub fn refresh_lenses(&mut self) -> Result<()> {
        let context = EvaluationContext::new(self.workflow.state(), self.workflow.dataset());
        match self.lenses.fetch_compatible_lenses(&context) {
            Ok(lenses) => {
                tracing::debug!(count = lenses.len(), "Fetched compatible lenses");
                self.available_lenses = lenses;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to fetch compatible lenses");
                self.error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Activate a lens, or deactivate with `None`. Any change of lens drops the override.
    pub fn select_lens(&mut self, lens_id: Option<&str>) -> Result<()> {
        if let Some(id) = lens_id {
            if !self.available_lenses.iter().any(|lens| lens.id == id) {
                return Err(ValidationError::UnknownLens(id.to_string()).into());
            }
        }
        let changed = self.workflow.state().active_lens_id.as_deref() != lens_id;
        self.workflow.select_lens(lens_id.map(str::to_string))?;
        if changed && self.override_domain.take().is_some() {
            self.render()?;
        }
        Ok(())
    }

    /// Replace the value-axis domain while a lens is active
    pub fn set_override_domain(&mut self, min: f64, max: f64) -> Result<()> {
        if self.active_lens().is_none() {
            return Err(ValidationError::NoActiveLens.into());
        }
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(ValidationError::InvalidDomain(min, max).into());
        }
        self.override_domain = Some((min, max));
        self.render()?;
        Ok(())
    }

    pub fn clear_override_domain(&mut self) -> Result<()> {
        if self.override_domain.take().is_some() {
            self.render()?;
        }
        Ok(())
    }
}
