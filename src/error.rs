// Error taxonomy for the visualization pipeline

use thiserror::Error;

use crate::chart::{AxisId, AxisKind, ChartKind};

/// Rejected locally; never reaches a renderer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Column '{column}' is {actual} but axis '{axis}' requires a {expected} column")]
    KindMismatch {
        axis: AxisId,
        column: String,
        expected: AxisKind,
        actual: AxisKind,
    },
    #[error("Column '{column}' is already assigned to axis '{assigned_to}'")]
    ColumnInUse { column: String, assigned_to: AxisId },
    #[error("Column '{0}' not found in dataset")]
    UnknownColumn(String),
    #[error("Axis '{axis}' is not used by the {chart} chart")]
    AxisNotRequired { axis: AxisId, chart: ChartKind },
    #[error("Column mapping is incomplete for the {chart} chart (missing: {missing})")]
    IncompleteMapping { chart: ChartKind, missing: String },
    #[error("No chart type has been selected")]
    NoChartSelected,
    #[error("The dataset lacks the columns the {0} chart needs")]
    IncompatibleChart(ChartKind),
    #[error("Chart type '{0}' is not in the chart catalog")]
    UnknownChart(String),
    #[error("'{event}' is not valid while in the {step} step")]
    InvalidTransition { event: &'static str, step: &'static str },
    #[error("The {chart} chart does not support the '{method}' method")]
    UnsupportedMethod { chart: ChartKind, method: String },
    #[error("Lens '{0}' is not available for this chart")]
    UnknownLens(String),
    #[error("No lens is active")]
    NoActiveLens,
    #[error("Invalid override domain [{0}, {1}]")]
    InvalidDomain(f64, f64),
}

/// A failed fetch or persist against an external collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Session '{0}' not found")]
    SessionNotFound(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

/// Failure of the assistant's text stream.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("Stream failed: {0}")]
    Remote(String),
    #[error("A stream is already in progress")]
    AlreadyStreaming,
    #[error("No stream is in progress")]
    NotStreaming,
    #[error("Open assistant message is missing from history")]
    PlaceholderLost,
}

#[derive(Error, Debug)]
pub enum ChartflowError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
    #[error("Render error: {0}")]
    Render(#[from] anyhow::Error),
}

pub type Result<T, E = ChartflowError> = std::result::Result<T, E>;
