// Library exports for chartflow

pub mod chart;
pub mod chat;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod lens;
pub mod mapping;
pub mod prepare;
pub mod session;
pub mod sse;
pub mod workflow;

// Rendering
pub mod ir;
pub mod render;
pub mod scale;
pub mod surface;

pub mod pipeline;

pub use chart::{AggregationMethod, AxisId, AxisKind, ChartCatalog, ChartDescriptor, ChartKind, SamplingDecision, SamplingMethod};
pub use chat::{ChatMessage, ChatStreamAssembler, Role, StreamEvent};
pub use config::{PrepareConfig, RenderConfig};
pub use dataset::{ColumnDescriptor, DatasetDescriptor, PreparedRow, Scalar};
pub use error::{ChartflowError, Result, StreamError, TransportError, ValidationError};
pub use ir::{ChartTitles, Dimensions, SceneGraph};
pub use mapping::{ColumnMapper, ColumnMapping};
pub use pipeline::{RowTicket, VisualizationSession};
pub use render::{RenderOutcome, RenderRequest};
pub use scale::ScaleFactory;
pub use session::{DataBackend, InMemoryBackend, LensBackend, RowQuery};
pub use surface::{HybridSurfaceController, Observation, ResizeObserver};
pub use workflow::{WorkflowEvent, WorkflowMachine, WorkflowState, WorkflowStep};
