//! Flow orchestration: analyze and export.
//!
//! Each flow is a [`Pipeline`] of [`PipelineStep`]s sharing a read-only
//! [`Context`] and a mutable [`FlowState`].
//!
//! # Architecture
//!
//! ```text
//! Analyze
//!     ├── Step: IngestBoth (or ExtractVideoAudio + LoadExternalAudio)
//!     └── Step: EstimateOffset
//!
//! Export
//!     ├── Step: ApplyOffset
//!     └── Step: Encode
//! ```
//!
//! # Example
//!
//! ```no_run
//! use avs_core::config::Settings;
//! use avs_core::orchestrator::{run_analyze, AnalyzeRequest, FlowObserver};
//!
//! let settings = Settings::default();
//! let request = AnalyzeRequest::new("clip.mp4", "voice.wav");
//! let result = run_analyze(request, &settings, FlowObserver::default()).unwrap();
//! println!("{}", result.interpretation());
//! ```

mod errors;
mod flows;
mod pipeline;
mod runner;
mod scratch;
mod step;
pub mod steps;
mod task;
mod types;

pub use errors::{FlowError, FlowErrorKind, FlowResult, StepResult};
pub use flows::{run_analyze, run_export, AnalyzeRequest, ExportOutcome, FlowObserver};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use runner::{ToolOutput, ToolRunner};
pub use scratch::ScratchDir;
pub use step::PipelineStep;
pub use task::{spawn_analyze, spawn_export, FlowEvent, FlowTask, SlotGuard, TaskSlot};
pub use types::{
    AlignedOutput, Context, EncodeOutput, FlowState, ProgressCallback, ProgressEvent,
    ProgressReporter,
};
