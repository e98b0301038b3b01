//! The unit of work inside a flow.

use super::errors::StepResult;
use super::types::{Context, FlowState};

/// One stage of an analyze or export flow.
///
/// [`Pipeline`](super::Pipeline) calls `validate_input`, then `execute`,
/// then `validate_output`, stopping at the first error. Steps read their
/// inputs from their own fields or from earlier steps' entries in
/// [`FlowState`], and report milestones through
/// [`Context::report_progress`].
pub trait PipelineStep: Send + Sync {
    fn name(&self) -> &str;

    /// Preconditions that can be checked before any work starts.
    fn validate_input(&self, ctx: &Context) -> StepResult<()>;

    fn execute(&self, ctx: &Context, state: &mut FlowState) -> StepResult<()>;

    /// Confirm `execute` left its output in `state`.
    fn validate_output(&self, ctx: &Context, state: &FlowState) -> StepResult<()>;

    /// Phase title for the flow log.
    fn description(&self) -> &str {
        self.name()
    }
}
