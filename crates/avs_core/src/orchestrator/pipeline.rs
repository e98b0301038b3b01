//! Sequential step runner.

use std::time::{Duration, Instant};

use super::errors::FlowResult;
use super::step::PipelineStep;
use super::types::{Context, FlowState};

/// Ordered sequence of steps.
///
/// The first failing step aborts the run; its error is returned as is.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Chaining form of [`Pipeline::add_step`].
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Run every step against the shared context and state.
    pub fn run(&self, ctx: &Context, state: &mut FlowState) -> FlowResult<PipelineRunResult> {
        let mut result = PipelineRunResult::default();

        for step in &self.steps {
            let name = step.name();
            let started = Instant::now();
            ctx.logger.phase(step.description());

            stage(ctx, name, "input validation", || step.validate_input(ctx))?;
            stage(ctx, name, "execution", || step.execute(ctx, state))?;
            stage(ctx, name, "output validation", || step.validate_output(ctx, state))?;

            let elapsed = started.elapsed();
            ctx.logger
                .success(&format!("{} completed in {:.2}s", name, elapsed.as_secs_f64()));
            result.steps_completed.push(name.to_string());
            result.elapsed.push(elapsed);
        }

        Ok(result)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Step names in run order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Steps that completed, in order, with their wall time.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    pub steps_completed: Vec<String>,
    pub elapsed: Vec<Duration>,
}

fn stage<F>(ctx: &Context, step: &str, what: &str, f: F) -> FlowResult<()>
where
    F: FnOnce() -> FlowResult<()>,
{
    ctx.logger.debug(&format!("{}: {}", step, what));
    f().map_err(|e| {
        ctx.logger.error(&format!("{} failed during {}: {}", step, what, e));
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::logging::{JobLogger, LogConfig};
    use crate::orchestrator::errors::{FlowError, StepResult};
    use crate::orchestrator::scratch::ScratchDir;
    use crate::orchestrator::types::ProgressReporter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingStep {
        name: &'static str,
        counter: Arc<AtomicUsize>,
        fail_execute: bool,
    }

    impl PipelineStep for CountingStep {
        fn name(&self) -> &str {
            self.name
        }

        fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut FlowState) -> StepResult<()> {
            self.counter.fetch_add(1, Ordering::SeqCst);
            if self.fail_execute {
                return Err(FlowError::invalid_input("boom"));
            }
            Ok(())
        }

        fn validate_output(&self, _ctx: &Context, _state: &FlowState) -> StepResult<()> {
            Ok(())
        }
    }

    fn test_context(dir: &std::path::Path) -> Context {
        let logger = JobLogger::new("test", dir.join("logs"), LogConfig::default(), None).unwrap();
        let scratch = ScratchDir::create(dir.join("tmp")).unwrap();
        Context::new(
            Settings::default(),
            "test",
            Arc::new(logger),
            scratch,
            ProgressReporter::default(),
        )
    }

    #[test]
    fn runs_steps_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let counter = Arc::new(AtomicUsize::new(0));

        let pipeline = Pipeline::new()
            .with_step(CountingStep {
                name: "First",
                counter: counter.clone(),
                fail_execute: false,
            })
            .with_step(CountingStep {
                name: "Second",
                counter: counter.clone(),
                fail_execute: false,
            });

        assert_eq!(pipeline.step_names(), vec!["First", "Second"]);

        let mut state = FlowState::new("test");
        let result = pipeline.run(&ctx, &mut state).unwrap();
        assert_eq!(result.steps_completed, vec!["First", "Second"]);
        assert_eq!(result.elapsed.len(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let counter = Arc::new(AtomicUsize::new(0));

        let pipeline = Pipeline::new()
            .with_step(CountingStep {
                name: "Failing",
                counter: counter.clone(),
                fail_execute: true,
            })
            .with_step(CountingStep {
                name: "Never",
                counter: counter.clone(),
                fail_execute: false,
            });

        let mut state = FlowState::new("test");
        let err = pipeline.run(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.step_count(), 2);

        ctx.logger.flush();
        let log = std::fs::read_to_string(ctx.logger.log_path()).unwrap();
        assert!(log.contains("Failing failed during execution: Invalid input: boom"));
        assert!(!log.contains("=== Never ==="));
    }
}
