//! Background execution of flows.
//!
//! A flow runs on a tokio blocking thread. Its progress (and optionally its
//! log lines) arrive on an unbounded channel, and the terminal result is
//! awaited separately. A [`TaskSlot`] admits one task at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::logging::LogCallback;
use crate::models::{JobDescriptor, SyncResult};

use super::errors::{FlowError, FlowResult};
use super::flows::{run_analyze, run_export, AnalyzeRequest, ExportOutcome, FlowObserver};
use super::types::{ProgressCallback, ProgressEvent};

/// Event delivered while a task runs.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    Progress(ProgressEvent),
    Log(String),
}

/// Admission control: at most one running task per slot.
#[derive(Debug, Clone, Default)]
pub struct TaskSlot {
    busy: Arc<AtomicBool>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Claim the slot, or fail with [`FlowError::Busy`].
    pub fn try_acquire(&self) -> FlowResult<SlotGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| FlowError::Busy)?;
        Ok(SlotGuard {
            busy: Arc::clone(&self.busy),
        })
    }
}

/// Releases the slot when dropped.
#[derive(Debug)]
pub struct SlotGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Handle to a running flow.
pub struct FlowTask<T> {
    events: mpsc::UnboundedReceiver<FlowEvent>,
    handle: JoinHandle<FlowResult<T>>,
}

impl<T: Send + 'static> FlowTask<T> {
    /// Must be called from within a tokio runtime.
    fn spawn<F>(slot: &TaskSlot, forward_logs: bool, run: F) -> FlowResult<Self>
    where
        F: FnOnce(FlowObserver) -> FlowResult<T> + Send + 'static,
    {
        let guard = slot.try_acquire()?;
        let (tx, events) = mpsc::unbounded_channel();

        let progress_tx = tx.clone();
        let progress: ProgressCallback = Box::new(move |event: &ProgressEvent| {
            let _ = progress_tx.send(FlowEvent::Progress(event.clone()));
        });
        let log: Option<LogCallback> = if forward_logs {
            Some(Box::new(move |line: &str| {
                let _ = tx.send(FlowEvent::Log(line.to_string()));
            }))
        } else {
            None
        };

        let observer = FlowObserver {
            progress: Some(progress),
            log,
        };
        let handle = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            run(observer)
        });

        Ok(Self { events, handle })
    }

    /// Next event, or `None` once the flow has finished.
    pub async fn next_event(&mut self) -> Option<FlowEvent> {
        self.events.recv().await
    }

    /// Await the terminal result.
    pub async fn join(self) -> FlowResult<T> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(FlowError::TaskPanicked(e.to_string())),
        }
    }

    /// Drain events into `on_event`, then return the terminal result.
    pub async fn wait_with<F>(mut self, mut on_event: F) -> FlowResult<T>
    where
        F: FnMut(FlowEvent),
    {
        while let Some(event) = self.events.recv().await {
            on_event(event);
        }
        self.join().await
    }
}

/// Start an analyze flow in the background.
pub fn spawn_analyze(
    slot: &TaskSlot,
    request: AnalyzeRequest,
    settings: Settings,
    forward_logs: bool,
) -> FlowResult<FlowTask<SyncResult>> {
    FlowTask::spawn(slot, forward_logs, move |observer| {
        run_analyze(request, &settings, observer)
    })
}

/// Start an export flow in the background.
pub fn spawn_export(
    slot: &TaskSlot,
    job: JobDescriptor,
    settings: Settings,
    forward_logs: bool,
) -> FlowResult<FlowTask<ExportOutcome>> {
    FlowTask::spawn(slot, forward_logs, move |observer| {
        run_export(job, &settings, observer)
    })
}
