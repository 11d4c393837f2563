//! Background execution of report jobs.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::error;

use crate::error::ReportError;
use crate::report::{ReportJob, ReportSummary};
use crate::store::DataStore;

/// Externally observable "report created" flag.
///
/// Cleared when a run starts and set only when the run succeeds.
#[derive(Clone, Debug, Default)]
pub struct CompletionFlag(Arc<AtomicBool>);

impl CompletionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, value: bool) {
        self.0.store(value, Ordering::Release);
    }
}

/// A report job running on its own thread.
///
/// There is no cancellation: once spawned the job runs to completion or failure.
pub struct ReportTask {
    handle: JoinHandle<Result<ReportSummary, ReportError>>,
    flag: CompletionFlag,
}

impl ReportTask {
    /// Starts `job` against `store` on a worker thread, reporting completion through `flag`.
    pub fn spawn<S>(job: ReportJob, store: S, flag: CompletionFlag) -> Result<Self, ReportError>
    where
        S: DataStore + Send + 'static,
    {
        flag.set(false);
        let worker_flag = flag.clone();
        let handle = thread::Builder::new()
            .name("store-report".into())
            .spawn(move || {
                let result = job.run(&store);
                match &result {
                    Ok(_) => worker_flag.set(true),
                    Err(err) => {
                        worker_flag.set(false);
                        error!("Report creation failed: {err}");
                    }
                }
                result
            })?;
        Ok(Self { handle, flag })
    }

    /// The flag this task reports to.
    pub fn flag(&self) -> &CompletionFlag {
        &self.flag
    }

    /// Whether the worker has stopped, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the worker and returns its result.
    pub fn join(self) -> Result<ReportSummary, ReportError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => {
                self.flag.set(false);
                error!("Report task panicked: {}", panic_message(&panic));
                Err(ReportError::TaskPanicked)
            }
        }
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
