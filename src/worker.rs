//! # Worker Dispatch
//!
//! Runs bulk decryption jobs on dedicated threads and reports back over a
//! channel, so callers on an interactive thread never block on the KDF or on
//! page I/O.
//!
//! Cheap checks (input existence; the key was already decoded when the job
//! was built) run on the caller's thread inside [`WorkerDispatch::dispatch`]
//! and fail fast. Everything else happens on the worker.
//!
//! Each job owns its key material, buffers and output file. Jobs share
//! nothing, so any number of them may run at once.

use crate::builders::DecryptJob;
use crate::decryption::run_cancellable;
use crate::error::DecryptError;
use crossbeam::channel::{unbounded, Receiver};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// What a running job reports.
#[derive(Debug)]
pub enum JobEvent {
    Progress { done: u64, total: u64 },
    Completed(PathBuf),
    Failed(DecryptError),
}

/// Caller's side of one dispatched job.
///
/// Dropping the handle requests cancellation without waiting for the worker.
pub struct JobHandle {
    id: u64,
    events: Receiver<JobEvent>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Raw event stream. Exactly one `Completed` or `Failed` ends it.
    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Ask the worker to stop before its next page.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Block until the job ends.
    pub fn wait(self) -> Result<PathBuf, DecryptError> {
        self.wait_with_progress(|_, _| {})
    }

    /// Block until the job ends, forwarding progress to `on_progress` on the
    /// calling thread.
    pub fn wait_with_progress<F>(mut self, mut on_progress: F) -> Result<PathBuf, DecryptError>
    where
        F: FnMut(u64, u64),
    {
        let mut outcome = None;
        for event in self.events.iter() {
            match event {
                JobEvent::Progress { done, total } => on_progress(done, total),
                JobEvent::Completed(path) => {
                    outcome = Some(Ok(path));
                    break;
                }
                JobEvent::Failed(err) => {
                    outcome = Some(Err(err));
                    break;
                }
            }
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                return Err(DecryptError::Worker(format!("job {} panicked", self.id)));
            }
        }
        outcome.unwrap_or_else(|| {
            Err(DecryptError::Worker(format!(
                "job {} ended without a result",
                self.id
            )))
        })
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel();
        }
    }
}

/// Spawns one named worker thread per job.
#[derive(Debug)]
pub struct WorkerDispatch {
    thread_prefix: String,
    next_id: AtomicU64,
}

impl Default for WorkerDispatch {
    fn default() -> Self {
        Self::new("wxdb-decrypt")
    }
}

impl WorkerDispatch {
    pub fn new(thread_prefix: impl Into<String>) -> Self {
        Self {
            thread_prefix: thread_prefix.into(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Start `job` in the background.
    ///
    /// # Errors
    ///
    /// [`DecryptError::FileNotFound`] synchronously if the input is missing;
    /// [`DecryptError::Worker`] if the thread cannot be spawned. All other
    /// failures arrive as [`JobEvent::Failed`].
    pub fn dispatch(&self, job: DecryptJob) -> Result<JobHandle, DecryptError> {
        job.precheck()?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);

        let thread = thread::Builder::new()
            .name(format!("{}-{id}", self.thread_prefix))
            .spawn(move || {
                let progress_tx = tx.clone();
                let progress_cancel = Arc::clone(&worker_cancel);
                let on_progress = move |done, total| {
                    if progress_tx.send(JobEvent::Progress { done, total }).is_err() {
                        // nobody is listening any more
                        progress_cancel.store(true, Ordering::Relaxed);
                    }
                };

                let event = match run_cancellable(job, on_progress, &worker_cancel) {
                    Ok(path) => JobEvent::Completed(path),
                    Err(err) => {
                        tracing::warn!(job = id, error = %err, "decryption job failed");
                        JobEvent::Failed(err)
                    }
                };
                let _ = tx.send(event);
            })
            .map_err(|e| DecryptError::Worker(e.to_string()))?;

        tracing::debug!(job = id, "decryption job dispatched");
        Ok(JobHandle {
            id,
            events: rx,
            cancel,
            thread: Some(thread),
        })
    }
}
