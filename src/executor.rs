//! Device execution context
//!
//! All hardware-touching work runs on a single dedicated thread, one job at
//! a time, in submission order. The inbound message path submits work here
//! and never waits for it; replies are produced from inside the job once the
//! tool handler returns.
//!
//! Jobs may block (camera HTTP, display I/O). The thread is not a tokio
//! worker, so blocking is safe. There is no preemption, timeout, or
//! cancellation: once scheduled, a job runs to completion.

use std::sync::mpsc;
use std::thread;

use tracing::{debug, error};

use crate::error::{McpError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the device execution thread
///
/// Cloning the handle shares the same queue. The thread exits once every
/// handle has been dropped and the queue has drained.
#[derive(Clone)]
pub struct DeviceExecutor {
    tx: mpsc::Sender<Job>,
}

impl DeviceExecutor {
    /// Spawn the device thread and return a handle to its queue
    pub fn start() -> Self {
        let (tx, rx) = mpsc::channel::<Job>();

        thread::Builder::new()
            .name("device-executor".to_string())
            .spawn(move || {
                debug!("device executor started");
                while let Ok(job) = rx.recv() {
                    // A panicking job must not take the device thread down
                    // with it; later submissions still need to run.
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job));
                    if outcome.is_err() {
                        error!("device job panicked");
                    }
                }
                debug!("device executor stopped");
            })
            .expect("failed to spawn device executor thread");

        Self { tx }
    }

    /// Queue a job for serialized execution on the device thread
    ///
    /// Non-blocking; fails only if the device thread is gone.
    pub fn schedule<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx
            .send(Box::new(job))
            .map_err(|_| McpError::ExecutorUnavailable.into())
    }
}
