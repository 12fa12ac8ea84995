//! Heartbeat manager
//!
//! One timer task per claimed message. The task sleeps `heartbeat_delay`,
//! extends the claim, and repeats until stopped.

use crate::backend::{BackendError, WrappedMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

pub(crate) struct HeartbeatHandle {
    cancelled: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatHandle {
    /// Spawn the heartbeat loop; `on_error` receives every failed heartbeat
    pub fn start<F>(message: Arc<dyn WrappedMessage>, delay: Duration, on_error: F) -> Self
    where
        F: Fn(BackendError) + Send + Sync + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(delay).await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                if let Err(e) = message.heartbeat().await {
                    log::warn!("Heartbeat failed for message: {}", e);
                    on_error(e);
                }
            }
        });

        Self {
            cancelled,
            task: Mutex::new(Some(task)),
        }
    }

    /// Cancel the loop. Idempotent.
    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::Release);
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
