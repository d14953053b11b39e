//! Background delivery workers.
//!
//! Each accepted job gets its own task so the command handler can return
//! right after the acknowledgement.

use super::channel::{Reply, ReplyChannel};
use super::views;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Spawns delivery workers and counts how many were started.
#[derive(Debug, Clone, Default)]
pub struct JobDispatcher {
    started: Arc<AtomicUsize>,
}

impl JobDispatcher {
    /// Create a dispatcher with a zero counter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of workers started so far
    #[must_use]
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Run `work` in the background.
    ///
    /// A failure is logged and the requester gets one best-effort notice on
    /// `channel`; replies already sent stay as they are.
    pub fn dispatch<F, E>(
        &self,
        label: &str,
        channel: Arc<dyn ReplyChannel>,
        work: F,
    ) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let worker = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        let label = label.to_string();
        info!(worker, job = %label, "Starting delivery worker");

        tokio::spawn(async move {
            match work.await {
                Ok(()) => info!(worker, job = %label, "Delivery worker finished"),
                Err(e) => {
                    error!(worker, job = %label, error = %e, "Delivery worker failed");
                    if let Err(send_err) = channel.send(Reply::Text(views::delivery_failure())).await
                    {
                        warn!(worker, error = %send_err, "Failed to send failure notice");
                    }
                }
            }
        })
    }
}
