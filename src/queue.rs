//! Work Queue & Worker
//!
//! Producers append prompts without blocking; exactly one background worker
//! takes them in arrival order and runs them through a [`PageCreator`], so
//! generations never overlap.

use crate::error::ApiError;
use crate::generation::{GenerationFailure, PageCreator};
use crate::store::PageName;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Result delivered to `enqueue_and_wait` callers
pub type GenerationOutcome = Result<PageName, GenerationFailure>;

/// `[queue]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Longest idle wait before the worker re-checks for work (milliseconds)
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Pause after a worker-level fault before taking the next prompt (milliseconds)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_idle_poll_ms() -> u64 {
    100
}

fn default_cooldown_ms() -> u64 {
    1000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            idle_poll_ms: default_idle_poll_ms(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// Consistent snapshot of the worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    /// Prompts waiting, excluding the one in flight
    pub queue_depth: usize,
    /// True exactly while the worker holds a prompt
    pub is_processing: bool,
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub completed: usize,
    pub failed: usize,
}

struct QueueItem {
    prompt: String,
    reply: Option<oneshot::Sender<GenerationOutcome>>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueueItem>,
    is_processing: bool,
    stats: QueueStats,
}

/// FIFO prompt queue with a single worker
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct PageQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
    running: Arc<RwLock<bool>>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
    config: QueueConfig,
}

impl Default for PageQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

impl PageQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            notify: Arc::new(Notify::new()),
            running: Arc::new(RwLock::new(false)),
            worker: Arc::new(Mutex::new(None)),
            config,
        }
    }

    /// Append a prompt; returns the queue depth after insertion
    pub fn enqueue(&self, prompt: impl Into<String>) -> usize {
        self.push(QueueItem {
            prompt: prompt.into(),
            reply: None,
        })
    }

    /// Append a prompt and wait for the worker to finish it
    pub async fn enqueue_and_wait(&self, prompt: impl Into<String>) -> GenerationOutcome {
        let (tx, rx) = oneshot::channel();
        self.push(QueueItem {
            prompt: prompt.into(),
            reply: Some(tx),
        });
        rx.await.map_err(|_| GenerationFailure {
            reason: "Generation worker stopped before finishing the request".to_string(),
            attempts: 0,
        })?
    }

    pub fn status(&self) -> QueueStatus {
        let state = self.state.lock();
        QueueStatus {
            queue_depth: state.pending.len(),
            is_processing: state.is_processing,
        }
    }

    pub fn stats(&self) -> QueueStats {
        self.state.lock().stats
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    /// Spawn the worker; a second call while running is a no-op
    pub fn start(&self, creator: Arc<dyn PageCreator>) -> Result<(), ApiError> {
        let mut running = self.running.write();
        if *running {
            return Ok(());
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ApiError::QueueError(
                "Worker must be started inside a tokio runtime".to_string(),
            ));
        }
        *running = true;
        drop(running);

        let state = Arc::clone(&self.state);
        let notify = Arc::clone(&self.notify);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();
        let handle = tokio::spawn(async move {
            Self::worker_loop(state, notify, running, creator, config).await;
        });
        *self.worker.lock() = Some(handle);

        info!("Started page generation worker");
        Ok(())
    }

    /// Stop the worker after its current prompt and wait for it to exit
    ///
    /// Pending prompts stay queued for a later `start`.
    pub async fn stop(&self) -> Result<(), ApiError> {
        {
            let mut running = self.running.write();
            if !*running {
                return Ok(());
            }
            *running = false;
        }
        self.notify.notify_one();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| ApiError::QueueError(format!("Worker task failed: {}", e)))?;
        }
        info!("Stopped page generation worker");
        Ok(())
    }

    fn push(&self, item: QueueItem) -> usize {
        let depth = {
            let mut state = self.state.lock();
            state.pending.push_back(item);
            state.pending.len()
        };
        self.notify.notify_one();
        debug!(queue_depth = depth, "Prompt enqueued");
        depth
    }

    async fn worker_loop(
        state: Arc<Mutex<QueueState>>,
        notify: Arc<Notify>,
        running: Arc<RwLock<bool>>,
        creator: Arc<dyn PageCreator>,
        config: QueueConfig,
    ) {
        debug!("Worker started");
        let idle_wait = Duration::from_millis(config.idle_poll_ms);

        while *running.read() {
            // Dequeue and mark in-flight in one critical section
            let next = {
                let mut state = state.lock();
                let item = state.pending.pop_front();
                if item.is_some() {
                    state.is_processing = true;
                }
                item.map(|item| (item, state.pending.len()))
            };

            let Some((item, queue_depth)) = next else {
                tokio::select! {
                    _ = notify.notified() => continue,
                    _ = sleep(idle_wait) => continue,
                }
            };

            info!(queue_depth, prompt = %item.prompt, "Processing prompt");
            let result = AssertUnwindSafe(creator.create_page(&item.prompt))
                .catch_unwind()
                .await;

            let (outcome, faulted) = match result {
                Ok(outcome) => (outcome, false),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(error = %message, "Generation worker caught a panic");
                    (
                        Err(GenerationFailure {
                            reason: format!("Worker error: {}", message),
                            attempts: 0,
                        }),
                        true,
                    )
                }
            };

            {
                let mut state = state.lock();
                state.is_processing = false;
                match &outcome {
                    Ok(_) => state.stats.completed += 1,
                    Err(_) => state.stats.failed += 1,
                }
            }

            match &outcome {
                Ok(name) => info!(page_name = %name, "Page ready"),
                Err(failure) => warn!(reason = %failure.reason, "Prompt failed"),
            }
            if let Some(reply) = item.reply {
                let _ = reply.send(outcome);
            }

            if faulted {
                sleep(Duration::from_millis(config.cooldown_ms)).await;
            }
        }

        debug!("Worker stopped");
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
