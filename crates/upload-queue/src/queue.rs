//! Upload queue orchestrator.
//!
//! Owns the ordered task list behind a single mutex. Every mutation goes
//! through it: inserts from [`UploadQueue::submit`], removals from
//! [`UploadQueue::cancel`] and [`UploadQueue::clear_completed`], and state
//! changes reported by running tasks. A task's updates are matched by its
//! private key, so anything arriving after the task was removed, even when
//! a new task has since taken the same identity, is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use romen_transfer::{SourceFile, disambiguate_name};

use crate::client::IngestClient;
use crate::task::{TaskState, TransferTask};
use crate::types::{QueueConfig, QueueEvent, TaskSnapshot, TaskStatus};

/// Private per-task key, never reused within a queue.
pub(crate) type TaskKey = u64;

struct TaskEntry {
    key: TaskKey,
    identity: String,
    size_bytes: u64,
    state: TaskState,
    cancel: CancellationToken,
}

impl TaskEntry {
    fn snapshot(&self) -> TaskSnapshot {
        let (display_title, cover_url, error) = match &self.state {
            TaskState::Completed { title, cover_url } => {
                (Some(title.clone()), cover_url.clone(), None)
            }
            TaskState::Failed { reason, .. } => (None, None, Some(reason.clone())),
            _ => (None, None, None),
        };

        TaskSnapshot {
            identity: self.identity.clone(),
            status: self.state.status(),
            progress_percent: self.state.progress_percent(),
            size_bytes: self.size_bytes,
            display_title,
            cover_url,
            error,
        }
    }
}

/// State shared between the queue handle and its running tasks.
pub(crate) struct SharedQueue {
    tasks: Mutex<Vec<TaskEntry>>,
    events_tx: mpsc::Sender<QueueEvent>,
    client: Arc<dyn IngestClient>,
    config: QueueConfig,
}

impl SharedQueue {
    pub(crate) fn client(&self) -> &dyn IngestClient {
        self.client.as_ref()
    }

    pub(crate) fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TaskEntry>> {
        // Entries are replaced whole under the lock, so a poisoned list is
        // still consistent.
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: QueueEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            trace!("queue event not delivered: {e}");
        }
    }

    /// Moves task `key` to `next` if it is still queued and the transition
    /// is legal. Returns whether the state changed.
    pub(crate) fn apply(&self, key: TaskKey, next: TaskState) -> bool {
        let mut tasks = self.lock();
        let Some(entry) = tasks.iter_mut().find(|t| t.key == key) else {
            trace!(key, status = ?next.status(), "update for removed task discarded");
            return false;
        };

        if !entry.state.can_become(&next) {
            trace!(
                identity = %entry.identity,
                from = ?entry.state.status(),
                to = ?next.status(),
                "transition ignored"
            );
            return false;
        }

        let previous = std::mem::replace(&mut entry.state, next);
        let status = entry.state.status();
        let percent = entry.state.progress_percent();

        if percent != previous.progress_percent()
            && matches!(status, TaskStatus::Uploading | TaskStatus::Processing)
        {
            self.emit(QueueEvent::Progress {
                identity: entry.identity.clone(),
                percent,
            });
        }
        if status != previous.status() {
            debug!(identity = %entry.identity, ?status, "task status changed");
            self.emit(QueueEvent::StatusChanged {
                identity: entry.identity.clone(),
                status,
            });
        }
        true
    }
}

/// Queue of disc-image transfers running concurrently.
///
/// Each submitted file gets its own tokio task that uploads it, polls the
/// resulting ingestion job, and reports back here. Callers read state with
/// [`snapshot`](Self::snapshot) or follow [`take_events`](Self::take_events).
pub struct UploadQueue {
    shared: Arc<SharedQueue>,
    events_rx: Mutex<Option<mpsc::Receiver<QueueEvent>>>,
    tracker: TaskTracker,
    next_key: AtomicU64,
}

impl UploadQueue {
    /// Creates an empty queue sending requests through `client`.
    pub fn new(client: Arc<dyn IngestClient>, config: QueueConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        Self {
            shared: Arc::new(SharedQueue {
                tasks: Mutex::new(Vec::new()),
                events_tx,
                client,
                config,
            }),
            events_rx: Mutex::new(Some(events_rx)),
            tracker: TaskTracker::new(),
            next_key: AtomicU64::new(1),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&self) -> Option<mpsc::Receiver<QueueEvent>> {
        self.events_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Queues `files` and starts uploading each one concurrently.
    ///
    /// Returns the identity assigned to each file, in order. A name already
    /// present in the queue gets a ` (n)` suffix. Per-file failures show up
    /// later as failed tasks, never here.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn submit(&self, files: Vec<SourceFile>) -> Vec<String> {
        let mut identities = Vec::with_capacity(files.len());
        let mut runners = Vec::with_capacity(files.len());

        {
            let mut tasks = self.shared.lock();
            for source in files {
                let identity =
                    disambiguate_name(source.name(), |n| tasks.iter().any(|t| t.identity == n));
                let key = self.next_key.fetch_add(1, Ordering::Relaxed);
                let cancel = CancellationToken::new();

                info!(%identity, bytes = source.size(), "queued for upload");
                tasks.push(TaskEntry {
                    key,
                    identity: identity.clone(),
                    size_bytes: source.size(),
                    state: TaskState::Pending,
                    cancel: cancel.clone(),
                });
                self.shared.emit(QueueEvent::Added {
                    identity: identity.clone(),
                });

                runners.push(TransferTask::new(
                    key,
                    identity.clone(),
                    source,
                    cancel,
                    Arc::clone(&self.shared),
                ));
                identities.push(identity);
            }
        }

        // Spawned after the lock is released; entries already exist.
        for runner in runners {
            self.tracker.spawn(runner.run());
        }
        identities
    }

    /// Cancels the task named `identity` and removes it from the queue.
    ///
    /// Removal is immediate; the task's network activity stops at its next
    /// suspension point. Returns `false` if no such task was queued.
    pub fn cancel(&self, identity: &str) -> bool {
        let mut tasks = self.shared.lock();
        let Some(pos) = tasks.iter().position(|t| t.identity == identity) else {
            return false;
        };

        let entry = tasks.remove(pos);
        entry.cancel.cancel();
        info!(%identity, status = ?entry.state.status(), "task cancelled");
        self.shared.emit(QueueEvent::Removed {
            identity: entry.identity,
        });
        true
    }

    /// Removes every completed task. Failed tasks stay until cancelled.
    ///
    /// Returns the number of tasks removed.
    pub fn clear_completed(&self) -> usize {
        let mut tasks = self.shared.lock();
        let (done, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *tasks)
            .into_iter()
            .partition(|t| t.state.status() == TaskStatus::Completed);
        *tasks = kept;

        for entry in &done {
            self.shared.emit(QueueEvent::Removed {
                identity: entry.identity.clone(),
            });
        }
        if !done.is_empty() {
            debug!(removed = done.len(), "cleared completed tasks");
        }
        done.len()
    }

    /// Returns the current state of every task, in submission order.
    pub fn snapshot(&self) -> Vec<TaskSnapshot> {
        self.shared.lock().iter().map(TaskEntry::snapshot).collect()
    }

    /// Returns the current state of one task.
    pub fn get(&self, identity: &str) -> Option<TaskSnapshot> {
        self.shared
            .lock()
            .iter()
            .find(|t| t.identity == identity)
            .map(TaskEntry::snapshot)
    }

    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }

    /// Cancels and removes every unfinished task, then waits for all task
    /// units to exit. Finished tasks stay visible.
    pub async fn shutdown(&self) {
        let cancelled = {
            let mut tasks = self.shared.lock();
            let (running, finished): (Vec<_>, Vec<_>) = std::mem::take(&mut *tasks)
                .into_iter()
                .partition(|t| !t.state.is_terminal());
            *tasks = finished;

            for entry in &running {
                entry.cancel.cancel();
                self.shared.emit(QueueEvent::Removed {
                    identity: entry.identity.clone(),
                });
            }
            running.len()
        };

        info!(cancelled, "upload queue shutting down");
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl Drop for UploadQueue {
    fn drop(&mut self) {
        for entry in self.shared.lock().iter() {
            entry.cancel.cancel();
        }
    }
}
