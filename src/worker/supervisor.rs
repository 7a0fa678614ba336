//! Worker supervision.
//!
//! One supervision task per content type owns that type's ticket queue and
//! its handler process. The queue outlives the process: when a handler
//! dies, the task waits out the restart backoff and relaunches with the
//! same receiver, so tickets enqueued during the gap are delivered to the
//! replacement worker.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, watch};

use crate::{debug, log};

use super::error::DispatchError;
use super::handler::HandlerLauncher;
use super::messages::Ticket;

/// Delay before relaunching a crashed handler.
pub const RESTART_BACKOFF: Duration = Duration::from_secs(5);

/// Per-type ticket queue depth. Senders block (asynchronously) when the
/// queue is full; there is no deadline and no rejection.
const QUEUE_DEPTH: usize = 32;

/// Lifecycle of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Running,
    Crashed,
    RestartPending,
    Stopped,
}

/// Per-type handle: the queue's sender side plus observable state.
struct WorkerHandle {
    queue: mpsc::Sender<Ticket>,
    state: watch::Receiver<WorkerState>,
}

/// Owns every worker and its inbound queue.
pub struct WorkerSupervisor {
    launcher: Arc<dyn HandlerLauncher>,
    registry: RwLock<FxHashMap<String, WorkerHandle>>,
    backoff: Duration,
}

impl WorkerSupervisor {
    pub fn new(launcher: Arc<dyn HandlerLauncher>) -> Self {
        Self {
            launcher,
            registry: RwLock::new(FxHashMap::default()),
            backoff: RESTART_BACKOFF,
        }
    }

    /// Override the restart backoff (tests use milliseconds).
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Register `kind` and start its worker if not yet known.
    ///
    /// Must be called from within the runtime that should own the
    /// supervision task. Registration happens once at startup; afterwards
    /// the registry is only read.
    pub fn ensure_worker(&self, kind: &str) {
        let mut registry = self.registry.write();
        if registry.contains_key(kind) {
            return;
        }

        let (queue_tx, queue_rx) = mpsc::channel(QUEUE_DEPTH);
        let (state_tx, state_rx) = watch::channel(WorkerState::Starting);
        registry.insert(
            kind.to_string(),
            WorkerHandle {
                queue: queue_tx,
                state: state_rx,
            },
        );

        let launcher = Arc::clone(&self.launcher);
        let kind = kind.to_string();
        let backoff = self.backoff;
        tokio::spawn(supervise(kind, launcher, queue_rx, state_tx, backoff));
    }

    /// Hand a ticket to the worker for `kind`.
    ///
    /// Blocks (asynchronously) until the queue accepts it, possibly across
    /// a worker restart. An unregistered type is a configuration mistake.
    pub async fn enqueue(&self, kind: &str, ticket: Ticket) -> Result<(), DispatchError> {
        let queue = self
            .registry
            .read()
            .get(kind)
            .map(|handle| handle.queue.clone())
            .ok_or_else(|| DispatchError::UndeclaredType(kind.to_string()))?;

        queue
            .send(ticket)
            .await
            .map_err(|_| DispatchError::WorkerLost(kind.to_string()))
    }

    /// Observe the state of the worker for `kind`.
    pub fn state(&self, kind: &str) -> Option<watch::Receiver<WorkerState>> {
        self.registry.read().get(kind).map(|h| h.state.clone())
    }

    /// Drop every queue sender. Each supervision task drains its remaining
    /// tickets, reaches `Stopped`, and exits.
    pub fn shutdown(&self) {
        self.registry.write().clear();
    }
}

/// Supervision loop for one content type.
///
/// The queue receiver stays here across restarts; only the handler is
/// replaced. A crashed worker is never resurrected; the relaunch is a new
/// process.
async fn supervise(
    kind: String,
    launcher: Arc<dyn HandlerLauncher>,
    mut queue: mpsc::Receiver<Ticket>,
    state: watch::Sender<WorkerState>,
    backoff: Duration,
) {
    loop {
        let _ = state.send(WorkerState::Starting);
        let mut handler = match launcher.launch(&kind).await {
            Ok(handler) => handler,
            Err(e) => {
                log!("worker"; "{}: launch failed: {}", kind, e);
                let _ = state.send(WorkerState::RestartPending);
                tokio::time::sleep(backoff).await;
                continue;
            }
        };

        debug!("worker"; "{}: running", kind);
        let _ = state.send(WorkerState::Running);

        loop {
            let Some(ticket) = queue.recv().await else {
                // All senders gone: process-wide shutdown.
                debug!("worker"; "{}: stopped", kind);
                let _ = state.send(WorkerState::Stopped);
                return;
            };

            match handler.call(&ticket).await {
                // The caller may have stopped waiting; an unread reply is
                // not an error.
                Ok(response) => {
                    let _ = ticket.reply.send(response);
                }
                // Dropping the ticket here closes its reply path: the
                // caller observes the loss instead of an empty response.
                Err(e) => {
                    log!("worker"; "{}: handler failed: {}", kind, e);
                    drop(ticket);
                    break;
                }
            }
        }

        let _ = state.send(WorkerState::Crashed);
        log!("worker"; "{}: restarting in {:?}", kind, backoff);
        let _ = state.send(WorkerState::RestartPending);
        tokio::time::sleep(backoff).await;
    }
}
