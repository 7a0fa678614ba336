use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::core::NodePath;
use crate::store::ContentItem;

use super::dispatcher::Dispatcher;
use super::error::{DispatchError, HandlerError};
use super::handler::{Handler, HandlerLauncher};
use super::messages::{RequestSnapshot, SessionSnapshot, Ticket, WorkerResponse};
use super::projector::{Outcome, project};
use super::supervisor::{WorkerState, WorkerSupervisor};

const TEST_BACKOFF: Duration = Duration::from_millis(10);
const WAIT: Duration = Duration::from_secs(5);

fn node(kind: &str) -> ContentItem {
    ContentItem::new(NodePath::new("/docs"), kind, "Docs", "admin")
}

fn call_failed() -> HandlerError {
    HandlerError::Call(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "handler gone",
    ))
}

async fn dispatch(dispatcher: &Dispatcher, kind: &str, action: &str) -> Result<WorkerResponse, DispatchError> {
    dispatcher
        .handle(
            node(kind),
            action,
            RequestSnapshot::default(),
            SessionSnapshot::default(),
            "main",
        )
        .await
}

// ----------------------------------------------------------------------------
// Scripted handlers
// ----------------------------------------------------------------------------

/// Answers every ticket with its action as the body.
struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn call(&mut self, ticket: &Ticket) -> Result<WorkerResponse, HandlerError> {
        Ok(WorkerResponse::body(ticket.action.as_bytes()))
    }
}

/// Dies on every call.
struct FailingHandler;

#[async_trait]
impl Handler for FailingHandler {
    async fn call(&mut self, _ticket: &Ticket) -> Result<WorkerResponse, HandlerError> {
        Err(call_failed())
    }
}

/// Records every action it sees.
struct RecordingHandler {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn call(&mut self, ticket: &Ticket) -> Result<WorkerResponse, HandlerError> {
        self.seen.lock().push(ticket.action.clone());
        Ok(WorkerResponse::body("done"))
    }
}

struct EchoLauncher;

#[async_trait]
impl HandlerLauncher for EchoLauncher {
    async fn launch(&self, _kind: &str) -> Result<Box<dyn Handler>, HandlerError> {
        Ok(Box::new(EchoHandler))
    }
}

struct FailingLauncher;

#[async_trait]
impl HandlerLauncher for FailingLauncher {
    async fn launch(&self, _kind: &str) -> Result<Box<dyn Handler>, HandlerError> {
        Ok(Box::new(FailingHandler))
    }
}

struct RecordingLauncher {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl HandlerLauncher for RecordingLauncher {
    async fn launch(&self, _kind: &str) -> Result<Box<dyn Handler>, HandlerError> {
        Ok(Box::new(RecordingHandler {
            seen: Arc::clone(&self.seen),
        }))
    }
}

/// First worker dies on its first ticket; every replacement echoes.
struct FlakyLauncher {
    launches: Arc<AtomicUsize>,
}

#[async_trait]
impl HandlerLauncher for FlakyLauncher {
    async fn launch(&self, _kind: &str) -> Result<Box<dyn Handler>, HandlerError> {
        let launch = self.launches.fetch_add(1, Ordering::SeqCst);
        if launch == 0 {
            Ok(Box::new(FailingHandler))
        } else {
            Ok(Box::new(EchoHandler))
        }
    }
}

fn supervisor(launcher: impl HandlerLauncher + 'static) -> Arc<WorkerSupervisor> {
    Arc::new(WorkerSupervisor::new(Arc::new(launcher)).with_backoff(TEST_BACKOFF))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_dispatch_returns_body_unmodified() {
    let supervisor = supervisor(EchoLauncher);
    supervisor.ensure_worker("document");
    let dispatcher = Dispatcher::new(Arc::clone(&supervisor));

    let response = timeout(WAIT, dispatch(&dispatcher, "document", "view"))
        .await
        .expect("dispatch should not hang")
        .unwrap();

    assert_eq!(response.body, b"view");
    assert!(response.redirect.is_none());

    let (outcome, _) = project(response, &node("document")).unwrap();
    assert_eq!(outcome, Outcome::Embed(b"view".to_vec()));
}

#[tokio::test]
async fn test_closed_reply_is_worker_lost_not_empty_success() {
    let supervisor = supervisor(FailingLauncher);
    supervisor.ensure_worker("document");
    let dispatcher = Dispatcher::new(Arc::clone(&supervisor));

    let result = timeout(WAIT, dispatch(&dispatcher, "document", "view"))
        .await
        .expect("dispatch should not hang");

    assert!(matches!(result, Err(DispatchError::WorkerLost(kind)) if kind == "document"));
}

#[tokio::test]
async fn test_undeclared_type_is_rejected() {
    let supervisor = supervisor(EchoLauncher);
    supervisor.ensure_worker("document");
    let dispatcher = Dispatcher::new(Arc::clone(&supervisor));

    let result = dispatch(&dispatcher, "gallery", "view").await;
    assert!(matches!(result, Err(DispatchError::UndeclaredType(kind)) if kind == "gallery"));
}

#[tokio::test]
async fn test_concurrent_tickets_delivered_exactly_once() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let supervisor = supervisor(RecordingLauncher {
        seen: Arc::clone(&seen),
    });
    supervisor.ensure_worker("document");
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&supervisor)));

    let mut handles = Vec::new();
    for i in 0..40 {
        let dispatcher = Arc::clone(&dispatcher);
        handles.push(tokio::spawn(async move {
            dispatch(&dispatcher, "document", &format!("action-{i}")).await
        }));
    }
    for handle in handles {
        let response = timeout(WAIT, handle)
            .await
            .expect("ticket should not hang")
            .unwrap()
            .unwrap();
        assert_eq!(response.body, b"done");
    }

    let seen = seen.lock();
    assert_eq!(seen.len(), 40);
    let unique: std::collections::BTreeSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), 40, "no ticket delivered twice");
}

#[tokio::test]
async fn test_restart_after_crash_redelivers_queued_ticket() {
    let launches = Arc::new(AtomicUsize::new(0));
    let supervisor = supervisor(FlakyLauncher {
        launches: Arc::clone(&launches),
    });
    supervisor.ensure_worker("document");
    let dispatcher = Dispatcher::new(Arc::clone(&supervisor));

    // First ticket kills the first worker: its caller sees the loss.
    let result = timeout(WAIT, dispatch(&dispatcher, "document", "first"))
        .await
        .expect("dispatch should not hang");
    assert!(matches!(result, Err(DispatchError::WorkerLost(_))));

    // A ticket enqueued during the restart gap waits for the replacement.
    let response = timeout(WAIT, dispatch(&dispatcher, "document", "second"))
        .await
        .expect("ticket enqueued during the gap must not be dropped")
        .unwrap();
    assert_eq!(response.body, b"second");
    assert!(launches.load(Ordering::SeqCst) >= 2, "a new worker was launched");
}

#[tokio::test]
async fn test_worker_reaches_running_state() {
    let supervisor = supervisor(EchoLauncher);
    supervisor.ensure_worker("document");

    let mut state = supervisor.state("document").expect("worker registered");
    let running = timeout(WAIT, state.wait_for(|s| *s == WorkerState::Running)).await;
    assert!(running.is_ok());

    assert!(supervisor.state("gallery").is_none());
}

#[tokio::test]
async fn test_unread_reply_does_not_crash_worker() {
    let supervisor = supervisor(EchoLauncher);
    supervisor.ensure_worker("document");

    // Enqueue a ticket and immediately abandon its reply path.
    let (reply_tx, reply_rx) = oneshot::channel();
    drop(reply_rx);
    let ticket = Ticket {
        node: node("document"),
        action: "abandoned".to_string(),
        request: RequestSnapshot::default(),
        session: SessionSnapshot::default(),
        site: "main".to_string(),
        reply: reply_tx,
    };
    supervisor.enqueue("document", ticket).await.unwrap();

    // The worker must survive the unread reply and keep serving.
    let dispatcher = Dispatcher::new(Arc::clone(&supervisor));
    let response = timeout(WAIT, dispatch(&dispatcher, "document", "after"))
        .await
        .expect("dispatch should not hang")
        .unwrap();
    assert_eq!(response.body, b"after");
}
