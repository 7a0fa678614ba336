//! Dispatch and handler error types.

use thiserror::Error;

/// Errors surfaced to the request path by the dispatch layer.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The node's content type was never declared in `[workers]`. A
    /// deployment mistake: types must be registered up front, so this is
    /// verified at startup and should not occur while serving.
    #[error("no worker declared for content type {0:?}")]
    UndeclaredType(String),

    /// The reply path closed without a value: the worker died between
    /// accepting the ticket and answering. The supervisor restarts the
    /// worker, but this request fails; the ticket is not retried.
    #[error("worker for content type {0:?} was lost before it replied")]
    WorkerLost(String),

    /// The worker answered with neither a body nor a redirect.
    #[error("worker response carries neither body nor redirect")]
    MalformedResponse,
}

/// Errors on the handler-process side of a worker.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler binary {0:?} not found on PATH")]
    MissingBinary(String, #[source] which::Error),

    #[error("failed to spawn handler {0:?}")]
    Spawn(String, #[source] std::io::Error),

    #[error("handshake with handler {0:?} failed: {1}")]
    Handshake(String, String),

    #[error("handler call failed")]
    Call(#[source] std::io::Error),

    #[error("could not encode handler call")]
    Encode(#[source] serde_json::Error),

    #[error("handler reply was not valid JSON")]
    Decode(#[source] serde_json::Error),
}
