//! Request dispatch.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::store::ContentItem;

use super::error::DispatchError;
use super::messages::{RequestSnapshot, SessionSnapshot, Ticket, WorkerResponse};
use super::supervisor::WorkerSupervisor;

/// Turns one inbound request into one ticket and waits for the worker's
/// answer.
pub struct Dispatcher {
    supervisor: Arc<WorkerSupervisor>,
}

impl Dispatcher {
    pub fn new(supervisor: Arc<WorkerSupervisor>) -> Self {
        Self { supervisor }
    }

    /// Dispatch `action` on `node` and await the correlated response.
    ///
    /// There is no deadline on the wait: a hung worker hangs this request.
    /// A reply path that closes without a value is the distinct
    /// [`DispatchError::WorkerLost`] outcome (the worker died mid-request);
    /// the ticket is not retried.
    pub async fn handle(
        &self,
        node: ContentItem,
        action: impl Into<String>,
        request: RequestSnapshot,
        session: SessionSnapshot,
        site: impl Into<String>,
    ) -> Result<WorkerResponse, DispatchError> {
        let kind = node.kind.clone();
        let (reply_tx, reply_rx) = oneshot::channel();
        let ticket = Ticket {
            node,
            action: action.into(),
            request,
            session,
            site: site.into(),
            reply: reply_tx,
        };

        self.supervisor.enqueue(&kind, ticket).await?;

        reply_rx
            .await
            .map_err(|_| DispatchError::WorkerLost(kind))
    }
}
