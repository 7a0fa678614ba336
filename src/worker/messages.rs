//! Worker message definitions.
//!
//! Message types flowing between the dispatcher and the per-type workers:
//!
//! ```text
//! Dispatcher --Ticket--> WorkerSupervisor --queue--> worker --reply--> Dispatcher
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::store::ContentItem;

/// Immutable snapshot of the inbound request, as handed to a worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// HTTP method, uppercased.
    pub method: String,
    /// Full request URL path (including any `@@action` suffix).
    pub url: String,
    /// Decoded form/query fields in submission order.
    #[serde(default)]
    pub form: Vec<(String, String)>,
}

impl RequestSnapshot {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }
}

/// Session state snapshot travelling with every ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Authenticated user, if any. Authentication itself lives outside
    /// this server; the snapshot only carries what the edge observed.
    pub user: Option<String>,
    pub locale: String,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            locale: "en".to_string(),
        }
    }
}

impl SessionSnapshot {
    /// Actor name for record stamps.
    pub fn actor(&self) -> &str {
        self.user.as_deref().unwrap_or("anonymous")
    }
}

/// One unit of dispatched work.
///
/// Delivered to exactly one worker; the reply sender accepts at most one
/// response and signals worker loss by being dropped unused.
#[derive(Debug)]
pub struct Ticket {
    pub node: ContentItem,
    pub action: String,
    pub request: RequestSnapshot,
    pub session: SessionSnapshot,
    pub site: String,
    pub reply: oneshot::Sender<WorkerResponse>,
}

/// A worker's answer to one ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerResponse {
    /// Response payload. Well-formed responses carry a non-empty body or
    /// a redirect, never neither.
    #[serde(default)]
    pub body: Vec<u8>,

    /// Redirect target; takes precedence over the body.
    #[serde(default)]
    pub redirect: Option<String>,

    /// Pass the body through unmodified instead of embedding it in the
    /// page frame.
    #[serde(default)]
    pub raw: bool,

    /// Updated record, if the worker mutated the node. Its path is forced
    /// back to the original item's path before use.
    #[serde(default)]
    pub node: Option<ContentItem>,
}

impl WorkerResponse {
    /// A plain embeddable body.
    pub fn body(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// A redirect to the given target.
    pub fn redirect(target: impl Into<String>) -> Self {
        Self {
            redirect: Some(target.into()),
            ..Self::default()
        }
    }
}
