//! Worker system for request dispatch.
//!
//! Message-passing concurrency for node requests:
//!
//! ```text
//! Dispatcher --Ticket--> WorkerSupervisor --queue--> handler process
//!     ^                                                    |
//!     +------------------ reply path ---------------------+
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Ticket, snapshots, and worker responses
//! - `handler` - Handler process seam (launch, handshake, call)
//! - `supervisor` - Per-type queues and restart supervision
//! - `dispatcher` - Request → ticket → awaited reply
//! - `projector` - Response interpretation
//! - `error` - Dispatch and handler error taxonomy

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod messages;
pub mod projector;
pub mod supervisor;

#[cfg(test)]
mod tests;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, HandlerError};
pub use handler::{Handler, HandlerLauncher, ProcessLauncher};
pub use messages::{RequestSnapshot, SessionSnapshot, Ticket, WorkerResponse};
pub use projector::{Outcome, project};
pub use supervisor::{WorkerState, WorkerSupervisor};
