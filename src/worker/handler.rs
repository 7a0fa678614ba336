//! Handler process seam.
//!
//! A worker is a long-lived external process handling every ticket for one
//! content type. The traits here keep the process plumbing behind a
//! minimal call/response contract so the supervisor and tests never touch
//! the wire format.
//!
//! The concrete protocol is deliberately small: the handler binary
//! (`<prefix><type>`, resolved on PATH) prints one `ready` line on
//! startup, then answers one JSON line per JSON call line on stdio.
//! While a call is open, the handler may interleave `write` requests to
//! store data files into the node's directory; each is acknowledged on
//! its own line before the final response arrives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::core::NodePath;
use crate::log;
use crate::store::{ContentItem, SiteStores};

use super::error::HandlerError;
use super::messages::{RequestSnapshot, SessionSnapshot, Ticket, WorkerResponse};

/// One live connection to a handler process.
#[async_trait]
pub trait Handler: Send {
    /// Process one ticket. Any error is a worker failure: the supervisor
    /// replaces the worker and the ticket's caller observes a lost reply.
    async fn call(&mut self, ticket: &Ticket) -> Result<WorkerResponse, HandlerError>;
}

/// Launches handler connections for the supervisor.
#[async_trait]
pub trait HandlerLauncher: Send + Sync {
    /// Spawn and handshake a fresh handler for `kind`.
    async fn launch(&self, kind: &str) -> Result<Box<dyn Handler>, HandlerError>;
}

// ============================================================================
// Process-backed implementation
// ============================================================================

/// Launches `<prefix><kind>` binaries from PATH.
pub struct ProcessLauncher {
    prefix: String,
    stores: SiteStores,
}

impl ProcessLauncher {
    pub fn new(prefix: impl Into<String>, stores: SiteStores) -> Self {
        Self {
            prefix: prefix.into(),
            stores,
        }
    }

    fn binary_name(&self, kind: &str) -> String {
        format!("{}{}", self.prefix, kind)
    }

    fn find_binary(&self, kind: &str) -> Result<PathBuf, HandlerError> {
        let name = self.binary_name(kind);
        which::which(&name).map_err(|e| HandlerError::MissingBinary(name, e))
    }

    /// Check that every declared type has a handler binary. Run at startup
    /// so a broken deployment aborts instead of serving requests.
    pub fn verify(&self, kinds: &[String]) -> Result<(), HandlerError> {
        for kind in kinds {
            self.find_binary(kind)?;
        }
        Ok(())
    }
}

#[async_trait]
impl HandlerLauncher for ProcessLauncher {
    async fn launch(&self, kind: &str) -> Result<Box<dyn Handler>, HandlerError> {
        let name = self.binary_name(kind);
        let binary = self.find_binary(kind)?;

        let mut child = Command::new(&binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HandlerError::Spawn(name.clone(), e))?;

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = BufReader::new(child.stdout.take().expect("stdout was piped"));

        let mut handler = ProcessHandler {
            kind: kind.to_string(),
            stores: self.stores.clone(),
            _child: child,
            stdin,
            stdout,
        };
        handler.handshake(&name).await?;
        Ok(Box::new(handler))
    }
}

/// A running handler process speaking JSON lines over stdio.
pub struct ProcessHandler {
    kind: String,
    stores: SiteStores,
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// One call on the wire. The node record omits its path by design, so the
/// path travels as its own field.
#[derive(Serialize)]
struct CallPayload<'a> {
    path: &'a str,
    node: &'a ContentItem,
    action: &'a str,
    request: &'a RequestSnapshot,
    session: &'a SessionSnapshot,
    site: &'a str,
}

/// A handler's request to store a data file for a node.
#[derive(Debug, Deserialize)]
struct WriteRequest {
    path: String,
    file: String,
    content: String,
}

impl ProcessHandler {
    async fn handshake(&mut self, name: &str) -> Result<(), HandlerError> {
        let line = self
            .read_line()
            .await
            .map_err(|e| HandlerError::Handshake(name.to_string(), e.to_string()))?;
        if line.trim() != "ready" {
            return Err(HandlerError::Handshake(
                name.to_string(),
                format!("unexpected greeting {:?}", line.trim()),
            ));
        }
        Ok(())
    }

    async fn read_line(&mut self) -> std::io::Result<String> {
        let mut line = String::new();
        let read = self.stdout.read_line(&mut line).await?;
        if read == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("handler for {:?} closed its stdout", self.kind),
            ));
        }
        Ok(line)
    }

    async fn write_line(&mut self, mut line: String) -> Result<(), HandlerError> {
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(HandlerError::Call)?;
        self.stdin.flush().await.map_err(HandlerError::Call)
    }

    /// Apply a handler's write request, stamping the record with the
    /// ticket's acting user.
    fn apply_write(&self, ticket: &Ticket, write: &WriteRequest) -> Result<(), String> {
        self.stores
            .write_node_data(
                &ticket.site,
                &NodePath::new(&write.path),
                &write.file,
                write.content.as_bytes(),
                ticket.session.actor(),
            )
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Handler for ProcessHandler {
    async fn call(&mut self, ticket: &Ticket) -> Result<WorkerResponse, HandlerError> {
        let payload = CallPayload {
            path: ticket.node.path.as_str(),
            node: &ticket.node,
            action: &ticket.action,
            request: &ticket.request,
            session: &ticket.session,
            site: &ticket.site,
        };
        let line = serde_json::to_string(&payload).map_err(HandlerError::Encode)?;
        self.write_line(line).await?;

        loop {
            let reply = self.read_line().await.map_err(HandlerError::Call)?;
            let value: serde_json::Value =
                serde_json::from_str(&reply).map_err(HandlerError::Decode)?;

            // Interleaved write request: acknowledge and keep reading.
            if let Some(write) = value.get("write") {
                let write: WriteRequest =
                    serde_json::from_value(write.clone()).map_err(HandlerError::Decode)?;
                let ack = match self.apply_write(ticket, &write) {
                    Ok(()) => serde_json::json!({"ok": true}),
                    Err(error) => {
                        log!("worker"; "{}: write to {} failed: {}", self.kind, write.path, error);
                        serde_json::json!({"ok": false, "error": error})
                    }
                };
                self.write_line(ack.to_string()).await?;
                continue;
            }

            return serde_json::from_value(value).map_err(HandlerError::Decode);
        }
    }
}
