//! Server lifecycle management.

use crate::config::SiteConfig;
use crate::store::SiteStores;
use crate::worker::{Dispatcher, ProcessLauncher, WorkerSupervisor};
use crate::{core::register_server, log};
use anyhow::{Context, Result};
use crossbeam::channel::Sender;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tiny_http::Server;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(
    interface: std::net::IpAddr,
    base_port: u16,
) -> Result<(Server, SocketAddr)> {
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < MAX_PORT_RETRIES => continue,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to bind after {} attempts (ports {}-{}): {}",
                    MAX_PORT_RETRIES,
                    base_port,
                    port,
                    e
                ));
            }
        }
    }
    unreachable!()
}

/// Register server for graceful shutdown.
///
/// This registers the server with the global shutdown handler set up in
/// main(). When Ctrl+C is pressed, the handler will unblock the server.
pub fn register_server_for_shutdown(server: Arc<Server>, shutdown_tx: Sender<()>) {
    register_server(server, shutdown_tx);
}

/// The running worker system: its runtime plus the dispatch objects.
pub struct WorkerSystem {
    runtime: tokio::runtime::Runtime,
    pub supervisor: Arc<WorkerSupervisor>,
    pub dispatcher: Arc<Dispatcher>,
}

impl WorkerSystem {
    /// Handle for bridging request threads into the runtime.
    pub fn handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    /// Stop accepting work and wind the runtime down.
    pub fn shutdown(self) {
        self.supervisor.shutdown();
        self.runtime.shutdown_timeout(Duration::from_secs(2));
    }
}

/// Verify the deployment and start one worker per declared content type.
///
/// A missing handler binary aborts startup here; a misconfigured server
/// must not begin serving requests.
pub fn start_worker_system(config: &SiteConfig, stores: SiteStores) -> Result<WorkerSystem> {
    let launcher = ProcessLauncher::new(&config.workers.handler_prefix, stores);
    launcher
        .verify(&config.workers.types)
        .context("worker verification failed")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let supervisor = Arc::new(
        WorkerSupervisor::new(Arc::new(launcher))
            .with_backoff(Duration::from_secs(config.workers.restart_backoff_secs)),
    );

    {
        // Supervision tasks must spawn inside the runtime.
        let _guard = runtime.enter();
        for kind in &config.workers.types {
            supervisor.ensure_worker(kind);
        }
    }

    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&supervisor)));
    Ok(WorkerSystem {
        runtime,
        supervisor,
        dispatcher,
    })
}
