//! The content server.
//!
//! Request flow: split the `@@action` suffix, resolve the site from the
//! Host header, look the node up in the site's content store, then either
//! handle `add`/`remove` at the edge or dispatch a ticket to the node
//! type's worker and project its response.

mod actions;
mod lifecycle;
mod request;
mod response;

use crate::config::{SiteConfig, SiteRegistry, SiteSection, cfg};
use crate::core::{NodePath, is_shutdown, split_action};
use crate::render::RenderContext;
use crate::store::{ContentItem, ContentStore, SiteStores, StoreError};
use crate::worker::{Dispatcher, Outcome, project};
use crate::{debug, log};
use actions::ActionOutcome;
use anyhow::Result;
use crossbeam::channel;
use std::sync::Arc;
use tiny_http::{Request, Server};

/// Shared state of the request loop.
struct ServeContext {
    registry: SiteRegistry,
    stores: SiteStores,
    dispatcher: Arc<Dispatcher>,
    handle: tokio::runtime::Handle,
}

impl ServeContext {
    fn site_for_host(&self, host: &str) -> Option<(&SiteSection, &ContentStore)> {
        let site = self.registry.site_for_host(host)?;
        let store = self.stores.get(&site.name)?;
        Some((site, store))
    }
}

/// Start workers, bind, and run the request loop until shutdown.
pub fn run(config: &Arc<SiteConfig>) -> Result<()> {
    let mut stores = SiteStores::new();
    for site in &config.sites {
        stores.insert(site.name.clone(), ContentStore::open(config.data_dir(site)));
    }

    let workers = lifecycle::start_worker_system(config, stores.clone())?;

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    let (shutdown_tx, _shutdown_rx) = channel::unbounded::<()>();
    lifecycle::register_server_for_shutdown(Arc::clone(&server), shutdown_tx);
    log!("serve"; "http://{}", addr);

    let context = Arc::new(ServeContext {
        registry: SiteRegistry::from_config(config),
        stores,
        dispatcher: Arc::clone(&workers.dispatcher),
        handle: workers.handle(),
    });

    run_request_loop(&server, &context);
    workers.shutdown();
    Ok(())
}

fn run_request_loop(server: &Server, context: &Arc<ServeContext>) {
    // Use a thread pool to handle requests concurrently: a request blocked
    // on its worker must not stall the others.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("failed to create thread pool");

    for request in server.incoming_requests() {
        let context = Arc::clone(context);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &context) {
                log!("serve"; "request error: {e}");
            }
        });
    }
}

/// Handle a single HTTP request
fn handle_request(mut request: Request, context: &ServeContext) -> Result<()> {
    // Early exit if shutdown requested
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    let url = request.url().to_string();
    let path_part = url.split('?').next().unwrap_or(&url);
    let (node_part, action) = split_action(path_part);

    // Canonical node URLs end with a slash
    if action.is_none() && !node_part.ends_with('/') {
        return response::respond_redirect(request, &format!("{node_part}/"));
    }

    let Some(host) = request::host_of(&request) else {
        debug!("serve"; "request without Host header");
        return response::respond_not_found(request);
    };
    let Some((site, store)) = context.site_for_host(&host) else {
        log!("serve"; "no site for host {host}");
        return response::respond_not_found(request);
    };

    let node_path = NodePath::from_request(node_part);
    let session = request::session_from_request(&request, site);
    let node = match store.lookup(&node_path) {
        Ok(node) => node,
        Err(StoreError::NotFound(_)) => {
            debug!("serve"; "node not found: {node_path}");
            return response::respond_not_found(request);
        }
        Err(e) => {
            log!("error"; "lookup of {node_path} failed: {e}");
            return response::respond_internal_error(request);
        }
    };

    let snapshot = request::snapshot_request(&mut request);
    debug!("serve"; "{} {} {}", site.name, snapshot.method, url);

    match action {
        Some("add") => {
            let outcome = actions::add(store, &node, &snapshot, &session, &cfg().workers);
            finish_action(request, outcome, store, site, node)
        }
        Some("remove") => {
            let outcome = actions::remove(store, &node, &snapshot);
            finish_action(request, outcome, store, site, node)
        }
        other => {
            let action = other.unwrap_or("view");
            dispatch_node(request, context, store, site, node, action, snapshot, session)
        }
    }
}

/// Dispatch a ticket for `node` and answer with the projected response.
#[allow(clippy::too_many_arguments)]
fn dispatch_node(
    request: Request,
    context: &ServeContext,
    store: &ContentStore,
    site: &SiteSection,
    node: ContentItem,
    action: &str,
    snapshot: crate::worker::RequestSnapshot,
    session: crate::worker::SessionSnapshot,
) -> Result<()> {
    let result = context.handle.block_on(context.dispatcher.handle(
        node.clone(),
        action,
        snapshot,
        session,
        site.name.clone(),
    ));

    let worker_response = match result {
        Ok(worker_response) => worker_response,
        Err(e) => {
            log!("error"; "dispatch for {} failed: {e}", node.path);
            return response::respond_internal_error(request);
        }
    };

    match project(worker_response, &node) {
        Ok((Outcome::Redirect(target), _)) => response::respond_redirect(request, &target),
        Ok((Outcome::Raw(body), _)) => response::respond_raw(request, body),
        Ok((Outcome::Embed(body), node)) => render_page(request, store, site, node, body),
        Err(e) => {
            log!("error"; "{} worker misbehaved: {e}", node.kind);
            response::respond_internal_error(request)
        }
    }
}

fn finish_action(
    request: Request,
    outcome: Result<ActionOutcome, StoreError>,
    store: &ContentStore,
    site: &SiteSection,
    node: ContentItem,
) -> Result<()> {
    match outcome {
        Ok(ActionOutcome::Redirect(target)) => response::respond_redirect(request, &target),
        Ok(ActionOutcome::Page(body)) => render_page(request, store, site, node, body),
        Ok(ActionOutcome::BadRequest(message)) => response::respond_bad_request(request, &message),
        Err(e) => {
            log!("error"; "action on {} failed: {e}", node.path);
            response::respond_internal_error(request)
        }
    }
}

/// Assemble the rendering context and answer with the framed page.
fn render_page(
    request: Request,
    store: &ContentStore,
    site: &SiteSection,
    node: ContentItem,
    body: Vec<u8>,
) -> Result<()> {
    match RenderContext::assemble(store, node, body) {
        Ok(render) => response::respond_html(request, render.into_page(site)),
        Err(e) => {
            log!("error"; "page assembly failed: {e}");
            response::respond_internal_error(request)
        }
    }
}
