//! Worker response projection.
//!
//! Interprets a [`WorkerResponse`] into the next externally-visible action
//! and pins an updated record back to the original item's path: a worker
//! must not be able to relocate a node through its response.

use crate::store::ContentItem;

use super::error::DispatchError;
use super::messages::WorkerResponse;

/// The externally-visible action derived from a worker response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Redirect the requester; wins over any body.
    Redirect(String),
    /// Pass the body through unmodified.
    Raw(Vec<u8>),
    /// Embed the body in the surrounding page frame.
    Embed(Vec<u8>),
}

/// Interpret `response` for a request on `original`.
///
/// Returns the outcome together with the effective item: the worker's
/// updated record with its path forced to the original's, or the original
/// itself.
pub fn project(
    mut response: WorkerResponse,
    original: &ContentItem,
) -> Result<(Outcome, ContentItem), DispatchError> {
    if response.body.is_empty() && response.redirect.is_none() {
        return Err(DispatchError::MalformedResponse);
    }

    let node = match response.node.take() {
        Some(mut updated) => {
            updated.path = original.path.clone();
            updated
        }
        None => original.clone(),
    };

    if let Some(target) = response.redirect.take() {
        return Ok((Outcome::Redirect(target), node));
    }

    let outcome = if response.raw {
        Outcome::Raw(response.body)
    } else {
        Outcome::Embed(response.body)
    };
    Ok((outcome, node))
}
