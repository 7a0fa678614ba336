//! HTTP response helpers.

use anyhow::Result;
use tiny_http::{Header, Request, Response, StatusCode};

const HTML: &str = "text/html; charset=utf-8";
const PLAIN: &str = "text/plain; charset=utf-8";

/// Respond with an assembled HTML page.
pub fn respond_html(request: Request, body: String) -> Result<()> {
    let response = Response::from_string(body)
        .with_status_code(StatusCode(200))
        .with_header(make_header("Content-Type", HTML));
    request.respond(response)?;
    Ok(())
}

/// Respond with a worker's raw body, passed through unmodified.
pub fn respond_raw(request: Request, body: Vec<u8>) -> Result<()> {
    let response = Response::from_data(body).with_status_code(StatusCode(200));
    request.respond(response)?;
    Ok(())
}

/// Respond with 303 See Other.
pub fn respond_redirect(request: Request, target: &str) -> Result<()> {
    let response = Response::empty(StatusCode(303))
        .with_header(Header::from_bytes("Location", target.as_bytes()).unwrap());
    request.respond(response)?;
    Ok(())
}

/// Respond with 404 for an unknown node or host.
pub fn respond_not_found(request: Request) -> Result<()> {
    send_plain(request, 404, "content not found")
}

/// Respond with 400 for an invalid action submission.
pub fn respond_bad_request(request: Request, message: &str) -> Result<()> {
    send_plain(request, 400, message)
}

/// Respond with a generic 500. Details stay in the log; the requester
/// never sees partial content.
pub fn respond_internal_error(request: Request) -> Result<()> {
    send_plain(request, 500, "internal server error")
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_plain(request, 503, "503 Service Unavailable")
}

fn send_plain(request: Request, status: u16, message: &str) -> Result<()> {
    let response = Response::from_string(message)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", PLAIN));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}
