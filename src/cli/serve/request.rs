//! Inbound request introspection.
//!
//! Builds the immutable snapshots that travel with a ticket. Session and
//! form machinery live outside this server; only what the edge can observe
//! directly (cookies, url-encoded fields) is captured here.

use std::io::Read;

use tiny_http::{Method, Request};
use url::form_urlencoded;

use crate::config::SiteSection;
use crate::worker::{RequestSnapshot, SessionSnapshot};

/// Cookie carrying the external session's user name.
const USER_COOKIE: &str = "arbor_user";

/// Host header value, if present.
pub fn host_of(request: &Request) -> Option<String> {
    header_value(request, "host")
}

/// Build the request snapshot, draining a url-encoded form body if present.
pub fn snapshot_request(request: &mut Request) -> RequestSnapshot {
    let method = request.method().to_string().to_ascii_uppercase();
    let url = request.url().to_string();

    let mut form = Vec::new();
    if let Some((_, query)) = url.split_once('?') {
        form.extend(parse_pairs(query));
    }
    if is_form_post(request) {
        let mut body = String::new();
        if request.as_reader().read_to_string(&mut body).is_ok() {
            form.extend(parse_pairs(&body));
        }
    }

    RequestSnapshot { method, url, form }
}

/// Session snapshot for the site handling this request.
pub fn session_from_request(request: &Request, site: &SiteSection) -> SessionSnapshot {
    let user = header_value(request, "cookie")
        .and_then(|cookies| cookie_value(&cookies, USER_COOKIE));
    SessionSnapshot {
        user,
        locale: site.locale.clone(),
    }
}

fn is_form_post(request: &Request) -> bool {
    request.method() == &Method::Post
        && header_value(request, "content-type")
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn header_value(request: &Request, field: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(field))
        .map(|h| h.value.to_string())
}

fn parse_pairs(encoded: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(encoded.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|cookie| {
        let (k, v) = cookie.split_once('=')?;
        (k.trim() == name).then(|| v.trim().to_string())
    })
}
