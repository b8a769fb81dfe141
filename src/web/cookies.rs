//! Session cookie parsing and rendering.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

use crate::domain::SessionId;

pub const SESSION_COOKIE: &str = "heartcheck_session";

/// Session id carried by the request, if any well-formed one is present.
#[must_use]
pub fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value))
}

/// `Set-Cookie` value binding the browser to `session`.
#[must_use]
pub fn session_cookie(session: &SessionId, secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
