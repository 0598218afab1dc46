//! Cookie-based login sessions.

use std::time::Duration;

use axum::http::{header, HeaderMap};
use tracing::debug;

use super::state::AppState;
use super::ApiError;
use crate::intra::IntraError;
use crate::models::UserProfile;
use crate::store::SessionLookup;

/// Cookie holding the user's OAuth access token.
pub const SESSION_COOKIE: &str = "access_token";

/// Access token from the request's session cookie, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value establishing a session.
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        token,
        ttl.as_secs()
    )
}

/// `Set-Cookie` value removing the session.
pub fn clear_cookie() -> String {
    format!("{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE)
}

/// Resolve the logged-in user for a request.
///
/// Live tokens are answered from the registry and expired ones are
/// rejected. Tokens the registry has never seen (e.g. after a restart) are
/// checked against the provider once and start a new session.
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<UserProfile, ApiError> {
    let token = session_token(headers).ok_or_else(|| state.unauthenticated())?;
    let now = state.now();

    match state.sessions.get(&token, now).await {
        SessionLookup::Active(profile) => return Ok(profile),
        SessionLookup::Expired => {
            debug!("Session expired");
            return Err(state.unauthenticated());
        }
        SessionLookup::Unknown => {}
    }

    match state.intra.me(&token).await {
        Ok(profile) => {
            debug!(login = %profile.login, "Restored session from provider");
            state.sessions.insert(token, profile.clone(), now).await;
            Ok(profile)
        }
        Err(IntraError::Unauthorized) => Err(state.unauthenticated()),
        Err(e) => Err(e.into()),
    }
}
