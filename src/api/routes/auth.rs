use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::session::{session_cookie, session_token};
use crate::api::state::AppState;
use crate::api::ApiError;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

/// Send users with a session to the time view, everyone else to login.
pub async fn root(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    if session_token(&headers).is_some() {
        Redirect::to("/time")
    } else {
        Redirect::to(&state.authorize_url)
    }
}

/// OAuth redirect target: trade the code for a token and start a session.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing authorization code".to_string()))?;

    let token = state.intra.exchange_code(&code).await?;
    let profile = state.intra.me(&token).await?;
    info!(login = %profile.login, id = profile.id, "User logged in");

    let cookie = session_cookie(&token, state.session_ttl);
    state.sessions.insert(token, profile, state.now()).await;
    let sessions = state.sessions.token_count().await;
    debug!(sessions, "Session started");

    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/time")).into_response())
}
