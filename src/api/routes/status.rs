use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::debug;

use crate::api::session::authenticate;
use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::seoul;
use crate::models::{StatusReport, UserState};

#[derive(Debug, Serialize)]
pub struct StatusAck {
    pub ok: bool,
}

/// Record a client's monitor/lock status.
///
/// The user is taken from the session cookie; clients without one name
/// themselves with `username`, which must belong to a user who has logged in.
pub async fn report_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<StatusReport>, JsonRejection>,
) -> Result<Json<StatusAck>, ApiError> {
    let Json(report) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let login = match authenticate(&state, &headers).await {
        Ok(profile) => profile.login,
        Err(ApiError::Unauthenticated { .. }) => {
            let username = report
                .username
                .as_deref()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| ApiError::BadRequest("username required".to_string()))?;
            state
                .sessions
                .find_login(username, state.now())
                .await
                .ok_or_else(|| ApiError::NotFound(format!("user {}", username)))?
                .login
        }
        Err(e) => return Err(e),
    };

    let updated_at = state.now().with_timezone(&seoul());
    let user_state = UserState::new(login.clone(), report.status, updated_at);
    state.state_store.set_state(&login, user_state).await?;
    debug!(login = %login, "Stored client status");

    Ok(Json(StatusAck { ok: true }))
}

/// Last status reported for the logged-in user.
pub async fn current_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserState>, ApiError> {
    let me = authenticate(&state, &headers).await?;
    let user_state = state.state_store.get_state(&me.login).await?;
    Ok(Json(user_state))
}
