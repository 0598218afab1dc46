use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::session::authenticate;
use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::{aggregate, format_hms, seoul, target_percent};
use crate::intra::{IntraError, LocationRange};
use crate::models::{Location, MonthPeriod, Session, UserState};

#[derive(Debug, Serialize)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub seconds: i64,
    pub hms: String,
}

#[derive(Debug, Serialize)]
pub struct TimeResponse {
    pub year: i32,
    pub month: u32,
    pub total_seconds: i64,
    pub alltime_hms: String,
    pub percent: f64,
    pub max_hour: u32,
    pub days: Vec<DayEntry>,
    pub location: Option<String>,
    pub state: Option<UserState>,
    pub username: String,
}

/// The client application shell. Requires a session.
pub async fn shell(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match authenticate(&state, &headers).await {
        Ok(_) => Html(state.shell_html.to_string()).into_response(),
        Err(ApiError::Unauthenticated { authorize_url }) => {
            Redirect::to(&authorize_url).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Learning time for the current month in Asia/Seoul.
pub async fn month_time(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TimeResponse>, ApiError> {
    let me = authenticate(&state, &headers).await?;

    let tz = seoul();
    let now = state.now();
    let period = MonthPeriod::containing(now, &tz);
    let range = LocationRange::for_month(period, &tz, now);

    let token = state.app_token.get(state.intra.as_ref()).await?;
    let locations = match state.intra.locations(&token, me.id, &range).await {
        Ok(locations) => locations,
        Err(IntraError::Unauthorized) => {
            // Next request will obtain a new app token
            warn!("App token rejected, discarding it");
            state.app_token.invalidate().await;
            return Err(IntraError::Unauthorized.into());
        }
        Err(e) => return Err(e.into()),
    };

    let sessions: Vec<Session> = locations.iter().filter_map(Location::to_session).collect();
    let summary = aggregate(&sessions, period, now, &tz);
    debug!(
        login = %me.login,
        sessions = sessions.len(),
        total_seconds = summary.total_seconds,
        "Aggregated {}", period
    );

    // No report yet is not an error here
    let user_state = state.state_store.get_state(&me.login).await.ok();

    let today = now.with_timezone(&tz).date_naive();
    let days = summary
        .days_through(today)
        .into_iter()
        .map(|d| DayEntry {
            date: d.date,
            seconds: d.seconds,
            hms: format_hms(d.seconds),
        })
        .collect();
    let max_hours = state.config.time.max_hours;

    Ok(Json(TimeResponse {
        year: summary.year,
        month: summary.month,
        total_seconds: summary.total_seconds,
        alltime_hms: format_hms(summary.total_seconds),
        percent: target_percent(summary.total_seconds, max_hours),
        max_hour: max_hours,
        days,
        location: me.location,
        state: user_state,
        username: me.login,
    }))
}
