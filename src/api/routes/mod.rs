pub mod auth;
pub mod status;
pub mod time;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use chrono::{DateTime, Utc};
    use serde_json::Value;
    use tower::util::ServiceExt;

    use crate::api::build_router;
    use crate::api::state::AppState;
    use crate::config::AppConfig;
    use crate::intra::MockIntra;
    use crate::models::UserProfile;
    use crate::store::MemoryStateStore;

    pub const USER_TOKEN: &str = "user-token";

    pub fn profile() -> UserProfile {
        UserProfile {
            id: 4242,
            login: "jdoe".to_string(),
            location: Some("c1r2s3".to_string()),
        }
    }

    pub fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.intra.client_id = "client".to_string();
        config.intra.client_secret = "secret".to_string();
        config.finalize();
        config
    }

    pub fn test_state(intra: MockIntra, now: DateTime<Utc>) -> AppState {
        test_state_with(Arc::new(intra), now)
    }

    pub fn test_state_with(intra: Arc<MockIntra>, now: DateTime<Utc>) -> AppState {
        AppState::new(config(), intra, Arc::new(MemoryStateStore::new()))
            .unwrap()
            .with_clock(Arc::new(move || now))
    }

    pub fn app(state: AppState) -> Router {
        build_router(state)
    }

    pub async fn send(
        app: Router,
        request: Request<Body>,
    ) -> (StatusCode, header::HeaderMap, Value) {
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, headers, json)
    }

    pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("access_token={}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("access_token={}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }
}
