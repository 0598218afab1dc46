//! 42 Intra API client.
//!
//! Covers the OAuth flows (authorization code for users, client
//! credentials for the service itself), the `/v2/me` profile lookup, and
//! paginated location history. Requests are never retried; timeouts and
//! transport failures are reported to the caller as-is.

use async_trait::async_trait;
use std::future::Future;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::config::IntraConfig;
use crate::models::{Location, MonthPeriod, UserProfile};

/// Locations requested per page.
pub const PAGE_SIZE: usize = 100;

/// How far before the month start location queries reach, so that a
/// session begun the evening before still contributes its in-month part.
pub const LOOKBACK_HOURS: i64 = 24;

/// Errors from the provider.
#[derive(Debug, Error)]
pub enum IntraError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Request to provider timed out")]
    Timeout,

    #[error("Token rejected by provider")]
    Unauthorized,

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for IntraError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IntraError::Timeout
        } else {
            IntraError::Http(e)
        }
    }
}

impl From<url::ParseError> for IntraError {
    fn from(e: url::ParseError) -> Self {
        IntraError::InvalidUrl(e.to_string())
    }
}

/// Time window for a location query, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRange {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl LocationRange {
    /// Locations that can overlap `period` up to `now`.
    pub fn for_month(period: MonthPeriod, tz: &FixedOffset, now: DateTime<Utc>) -> Self {
        let (month_start, month_end) = period.bounds(tz);
        Self {
            begin: month_start - Duration::hours(LOOKBACK_HOURS),
            end: month_end.min(now),
        }
    }

    /// Whether any location could begin inside the window.
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// The `range[begin_at]` filter value.
    pub fn to_query(&self) -> String {
        format!(
            "{},{}",
            self.begin.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

/// Operations the service needs from the provider.
#[async_trait]
pub trait IntraApi: Send + Sync {
    /// Exchange an authorization code for a user access token.
    async fn exchange_code(&self, code: &str) -> Result<String, IntraError>;

    /// Obtain a fresh client-credentials token for the service.
    async fn request_app_token(&self) -> Result<String, IntraError>;

    /// Profile of the user owning `token`.
    async fn me(&self, token: &str) -> Result<UserProfile, IntraError>;

    /// All of a user's locations that began inside `range`.
    async fn locations(
        &self,
        token: &str,
        user_id: u64,
        range: &LocationRange,
    ) -> Result<Vec<Location>, IntraError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Build the browser-facing authorization URL.
pub fn authorize_url(config: &IntraConfig, redirect_uri: &str) -> Result<String, IntraError> {
    let url = Url::parse_with_params(
        &format!("{}/oauth/authorize", config.api_base_url),
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
        ],
    )?;
    Ok(url.to_string())
}

/// HTTP client for the provider.
pub struct IntraClient {
    client: Client,
    base_url: Url,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl IntraClient {
    pub fn new(config: &IntraConfig, redirect_uri: impl Into<String>) -> Result<Self, IntraError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("logtime/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = Url::parse(&format!("{}/", config.api_base_url))?;

        Ok(Self {
            client,
            base_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: redirect_uri.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IntraError> {
        Ok(self.base_url.join(path)?)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<String, IntraError> {
        let response = self
            .client
            .post(self.endpoint("oauth/token")?)
            .form(form)
            .send()
            .await?;
        let token: TokenResponse = check_status(response).await?.json().await?;
        Ok(token.access_token)
    }
}

/// Query parameters for one page of a location request.
fn page_query(page: usize, range: &LocationRange) -> [(&'static str, String); 3] {
    [
        ("page[size]", PAGE_SIZE.to_string()),
        ("page[number]", page.to_string()),
        ("range[begin_at]", range.to_query()),
    ]
}

/// Fetch pages numbered from 1 until one comes back short.
async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<Location>, IntraError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Vec<Location>, IntraError>>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch_page(page).await?;
        let batch_len = batch.len();
        all.extend(batch);

        if batch_len < PAGE_SIZE {
            return Ok(all);
        }
        page += 1;
    }
}

/// Map non-success statuses to errors.
async fn check_status(response: Response) -> Result<Response, IntraError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(IntraError::Unauthorized);
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(IntraError::HttpStatus {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

#[async_trait]
impl IntraApi for IntraClient {
    async fn exchange_code(&self, code: &str) -> Result<String, IntraError> {
        debug!("Exchanging authorization code");
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn request_app_token(&self) -> Result<String, IntraError> {
        info!("Requesting client-credentials token");
        self.request_token(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ])
        .await
    }

    async fn me(&self, token: &str) -> Result<UserProfile, IntraError> {
        let response = self
            .client
            .get(self.endpoint("v2/me")?)
            .bearer_auth(token)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn locations(
        &self,
        token: &str,
        user_id: u64,
        range: &LocationRange,
    ) -> Result<Vec<Location>, IntraError> {
        let url = self.endpoint(&format!("v2/users/{}/locations", user_id))?;

        let all = collect_pages(|page| {
            let request = self
                .client
                .get(url.clone())
                .bearer_auth(token)
                .query(&page_query(page, range));
            async move {
                let response = request.send().await?;
                let batch: Vec<Location> = check_status(response).await?.json().await?;
                Ok::<_, IntraError>(batch)
            }
        })
        .await?;

        debug!(user_id, count = all.len(), "Fetched locations");
        Ok(all)
    }
}

/// Cached client-credentials token shared across requests.
#[derive(Default)]
pub struct TokenCache {
    token: RwLock<Option<String>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached token, or a new one from the provider.
    pub async fn get(&self, api: &dyn IntraApi) -> Result<String, IntraError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut slot = self.token.write().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let token = api.request_app_token().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next `get` requests a new one.
    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }
}

/// In-memory provider for tests.
#[cfg(test)]
pub struct MockIntra {
    pub user_token: String,
    pub profile: UserProfile,
    pub locations: Vec<Location>,
    /// Status to fail location requests with (401 maps to `Unauthorized`)
    pub locations_status: Option<u16>,
    pub app_tokens_issued: std::sync::atomic::AtomicUsize,
    /// `(user_id, range)` of every location request, in order
    pub location_requests: std::sync::Mutex<Vec<(u64, LocationRange)>>,
}

#[cfg(test)]
impl MockIntra {
    pub fn new(user_token: impl Into<String>, profile: UserProfile) -> Self {
        Self {
            user_token: user_token.into(),
            profile,
            locations: Vec::new(),
            locations_status: None,
            app_tokens_issued: std::sync::atomic::AtomicUsize::new(0),
            location_requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = locations;
        self
    }

    pub fn failing_locations(mut self, status: u16) -> Self {
        self.locations_status = Some(status);
        self
    }
}

#[cfg(test)]
#[async_trait]
impl IntraApi for MockIntra {
    async fn exchange_code(&self, code: &str) -> Result<String, IntraError> {
        if code == "good-code" {
            Ok(self.user_token.clone())
        } else {
            Err(IntraError::HttpStatus {
                status: 400,
                message: "invalid_grant".to_string(),
            })
        }
    }

    async fn request_app_token(&self) -> Result<String, IntraError> {
        let n = self
            .app_tokens_issued
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(format!("app-token-{}", n))
    }

    async fn me(&self, token: &str) -> Result<UserProfile, IntraError> {
        if token == self.user_token {
            Ok(self.profile.clone())
        } else {
            Err(IntraError::Unauthorized)
        }
    }

    async fn locations(
        &self,
        _token: &str,
        user_id: u64,
        range: &LocationRange,
    ) -> Result<Vec<Location>, IntraError> {
        self.location_requests
            .lock()
            .unwrap()
            .push((user_id, *range));
        match self.locations_status {
            Some(401) => Err(IntraError::Unauthorized),
            Some(status) => Err(IntraError::HttpStatus {
                status,
                message: "mock failure".to_string(),
            }),
            None => Ok(self.locations.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn profile() -> UserProfile {
        UserProfile {
            id: 1,
            login: "jdoe".to_string(),
            location: None,
        }
    }

    #[test]
    fn test_authorize_url() {
        let config = IntraConfig {
            client_id: "abc".to_string(),
            ..Default::default()
        };
        let url = authorize_url(&config, "http://localhost:8000/callback").unwrap();

        assert!(url.starts_with("https://api.intra.42.fr/oauth/authorize?"));
        assert!(url.contains("client_id=abc"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fcallback"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn test_location_range_query() {
        let range = LocationRange {
            begin: Utc.with_ymd_and_hms(2023, 12, 31, 15, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 10, 3, 4, 5).unwrap(),
        };
        assert_eq!(
            range.to_query(),
            "2023-12-31T15:00:00Z,2024-01-10T03:04:05Z"
        );
    }

    #[test]
    fn test_range_for_month_reaches_into_previous_day() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let jan = MonthPeriod::new(2024, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 3, 0, 0).unwrap();

        let range = LocationRange::for_month(jan, &tz, now);
        assert_eq!(range.begin, Utc.with_ymd_and_hms(2023, 12, 30, 15, 0, 0).unwrap());
        assert_eq!(range.end, now);
        assert!(!range.is_empty());
    }

    #[test]
    fn test_range_for_past_and_future_months() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 3, 0, 0).unwrap();

        let dec = LocationRange::for_month(MonthPeriod::new(2023, 12).unwrap(), &tz, now);
        assert_eq!(dec.end, Utc.with_ymd_and_hms(2023, 12, 31, 15, 0, 0).unwrap());

        let mar = LocationRange::for_month(MonthPeriod::new(2024, 3).unwrap(), &tz, now);
        assert!(mar.is_empty());
    }

    #[test]
    fn test_page_query() {
        let range = LocationRange {
            begin: Utc.with_ymd_and_hms(2023, 12, 30, 15, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 16, 3, 0, 0).unwrap(),
        };
        let query = page_query(3, &range);

        assert_eq!(query[0], ("page[size]", "100".to_string()));
        assert_eq!(query[1], ("page[number]", "3".to_string()));
        assert_eq!(
            query[2],
            (
                "range[begin_at]",
                "2023-12-30T15:00:00Z,2024-01-16T03:00:00Z".to_string()
            )
        );
    }

    fn page_of(len: usize) -> Vec<Location> {
        vec![Location::default(); len]
    }

    #[tokio::test]
    async fn test_collect_pages_stops_on_short_page() {
        let sizes = [PAGE_SIZE, PAGE_SIZE, 3, PAGE_SIZE];
        let mut requested = Vec::new();

        let all = collect_pages(|page| {
            requested.push(page);
            let batch = page_of(sizes[page - 1]);
            async move { Ok::<_, IntraError>(batch) }
        })
        .await
        .unwrap();

        assert_eq!(all.len(), 2 * PAGE_SIZE + 3);
        assert_eq!(requested, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_collect_pages_stops_on_empty_page() {
        let sizes = [PAGE_SIZE, 0];
        let mut requested = 0;

        let all = collect_pages(|page| {
            requested += 1;
            let batch = page_of(sizes[page - 1]);
            async move { Ok::<_, IntraError>(batch) }
        })
        .await
        .unwrap();

        assert_eq!(all.len(), PAGE_SIZE);
        assert_eq!(requested, 2);
    }

    #[tokio::test]
    async fn test_collect_pages_propagates_failure() {
        let result = collect_pages(|page| async move {
            if page == 2 {
                Err(IntraError::Timeout)
            } else {
                Ok(page_of(PAGE_SIZE))
            }
        })
        .await;

        assert!(matches!(result, Err(IntraError::Timeout)));
    }

    #[test]
    fn test_client_builds_from_config() {
        let config = IntraConfig::default();
        let client = IntraClient::new(&config, "http://localhost:8000/callback").unwrap();
        assert_eq!(
            client.endpoint("v2/me").unwrap().as_str(),
            "https://api.intra.42.fr/v2/me"
        );
    }

    #[test]
    fn test_token_response_deserialization() {
        let json = r#"{"access_token": "tok", "token_type": "bearer", "expires_in": 7200}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "tok");
    }

    #[tokio::test]
    async fn test_token_cache_reuses_token() {
        let api = MockIntra::new("user", profile());
        let cache = TokenCache::new();

        let first = cache.get(&api).await.unwrap();
        let second = cache.get(&api).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            api.app_tokens_issued
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn test_token_cache_invalidate() {
        let api = MockIntra::new("user", profile());
        let cache = TokenCache::new();

        let first = cache.get(&api).await.unwrap();
        cache.invalidate().await;
        let second = cache.get(&api).await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_mock_rejects_unknown_token() {
        let api = MockIntra::new("user", profile());
        assert!(matches!(
            api.me("someone-else").await,
            Err(IntraError::Unauthorized)
        ));
        assert_eq!(api.me("user").await.unwrap().login, "jdoe");
    }
}
