use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::api::ApiError;
use crate::config::{AppConfig, ConfigError};
use crate::intra::{authorize_url, IntraApi, TokenCache};
use crate::store::{SessionRegistry, StateStore};

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Page served at `/time` when no `shell_path` is configured.
const BUILTIN_SHELL: &str = include_str!("../../static/time.html");

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub intra: Arc<dyn IntraApi>,
    pub app_token: Arc<TokenCache>,
    pub sessions: Arc<SessionRegistry>,
    pub state_store: Arc<dyn StateStore>,
    pub clock: Clock,
    pub authorize_url: Arc<str>,
    pub session_ttl: Duration,
    pub shell_html: Arc<str>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        intra: Arc<dyn IntraApi>,
        state_store: Arc<dyn StateStore>,
    ) -> Result<Self, ConfigError> {
        let authorize_url = authorize_url(&config.intra, &config.redirect_uri())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        let session_ttl = config.server.session_ttl()?;
        let shell_html = match &config.server.shell_path {
            Some(path) => std::fs::read_to_string(path)?,
            None => BUILTIN_SHELL.to_string(),
        };

        Ok(Self {
            config: Arc::new(config),
            intra,
            app_token: Arc::new(TokenCache::new()),
            sessions: Arc::new(SessionRegistry::new(session_ttl)),
            state_store,
            clock: Arc::new(Utc::now),
            authorize_url: authorize_url.into(),
            session_ttl,
            shell_html: shell_html.into(),
        })
    }

    /// Replace the clock, e.g. to pin "now" in tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn unauthenticated(&self) -> ApiError {
        ApiError::Unauthenticated {
            authorize_url: self.authorize_url.to_string(),
        }
    }
}
