use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::UserProfile;

/// Result of looking up a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookup {
    Active(UserProfile),
    /// The token was registered but its session has lapsed. The entry is
    /// removed by the lookup.
    Expired,
    Unknown,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    profile: UserProfile,
    logged_in_at: DateTime<Utc>,
}

/// Logged-in users, keyed by their OAuth access token and by login.
///
/// A session lasts `ttl` from login, matching the cookie's `Max-Age`.
/// Expired entries are dropped when looked up and swept on every insert.
pub struct SessionRegistry {
    ttl: Duration,
    by_token: RwLock<HashMap<String, SessionEntry>>,
    by_login: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            by_token: RwLock::new(HashMap::new()),
            by_login: RwLock::new(HashMap::new()),
        }
    }

    fn is_expired(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
        // A login stamped after `now` counts as fresh
        (now - entry.logged_in_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= self.ttl)
    }

    pub async fn insert(
        &self,
        token: impl Into<String>,
        profile: UserProfile,
        now: DateTime<Utc>,
    ) {
        let entry = SessionEntry {
            profile,
            logged_in_at: now,
        };

        let mut by_login = self.by_login.write().await;
        by_login.retain(|_, e| !self.is_expired(e, now));
        by_login.insert(entry.profile.login.clone(), entry.clone());
        drop(by_login);

        let mut by_token = self.by_token.write().await;
        by_token.retain(|_, e| !self.is_expired(e, now));
        by_token.insert(token.into(), entry);
    }

    pub async fn get(&self, token: &str, now: DateTime<Utc>) -> SessionLookup {
        match self.by_token.read().await.get(token) {
            None => return SessionLookup::Unknown,
            Some(entry) if !self.is_expired(entry, now) => {
                return SessionLookup::Active(entry.profile.clone())
            }
            Some(_) => {}
        }

        self.by_token.write().await.remove(token);
        SessionLookup::Expired
    }

    /// Find a user whose latest login is still live.
    pub async fn find_login(&self, login: &str, now: DateTime<Utc>) -> Option<UserProfile> {
        self.by_login
            .read()
            .await
            .get(login)
            .filter(|e| !self.is_expired(e, now))
            .map(|e| e.profile.clone())
    }

    /// Number of registered tokens, expired or not.
    pub async fn token_count(&self) -> usize {
        self.by_token.read().await.len()
    }
}
