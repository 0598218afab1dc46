//! In-memory stores.
//!
//! - **state**: last-known client status per user
//! - **sessions**: logged-in users keyed by access token
//!
//! Nothing here survives a restart.

mod sessions;

pub use sessions::{SessionLookup, SessionRegistry};

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::UserState;

/// Errors from a state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No state has been recorded for the user. Callers treat this as
    /// "no prior state".
    #[error("No state for user: {0}")]
    NotFound(String),
}

/// Per-user status storage. Writes overwrite (last write wins).
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn set_state(&self, user_id: &str, state: UserState) -> Result<(), StoreError>;

    async fn get_state(&self, user_id: &str) -> Result<UserState, StoreError>;
}

/// [`StateStore`] backed by a map in process memory.
#[derive(Default)]
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, UserState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn set_state(&self, user_id: &str, state: UserState) -> Result<(), StoreError> {
        self.states.write().await.insert(user_id.to_string(), state);
        Ok(())
    }

    async fn get_state(&self, user_id: &str) -> Result<UserState, StoreError> {
        self.states
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }
}
