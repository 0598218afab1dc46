//! Users and their client-reported status.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The subset of the provider's `/v2/me` response the service needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub login: String,

    /// Workstation the user is currently logged in at, if any
    #[serde(default)]
    pub location: Option<String>,
}

/// Monitor and screen-lock status as reported by a desktop client.
///
/// Values are kept exactly as the client sent them: clients disagree on
/// whether a lock flag is a string or a boolean, or a timestamp a number
/// or a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStatus {
    #[serde(default)]
    pub monitor_state: Option<Value>,
    #[serde(default)]
    pub last_monitor_off_time: Option<Value>,
    #[serde(default)]
    pub last_monitor_on_time: Option<Value>,
    #[serde(default)]
    pub is_locked_screen: Option<Value>,
    #[serde(default)]
    pub last_screenlock_time: Option<Value>,
    #[serde(default)]
    pub last_screenunlock_time: Option<Value>,
}

/// Body of a status report. `username` names the user when the
/// reporting client carries no session cookie.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(flatten)]
    pub status: UserStatus,
}

/// Last-known status for a user. Lives in memory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    pub user_id: String,

    #[serde(flatten)]
    pub status: UserStatus,

    pub updated_at: DateTime<FixedOffset>,
}

impl UserState {
    pub fn new(
        user_id: impl Into<String>,
        status: UserStatus,
        updated_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            status,
            updated_at,
        }
    }
}
