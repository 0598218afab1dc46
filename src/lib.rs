//! # Logtime
//!
//! Monthly and daily learning time for 42 students, computed from the
//! 42 Intra location history, behind an Intra OAuth login.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (sessions, month summaries, user state)
//! - **calculate**: Time aggregation in Asia/Seoul
//! - **intra**: OAuth and location API client
//! - **store**: In-memory user state and login sessions
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod calculate;
pub mod config;
pub mod intra;
pub mod models;
pub mod store;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num.checked_mul(multiplier)?))
}
