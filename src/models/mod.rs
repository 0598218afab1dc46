//! Core data models for the logtime service.

mod period;
mod session;
mod summary;
mod user;

pub use period::*;
pub use session::*;
pub use summary::*;
pub use user::*;
