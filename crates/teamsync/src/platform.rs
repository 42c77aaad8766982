//! Platform-agnostic access to an organization's teams, repositories and users.
//!
//! This module defines the `RemoteDirectory` trait the sync engine consumes,
//! the entity types it exchanges, the shared error type, and the pacing
//! strategies (`Throttle`) applied between mutating calls.
//!
//! # Example
//!
//! ```ignore
//! use teamsync::platform::{RemoteDirectory, PlatformError};
//!
//! async fn show_teams<D: RemoteDirectory>(directory: &D) -> Result<(), PlatformError> {
//!     for (name, team) in directory.list_teams().await? {
//!         println!("{name} ({})", team.slug);
//!     }
//!     Ok(())
//! }
//! ```

mod errors;
mod throttle;
mod types;

pub use errors::{PlatformError, Result, short_error_message};
pub use throttle::{
    AdaptiveDelay, FixedDelay, NoDelay, RequestRateLimiter, SharedThrottle, Throttle, delays,
};
pub use types::{ParsePermissionError, Permission, RemoteDirectory, Repository, Team, UserRef};
