//! Teamsync - keep platform teams in step with a course roster.
//!
//! This library reconciles the membership of organization teams (and their
//! same-named repositories) against a desired-state roster, and bulk-applies
//! repository permissions to teams selected by name prefix.
//!
//! # Features
//!
//! - `github` (default) - The octocrab-backed [`github::GitHubDirectory`],
//!   which works against github.com and GitHub Enterprise Server.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use teamsync::{assignment, github::GitHubDirectory, platform::FixedDelay, sync::SyncContext};
//!
//! let directory = GitHubDirectory::new("https://api.github.com", &token, "engr-csc316")?;
//! let loaded = assignment::load("teams.txt")?;
//!
//! let ctx = SyncContext::builder()
//!     .directory(directory)
//!     .throttle(Arc::new(FixedDelay::default()))
//!     .build()?;
//! let report = ctx.synchronize(&loaded.assignments).await?;
//! ```

pub mod assignment;
pub mod platform;
pub mod sync;

#[cfg(feature = "github")]
pub mod retry;

#[cfg(feature = "github")]
pub mod github;

pub use assignment::{Assignment, AssignmentError, LoadWarning, LoadedAssignments};
pub use platform::{
    Permission, PlatformError, RemoteDirectory, Repository, SharedThrottle, Team, Throttle,
    UserRef,
};
pub use sync::{PermissionReport, SyncError, SyncOptions, SyncReport, UnresolvedUser};
