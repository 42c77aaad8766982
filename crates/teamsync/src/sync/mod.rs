//! Team membership synchronization and bulk permission updates.
//!
//! # Module Structure
//!
//! - [`types`] - Options, reports, outcomes, `MembershipDiff`, `SyncError`
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`engine`] - Membership synchronization: `synchronize()`
//! - [`permissions`] - Prefix permission updates: `update_permissions()`
//! - [`context`] - `SyncContext` builder bundling the above
//! - `test_support` - `MemoryDirectory` test double (tests and `test-support` feature)
//!
//! # Example
//!
//! ```ignore
//! use teamsync::assignment;
//! use teamsync::platform::FixedDelay;
//! use teamsync::sync::{SyncOptions, synchronize};
//!
//! let loaded = assignment::load("teams.txt")?;
//! let report = synchronize(
//!     &directory,
//!     &loaded.assignments,
//!     &SyncOptions::default(),
//!     &FixedDelay::default(),
//!     None,
//!     None,
//! )
//! .await?;
//! for user in &report.unresolved {
//!     println!("{user}");
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

mod context;
pub mod engine;
pub mod permissions;
mod progress;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-export types
pub use types::{
    AssignmentOutcome, MembershipDiff, PermissionFailure, PermissionReport, SyncError,
    SyncOptions, SyncReport, TeamResolution, UnresolvedUser,
};

// Re-export constants
pub use types::{EMPTY_LIST_REASON, NOT_FOUND_REASON};

// Re-export progress types
pub use progress::{ProgressCallback, SyncProgress, emit};

pub use context::{SyncContext, SyncContextBuilder, SyncContextError};
pub use engine::synchronize;
pub use permissions::update_permissions;

/// True once the shared shutdown flag has been raised.
pub(crate) fn is_shutdown_requested(flag: Option<&AtomicBool>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::Relaxed))
}
