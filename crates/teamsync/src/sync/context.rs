//! Sync context builder.
//!
//! Bundles the directory, pacing strategy, options, progress callback and
//! shutdown flag so callers don't thread six parameters through every run.
//!
//! # Example
//!
//! ```ignore
//! use teamsync::sync::{SyncContext, SyncOptions};
//!
//! let ctx = SyncContext::builder()
//!     .directory(github)
//!     .throttle(Arc::new(FixedDelay::default()))
//!     .options(SyncOptions::default())
//!     .progress(callback)
//!     .build()?;
//!
//! let report = ctx.synchronize(&loaded.assignments).await?;
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::assignment::Assignment;
use crate::platform::{FixedDelay, Permission, RemoteDirectory, SharedThrottle};

use super::engine::synchronize;
use super::permissions::update_permissions;
use super::progress::ProgressCallback;
use super::types::{PermissionReport, SyncError, SyncOptions, SyncReport};

/// Error type for sync context construction.
#[derive(Debug, thiserror::Error)]
pub enum SyncContextError {
    /// Missing required field in builder.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
}

/// Builder for creating a `SyncContext`.
pub struct SyncContextBuilder<D> {
    directory: Option<D>,
    throttle: Option<SharedThrottle>,
    options: Option<SyncOptions>,
    progress: Option<Arc<ProgressCallback>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl<D> Default for SyncContextBuilder<D> {
    fn default() -> Self {
        Self {
            directory: None,
            throttle: None,
            options: None,
            progress: None,
            shutdown_flag: None,
        }
    }
}

impl<D: RemoteDirectory> SyncContextBuilder<D> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the remote directory.
    pub fn directory(mut self, directory: D) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Set the pacing strategy. Defaults to a fixed 500 ms delay.
    pub fn throttle(mut self, throttle: SharedThrottle) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Set sync options.
    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the progress callback.
    pub fn progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Set the shutdown flag for graceful shutdown.
    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Build the sync context.
    ///
    /// # Errors
    ///
    /// Returns `SyncContextError::MissingField` if no directory was set.
    pub fn build(self) -> Result<SyncContext<D>, SyncContextError> {
        let directory = self
            .directory
            .ok_or(SyncContextError::MissingField { field: "directory" })?;

        Ok(SyncContext {
            directory,
            throttle: self
                .throttle
                .unwrap_or_else(|| Arc::new(FixedDelay::default())),
            options: self.options.unwrap_or_default(),
            progress: self.progress,
            shutdown_flag: self.shutdown_flag,
        })
    }
}

/// Everything a synchronization or permission run needs.
pub struct SyncContext<D> {
    directory: D,
    throttle: SharedThrottle,
    options: SyncOptions,
    progress: Option<Arc<ProgressCallback>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl<D: RemoteDirectory> SyncContext<D> {
    /// Create a new builder.
    pub fn builder() -> SyncContextBuilder<D> {
        SyncContextBuilder::new()
    }

    /// Get a reference to the directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Get a reference to the options.
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Check if dry run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Synchronize team membership for every assignment.
    pub async fn synchronize(&self, assignments: &[Assignment]) -> Result<SyncReport, SyncError> {
        synchronize(
            &self.directory,
            assignments,
            &self.options,
            &*self.throttle,
            self.progress.as_deref(),
            self.shutdown_flag.as_deref(),
        )
        .await
    }

    /// Apply `permission` to every team/repository pair matching `prefix`.
    pub async fn update_permissions(
        &self,
        prefix: &str,
        permission: Permission,
    ) -> Result<PermissionReport, SyncError> {
        update_permissions(
            &self.directory,
            prefix,
            permission,
            &self.options,
            &*self.throttle,
            self.progress.as_deref(),
            self.shutdown_flag.as_deref(),
        )
        .await
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }
}
