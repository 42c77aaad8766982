//! GitHub (and GitHub Enterprise Server) implementation of the directory.
//!
//! # Module Structure
//!
//! - [`error`] - Error types and HTTP status classification
//! - [`types`] - Request and response bodies
//! - [`client`] - `GitHubDirectory`, the `RemoteDirectory` implementation
//! - [`convert`] - Conversion from API types to directory entities
//!
//! # Example
//!
//! ```ignore
//! use teamsync::github::{GitHubDirectory, DEFAULT_API_URL};
//! use teamsync::platform::RemoteDirectory;
//!
//! let directory = GitHubDirectory::new(DEFAULT_API_URL, &token, "engr-csc316-fall2024")?;
//! let teams = directory.list_teams().await?;
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use error::{
    GitHubError, RateLimitHeaders, classify_response, classify_status, from_octocrab,
};

pub use types::PER_PAGE;

pub use client::{DEFAULT_API_URL, GitHubDirectory, create_client};

pub use convert::{to_repository, to_team, to_user_ref};
