//! Configuration file support for teamsync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`TEAMSYNC_GITHUB_TOKEN`, `TEAMSYNC_GITHUB_ORG`,
//!    `TEAMSYNC_GITHUB_API_URL`, or any key as `TEAMSYNC_<SECTION>__<KEY>`,
//!    e.g. `TEAMSYNC_SYNC__DELAY_MS`)
//! 3. Local config file (./teamsync.toml)
//! 4. User config file (~/.config/teamsync/config.toml)
//! 5. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [github]
//! api_url = "https://github.ncsu.edu/api/v3"  # default: https://api.github.com
//! token = "ghp_..."  # or use TEAMSYNC_GITHUB_TOKEN
//! org = "engr-csc316-fall2024"
//!
//! [sync]
//! input = "teams.txt"
//! throttle = "fixed"  # fixed | adaptive | rate | none
//! delay_ms = 500
//! max_delay_ms = 60000
//! requests_per_second = 2
//!
//! [permissions]
//! level = "read"  # read | write | admin
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use directories::ProjectDirs;
use serde::Deserialize;
use teamsync::platform::{
    AdaptiveDelay, FixedDelay, NoDelay, Permission, RequestRateLimiter, SharedThrottle, delays,
};

/// Environment variable prefix.
const ENV_PREFIX: &str = "TEAMSYNC";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error(
        "No GitHub token configured. Set TEAMSYNC_GITHUB_TOKEN or add `token` under [github] in {}",
        config_hint()
    )]
    MissingToken,

    #[error(
        "No organization configured. Set TEAMSYNC_GITHUB_ORG or add `org` under [github] in {}",
        config_hint()
    )]
    MissingOrg,

    #[error("No assignment file given. Pass --input or set `input` under [sync]")]
    MissingInput,
}

fn config_hint() -> String {
    Config::default_config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "teamsync.toml".to_string())
}

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub configuration.
    pub github: GitHubConfig,
    /// Membership sync defaults.
    pub sync: SyncConfig,
    /// Permission update defaults.
    pub permissions: PermissionsConfig,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API base URL; use `https://<host>/api/v3` for GitHub Enterprise Server.
    pub api_url: String,
    /// Personal access token with `admin:org` and `repo` scopes.
    pub token: Option<String>,
    /// Organization whose teams are managed.
    pub org: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: teamsync::github::DEFAULT_API_URL.to_string(),
            token: None,
            org: None,
        }
    }
}

/// Pacing strategy between mutating calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThrottleKind {
    /// Constant delay after every mutation.
    #[default]
    Fixed,
    /// Delay that backs off on rate limiting and recovers afterwards.
    Adaptive,
    /// Token bucket of `requests_per_second`.
    Rate,
    /// No delay at all.
    None,
}

/// Membership sync defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Assignment file used when `--input` is not given.
    pub input: Option<PathBuf>,
    pub throttle: ThrottleKind,
    /// Delay for the fixed strategy, and base delay for the adaptive one.
    pub delay_ms: u64,
    /// Ceiling for the adaptive strategy.
    pub max_delay_ms: u64,
    /// Rate for the token-bucket strategy.
    pub requests_per_second: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            input: None,
            throttle: ThrottleKind::Fixed,
            delay_ms: delays::DEFAULT_DELAY_MS,
            max_delay_ms: delays::DEFAULT_MAX_DELAY_MS,
            requests_per_second: 2,
        }
    }
}

/// Permission update defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    pub level: Permission,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            level: Permission::Read,
        }
    }
}

/// Validated connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubCredentials {
    pub api_url: String,
    pub token: String,
    pub org: String,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/teamsync/config.toml)
    /// 3. Local config file (./teamsync.toml)
    /// 4. Environment variables with the TEAMSYNC_ prefix
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Add XDG config file if it exists
        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        // Add local config file (higher priority than XDG)
        let local_config = PathBuf::from("teamsync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./teamsync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., TEAMSYNC_SYNC__DELAY_MS -> sync.delay_ms
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Single-underscore spellings for the keys people set most.
        for (key, var) in [
            ("github.token", "TEAMSYNC_GITHUB_TOKEN"),
            ("github.org", "TEAMSYNC_GITHUB_ORG"),
            ("github.api_url", "TEAMSYNC_GITHUB_API_URL"),
        ] {
            builder = builder.set_override_option(key, std::env::var(var).ok())?;
        }

        Self::from_builder(builder)
    }

    fn from_builder(builder: config::ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        Ok(builder.build()?.try_deserialize::<Config>()?)
    }

    /// Token, organization and endpoint, or the reason they are unusable.
    pub fn github_credentials(&self) -> Result<GitHubCredentials, ConfigError> {
        let token = self
            .github
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;
        let org = self
            .github
            .org
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .ok_or(ConfigError::MissingOrg)?;

        Ok(GitHubCredentials {
            api_url: self.github.api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            org: org.to_string(),
        })
    }

    /// Assignment file: the CLI flag wins over the configured path.
    pub fn input_path(&self, flag: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        flag.or_else(|| self.sync.input.clone())
            .ok_or(ConfigError::MissingInput)
    }

    /// Build the configured pacing strategy.
    ///
    /// `delay_ms` overrides the configured delay; dry runs never wait.
    pub fn throttle(&self, delay_ms: Option<u64>, dry_run: bool) -> SharedThrottle {
        if dry_run {
            return Arc::new(NoDelay);
        }

        let delay = Duration::from_millis(delay_ms.unwrap_or(self.sync.delay_ms));
        match self.sync.throttle {
            ThrottleKind::Fixed => Arc::new(FixedDelay::new(delay)),
            ThrottleKind::Adaptive => Arc::new(AdaptiveDelay::new(
                delay,
                Duration::from_millis(self.sync.max_delay_ms),
            )),
            ThrottleKind::Rate => Arc::new(RequestRateLimiter::new(self.sync.requests_per_second)),
            ThrottleKind::None => Arc::new(NoDelay),
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "teamsync").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
