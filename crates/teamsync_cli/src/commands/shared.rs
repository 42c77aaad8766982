use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use console::style;
use teamsync::github::GitHubDirectory;
use teamsync::sync::{SyncContext, SyncOptions};

use crate::config::Config;
use crate::progress::ProgressReporter;

/// A ready-to-run context plus the reporter wired into it.
pub(crate) struct Session {
    pub(crate) context: SyncContext<GitHubDirectory>,
    pub(crate) reporter: Arc<ProgressReporter>,
}

/// Validate credentials and connect, sharing one throttle between the engine
/// and the client's rate-limit feedback.
pub(crate) fn open_session(
    config: &Config,
    options: SyncOptions,
    delay_ms: Option<u64>,
    shutdown: Arc<AtomicBool>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let credentials = config.github_credentials()?;
    let throttle = config.throttle(delay_ms, options.dry_run);

    tracing::debug!(
        api_url = %credentials.api_url,
        org = %credentials.org,
        throttle = ?config.sync.throttle,
        "Connecting to GitHub"
    );

    let directory = GitHubDirectory::new(
        &credentials.api_url,
        &credentials.token,
        &credentials.org,
    )?
    .with_throttle(Arc::clone(&throttle));

    let reporter = Arc::new(ProgressReporter::new());
    let context = SyncContext::builder()
        .directory(directory)
        .throttle(throttle)
        .options(options)
        .progress(reporter.as_callback())
        .shutdown_flag(shutdown)
        .build()?;

    Ok(Session { context, reporter })
}

pub(crate) fn dry_run_banner(is_tty: bool) {
    if is_tty {
        println!(
            "{}\n",
            style("Dry run: nothing will be changed on GitHub").yellow().bold()
        );
    } else {
        tracing::info!("Dry run: nothing will be changed");
    }
}

/// Print a `label: count` line, colouring non-zero problem counts.
pub(crate) fn count_line(label: &str, count: usize, problem: bool) {
    let value = if problem && count > 0 {
        style(count.to_string()).red().bold()
    } else {
        style(count.to_string()).bold()
    };
    println!("  {label:<12} {value}");
}
