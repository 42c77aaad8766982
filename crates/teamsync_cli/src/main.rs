//! Teamsync CLI - keep GitHub organization teams in step with a course roster.

mod commands;
#[cfg(feature = "github")]
mod config;
#[cfg(feature = "github")]
mod progress;
#[cfg(feature = "github")]
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "teamsync")]
#[command(version)]
#[command(about = "Synchronize GitHub team membership from a roster file")]
#[command(
    long_about = "Teamsync reconciles the members of GitHub organization teams against a \
plain-text roster. Teams that do not exist are created together with a private repository \
of the same name. It can also grant a permission level to every team on its same-named \
repository for all repositories matching a name prefix."
)]
#[command(after_long_help = r#"ROSTER FORMAT
    One team per line: the team name, then its members' logins, separated by
    whitespace. Blank lines and lines starting with '#' are ignored.

        CSC316-P1-groupA  alice bob carol
        CSC316-P1-groupB  dave erin

EXAMPLES
    Preview the changes for a roster:
        $ teamsync assign --input teams.txt --dry-run

    Apply it, pacing mutations one second apart:
        $ teamsync assign --input teams.txt --delay-ms 1000

    Give every project team read access to its repository:
        $ teamsync permissions CSC316-P1 --level read

    Generate shell completions:
        $ teamsync completions bash > ~/.local/share/bash-completion/completions/teamsync

CONFIGURATION
    Teamsync reads configuration from:
      1. ~/.config/teamsync/config.toml (or $XDG_CONFIG_HOME/teamsync/config.toml)
      2. ./teamsync.toml
      3. Environment variables (TEAMSYNC_* prefix)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    TEAMSYNC_GITHUB_TOKEN     Personal access token (admin:org and repo scopes)
    TEAMSYNC_GITHUB_ORG       Organization whose teams are managed
    TEAMSYNC_GITHUB_API_URL   API base URL (default: https://api.github.com)
    TEAMSYNC_SYNC__DELAY_MS   Delay between mutations in milliseconds (default: 500)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile team membership with a roster file
    #[cfg(feature = "github")]
    Assign {
        /// Roster file (defaults to `sync.input` from the config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Show what would change without changing anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Remove every member of a team whose roster line lists no members
        #[arg(long)]
        allow_empty: bool,

        /// Delay between mutating calls in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Grant a permission to teams on their same-named repositories
    #[cfg(feature = "github")]
    Permissions {
        /// Repository name prefix (literal and case-sensitive)
        prefix: String,

        /// Permission level: read, write or admin (defaults to `permissions.level`)
        #[arg(short, long)]
        level: Option<teamsync::Permission>,

        /// Show what would change without changing anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Delay between mutating calls in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing for non-TTY mode (structured logging)
    // Only initialize if not connected to a TTY
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("teamsync=info,teamsync_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "github")]
        Commands::Assign {
            input,
            dry_run,
            allow_empty,
            delay_ms,
        } => {
            let config = config::Config::load()?;
            let shutdown = shutdown::setup_shutdown_handler();
            commands::assign::handle_assign(
                commands::assign::AssignArgs {
                    input,
                    dry_run,
                    allow_empty,
                    delay_ms,
                },
                &config,
                shutdown,
            )
            .await?;
        }
        #[cfg(feature = "github")]
        Commands::Permissions {
            prefix,
            level,
            dry_run,
            delay_ms,
        } => {
            let config = config::Config::load()?;
            let shutdown = shutdown::setup_shutdown_handler();
            commands::permissions::handle_permissions(
                commands::permissions::PermissionsArgs {
                    prefix,
                    level,
                    dry_run,
                    delay_ms,
                },
                &config,
                shutdown,
            )
            .await?;
        }
        Commands::Completions { shell } => commands::meta::handle_completions(shell)?,
        Commands::Man { output } => commands::meta::handle_man(output)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[cfg(feature = "github")]
    #[test]
    fn assign_parses_flags() {
        let cli = Cli::try_parse_from([
            "teamsync",
            "assign",
            "--input",
            "teams.txt",
            "--dry-run",
            "--allow-empty",
            "--delay-ms",
            "250",
        ])
        .unwrap();

        match cli.command {
            Commands::Assign {
                input,
                dry_run,
                allow_empty,
                delay_ms,
            } => {
                assert_eq!(input, Some(PathBuf::from("teams.txt")));
                assert!(dry_run);
                assert!(allow_empty);
                assert_eq!(delay_ms, Some(250));
            }
            _ => panic!("expected assign"),
        }
    }

    #[cfg(feature = "github")]
    #[test]
    fn permissions_parses_level() {
        let cli =
            Cli::try_parse_from(["teamsync", "permissions", "CSC316-P1", "--level", "push"])
                .unwrap();

        match cli.command {
            Commands::Permissions {
                prefix,
                level,
                dry_run,
                ..
            } => {
                assert_eq!(prefix, "CSC316-P1");
                assert_eq!(level, Some(teamsync::Permission::Write));
                assert!(!dry_run);
            }
            _ => panic!("expected permissions"),
        }
    }

    #[cfg(feature = "github")]
    #[test]
    fn permissions_rejects_unknown_level() {
        let result = Cli::try_parse_from(["teamsync", "permissions", "CSC316", "--level", "owner"]);
        assert!(result.is_err());
    }

    #[cfg(feature = "github")]
    #[test]
    fn permissions_requires_prefix() {
        assert!(Cli::try_parse_from(["teamsync", "permissions"]).is_err());
    }
}
