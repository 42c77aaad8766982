//! Loading desired team assignments from a roster file.
//!
//! The format is one assignment per line: the team id followed by the
//! member ids, separated by whitespace.
//!
//! ```text
//! # team          members...
//! CSC316-P1-01    alice bob
//! CSC316-P1-02    carol dave erin
//! CSC316-P1-03
//! ```
//!
//! A line holding only a team id describes a team that should end up with no
//! members. Blank lines and `#` comments are skipped. Anything odd about a
//! line is reported as a [`LoadWarning`] and never aborts the rest of the file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Desired membership for one team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Team name (and repository name).
    pub team_id: String,
    /// Member identifiers in input order, duplicates preserved.
    pub desired_members: Vec<String>,
}

impl Assignment {
    pub fn new<I, S>(team_id: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            team_id: team_id.into(),
            desired_members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// True when the line named a team but no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.desired_members.is_empty()
    }
}

/// A non-fatal problem found while reading the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

/// Parsed roster plus everything worth telling the operator about it.
#[derive(Debug, Clone, Default)]
pub struct LoadedAssignments {
    pub assignments: Vec<Assignment>,
    pub warnings: Vec<LoadWarning>,
}

/// Errors that prevent the roster from being read at all.
#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("failed to read assignment file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read and parse a roster file.
pub fn load(path: impl AsRef<Path>) -> Result<LoadedAssignments, AssignmentError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| AssignmentError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let loaded = parse(&content);
    tracing::debug!(
        path = %path.display(),
        assignments = loaded.assignments.len(),
        warnings = loaded.warnings.len(),
        "Loaded assignments"
    );
    Ok(loaded)
}

/// Parse roster content. Never fails; problems become warnings.
pub fn parse(content: &str) -> LoadedAssignments {
    let mut loaded = LoadedAssignments::default();
    let mut seen_teams: HashSet<&str> = HashSet::new();

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(team_id) = tokens.next() else {
            continue;
        };

        let members: Vec<&str> = tokens.collect();

        if !seen_teams.insert(team_id) {
            loaded.warnings.push(LoadWarning {
                line: line_no,
                message: format!(
                    "team '{team_id}' appears more than once; later lines override earlier ones"
                ),
            });
        }

        let mut unique = HashSet::new();
        if let Some(dup) = members.iter().find(|m| !unique.insert(**m)) {
            loaded.warnings.push(LoadWarning {
                line: line_no,
                message: format!("member '{dup}' listed more than once for team '{team_id}'"),
            });
        }

        if members.is_empty() {
            loaded.warnings.push(LoadWarning {
                line: line_no,
                message: format!(
                    "team '{team_id}' has no members; syncing it removes everyone from the team"
                ),
            });
        }

        loaded.assignments.push(Assignment::new(team_id, members));
    }

    loaded
}
