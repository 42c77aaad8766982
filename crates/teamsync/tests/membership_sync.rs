//! End-to-end membership synchronization against an in-memory organization.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use teamsync::assignment;
use teamsync::platform::{FixedDelay, NoDelay, Permission};
use teamsync::sync::test_support::{Call, Failure, MemoryDirectory};
use teamsync::sync::{
    AssignmentOutcome, EMPTY_LIST_REASON, ProgressCallback, SyncContext, SyncOptions, SyncProgress,
    TeamResolution, synchronize,
};

/// If exceeded, the run is hanging.
const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

fn course() -> MemoryDirectory {
    ["alice", "bob", "carol", "dave", "frank", "grace"]
        .into_iter()
        .fold(MemoryDirectory::new("engr-csc316"), MemoryDirectory::with_user)
        .with_team("TeamA", &["alice", "carol"])
        .with_team("TeamC", &[])
        .with_team("TeamD", &["grace"])
}

async fn run(org: &MemoryDirectory, roster: &str, options: SyncOptions) -> teamsync::SyncReport {
    let loaded = assignment::parse(roster);
    tokio::time::timeout(
        SYNC_TIMEOUT,
        synchronize(org, &loaded.assignments, &options, &NoDelay, None, None),
    )
    .await
    .expect("sync timed out")
    .expect("sync succeeds")
}

#[tokio::test]
async fn roster_file_drives_a_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("teams.txt");
    std::fs::write(
        &path,
        "# project 1\nTeamA alice bob\nTeamB dave\n\nTeamC frank eve\n",
    )
    .unwrap();

    let org = course();
    let loaded = assignment::load(&path).unwrap();
    assert!(loaded.warnings.is_empty());

    let report = synchronize(
        &org,
        &loaded.assignments,
        &SyncOptions::default(),
        &NoDelay,
        None,
        None,
    )
    .await
    .unwrap();

    assert_eq!(org.members_of("TeamA"), vec!["alice", "bob"]);
    assert_eq!(org.members_of("TeamB"), vec!["dave"]);
    assert_eq!(org.members_of("TeamC"), vec!["frank"]);
    assert!(org.repository("TeamB").is_some());

    assert_eq!(report.synced_count(), 3);
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(
        report.unresolved[0].to_string(),
        "eve not found, not added to TeamC"
    );
}

#[tokio::test]
async fn new_team_is_created_before_any_membership_change() {
    let org = course();

    let report = run(&org, "TeamB dave", SyncOptions::default()).await;

    assert_eq!(
        org.mutation_calls(),
        vec![
            Call::CreateRepository {
                name: "TeamB".to_string(),
                private: true,
                auto_init: true,
            },
            Call::CreateTeam {
                name: "TeamB".to_string(),
                permission: Permission::Write,
                repository: "TeamB".to_string(),
            },
            Call::AddMember {
                team: "TeamB".to_string(),
                user: "dave".to_string(),
            },
        ]
    );
    assert!(matches!(
        &report.outcomes[0],
        AssignmentOutcome::Synced {
            resolution: TeamResolution::Created,
            ..
        }
    ));
}

#[tokio::test]
async fn second_run_with_same_roster_changes_nothing() {
    let org = course();
    let roster = "TeamA alice bob\nTeamB dave\nTeamC frank eve\n";

    let _ = run(&org, roster, SyncOptions::default()).await;
    org.clear_calls();
    let report = run(&org, roster, SyncOptions::default()).await;

    assert!(org.mutation_calls().is_empty());
    assert_eq!(report.added_count(), 0);
    assert_eq!(report.removed_count(), 0);
    // eve still cannot be resolved, and is reported again
    assert_eq!(report.unresolved.len(), 1);
}

#[tokio::test]
async fn dropping_a_member_between_runs_removes_them() {
    let org = course();

    let _ = run(&org, "TeamA alice bob", SyncOptions::default()).await;
    org.clear_calls();
    let _ = run(&org, "TeamA alice", SyncOptions::default()).await;

    assert_eq!(
        org.mutation_calls(),
        vec![Call::RemoveMember {
            team: "TeamA".to_string(),
            user: "bob".to_string(),
        }]
    );
    assert_eq!(org.members_of("TeamA"), vec!["alice"]);
}

#[tokio::test]
async fn empty_line_leaves_team_alone_unless_allowed() {
    let org = course();

    let report = run(&org, "TeamD", SyncOptions::default()).await;
    assert_eq!(
        report.outcomes,
        vec![AssignmentOutcome::Skipped {
            team: "TeamD".to_string(),
            reason: EMPTY_LIST_REASON.to_string(),
        }]
    );
    assert_eq!(org.members_of("TeamD"), vec!["grace"]);

    let options = SyncOptions {
        allow_empty: true,
        ..SyncOptions::default()
    };
    let report = run(&org, "TeamD", options).await;
    assert_eq!(report.removed_count(), 1);
    assert!(org.members_of("TeamD").is_empty());
}

#[tokio::test]
async fn failed_creation_does_not_stop_later_teams() {
    let org = course().failing("create_repository:TeamB", Failure::Api);

    let report = run(&org, "TeamB dave\nTeamC frank", SyncOptions::default()).await;

    assert!(report.outcomes[0].is_failed());
    assert_eq!(org.members_of("TeamC"), vec!["frank"]);
    assert!(
        !org.mutation_calls()
            .iter()
            .any(|c| matches!(c, Call::CreateTeam { .. }))
    );
}

#[tokio::test]
async fn dry_run_reports_plan_without_mutating() {
    let org = course();
    let options = SyncOptions {
        dry_run: true,
        ..SyncOptions::default()
    };

    let report = run(&org, "TeamA alice bob\nTeamB dave", options).await;

    assert!(report.dry_run);
    assert!(org.mutation_calls().is_empty());
    assert_eq!(report.added_count(), 2);
    assert_eq!(report.removed_count(), 1);
    assert!(org.repository("TeamB").is_none());
}

#[tokio::test(start_paused = true)]
async fn fixed_delay_paces_every_mutation() {
    let org = course();
    let roster = assignment::parse("TeamA alice bob\nTeamC frank");
    let start = tokio::time::Instant::now();

    let report = synchronize(
        &org,
        &roster.assignments,
        &SyncOptions::default(),
        &FixedDelay::new(Duration::from_millis(500)),
        None,
        None,
    )
    .await
    .unwrap();

    // three mutations (remove carol, add bob, add frank) plus one gap between teams
    assert_eq!(report.added_count() + report.removed_count(), 3);
    assert!(start.elapsed() >= Duration::from_millis(2000));
}

#[tokio::test]
async fn context_reports_progress_and_honours_shutdown() {
    let org = course();
    let events = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let flag = Arc::new(AtomicBool::new(true));
    let callback: ProgressCallback = Box::new(move |event: SyncProgress| {
        sink.lock().unwrap().push(event);
    });

    let ctx = SyncContext::builder()
        .directory(org)
        .throttle(Arc::new(NoDelay))
        .progress(Arc::new(callback))
        .shutdown_flag(Arc::clone(&flag))
        .build()
        .unwrap();

    let loaded = assignment::parse("TeamA alice bob\nTeamB dave");
    let report = ctx.synchronize(&loaded.assignments).await.unwrap();

    assert!(report.interrupted);
    assert!(report.outcomes.is_empty());
    assert!(ctx.directory().mutation_calls().is_empty());
    assert!(
        events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, SyncProgress::Interrupted { remaining: 2 }))
    );
}

#[tokio::test]
async fn orphaned_repository_gets_a_team_without_being_recreated() {
    let org = course().with_repository("TeamB");

    let report = run(&org, "TeamB dave", SyncOptions::default()).await;

    assert_eq!(report.synced_count(), 1);
    assert!(
        !org.mutation_calls()
            .iter()
            .any(|c| matches!(c, Call::CreateRepository { .. }))
    );
    assert_eq!(org.members_of("TeamB"), vec!["dave"]);
    assert_eq!(org.permission("TeamB", "TeamB"), Some(Permission::Write));
}
