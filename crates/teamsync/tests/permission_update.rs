//! Prefix permission updates against an in-memory organization.

use teamsync::Permission;
use teamsync::platform::NoDelay;
use teamsync::sync::test_support::{Call, MemoryDirectory};
use teamsync::sync::{SyncOptions, update_permissions};

fn course() -> MemoryDirectory {
    MemoryDirectory::new("engr-csc316")
        .with_team("CSC316-P1-groupA", &[])
        .with_team("CSC316-P1-groupB", &[])
        .with_team("CSC316-P2-groupA", &[])
        .with_team("csc316-p1-groupC", &[])
}

fn granted(team: &str, permission: Permission) -> Call {
    Call::SetPermission {
        team: team.to_string(),
        repository: team.to_string(),
        permission,
    }
}

#[tokio::test]
async fn grants_read_to_every_matching_team() {
    let org = course();

    let report = update_permissions(
        &org,
        "CSC316-P1",
        Permission::Read,
        &SyncOptions::default(),
        &NoDelay,
        None,
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.updated, vec!["CSC316-P1-groupA", "CSC316-P1-groupB"]);
    assert!(!report.has_problems());
    let permission = |team| org.permission(team, team);
    assert_eq!(permission("CSC316-P1-groupA"), Some(Permission::Read));
    assert_eq!(permission("CSC316-P1-groupB"), Some(Permission::Read));
    assert_eq!(permission("CSC316-P2-groupA"), None);
    assert_eq!(permission("csc316-p1-groupC"), None);
}

#[tokio::test]
async fn membership_sync_then_permission_lockdown() {
    let org = course().with_user("alice");
    let loaded = teamsync::assignment::parse("CSC316-P1-groupD alice");

    let _ = teamsync::sync::synchronize(
        &org,
        &loaded.assignments,
        &SyncOptions::default(),
        &NoDelay,
        None,
        None,
    )
    .await
    .unwrap();
    org.clear_calls();

    let report = update_permissions(
        &org,
        "CSC316-P1",
        Permission::Read,
        &SyncOptions::default(),
        &NoDelay,
        None,
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.updated.len(), 3);
    assert_eq!(
        org.mutation_calls(),
        vec![
            granted("CSC316-P1-groupA", Permission::Read),
            granted("CSC316-P1-groupB", Permission::Read),
            granted("CSC316-P1-groupD", Permission::Read),
        ]
    );
}

#[tokio::test]
async fn dry_run_grants_nothing() {
    let org = course();
    let options = SyncOptions {
        dry_run: true,
        ..SyncOptions::default()
    };

    let report = update_permissions(
        &org,
        "CSC316",
        Permission::Admin,
        &options,
        &NoDelay,
        None,
        None,
    )
    .await
    .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.updated.len(), 3);
    assert!(org.mutation_calls().is_empty());
}
