//! In-memory directory for exercising the engine without a network.
//!
//! Compiled for unit tests and, behind the `test-support` feature, for the
//! integration tests under `tests/`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::platform::{
    self, Permission, PlatformError, RemoteDirectory, Repository, Team, Throttle, UserRef,
};

/// Every call made against [`MemoryDirectory`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListTeams,
    ListMembers(String),
    ListRepositories,
    FindUser(String),
    CreateRepository {
        name: String,
        private: bool,
        auto_init: bool,
    },
    CreateTeam {
        name: String,
        permission: Permission,
        repository: String,
    },
    AddMember {
        team: String,
        user: String,
    },
    RemoveMember {
        team: String,
        user: String,
    },
    SetPermission {
        team: String,
        repository: String,
        permission: Permission,
    },
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateRepository { .. }
                | Call::CreateTeam { .. }
                | Call::AddMember { .. }
                | Call::RemoveMember { .. }
                | Call::SetPermission { .. }
        )
    }

    pub fn is_membership(&self) -> bool {
        matches!(self, Call::AddMember { .. } | Call::RemoveMember { .. })
    }
}

/// Kind of failure to inject at a given call.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// Recoverable API rejection.
    Api,
    /// Credentials rejected.
    Auth,
}

impl Failure {
    fn to_error(self, key: &str) -> PlatformError {
        match self {
            Failure::Api => PlatformError::api_status(422, format!("{key}: rejected")),
            Failure::Auth => PlatformError::AuthRequired,
        }
    }
}

#[derive(Default)]
struct State {
    teams: HashMap<String, Team>,
    members: HashMap<String, Vec<UserRef>>,
    repositories: HashMap<String, Repository>,
    /// Keyed by lowercase login; lookups are case-insensitive like GitHub's.
    users: HashMap<String, UserRef>,
    permissions: HashMap<(String, String), Permission>,
    failures: HashMap<String, Failure>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn user(&mut self, login: &str) -> UserRef {
        let key = login.to_lowercase();
        if let Some(user) = self.users.get(&key) {
            return user.clone();
        }
        let user = UserRef::new(login, self.next_id());
        self.users.insert(key, user.clone());
        user
    }

    fn insert_team(&mut self, name: &str) -> Team {
        let team = Team {
            id: self.next_id(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            permission: Some(Permission::Write),
        };
        self.teams.insert(name.to_string(), team.clone());
        self.members.entry(name.to_string()).or_default();
        team
    }

    fn insert_repository(&mut self, name: &str) -> Repository {
        let repository = Repository {
            name: name.to_string(),
            private: true,
            initialized: true,
        };
        self.repositories
            .insert(name.to_string(), repository.clone());
        repository
    }

    fn check(&self, key: &str) -> platform::Result<()> {
        match self.failures.get(key) {
            Some(failure) => Err(failure.to_error(key)),
            None => Ok(()),
        }
    }
}

/// Organization held entirely in memory, recording every call.
pub struct MemoryDirectory {
    org: String,
    state: Mutex<State>,
    calls: Mutex<Vec<Call>>,
}

impl MemoryDirectory {
    pub fn new(org: &str) -> Self {
        Self {
            org: org.to_string(),
            state: Mutex::new(State::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    /// A user known to the platform.
    pub fn with_user(self, login: &str) -> Self {
        self.state().user(login);
        self
    }

    /// A team with its bound repository and the given members.
    pub fn with_team(self, name: &str, members: &[&str]) -> Self {
        {
            let mut state = self.state();
            state.insert_team(name);
            state.insert_repository(name);
            let users: Vec<UserRef> = members.iter().map(|login| state.user(login)).collect();
            state.members.insert(name.to_string(), users);
        }
        self
    }

    /// A repository with no team of the same name.
    pub fn with_repository(self, name: &str) -> Self {
        self.state().insert_repository(name);
        self
    }

    /// Make the call identified by `key` fail, e.g. `"create_repository:TeamB"`.
    pub fn failing(self, key: &str, failure: Failure) -> Self {
        self.state().failures.insert(key.to_string(), failure);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn mutation_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(Call::is_mutation)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Current member logins of `team`, sorted.
    pub fn members_of(&self, team: &str) -> Vec<String> {
        let mut logins: Vec<String> = self
            .state()
            .members
            .get(team)
            .map(|users| users.iter().map(|u| u.login.clone()).collect())
            .unwrap_or_default();
        logins.sort();
        logins
    }

    pub fn has_team(&self, team: &str) -> bool {
        self.state().teams.contains_key(team)
    }

    pub fn repository(&self, name: &str) -> Option<Repository> {
        self.state().repositories.get(name).cloned()
    }

    pub fn permission(&self, team: &str, repository: &str) -> Option<Permission> {
        self.state()
            .permissions
            .get(&(team.to_string(), repository.to_string()))
            .copied()
    }
}

#[async_trait]
impl RemoteDirectory for MemoryDirectory {
    fn organization(&self) -> &str {
        &self.org
    }

    async fn list_teams(&self) -> platform::Result<HashMap<String, Team>> {
        self.record(Call::ListTeams);
        let state = self.state();
        state.check("list_teams")?;
        Ok(state.teams.clone())
    }

    async fn list_team_members(&self, team: &Team) -> platform::Result<Vec<UserRef>> {
        self.record(Call::ListMembers(team.name.clone()));
        let state = self.state();
        state.check(&format!("list_team_members:{}", team.name))?;
        state
            .members
            .get(&team.name)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("team: {}", team.name)))
    }

    async fn list_repositories(&self) -> platform::Result<HashMap<String, Repository>> {
        self.record(Call::ListRepositories);
        let state = self.state();
        state.check("list_repositories")?;
        Ok(state.repositories.clone())
    }

    async fn find_user(&self, id: &str) -> platform::Result<UserRef> {
        self.record(Call::FindUser(id.to_string()));
        let state = self.state();
        state.check(&format!("find_user:{id}"))?;
        state
            .users
            .get(&id.to_lowercase())
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("user: {id}")))
    }

    async fn create_repository(
        &self,
        name: &str,
        private: bool,
        auto_init: bool,
    ) -> platform::Result<Repository> {
        self.record(Call::CreateRepository {
            name: name.to_string(),
            private,
            auto_init,
        });
        let mut state = self.state();
        state.check(&format!("create_repository:{name}"))?;
        if state.repositories.contains_key(name) {
            return Err(PlatformError::api_status(
                422,
                format!("repository {name} already exists"),
            ));
        }
        let repository = Repository {
            name: name.to_string(),
            private,
            initialized: auto_init,
        };
        state
            .repositories
            .insert(name.to_string(), repository.clone());
        Ok(repository)
    }

    async fn create_team(
        &self,
        name: &str,
        default_permission: Permission,
        repository: &Repository,
    ) -> platform::Result<Team> {
        self.record(Call::CreateTeam {
            name: name.to_string(),
            permission: default_permission,
            repository: repository.name.clone(),
        });
        let mut state = self.state();
        state.check(&format!("create_team:{name}"))?;
        let mut team = state.insert_team(name);
        team.permission = Some(default_permission);
        state.teams.insert(name.to_string(), team.clone());
        state.permissions.insert(
            (name.to_string(), repository.name.clone()),
            default_permission,
        );
        Ok(team)
    }

    async fn add_member(&self, team: &Team, user: &UserRef) -> platform::Result<()> {
        self.record(Call::AddMember {
            team: team.name.clone(),
            user: user.login.clone(),
        });
        let mut state = self.state();
        state.check(&format!("add_member:{}", team.name))?;
        let members = state.members.entry(team.name.clone()).or_default();
        if !members.contains(user) {
            members.push(user.clone());
        }
        Ok(())
    }

    async fn remove_member(&self, team: &Team, user: &UserRef) -> platform::Result<()> {
        self.record(Call::RemoveMember {
            team: team.name.clone(),
            user: user.login.clone(),
        });
        let mut state = self.state();
        state.check(&format!("remove_member:{}", team.name))?;
        if let Some(members) = state.members.get_mut(&team.name) {
            members.retain(|member| member != user);
        }
        Ok(())
    }

    async fn set_permission(
        &self,
        team: &Team,
        repository: &Repository,
        permission: Permission,
    ) -> platform::Result<()> {
        self.record(Call::SetPermission {
            team: team.name.clone(),
            repository: repository.name.clone(),
            permission,
        });
        let mut state = self.state();
        state.check(&format!("set_permission:{}", repository.name))?;
        state
            .permissions
            .insert((team.name.clone(), repository.name.clone()), permission);
        Ok(())
    }
}

/// Throttle that only counts how often it was consulted.
#[derive(Default)]
pub struct CountingThrottle {
    pauses: AtomicUsize,
}

impl CountingThrottle {
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Throttle for CountingThrottle {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Logins that appear in `calls` as additions or removals for `team`.
pub fn membership_changes(calls: &[Call], team: &str) -> (Vec<String>, Vec<String>) {
    let mut added = Vec::new();
    let mut removed = Vec::new();
    for call in calls {
        match call {
            Call::AddMember { team: t, user } if t == team => added.push(user.clone()),
            Call::RemoveMember { team: t, user } if t == team => removed.push(user.clone()),
            _ => {}
        }
    }
    (added, removed)
}

/// Users looked up, deduplicated in call order.
pub fn looked_up(calls: &[Call]) -> Vec<String> {
    let mut seen = HashSet::new();
    calls
        .iter()
        .filter_map(|call| match call {
            Call::FindUser(id) if seen.insert(id.clone()) => Some(id.clone()),
            _ => None,
        })
        .collect()
}
