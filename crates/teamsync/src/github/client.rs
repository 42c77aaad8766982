//! GitHub API client implementing the `RemoteDirectory` trait.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::convert::{to_repository, to_team, to_user_ref};
use super::error::{GitHubError, RateLimitHeaders, classify_response, from_octocrab};
use super::types::{
    CreateRepositoryRequest, CreateTeamRequest, GitHubErrorBody, GitHubTeam, GitHubUser,
    MembershipRequest, PER_PAGE, TeamRepositoryPermissionRequest,
};
use crate::platform::{
    self, Permission, PlatformError, RemoteDirectory, Repository, SharedThrottle, Team, UserRef,
};
use crate::retry::{RetryConfig, with_retry};

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Create an authenticated Octocrab instance for `api_url`.
///
/// Use the enterprise form (`https://github.example.edu/api/v3`) for
/// GitHub Enterprise Server.
pub fn create_client(api_url: &str, token: &str) -> Result<Octocrab, GitHubError> {
    if token.trim().is_empty() {
        return Err(GitHubError::AuthRequired);
    }

    Octocrab::builder()
        .personal_token(token.to_string())
        .base_uri(api_url)
        .map_err(|e| GitHubError::InvalidEndpoint {
            url: api_url.to_string(),
            message: e.to_string(),
        })?
        .build()
        .map_err(GitHubError::Api)
}

/// GitHub organization directory.
///
/// Every request is retried on transient failures. When a throttle is
/// attached, rate-limit rejections seen during retries are forwarded to it so
/// the caller's pacing adapts as well.
#[derive(Clone)]
pub struct GitHubDirectory {
    inner: Arc<Octocrab>,
    api_url: String,
    org: String,
    retry: RetryConfig,
    throttle: Option<SharedThrottle>,
}

impl GitHubDirectory {
    /// Connect to `api_url` with a personal access token, scoped to `org`.
    pub fn new(api_url: &str, token: &str, org: &str) -> Result<Self, GitHubError> {
        let client = create_client(api_url, token)?;
        Ok(Self::from_octocrab(client, api_url, org))
    }

    /// Wrap an existing Octocrab instance configured for `api_url`.
    pub fn from_octocrab(client: Octocrab, api_url: &str, org: &str) -> Self {
        Self {
            inner: Arc::new(client),
            api_url: api_url.trim_end_matches('/').to_string(),
            org: org.to_string(),
            retry: RetryConfig::default(),
            throttle: None,
        }
    }

    /// Forward rate-limit signals to `throttle`.
    #[must_use]
    pub fn with_throttle(mut self, throttle: SharedThrottle) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Run one request through the retry policy.
    ///
    /// Creation requests are not idempotent, so they are only retried when
    /// GitHub rejected them outright for rate limiting.
    async fn request<T, F, Fut>(&self, label: &str, idempotent: bool, op: F) -> platform::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = platform::Result<T>>,
    {
        let throttle = self.throttle.clone();
        let is_retryable = move |e: &PlatformError| {
            if idempotent {
                e.is_transient()
            } else {
                e.is_rate_limited()
            }
        };

        with_retry(
            op,
            &self.retry,
            is_retryable,
            |e: &PlatformError, _| {
                if e.is_rate_limited()
                    && let Some(throttle) = &throttle
                {
                    throttle.on_rate_limited(e.retry_after());
                }
            },
            label,
        )
        .await
    }

    /// Send one request and return the body of a 2xx answer.
    ///
    /// Error answers are classified from GitHub's message and rate-limit
    /// headers, so a rate limit carries the reset time GitHub announced.
    async fn send<B>(
        &self,
        method: Method,
        route: &str,
        body: Option<&B>,
    ) -> platform::Result<String>
    where
        B: Serialize + Sync,
    {
        let url = format!("{}{}", self.api_url, route);
        let url = url.as_str();
        let response = match method {
            Method::Get => self.inner._get(url).await,
            Method::Post => self.inner._post(url, body).await,
            Method::Put => self.inner._put(url, body).await,
            Method::Delete => self.inner._delete(url, body).await,
        }
        .map_err(|e| from_octocrab(e, route))?;

        let status = response.status();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };
        let limits = RateLimitHeaders::parse(
            header("retry-after").as_deref(),
            header("x-ratelimit-remaining").as_deref(),
            header("x-ratelimit-reset").as_deref(),
        );

        let text = self
            .inner
            .body_to_string(response)
            .await
            .map_err(|e| from_octocrab(e, route))?;
        if status.is_success() {
            return Ok(text);
        }

        let message = serde_json::from_str::<GitHubErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        tracing::trace!(route, status = status.as_u16(), ?limits, "GitHub error answer");
        Err(classify_response(status.as_u16(), &message, &limits, route))
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> platform::Result<T> {
        self.request(route, true, move || async move {
            let text = self.send(Method::Get, route, None::<&()>).await?;
            parse_json(&text, route)
        })
        .await
    }

    /// Fetch every page of a list endpoint.
    async fn get_all_pages<T: DeserializeOwned>(&self, route: &str) -> platform::Result<Vec<T>> {
        let separator = if route.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let page_route = format!("{route}{separator}per_page={PER_PAGE}&page={page}");
            let batch: Vec<T> = self.get_json(&page_route).await?;
            let count = batch.len();
            items.extend(batch);

            tracing::trace!(route, page, count, "Fetched page");

            // If we got fewer than a full page, we've reached the end
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    async fn post_json<B, T>(&self, route: &str, body: &B) -> platform::Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.request(route, false, move || async move {
            let text = self.send(Method::Post, route, Some(body)).await?;
            parse_json(&text, route)
        })
        .await
    }

    /// PUT/DELETE endpoints answer 204 with no body; only the status matters.
    async fn send_no_content<B>(
        &self,
        method: Method,
        route: &str,
        body: Option<&B>,
    ) -> platform::Result<()>
    where
        B: Serialize + Sync,
    {
        self.request(route, true, move || async move {
            self.send(method, route, body).await.map(|_| ())
        })
        .await
    }

    fn team_route(&self, team: &Team) -> String {
        format!("/orgs/{}/teams/{}", self.org, team.slug)
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

fn parse_json<T: DeserializeOwned>(text: &str, route: &str) -> platform::Result<T> {
    serde_json::from_str(text)
        .map_err(|e| PlatformError::internal(format!("{route}: unexpected response body: {e}")))
}

#[async_trait]
impl RemoteDirectory for GitHubDirectory {
    fn organization(&self) -> &str {
        &self.org
    }

    async fn list_teams(&self) -> platform::Result<HashMap<String, Team>> {
        let route = format!("/orgs/{}/teams", self.org);
        let teams: Vec<GitHubTeam> = self.get_all_pages(&route).await?;
        Ok(teams
            .iter()
            .map(|team| (team.name.clone(), to_team(team)))
            .collect())
    }

    async fn list_team_members(&self, team: &Team) -> platform::Result<Vec<UserRef>> {
        let route = format!("{}/members", self.team_route(team));
        let members: Vec<GitHubUser> = self.get_all_pages(&route).await?;
        Ok(members.iter().map(to_user_ref).collect())
    }

    async fn list_repositories(&self) -> platform::Result<HashMap<String, Repository>> {
        let route = format!("/orgs/{}/repos?type=all", self.org);
        let repos: Vec<octocrab::models::Repository> = self.get_all_pages(&route).await?;
        Ok(repos
            .iter()
            .map(|repo| (repo.name.clone(), to_repository(repo)))
            .collect())
    }

    async fn find_user(&self, id: &str) -> platform::Result<UserRef> {
        let route = format!("/users/{id}");
        match self.get_json::<GitHubUser>(&route).await {
            Ok(user) => Ok(to_user_ref(&user)),
            Err(e) if e.is_not_found() => Err(PlatformError::not_found(format!("user: {id}"))),
            Err(e) => Err(e),
        }
    }

    async fn create_repository(
        &self,
        name: &str,
        private: bool,
        auto_init: bool,
    ) -> platform::Result<Repository> {
        let route = format!("/orgs/{}/repos", self.org);
        let body = CreateRepositoryRequest {
            name,
            private,
            auto_init,
        };
        let repo: octocrab::models::Repository = self.post_json(&route, &body).await?;
        tracing::debug!(org = %self.org, repo = %repo.name, "Created repository");

        let mut created = to_repository(&repo);
        // The initial commit lands asynchronously; the request is what counts.
        created.initialized |= auto_init;
        Ok(created)
    }

    async fn create_team(
        &self,
        name: &str,
        default_permission: Permission,
        repository: &Repository,
    ) -> platform::Result<Team> {
        let route = format!("/orgs/{}/teams", self.org);
        let body = CreateTeamRequest {
            name,
            repo_names: vec![format!("{}/{}", self.org, repository.name)],
            permission: default_permission.as_api_str(),
            privacy: "closed",
        };
        let team: GitHubTeam = self.post_json(&route, &body).await?;
        let mut team = to_team(&team);
        tracing::debug!(org = %self.org, team = %team.name, slug = %team.slug, "Created team");

        // The `permission` field on team creation is deprecated and ignored by
        // github.com, so grant the repository permission explicitly.
        self.set_permission(&team, repository, default_permission)
            .await?;
        team.permission = Some(default_permission);
        Ok(team)
    }

    async fn add_member(&self, team: &Team, user: &UserRef) -> platform::Result<()> {
        let route = format!("{}/memberships/{}", self.team_route(team), user.login);
        self.send_no_content(
            Method::Put,
            &route,
            Some(&MembershipRequest::default()),
        )
        .await
    }

    async fn remove_member(&self, team: &Team, user: &UserRef) -> platform::Result<()> {
        let route = format!("{}/memberships/{}", self.team_route(team), user.login);
        self.send_no_content(Method::Delete, &route, None::<&()>)
            .await
    }

    async fn set_permission(
        &self,
        team: &Team,
        repository: &Repository,
        permission: Permission,
    ) -> platform::Result<()> {
        let route = format!(
            "{}/repos/{}/{}",
            self.team_route(team),
            self.org,
            repository.name
        );
        let body = TeamRepositoryPermissionRequest {
            permission: permission.as_api_str(),
        };
        self.send_no_content(Method::Put, &route, Some(&body))
            .await
    }
}
