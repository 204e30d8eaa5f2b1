//! Crate for interacting with the GitLab REST API (v4).
//!
//! This crate provides a client for making bearer-token authenticated requests to a
//! GitLab instance. It covers the narrow slice of the API needed to manage branch
//! protection and merge request approval rules across the projects of a group.
//!
//! Callers depend on the [`GitLabApi`] trait; [`GitLabClient`] is the `reqwest`
//! backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

pub mod errors;
pub use errors::Error;

pub mod approval_rule;
pub mod branch_protection;
pub mod endpoints;
pub mod models;

pub use approval_rule::CreateApprovalRulePayload;
pub use branch_protection::{MergeAccessGrant, ProtectBranchPayload};
pub use models::{
    AccessGrant, AccessLevel, ApprovalRule, Branch, Group, Project, ProtectedBranch,
    ProtectedBranchRef, User,
};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Per-call network timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest page size GitLab accepts on list endpoints.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Error bodies are truncated to this many characters before being stored in an [`Error`].
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Parameters for fetching one page of a group's projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectPageQuery {
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
    /// Also list projects that live in subgroups of the group
    pub include_subgroups: bool,
}

/// Operations against a GitLab instance.
///
/// Every method maps to exactly one HTTP request. A 404 response is always
/// reported as [`Error::NotFound`]; deciding whether that is acceptable is up to
/// the caller.
#[async_trait]
pub trait GitLabApi: Send + Sync {
    /// Looks up a group by its full namespace path.
    async fn get_group(&self, full_path: &str) -> Result<Group, Error>;

    /// Fetches a single page of the projects in a group.
    ///
    /// An empty result means the previous page was the last one.
    async fn list_group_projects(
        &self,
        group_id: u64,
        query: &ProjectPageQuery,
    ) -> Result<Vec<Project>, Error>;

    /// Returns all users whose username matches exactly.
    async fn find_users_by_username(&self, username: &str) -> Result<Vec<User>, Error>;

    /// Fetches a single branch of a project.
    async fn get_branch(&self, project_id: u64, branch: &str) -> Result<Branch, Error>;

    /// Removes the protection rule for a branch name.
    async fn unprotect_branch(&self, project_id: u64, branch: &str) -> Result<(), Error>;

    /// Creates a protection rule.
    async fn protect_branch(
        &self,
        project_id: u64,
        payload: &ProtectBranchPayload,
    ) -> Result<ProtectedBranch, Error>;

    /// Fetches a single page of the project-level merge request approval rules.
    ///
    /// Pages hold up to [`MAX_PAGE_SIZE`] rules; an empty result means the
    /// previous page was the last one.
    async fn list_approval_rules(
        &self,
        project_id: u64,
        page: u32,
    ) -> Result<Vec<ApprovalRule>, Error>;

    /// Deletes a project-level approval rule.
    async fn delete_approval_rule(&self, project_id: u64, rule_id: u64) -> Result<(), Error>;

    /// Creates a project-level approval rule.
    async fn create_approval_rule(
        &self,
        project_id: u64,
        payload: &CreateApprovalRulePayload,
    ) -> Result<ApprovalRule, Error>;
}

/// A client for the GitLab REST API, authenticated with a bearer token.
#[derive(Debug)]
pub struct GitLabClient {
    http: reqwest::Client,
    api_root: String,
    token: SecretString,
}

impl GitLabClient {
    /// Creates a new `GitLabClient` for the instance at `base_url`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root URL of the GitLab instance, e.g. `https://gitlab.com`.
    /// * `token` - Personal, project or group access token.
    /// * `timeout` - Timeout applied to every request.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfiguration` if the URL cannot be parsed or the
    /// HTTP client cannot be built.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gitlab_client::{GitLabClient, DEFAULT_TIMEOUT};
    /// use secrecy::SecretString;
    ///
    /// let token = SecretString::from("glpat-example".to_string());
    /// let client = GitLabClient::new("https://gitlab.com", token, DEFAULT_TIMEOUT).unwrap();
    /// assert_eq!(client.api_root(), "https://gitlab.com/api/v4");
    /// ```
    pub fn new(base_url: &str, token: SecretString, timeout: Duration) -> Result<Self, Error> {
        let parsed = Url::parse(base_url).map_err(|e| {
            Error::InvalidConfiguration(format!("Invalid GitLab URL '{}': {}", base_url, e))
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidConfiguration(format!(
                "GitLab URL '{}' must be an http(s) URL",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        let api_root = format!("{}/api/v4", parsed.as_str().trim_end_matches('/'));
        debug!(api_root = api_root, "Created GitLab client");

        Ok(Self {
            http,
            api_root,
            token,
        })
    }

    /// The URL all endpoint paths are appended to.
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.token.expose_secret())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let request = self.authorized(self.http.get(self.url(path)).query(query));
        let response = check_status(request.send().await?).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_json<B, T>(&self, path: &str, payload: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.authorized(self.http.post(self.url(path)).json(payload));
        let response = check_status(request.send().await?).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let request = self.authorized(self.http.delete(self.url(path)));
        check_status(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl GitLabApi for GitLabClient {
    #[instrument(skip(self))]
    async fn get_group(&self, full_path: &str) -> Result<Group, Error> {
        self.get_json(&endpoints::group(full_path), &[]).await
    }

    #[instrument(skip(self))]
    async fn list_group_projects(
        &self,
        group_id: u64,
        query: &ProjectPageQuery,
    ) -> Result<Vec<Project>, Error> {
        let mut params = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.min(MAX_PAGE_SIZE).to_string()),
        ];
        if query.include_subgroups {
            params.push(("include_subgroups", "true".to_string()));
        }

        let projects: Vec<Project> = self
            .get_json(&endpoints::group_projects(group_id), &params)
            .await?;
        debug!(
            group_id = group_id,
            page = query.page,
            count = projects.len(),
            "Fetched project page"
        );
        Ok(projects)
    }

    #[instrument(skip(self))]
    async fn find_users_by_username(&self, username: &str) -> Result<Vec<User>, Error> {
        self.get_json(&endpoints::users(), &[("username", username.to_string())])
            .await
    }

    #[instrument(skip(self))]
    async fn get_branch(&self, project_id: u64, branch: &str) -> Result<Branch, Error> {
        self.get_json(&endpoints::branch(project_id, branch), &[])
            .await
    }

    #[instrument(skip(self))]
    async fn unprotect_branch(&self, project_id: u64, branch: &str) -> Result<(), Error> {
        self.delete(&endpoints::protected_branch(project_id, branch))
            .await
    }

    #[instrument(skip(self, payload), fields(branch = %payload.name))]
    async fn protect_branch(
        &self,
        project_id: u64,
        payload: &ProtectBranchPayload,
    ) -> Result<ProtectedBranch, Error> {
        self.post_json(&endpoints::protected_branches(project_id), payload)
            .await
    }

    #[instrument(skip(self))]
    async fn list_approval_rules(
        &self,
        project_id: u64,
        page: u32,
    ) -> Result<Vec<ApprovalRule>, Error> {
        self.get_json(
            &endpoints::approval_rules(project_id),
            &[
                ("page", page.to_string()),
                ("per_page", MAX_PAGE_SIZE.to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_approval_rule(&self, project_id: u64, rule_id: u64) -> Result<(), Error> {
        self.delete(&endpoints::approval_rule(project_id, rule_id))
            .await
    }

    #[instrument(skip(self, payload), fields(rule = %payload.name))]
    async fn create_approval_rule(
        &self,
        project_id: u64,
        payload: &CreateApprovalRulePayload,
    ) -> Result<ApprovalRule, Error> {
        self.post_json(&endpoints::approval_rules(project_id), payload)
            .await
    }
}

/// Maps a non-success response onto the matching [`Error`] variant.
async fn check_status(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: String = match response.text().await {
        Ok(text) => text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        Err(e) => format!("<unreadable body: {}>", e),
    };

    let error = match status.as_u16() {
        404 => Error::NotFound,
        401 | 403 => Error::Unauthorized {
            status: status.as_u16(),
            body,
        },
        429 => Error::RateLimitExceeded,
        other => Error::UnexpectedStatus {
            status: other,
            body,
        },
    };

    if !error.is_not_found() {
        warn!(status = status.as_u16(), error = %error, "GitLab request failed");
    }
    Err(error)
}
