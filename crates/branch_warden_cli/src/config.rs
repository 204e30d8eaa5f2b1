//! Configuration management for the Branch Warden CLI.
//!
//! The configuration is a single TOML file describing the GitLab instance, the
//! group to reconcile and the policy to enforce. It is loaded from the path
//! given with `--config`, or from `branch-warden.toml` in the current directory.
//!
//! The access token is never part of the file; it is read from the
//! `GITLAB_TOKEN` environment variable.

use std::{env, fs, path::Path, time::Duration};

use branch_warden_core::{ApprovalPolicy, DesiredPolicy, ExecutionMode, FleetSettings};
use gitlab_client::AccessLevel;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Error;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "branch-warden.toml";

/// Environment variable holding the GitLab access token
pub const TOKEN_ENV_VAR: &str = "GITLAB_TOKEN";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Role names accepted for access level settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    Developer,
    Maintainer,
    Owner,
}

impl From<RoleName> for AccessLevel {
    fn from(role: RoleName) -> Self {
        match role {
            RoleName::Developer => AccessLevel::Developer,
            RoleName::Maintainer => AccessLevel::Maintainer,
            RoleName::Owner => AccessLevel::Owner,
        }
    }
}

/// The `[approval_rule]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApprovalRuleConfig {
    #[serde(default = "default_rule_name")]
    pub name: String,
    #[serde(default = "default_approvals_required")]
    pub approvals_required: u32,
    #[serde(default)]
    pub approver_usernames: Vec<String>,
}

/// Main configuration structure for the Branch Warden CLI application.
///
/// # Example TOML Configuration
///
/// ```toml
/// gitlab_url = "https://gitlab.com"
/// group_path = "acme/dev-backend"
/// branch = "PROD"
/// dry_run = true
/// merge_allowed_users = ["alice", "bob"]
///
/// [approval_rule]
/// name = "PROD Merge Approval"
/// approvals_required = 1
/// approver_usernames = ["alice"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_gitlab_url")]
    pub gitlab_url: String,

    /// Full path of the group whose projects are reconciled
    pub group_path: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    /// Record changes without sending them; overridden by `--apply` / `--dry-run`
    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default = "default_true")]
    pub include_subgroups: bool,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub merge_allowed_users: Vec<String>,

    #[serde(default = "default_push_access_level")]
    pub push_access_level: RoleName,

    #[serde(default = "default_merge_grant_access_level")]
    pub merge_grant_access_level: RoleName,

    #[serde(default)]
    pub allow_force_push: bool,

    #[serde(default)]
    pub code_owner_approval_required: bool,

    #[serde(default)]
    pub approval_rule: Option<ApprovalRuleConfig>,
}

fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_branch() -> String {
    "PROD".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_push_access_level() -> RoleName {
    RoleName::Developer
}

fn default_merge_grant_access_level() -> RoleName {
    RoleName::Maintainer
}

fn default_rule_name() -> String {
    "PROD Merge Approval".to_string()
}

fn default_approvals_required() -> u32 {
    1
}

impl AppConfig {
    /// Loads and validates the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file does not exist, cannot be read,
    /// is not valid TOML for this schema, or fails [`AppConfig::validate`].
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::path::Path;
    /// use branch_warden_cli::config::AppConfig;
    ///
    /// let config = AppConfig::load(Path::new("./branch-warden.toml")).unwrap();
    /// println!("Reconciling {} in {}", config.branch, config.group_path);
    /// ```
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(Error::Config(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read configuration file: {}", e)))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse configuration file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the values that the policy itself cannot check.
    pub fn validate(&self) -> Result<(), Error> {
        if self.group_path.trim().is_empty() {
            return Err(Error::Config("group_path must not be empty".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(Error::Config(
                "timeout_seconds must be greater than zero".to_string(),
            ));
        }

        self.to_policy()
            .validate()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Builds the policy the reconciler enforces.
    pub fn to_policy(&self) -> DesiredPolicy {
        DesiredPolicy {
            branch_name: self.branch.clone(),
            push_access_level: self.push_access_level.into(),
            merge_grant_access_level: self.merge_grant_access_level.into(),
            merge_allowed_users: self.merge_allowed_users.clone(),
            allow_force_push: self.allow_force_push,
            code_owner_approval_required: self.code_owner_approval_required,
            approval_rule: self.approval_rule.as_ref().map(|rule| ApprovalPolicy {
                name: rule.name.clone(),
                approvals_required: rule.approvals_required,
                approver_usernames: rule.approver_usernames.clone(),
            }),
        }
    }

    /// Builds the run settings; `mode_override` comes from the command line.
    pub fn to_fleet_settings(&self, mode_override: Option<ExecutionMode>) -> FleetSettings {
        FleetSettings {
            group_path: self.group_path.clone(),
            include_subgroups: self.include_subgroups,
            mode: mode_override.unwrap_or(ExecutionMode::from_apply_flag(!self.dry_run)),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Reads the access token from [`TOKEN_ENV_VAR`].
///
/// # Errors
///
/// Returns `Error::MissingCredential` if the variable is unset or blank.
pub fn token_from_env() -> Result<SecretString, Error> {
    match env::var(TOKEN_ENV_VAR) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        _ => Err(Error::MissingCredential(TOKEN_ENV_VAR.to_string())),
    }
}
