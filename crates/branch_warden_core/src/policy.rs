//! Desired branch policy and execution mode.
//!
//! A [`DesiredPolicy`] is built once from configuration and handed to the
//! reconciler by reference. Nothing in this crate reads policy from global state.

use gitlab_client::{AccessLevel, MergeAccessGrant, ProtectBranchPayload};
use serde::{Deserialize, Serialize};

use crate::{Error, WardenResult};

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;

/// Whether mutating calls are sent to GitLab or only recorded.
///
/// Chosen once per run and never changed while the run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Record the intended calls, send nothing.
    DryRun,
    /// Send every call.
    Apply,
}

impl ExecutionMode {
    pub fn from_apply_flag(apply_changes: bool) -> Self {
        if apply_changes {
            ExecutionMode::Apply
        } else {
            ExecutionMode::DryRun
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, ExecutionMode::DryRun)
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::DryRun => write!(f, "dry run"),
            ExecutionMode::Apply => write!(f, "apply"),
        }
    }
}

/// The merge request approval rule that accompanies the protection rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    /// Reserved rule name; existing rules with this name are replaced
    pub name: String,
    pub approvals_required: u32,
    /// Usernames allowed to approve, in configuration order
    pub approver_usernames: Vec<String>,
}

/// Target state for the protected branch of every repository in the group.
///
/// # Examples
///
/// ```rust
/// use branch_warden_core::{ApprovalPolicy, DesiredPolicy};
///
/// let policy = DesiredPolicy {
///     merge_allowed_users: vec!["alice".to_string(), "bob".to_string()],
///     approval_rule: Some(ApprovalPolicy {
///         name: "PROD Merge Approval".to_string(),
///         approvals_required: 1,
///         approver_usernames: vec!["alice".to_string()],
///     }),
///     ..DesiredPolicy::new("PROD")
/// };
///
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredPolicy {
    /// Name of the branch to protect
    pub branch_name: String,
    /// Lowest role that may push; must be Developer or Maintainer
    pub push_access_level: AccessLevel,
    /// Tier attached to each per-user merge grant
    pub merge_grant_access_level: AccessLevel,
    /// Usernames that receive an explicit merge grant, in configuration order
    pub merge_allowed_users: Vec<String>,
    pub allow_force_push: bool,
    pub code_owner_approval_required: bool,
    /// Approval rule to install next to the protection rule, if any
    pub approval_rule: Option<ApprovalPolicy>,
}

impl DesiredPolicy {
    /// A policy for `branch_name` with developer push, maintainer-tier merge
    /// grants, no merge users and no approval rule.
    pub fn new(branch_name: impl Into<String>) -> Self {
        Self {
            branch_name: branch_name.into(),
            push_access_level: AccessLevel::Developer,
            merge_grant_access_level: AccessLevel::Maintainer,
            merge_allowed_users: Vec::new(),
            allow_force_push: false,
            code_owner_approval_required: false,
            approval_rule: None,
        }
    }

    /// Checks the policy for values GitLab would reject or that would silently
    /// widen access.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPolicy` describing the first problem found.
    pub fn validate(&self) -> WardenResult<()> {
        if self.branch_name.trim().is_empty() {
            return Err(Error::InvalidPolicy(
                "branch name must not be empty".to_string(),
            ));
        }

        if !matches!(
            self.push_access_level,
            AccessLevel::Developer | AccessLevel::Maintainer
        ) {
            return Err(Error::InvalidPolicy(format!(
                "push access level must be Developer or Maintainer, got {}",
                self.push_access_level
            )));
        }

        if self.merge_grant_access_level < AccessLevel::Developer {
            return Err(Error::InvalidPolicy(format!(
                "merge grant access level must be Developer or higher, got {}",
                self.merge_grant_access_level
            )));
        }

        if let Some(rule) = &self.approval_rule {
            if rule.name.trim().is_empty() {
                return Err(Error::InvalidPolicy(
                    "approval rule name must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Every username the policy refers to, merge users first.
    pub fn referenced_usernames(&self) -> Vec<&str> {
        let approvers = self
            .approval_rule
            .iter()
            .flat_map(|rule| rule.approver_usernames.iter());
        self.merge_allowed_users
            .iter()
            .chain(approvers)
            .map(String::as_str)
            .collect()
    }

    /// Builds the protection request for the given merge user IDs.
    ///
    /// Role-based merge access is always switched off; merging is granted only
    /// through one entry per user.
    pub fn protect_payload(&self, merge_user_ids: &[u64]) -> ProtectBranchPayload {
        ProtectBranchPayload {
            name: self.branch_name.clone(),
            push_access_level: self.push_access_level,
            merge_access_level: AccessLevel::NoAccess,
            allow_force_push: self.allow_force_push,
            code_owner_approval_required: self.code_owner_approval_required,
            allowed_to_merge: merge_user_ids
                .iter()
                .map(|&user_id| MergeAccessGrant {
                    user_id,
                    access_level: self.merge_grant_access_level,
                })
                .collect(),
        }
    }
}
