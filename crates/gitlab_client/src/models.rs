//! # Models
//!
//! This module contains the wire models returned by the GitLab REST API (v4).
//!
//! Only the fields the reconciler needs are declared; everything else in the
//! GitLab payloads is ignored during deserialization.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// GitLab role tier, expressed on the wire as its numeric value.
///
/// Anyone holding the given role or a higher one is covered by the level.
/// `NoAccess` (0) is used to switch off role-based access entirely.
///
/// # Examples
///
/// ```
/// use gitlab_client::models::AccessLevel;
///
/// assert_eq!(u8::from(AccessLevel::Developer), 30);
/// assert_eq!(AccessLevel::try_from(40u8).unwrap(), AccessLevel::Maintainer);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AccessLevel {
    NoAccess,
    Minimal,
    Guest,
    Planner,
    Reporter,
    Developer,
    Maintainer,
    Owner,
    Admin,
}

impl AccessLevel {
    /// Human readable name, matching the GitLab UI wording.
    pub fn name(&self) -> &'static str {
        match self {
            AccessLevel::NoAccess => "No access",
            AccessLevel::Minimal => "Minimal access",
            AccessLevel::Guest => "Guest",
            AccessLevel::Planner => "Planner",
            AccessLevel::Reporter => "Reporter",
            AccessLevel::Developer => "Developer",
            AccessLevel::Maintainer => "Maintainer",
            AccessLevel::Owner => "Owner",
            AccessLevel::Admin => "Admin",
        }
    }
}

impl From<AccessLevel> for u8 {
    fn from(level: AccessLevel) -> Self {
        match level {
            AccessLevel::NoAccess => 0,
            AccessLevel::Minimal => 5,
            AccessLevel::Guest => 10,
            AccessLevel::Planner => 15,
            AccessLevel::Reporter => 20,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
            AccessLevel::Owner => 50,
            AccessLevel::Admin => 60,
        }
    }
}

impl TryFrom<u8> for AccessLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccessLevel::NoAccess),
            5 => Ok(AccessLevel::Minimal),
            10 => Ok(AccessLevel::Guest),
            15 => Ok(AccessLevel::Planner),
            20 => Ok(AccessLevel::Reporter),
            30 => Ok(AccessLevel::Developer),
            40 => Ok(AccessLevel::Maintainer),
            50 => Ok(AccessLevel::Owner),
            60 => Ok(AccessLevel::Admin),
            other => Err(format!("unknown GitLab access level: {}", other)),
        }
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), u8::from(*self))
    }
}

/// Represents a GitLab group or subgroup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Group {
    /// The unique numeric ID of the group
    pub id: u64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Full namespace path, e.g. `acme/dev-backend`
    pub full_path: String,
}

/// Represents a GitLab project (repository).
///
/// # Examples
///
/// ```rust
/// use gitlab_client::models::Project;
///
/// let project = Project {
///     id: 42,
///     name: "payments".to_string(),
///     path_with_namespace: "acme/dev-backend/payments".to_string(),
///     default_branch: Some("main".to_string()),
/// };
///
/// assert_eq!(project.to_string(), "acme/dev-backend/payments (id=42)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Project {
    /// The unique numeric ID of the project
    pub id: u64,
    /// Short project name
    #[serde(default)]
    pub name: String,
    /// Full path including all parent namespaces
    pub path_with_namespace: String,
    /// Default branch, absent for empty repositories
    #[serde(default)]
    pub default_branch: Option<String>,
}

impl std::fmt::Display for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (id={})", self.path_with_namespace, self.id)
    }
}

/// Represents a GitLab user account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    /// The unique numeric ID of the user
    pub id: u64,
    /// The login name of the user
    #[serde(default)]
    pub username: String,
}

/// Represents a branch of a project repository.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Branch {
    pub name: String,
    /// Whether a protection rule currently covers the branch
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub default: bool,
}

/// One access entry of a protected branch, as reported by GitLab.
///
/// An entry is either role based (`user_id` and `group_id` both absent) or
/// granted to a specific user or group.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccessGrant {
    #[serde(default)]
    pub id: Option<u64>,
    /// Raw numeric level; kept as a number because GitLab may report tiers this crate doesn't model
    pub access_level: u8,
    #[serde(default)]
    pub access_level_description: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub group_id: Option<u64>,
}

impl AccessGrant {
    /// Returns `true` for entries that apply to a whole role rather than an identity.
    pub fn is_role_based(&self) -> bool {
        self.user_id.is_none() && self.group_id.is_none()
    }
}

/// A protection rule attached to a branch name.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProtectedBranch {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub push_access_levels: Vec<AccessGrant>,
    #[serde(default)]
    pub merge_access_levels: Vec<AccessGrant>,
    #[serde(default)]
    pub allow_force_push: bool,
    #[serde(default)]
    pub code_owner_approval_required: bool,
}

impl ProtectedBranch {
    /// User IDs that hold an explicit merge grant, in the order GitLab reports them.
    pub fn merge_user_ids(&self) -> Vec<u64> {
        self.merge_access_levels
            .iter()
            .filter_map(|grant| grant.user_id)
            .collect()
    }

    /// Returns `true` if some role (rather than a named identity) may merge.
    pub fn has_role_based_merge_access(&self) -> bool {
        self.merge_access_levels
            .iter()
            .any(|grant| grant.is_role_based() && grant.access_level > 0)
    }
}

/// Minimal reference to a protected branch as embedded in other resources.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProtectedBranchRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// A project-level merge request approval rule.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApprovalRule {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub approvals_required: u32,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub protected_branches: Vec<ProtectedBranchRef>,
}
