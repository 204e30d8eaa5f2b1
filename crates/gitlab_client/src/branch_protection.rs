//! Branch protection request payloads.
//!
//! This module contains the body sent to `POST /projects/:id/protected_branches`.

use serde::{Deserialize, Serialize};

use crate::models::AccessLevel;

#[cfg(test)]
#[path = "branch_protection_tests.rs"]
mod tests;

/// A per-user merge grant inside a protection request.
///
/// GitLab still wants an access level on user grants; it has to be at least
/// the tier that would normally be allowed to merge.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MergeAccessGrant {
    pub user_id: u64,
    pub access_level: AccessLevel,
}

/// Body of a "protect branch" request.
///
/// # Examples
///
/// ```rust
/// use gitlab_client::{MergeAccessGrant, ProtectBranchPayload};
/// use gitlab_client::models::AccessLevel;
///
/// let payload = ProtectBranchPayload {
///     name: "PROD".to_string(),
///     push_access_level: AccessLevel::Developer,
///     merge_access_level: AccessLevel::NoAccess,
///     allow_force_push: false,
///     code_owner_approval_required: false,
///     allowed_to_merge: vec![MergeAccessGrant {
///         user_id: 101,
///         access_level: AccessLevel::Maintainer,
///     }],
/// };
///
/// let body = serde_json::to_value(&payload).unwrap();
/// assert_eq!(body["merge_access_level"], 0);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProtectBranchPayload {
    /// Branch name (or wildcard) to protect
    pub name: String,
    /// Lowest role allowed to push
    pub push_access_level: AccessLevel,
    /// Lowest role allowed to merge; `NoAccess` leaves merging to the explicit grants
    pub merge_access_level: AccessLevel,
    pub allow_force_push: bool,
    pub code_owner_approval_required: bool,
    /// Explicit per-user merge grants, reported back as `merge_access_levels`
    pub allowed_to_merge: Vec<MergeAccessGrant>,
}
