//! Approval rule request payloads.

use serde::{Deserialize, Serialize};

/// Body of `POST /projects/:id/approval_rules`.
///
/// `protected_branch_ids` restricts the rule to the listed protection rules;
/// an empty list would make the rule apply to every branch.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CreateApprovalRulePayload {
    pub name: String,
    pub approvals_required: u32,
    pub user_ids: Vec<u64>,
    pub protected_branch_ids: Vec<u64>,
}
