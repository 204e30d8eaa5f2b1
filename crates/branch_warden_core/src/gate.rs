//! Execution mode gate for mutating GitLab calls.
//!
//! Every delete or create issued by the reconciler goes through a [`ChangeGate`].
//! In [`ExecutionMode::DryRun`] the call is recorded and a synthetic success is
//! returned; in [`ExecutionMode::Apply`] the call is sent and its status is
//! classified. Either way the call ends up in the gate's journal.

use gitlab_client::{endpoints, CreateApprovalRulePayload, GitLabApi, ProtectBranchPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{Error, ExecutionMode, WardenResult};

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;

/// Stand-in for the protection rule ID in dry-run approval rule payloads.
pub const PROTECTED_BRANCH_PLACEHOLDER: &str = "<dry-run:protected-branch-id>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Delete,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Delete => write!(f, "DELETE"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// A mutating call, exactly as it was (or would have been) sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedChange {
    pub method: HttpMethod,
    /// Path relative to `/api/v4`
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// `false` when the call was only recorded
    pub applied: bool,
}

impl std::fmt::Display for PlannedChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if let Some(body) = &self.body {
            write!(f, " {}", body)?;
        }
        Ok(())
    }
}

/// Identity of a resource created through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceRef {
    /// ID assigned by GitLab
    Assigned(u64),
    /// Dry run: nothing was created
    Placeholder,
}

impl ResourceRef {
    pub fn id(&self) -> Option<u64> {
        match self {
            ResourceRef::Assigned(id) => Some(*id),
            ResourceRef::Placeholder => None,
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceRef::Assigned(id) => write!(f, "{}", id),
            ResourceRef::Placeholder => write!(f, "<dry-run>"),
        }
    }
}

/// What a delete through the gate amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// GitLab answered 404; treated as success
    AlreadyAbsent,
    /// Dry run: the call was recorded only
    Planned,
}

/// Routes mutating calls for one repository through the run's execution mode.
pub struct ChangeGate<'a> {
    client: &'a dyn GitLabApi,
    mode: ExecutionMode,
    journal: Vec<PlannedChange>,
}

impl<'a> ChangeGate<'a> {
    pub fn new(client: &'a dyn GitLabApi, mode: ExecutionMode) -> Self {
        Self {
            client,
            mode,
            journal: Vec::new(),
        }
    }

    /// Calls recorded so far, in order.
    pub fn into_journal(self) -> Vec<PlannedChange> {
        self.journal
    }

    fn record(&mut self, method: HttpMethod, path: String, body: Option<Value>) {
        let change = PlannedChange {
            method,
            path,
            body,
            applied: !self.mode.is_dry_run(),
        };
        if self.mode.is_dry_run() {
            info!(change = %change, "[DRY-RUN] Not sending");
        } else {
            debug!(change = %change, "Sending");
        }
        self.journal.push(change);
    }

    /// Removes the protection rule for `branch`; a missing rule counts as success.
    pub async fn unprotect_branch(
        &mut self,
        project_id: u64,
        branch: &str,
    ) -> WardenResult<DeleteOutcome> {
        self.record(
            HttpMethod::Delete,
            endpoints::protected_branch(project_id, branch),
            None,
        );
        if self.mode.is_dry_run() {
            return Ok(DeleteOutcome::Planned);
        }

        classify_delete(
            self.client.unprotect_branch(project_id, branch).await,
            "remove existing branch protection",
        )
    }

    /// Creates a protection rule and returns its ID.
    ///
    /// The recorded body is the serialized `payload`, identical in both modes.
    pub async fn protect_branch(
        &mut self,
        project_id: u64,
        payload: &ProtectBranchPayload,
    ) -> WardenResult<ResourceRef> {
        self.record(
            HttpMethod::Post,
            endpoints::protected_branches(project_id),
            Some(serde_json::to_value(payload)?),
        );
        if self.mode.is_dry_run() {
            return Ok(ResourceRef::Placeholder);
        }

        let created = self
            .client
            .protect_branch(project_id, payload)
            .await
            .map_err(|e| Error::gitlab("create branch protection", e))?;
        Ok(ResourceRef::Assigned(created.id))
    }

    /// Deletes an approval rule; a missing rule counts as success.
    pub async fn delete_approval_rule(
        &mut self,
        project_id: u64,
        rule_id: u64,
    ) -> WardenResult<DeleteOutcome> {
        self.record(
            HttpMethod::Delete,
            endpoints::approval_rule(project_id, rule_id),
            None,
        );
        if self.mode.is_dry_run() {
            return Ok(DeleteOutcome::Planned);
        }

        classify_delete(
            self.client.delete_approval_rule(project_id, rule_id).await,
            "delete approval rule",
        )
    }

    /// Creates an approval rule scoped to exactly one protection rule.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnscopedApprovalRule` when asked to send a rule for a
    /// placeholder protection in apply mode.
    pub async fn create_approval_rule(
        &mut self,
        project_id: u64,
        name: &str,
        approvals_required: u32,
        user_ids: &[u64],
        protection: ResourceRef,
    ) -> WardenResult<ResourceRef> {
        let payload = CreateApprovalRulePayload {
            name: name.to_string(),
            approvals_required,
            user_ids: user_ids.to_vec(),
            protected_branch_ids: protection.id().into_iter().collect(),
        };
        let mut body = serde_json::to_value(&payload)?;
        if protection == ResourceRef::Placeholder {
            body["protected_branch_ids"] = Value::from(vec![PROTECTED_BRANCH_PLACEHOLDER]);
        }

        if !self.mode.is_dry_run() && payload.protected_branch_ids.is_empty() {
            return Err(Error::UnscopedApprovalRule {
                rule: name.to_string(),
            });
        }

        self.record(
            HttpMethod::Post,
            endpoints::approval_rules(project_id),
            Some(body),
        );
        if self.mode.is_dry_run() {
            return Ok(ResourceRef::Placeholder);
        }

        let created = self
            .client
            .create_approval_rule(project_id, &payload)
            .await
            .map_err(|e| Error::gitlab("create approval rule", e))?;
        Ok(ResourceRef::Assigned(created.id))
    }
}

fn classify_delete(
    result: Result<(), gitlab_client::Error>,
    operation: &str,
) -> WardenResult<DeleteOutcome> {
    match result {
        Ok(()) => Ok(DeleteOutcome::Deleted),
        Err(e) if e.is_not_found() => {
            debug!(operation = operation, "Nothing to delete");
            Ok(DeleteOutcome::AlreadyAbsent)
        }
        Err(e) => Err(Error::gitlab(operation, e)),
    }
}
