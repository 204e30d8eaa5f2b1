//! Per-repository policy reconciliation.
//!
//! This module provides [`PolicyReconciler`], which drives a single project to
//! the [`DesiredPolicy`]. Reconciliation replaces rather than merges: whatever
//! protection rule exists for the branch is removed and a new one is created
//! from the policy alone, so the result does not depend on what was there
//! before.
//!
//! # Phases
//!
//! 1. **Clear**: delete the protection rule for the branch (404 is success).
//! 2. **Install**: create the protection rule with role-based merge access set
//!    to No access and one merge grant per resolved user.
//! 3. **Approval rule**: delete every approval rule carrying the reserved name,
//!    then create one scoped to the rule from phase 2. Only runs when the
//!    policy has an approval rule and phase 2 succeeded.
//!
//! A project without the branch is skipped before phase 1 and receives no
//! mutating calls.

use gitlab_client::{GitLabApi, Project};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::report::RepositorySummary;
use crate::{
    branch_exists, ChangeGate, DesiredPolicy, Error, ExecutionMode, RepositoryOutcome,
    ResolvedIdentities, ResourceRef,
};

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;

/// Step at which a repository failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStage {
    BranchCheck,
    ClearProtection,
    InstallProtection,
    ApprovalRule,
}

impl std::fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReconcileStage::BranchCheck => "branch check",
            ReconcileStage::ClearProtection => "clear protection",
            ReconcileStage::InstallProtection => "install protection",
            ReconcileStage::ApprovalRule => "approval rule",
        };
        write!(f, "{}", name)
    }
}

type PhaseResult<T> = Result<T, (ReconcileStage, Error)>;

/// Applies one policy to projects, one at a time.
///
/// Holds only shared, read-only inputs; every call to [`reconcile`](Self::reconcile)
/// starts from a fresh [`ChangeGate`].
pub struct PolicyReconciler<'a> {
    client: &'a dyn GitLabApi,
    policy: &'a DesiredPolicy,
    identities: &'a ResolvedIdentities,
    mode: ExecutionMode,
}

impl<'a> PolicyReconciler<'a> {
    pub fn new(
        client: &'a dyn GitLabApi,
        policy: &'a DesiredPolicy,
        identities: &'a ResolvedIdentities,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            client,
            policy,
            identities,
            mode,
        }
    }

    /// Reconciles a single project and reports what happened.
    ///
    /// Never returns an error: failures are captured in
    /// [`RepositoryOutcome::Failed`] so the caller can move on to the next project.
    #[instrument(
        skip(self, project),
        fields(project = %project.path_with_namespace, project_id = project.id, mode = %self.mode)
    )]
    pub async fn reconcile(&self, project: &Project) -> RepositoryOutcome {
        let repository = RepositorySummary::from(project);
        let branch = &self.policy.branch_name;

        match branch_exists(self.client, project, branch).await {
            Ok(true) => {}
            Ok(false) => {
                info!(branch = %branch, "Branch not found, skipping");
                return RepositoryOutcome::Skipped {
                    repository,
                    reason: format!("branch '{}' not found", branch),
                };
            }
            Err(e) => {
                warn!(error = %e, "Branch check failed");
                return RepositoryOutcome::Failed {
                    repository,
                    stage: ReconcileStage::BranchCheck,
                    reason: e.to_string(),
                    changes: Vec::new(),
                };
            }
        }

        let mut gate = ChangeGate::new(self.client, self.mode);
        let result = self.apply(project.id, &mut gate).await;
        let changes = gate.into_journal();

        match result {
            Ok((protection, approval_rule)) => {
                info!(
                    protection = %protection,
                    changes = changes.len(),
                    "Repository protected"
                );
                RepositoryOutcome::Protected {
                    repository,
                    protection,
                    approval_rule,
                    changes,
                }
            }
            Err((stage, e)) => {
                warn!(stage = %stage, error = %e, "Repository reconciliation failed");
                RepositoryOutcome::Failed {
                    repository,
                    stage,
                    reason: e.to_string(),
                    changes,
                }
            }
        }
    }

    async fn apply(
        &self,
        project_id: u64,
        gate: &mut ChangeGate<'_>,
    ) -> PhaseResult<(ResourceRef, Option<ResourceRef>)> {
        let branch = &self.policy.branch_name;

        gate.unprotect_branch(project_id, branch)
            .await
            .map_err(|e| (ReconcileStage::ClearProtection, e))?;

        let payload = self.policy.protect_payload(&self.identities.merge_user_ids);
        let protection = gate
            .protect_branch(project_id, &payload)
            .await
            .map_err(|e| (ReconcileStage::InstallProtection, e))?;

        let approval_rule = match &self.policy.approval_rule {
            Some(rule) => Some(
                self.replace_approval_rule(
                    project_id,
                    &rule.name,
                    rule.approvals_required,
                    protection,
                    gate,
                )
                .await
                .map_err(|e| (ReconcileStage::ApprovalRule, e))?,
            ),
            None => None,
        };

        Ok((protection, approval_rule))
    }

    async fn replace_approval_rule(
        &self,
        project_id: u64,
        name: &str,
        approvals_required: u32,
        protection: ResourceRef,
        gate: &mut ChangeGate<'_>,
    ) -> Result<ResourceRef, Error> {
        // Every page is read before the first delete.
        let mut stale = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .client
                .list_approval_rules(project_id, page)
                .await
                .map_err(|e| Error::gitlab("list approval rules", e))?;
            if batch.is_empty() {
                break;
            }
            stale.extend(batch.into_iter().filter(|r| r.name == name).map(|r| r.id));
            page += 1;
        }

        for rule_id in stale {
            gate.delete_approval_rule(project_id, rule_id).await?;
        }

        gate.create_approval_rule(
            project_id,
            name,
            approvals_required,
            &self.identities.approver_ids,
            protection,
        )
        .await
    }
}

/// Reconciles one project with a throwaway [`PolicyReconciler`].
pub async fn reconcile_one(
    client: &dyn GitLabApi,
    project: &Project,
    policy: &DesiredPolicy,
    identities: &ResolvedIdentities,
    mode: ExecutionMode,
) -> RepositoryOutcome {
    PolicyReconciler::new(client, policy, identities, mode)
        .reconcile(project)
        .await
}
