use gitlab_client::GitLabApi;
use tracing::{info, instrument};

use crate::{
    DesiredPolicy, ExecutionMode, IdentityResolver, PolicyReconciler, RepositoryEnumerator,
    RunReport, WardenResult,
};

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;

/// Where and how a run operates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetSettings {
    /// Full path of the group, e.g. `acme/dev-backend`
    pub group_path: String,
    pub include_subgroups: bool,
    pub mode: ExecutionMode,
}

/// Reconciles every project of a group against `policy`.
///
/// The policy is validated and every username resolved before any project is
/// listed, so a bad username or group stops the run with nothing changed.
/// Projects are then processed strictly one after another.
///
/// # Errors
///
/// Returns the errors of [`DesiredPolicy::validate`],
/// [`IdentityResolver::resolve_policy`] and
/// [`RepositoryEnumerator::list_repositories`]. Failures of individual projects
/// are recorded in the report instead.
#[instrument(skip(client, policy), fields(group = %settings.group_path, mode = %settings.mode))]
pub async fn run_fleet(
    client: &dyn GitLabApi,
    policy: &DesiredPolicy,
    settings: &FleetSettings,
) -> WardenResult<RunReport> {
    policy.validate()?;

    let mut report = RunReport::new(settings.mode, &settings.group_path, &policy.branch_name);
    info!(
        run_id = %report.run_id,
        branch = %policy.branch_name,
        usernames = policy.referenced_usernames().len(),
        "Starting reconciliation run"
    );

    let identities = IdentityResolver::new(client).resolve_policy(policy).await?;
    let projects = RepositoryEnumerator::new(client, settings.include_subgroups)
        .list_repositories(&settings.group_path)
        .await?;

    let reconciler = PolicyReconciler::new(client, policy, &identities, settings.mode);
    for project in &projects {
        report.record(reconciler.reconcile(project).await);
    }
    report.finish();

    info!(
        run_id = %report.run_id,
        protected = report.protected_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        "Reconciliation run finished"
    );
    Ok(report)
}
