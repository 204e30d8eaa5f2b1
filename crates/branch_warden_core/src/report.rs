//! Per-repository outcomes and the run summary.

use chrono::{DateTime, Utc};
use gitlab_client::Project;
use serde::Serialize;
use uuid::Uuid;

use crate::{ExecutionMode, PlannedChange, ReconcileStage, ResourceRef};

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

/// Project fields carried into the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySummary {
    pub id: u64,
    pub path_with_namespace: String,
}

impl From<&Project> for RepositorySummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            path_with_namespace: project.path_with_namespace.clone(),
        }
    }
}

impl std::fmt::Display for RepositorySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (id={})", self.path_with_namespace, self.id)
    }
}

/// What happened to one repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepositoryOutcome {
    /// The policy was installed, or would have been in a dry run.
    Protected {
        repository: RepositorySummary,
        protection: ResourceRef,
        approval_rule: Option<ResourceRef>,
        changes: Vec<PlannedChange>,
    },
    /// The branch does not exist; nothing was sent.
    Skipped {
        repository: RepositorySummary,
        reason: String,
    },
    /// A request failed part way through.
    Failed {
        repository: RepositorySummary,
        stage: ReconcileStage,
        reason: String,
        /// Calls made before the failure, including the failing one
        changes: Vec<PlannedChange>,
    },
}

impl RepositoryOutcome {
    pub fn repository(&self) -> &RepositorySummary {
        match self {
            RepositoryOutcome::Protected { repository, .. }
            | RepositoryOutcome::Skipped { repository, .. }
            | RepositoryOutcome::Failed { repository, .. } => repository,
        }
    }

    pub fn changes(&self) -> &[PlannedChange] {
        match self {
            RepositoryOutcome::Protected { changes, .. }
            | RepositoryOutcome::Failed { changes, .. } => changes,
            RepositoryOutcome::Skipped { .. } => &[],
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, RepositoryOutcome::Protected { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RepositoryOutcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RepositoryOutcome::Failed { .. })
    }
}

/// Result of one pass over a group.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: ExecutionMode,
    pub group_path: String,
    pub branch: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<RepositoryOutcome>,
}

impl RunReport {
    pub fn new(mode: ExecutionMode, group_path: &str, branch: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            group_path: group_path.to_string(),
            branch: branch.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: RepositoryOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn protected_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_protected()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }
}
