//! # Branch Warden Core
//!
//! This crate drives every project of a GitLab group to a single branch
//! protection policy: a wide role may push to the protected branch, only an
//! explicit list of users may merge into it, and merges need approval from a
//! named set of approvers.
//!
//! ## Overview
//!
//! A run proceeds in this order:
//! 1. Validate the [`DesiredPolicy`]
//! 2. Resolve every configured username to a user ID ([`IdentityResolver`])
//! 3. List the projects of the group ([`RepositoryEnumerator`])
//! 4. For each project, check that the branch exists ([`branch_exists`]) and
//!    replace its protection and approval rules ([`PolicyReconciler`])
//! 5. Collect a [`RepositoryOutcome`] per project into a [`RunReport`]
//!
//! [`run_fleet`] performs the whole sequence. Steps 1 to 3 either succeed or
//! abort the run; step 4 records failures per project and carries on.
//!
//! ## Execution mode
//!
//! Every mutating request passes through a [`ChangeGate`]. With
//! [`ExecutionMode::DryRun`] the requests are recorded as [`PlannedChange`]s and
//! logged but never sent; read requests are still made so the plan reflects the
//! real state of each project.
//!
//! ## Examples
//!
//! ```no_run
//! use branch_warden_core::{run_fleet, DesiredPolicy, ExecutionMode, FleetSettings};
//! use gitlab_client::{GitLabClient, DEFAULT_TIMEOUT};
//! use secrecy::SecretString;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let token = SecretString::from("glpat-example".to_string());
//! let client = GitLabClient::new("https://gitlab.com", token, DEFAULT_TIMEOUT)?;
//!
//! let policy = DesiredPolicy {
//!     merge_allowed_users: vec!["alice".to_string()],
//!     ..DesiredPolicy::new("PROD")
//! };
//! let settings = FleetSettings {
//!     group_path: "acme/dev-backend".to_string(),
//!     include_subgroups: true,
//!     mode: ExecutionMode::DryRun,
//! };
//!
//! let report = run_fleet(&client, &policy, &settings).await?;
//! println!("{} protected, {} skipped", report.protected_count(), report.skipped_count());
//! # Ok(())
//! # }
//! ```

mod errors;
pub use errors::{Error, WardenResult};

pub mod branch_check;
pub mod enumerator;
pub mod fleet;
pub mod gate;
pub mod identity;
pub mod policy;
pub mod reconciler;
pub mod report;

pub use branch_check::branch_exists;
pub use enumerator::RepositoryEnumerator;
pub use fleet::{run_fleet, FleetSettings};
pub use gate::{
    ChangeGate, DeleteOutcome, HttpMethod, PlannedChange, ResourceRef,
    PROTECTED_BRANCH_PLACEHOLDER,
};
pub use identity::{IdentityResolver, ResolvedIdentities};
pub use policy::{ApprovalPolicy, DesiredPolicy, ExecutionMode};
pub use reconciler::{reconcile_one, PolicyReconciler, ReconcileStage};
pub use report::{RepositoryOutcome, RepositorySummary, RunReport};

#[cfg(test)]
mod testing;

#[cfg(test)]
#[path = "lib_integration_tests.rs"]
mod integration_tests;
