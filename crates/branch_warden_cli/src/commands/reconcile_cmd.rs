//! The `reconcile` command.
//!
//! Loads the configuration, reads the token, runs the reconciliation over the
//! configured group and renders the resulting report.
//!
//! # Examples
//!
//! ```bash
//! # Show what would change, using ./branch-warden.toml
//! branch-warden reconcile --dry-run
//!
//! # Apply the policy with an explicit configuration file
//! branch-warden reconcile --config prod.toml --apply
//!
//! # Machine-readable report
//! branch-warden reconcile --format json
//! ```

use std::path::PathBuf;

use branch_warden_core::{run_fleet, ExecutionMode, RepositoryOutcome, RunReport};
use clap::Args;
use colored::Colorize;
use gitlab_client::{GitLabApi, GitLabClient};
use tracing::{info, instrument};

use crate::config::{token_from_env, AppConfig, DEFAULT_CONFIG_FILENAME};
use crate::errors::Error;

#[cfg(test)]
#[path = "reconcile_cmd_tests.rs"]
mod tests;

/// Arguments for the `reconcile` command.
#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    /// Path to the configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Send the changes to GitLab, overriding `dry_run` in the configuration.
    #[arg(long, conflicts_with = "dry_run")]
    pub apply: bool,

    /// Only record the changes, overriding `dry_run` in the configuration.
    #[arg(long)]
    pub dry_run: bool,

    /// Output format (json or pretty).
    ///
    /// - json: Machine-readable JSON output
    /// - pretty: Human-readable formatted output (default)
    #[arg(long, default_value = "pretty")]
    pub format: String,
}

impl ReconcileArgs {
    /// Execution mode requested on the command line, if any.
    pub fn mode_override(&self) -> Option<ExecutionMode> {
        if self.apply {
            Some(ExecutionMode::Apply)
        } else if self.dry_run {
            Some(ExecutionMode::DryRun)
        } else {
            None
        }
    }
}

/// Runs the command and returns the rendered report with the finished run.
///
/// # Errors
///
/// Returns an error for an unknown output format, a configuration problem, a
/// missing token, or a run that was aborted before touching any repository.
pub async fn execute(args: &ReconcileArgs) -> Result<(RunReport, String), Error> {
    check_format(&args.format)?;

    let config = AppConfig::load(&args.config)?;
    let token = token_from_env()?;
    let client = GitLabClient::new(&config.gitlab_url, token, config.timeout())?;

    let report = run(&client, &config, args.mode_override()).await?;
    let rendered = format_report(&report, &args.format)?;
    Ok((report, rendered))
}

/// Runs the reconciliation described by `config` against `client`.
#[instrument(skip(client, config), fields(group = %config.group_path, branch = %config.branch))]
pub async fn run(
    client: &dyn GitLabApi,
    config: &AppConfig,
    mode_override: Option<ExecutionMode>,
) -> Result<RunReport, Error> {
    let policy = config.to_policy();
    let settings = config.to_fleet_settings(mode_override);
    info!(mode = %settings.mode, "Reconciling branch policy");

    Ok(run_fleet(client, &policy, &settings).await?)
}

fn check_format(format: &str) -> Result<(), Error> {
    match format {
        "json" | "pretty" => Ok(()),
        other => Err(Error::InvalidArguments(format!(
            "Unknown output format '{}', expected json or pretty",
            other
        ))),
    }
}

/// Renders a report in the requested format.
pub fn format_report(report: &RunReport, format: &str) -> Result<String, Error> {
    check_format(format)?;
    if format == "json" {
        return Ok(serde_json::to_string_pretty(report)?);
    }
    Ok(format_report_pretty(report))
}

fn format_report_pretty(report: &RunReport) -> String {
    let mut output = String::new();

    let mode = if report.mode.is_dry_run() {
        "DRY RUN (no changes sent)".yellow().bold()
    } else {
        "APPLY (changes sent)".red().bold()
    };
    output.push_str(&format!("{}: {}\n", "Mode".bold(), mode));
    output.push_str(&format!("{}: {}\n", "Group".bold(), report.group_path));
    output.push_str(&format!("{}: {}\n", "Branch".bold(), report.branch));
    output.push_str(&format!("{}: {}\n\n", "Run".bold(), report.run_id));

    for outcome in &report.outcomes {
        match outcome {
            RepositoryOutcome::Protected {
                repository,
                protection,
                approval_rule,
                ..
            } => {
                let rule = approval_rule
                    .map(|r| format!(", approval rule {}", r))
                    .unwrap_or_default();
                output.push_str(&format!(
                    "  {} {} protected (protection {}{})\n",
                    "✓".green(),
                    repository,
                    protection,
                    rule
                ));
            }
            RepositoryOutcome::Skipped { repository, reason } => {
                output.push_str(&format!(
                    "  {} {} skipped: {}\n",
                    "-".dimmed(),
                    repository,
                    reason
                ));
            }
            RepositoryOutcome::Failed {
                repository,
                stage,
                reason,
                ..
            } => {
                output.push_str(&format!(
                    "  {} {} failed at {}: {}\n",
                    "✗".red(),
                    repository,
                    stage,
                    reason
                ));
            }
        }

        for change in outcome.changes() {
            let marker = if change.applied { "" } else { "[DRY-RUN] " };
            output.push_str(&format!("      {}{}\n", marker, change));
        }
    }

    output.push_str(&format!(
        "\n{}: {} protected, {} skipped, {} failed\n",
        "Summary".bold(),
        report.protected_count(),
        report.skipped_count(),
        report.failed_count()
    ));
    output
}
