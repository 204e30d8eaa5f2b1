use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the Branch Warden CLI application.
///
/// Every variant stops the run before or instead of producing a report; the
/// process exits with status 2 for all of them.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error occurred while loading or validating configuration.
    ///
    /// This error is returned when the configuration file is missing, cannot be
    /// parsed, or contains values that cannot form a valid policy.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The GitLab access token was not provided.
    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    /// Invalid command-line arguments were provided.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The reconciliation run was aborted before any repository was touched.
    #[error(transparent)]
    Core(#[from] branch_warden_core::Error),

    /// The GitLab client could not be created.
    #[error("GitLab client error: {0}")]
    Client(#[from] gitlab_client::Error),

    /// The report could not be rendered.
    #[error("Failed to render report: {0}")]
    Output(#[from] serde_json::Error),
}
