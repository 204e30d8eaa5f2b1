use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Result type used throughout the core crate.
pub type WardenResult<T> = Result<T, Error>;

/// Errors raised by the reconciliation core.
///
/// `UnknownIdentity`, `UnknownGroup` and `InvalidPolicy` abort a run before any
/// repository is touched. `GitLab` and `UnscopedApprovalRule` only fail the
/// repository being processed.
#[derive(Error, Debug)]
pub enum Error {
    /// A configured username has no matching GitLab account.
    #[error("GitLab user '{username}' was not found")]
    UnknownIdentity { username: String },

    /// The target group path does not exist or is not visible to the token.
    #[error("GitLab group '{path}' was not found")]
    UnknownGroup { path: String },

    /// The desired policy is not internally consistent.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// A GitLab request failed in a way that is not part of the expected flow.
    #[error("Failed to {operation}: {source}")]
    GitLab {
        operation: String,
        #[source]
        source: gitlab_client::Error,
    },

    /// A request payload could not be turned into JSON.
    #[error("Failed to serialize request payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An approval rule was about to be sent without the ID of the protection rule it belongs to.
    #[error("Refusing to create approval rule '{rule}' without a protected branch ID")]
    UnscopedApprovalRule { rule: String },
}

impl Error {
    /// Wraps a client error with a description of what was being attempted.
    pub fn gitlab(operation: impl Into<String>, source: gitlab_client::Error) -> Self {
        Error::GitLab {
            operation: operation.into(),
            source,
        }
    }
}
