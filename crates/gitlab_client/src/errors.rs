//! Error types for GitLab client operations.
//!
//! This module defines the error types that can occur when interacting with the GitLab REST API
//! through the gitlab_client crate. The variants keep "the resource does not exist" apart from
//! "the request failed", because callers make different decisions for each.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitLab client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use gitlab_client::Error;
///
/// match client.get_branch(project_id, "PROD").await {
///     Ok(branch) => println!("Branch found: {}", branch.name),
///     Err(Error::NotFound) => println!("No such branch"),
///     Err(err) => eprintln!("Lookup failed: {}", err),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error deserializing the response from GitLab.
    ///
    /// The server answered with a success status but the body did not match the
    /// expected structure.
    #[error("Failed to deserialize GitLab response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The client could not be constructed from the supplied settings.
    ///
    /// Typically an unparseable base URL or an HTTP client that failed to build.
    #[error("Invalid client configuration: {0}")]
    InvalidConfiguration(String),

    /// The requested resource was not found.
    ///
    /// Returned for HTTP 404 responses only. Any other failure uses a different variant so
    /// that a missing resource is never confused with a failed request.
    #[error("Resource not found")]
    NotFound,

    /// GitLab API rate limit has been exceeded (HTTP 429).
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The request could not be sent or the response could not be read.
    ///
    /// Covers connection failures, DNS errors and timeouts.
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The credential was rejected (HTTP 401 or 403).
    #[error("Authentication failed with status {status}: {body}")]
    Unauthorized { status: u16, body: String },

    /// Any other non-success status code.
    #[error("Unexpected status {status} from GitLab: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl Error {
    /// Returns `true` when the error only says that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}
