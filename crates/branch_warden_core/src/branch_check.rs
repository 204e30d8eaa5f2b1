use gitlab_client::{GitLabApi, Project};
use tracing::{debug, instrument};

use crate::{Error, WardenResult};

#[cfg(test)]
#[path = "branch_check_tests.rs"]
mod tests;

/// Reports whether `branch` exists in `project`.
///
/// A 404 means the branch is absent. Every other failure is returned as an
/// error so that a broken request is never mistaken for a missing branch.
#[instrument(skip(client, project), fields(project = %project.path_with_namespace))]
pub async fn branch_exists(
    client: &dyn GitLabApi,
    project: &Project,
    branch: &str,
) -> WardenResult<bool> {
    match client.get_branch(project.id, branch).await {
        Ok(found) => {
            debug!(branch = %found.name, protected = found.protected, "Branch found");
            Ok(true)
        }
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(Error::gitlab(format!("check branch '{}'", branch), e)),
    }
}
