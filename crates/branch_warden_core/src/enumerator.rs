//! Repository enumeration for a GitLab group.

use gitlab_client::{GitLabApi, Project, ProjectPageQuery, MAX_PAGE_SIZE};
use tracing::{debug, info, instrument};

use crate::{Error, WardenResult};

#[cfg(test)]
#[path = "enumerator_tests.rs"]
mod tests;

/// Lists every project under a group, one page at a time.
pub struct RepositoryEnumerator<'a> {
    client: &'a dyn GitLabApi,
    include_subgroups: bool,
}

impl<'a> RepositoryEnumerator<'a> {
    pub fn new(client: &'a dyn GitLabApi, include_subgroups: bool) -> Self {
        Self {
            client,
            include_subgroups,
        }
    }

    /// Returns all projects of `group_path` in the order GitLab lists them.
    ///
    /// Pages are requested from 1 upwards until an empty page comes back.
    ///
    /// # Errors
    ///
    /// * `Error::UnknownGroup` if the group does not exist.
    /// * `Error::GitLab` if any request fails.
    #[instrument(skip(self), fields(include_subgroups = self.include_subgroups))]
    pub async fn list_repositories(&self, group_path: &str) -> WardenResult<Vec<Project>> {
        let group = self.client.get_group(group_path).await.map_err(|e| {
            if e.is_not_found() {
                Error::UnknownGroup {
                    path: group_path.to_string(),
                }
            } else {
                Error::gitlab(format!("look up group '{}'", group_path), e)
            }
        })?;

        let mut projects = Vec::new();
        let mut page = 1;
        loop {
            let query = ProjectPageQuery {
                page,
                per_page: MAX_PAGE_SIZE,
                include_subgroups: self.include_subgroups,
            };
            let batch = self
                .client
                .list_group_projects(group.id, &query)
                .await
                .map_err(|e| {
                    Error::gitlab(format!("list projects of group '{}'", group_path), e)
                })?;

            if batch.is_empty() {
                break;
            }
            debug!(page = page, count = batch.len(), "Fetched project page");
            projects.extend(batch);
            page += 1;
        }

        info!(
            group = group_path,
            group_id = group.id,
            count = projects.len(),
            "Enumerated repositories"
        );
        Ok(projects)
    }
}
