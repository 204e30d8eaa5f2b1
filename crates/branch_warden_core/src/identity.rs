//! Username to user ID resolution.

use std::collections::HashMap;

use gitlab_client::GitLabApi;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{DesiredPolicy, Error, WardenResult};

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;

/// User IDs for a policy, resolved once per run.
///
/// Each list lines up position by position with the username list it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedIdentities {
    pub merge_user_ids: Vec<u64>,
    pub approver_ids: Vec<u64>,
}

/// Looks usernames up through the GitLab user search and caches the answers.
///
/// A username with no match fails the resolution; the caller is expected to
/// abort the run, since continuing would grant or deny the wrong people.
pub struct IdentityResolver<'a> {
    client: &'a dyn GitLabApi,
    cache: HashMap<String, u64>,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(client: &'a dyn GitLabApi) -> Self {
        Self {
            client,
            cache: HashMap::new(),
        }
    }

    /// Resolves usernames to IDs, preserving input order and duplicates.
    ///
    /// # Errors
    ///
    /// * `Error::UnknownIdentity` if a username has no match.
    /// * `Error::GitLab` if the lookup request itself fails.
    pub async fn resolve(&mut self, usernames: &[String]) -> WardenResult<Vec<u64>> {
        let mut ids = Vec::with_capacity(usernames.len());
        for username in usernames {
            ids.push(self.resolve_one(username).await?);
        }
        Ok(ids)
    }

    /// Resolves every username the policy refers to.
    pub async fn resolve_policy(
        &mut self,
        policy: &DesiredPolicy,
    ) -> WardenResult<ResolvedIdentities> {
        let merge_user_ids = self.resolve(&policy.merge_allowed_users).await?;
        let approver_ids = match &policy.approval_rule {
            Some(rule) => self.resolve(&rule.approver_usernames).await?,
            None => Vec::new(),
        };

        info!(
            merge_users = merge_user_ids.len(),
            approvers = approver_ids.len(),
            lookups = self.cache.len(),
            "Resolved policy identities"
        );

        Ok(ResolvedIdentities {
            merge_user_ids,
            approver_ids,
        })
    }

    async fn resolve_one(&mut self, username: &str) -> WardenResult<u64> {
        if let Some(id) = self.cache.get(username) {
            return Ok(*id);
        }

        let users = self
            .client
            .find_users_by_username(username)
            .await
            .map_err(|e| Error::gitlab(format!("look up user '{}'", username), e))?;

        // The search is case-insensitive; prefer the exact account when several come back.
        let user = users
            .iter()
            .find(|u| u.username == username)
            .or_else(|| users.first())
            .ok_or_else(|| {
                error!(username = username, "GitLab user not found");
                Error::UnknownIdentity {
                    username: username.to_string(),
                }
            })?;

        debug!(username = username, user_id = user.id, "Resolved user");
        self.cache.insert(username.to_string(), user.id);
        Ok(user.id)
    }
}
