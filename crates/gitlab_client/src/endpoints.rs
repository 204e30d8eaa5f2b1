//! Resource paths of the GitLab REST API, relative to `<base>/api/v4`.
//!
//! The same functions build the paths the client calls and the paths recorded
//! for dry-run reporting, so both always agree.

use url::form_urlencoded;

#[cfg(test)]
#[path = "endpoints_tests.rs"]
mod tests;

/// Encodes a value that is used as a single path segment.
///
/// Namespaced paths (`acme/backend`) and branch names (`release/1.0`) contain
/// slashes that must reach GitLab as `%2F`.
pub fn encode_segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

pub fn group(full_path: &str) -> String {
    format!("/groups/{}", encode_segment(full_path))
}

pub fn group_projects(group_id: u64) -> String {
    format!("/groups/{}/projects", group_id)
}

pub fn users() -> String {
    "/users".to_string()
}

pub fn branch(project_id: u64, branch: &str) -> String {
    format!(
        "/projects/{}/repository/branches/{}",
        project_id,
        encode_segment(branch)
    )
}

pub fn protected_branches(project_id: u64) -> String {
    format!("/projects/{}/protected_branches", project_id)
}

pub fn protected_branch(project_id: u64, branch: &str) -> String {
    format!(
        "/projects/{}/protected_branches/{}",
        project_id,
        encode_segment(branch)
    )
}

pub fn approval_rules(project_id: u64) -> String {
    format!("/projects/{}/approval_rules", project_id)
}

pub fn approval_rule(project_id: u64, rule_id: u64) -> String {
    format!("/projects/{}/approval_rules/{}", project_id, rule_id)
}
