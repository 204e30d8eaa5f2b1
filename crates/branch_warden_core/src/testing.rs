//! In-memory GitLab used by the unit tests of this crate.
//!
//! Behaves like the parts of the GitLab API the reconciler touches: creating a
//! protection rule that already exists is rejected with 409, deleting a
//! protection rule leaves approval rules behind with the reference removed, and
//! every request is logged so tests can assert on the exact calls made.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use gitlab_client::{
    endpoints, AccessGrant, ApprovalRule, Branch, CreateApprovalRulePayload, Error, GitLabApi,
    Group, Project, ProjectPageQuery, ProtectBranchPayload, ProtectedBranch, ProtectedBranchRef,
    User, MAX_PAGE_SIZE,
};

/// One request received by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCall {
    pub method: &'static str,
    pub path: String,
}

impl FakeCall {
    pub fn is_mutating(&self) -> bool {
        self.method != "GET"
    }
}

#[derive(Default)]
struct FakeState {
    groups: HashMap<String, Group>,
    /// (group id, in a subgroup, project)
    projects: Vec<(u64, bool, Project)>,
    users: Vec<User>,
    branches: HashSet<(u64, String)>,
    protected: HashMap<(u64, String), ProtectedBranch>,
    approval_rules: HashMap<u64, Vec<ApprovalRule>>,
    failures: HashMap<(&'static str, String), u16>,
    page_size: Option<usize>,
    next_id: u64,
    calls: Vec<FakeCall>,
}

impl FakeState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        1000 + self.next_id
    }

    fn enter(&mut self, method: &'static str, path: String) -> Result<(), Error> {
        self.calls.push(FakeCall {
            method,
            path: path.clone(),
        });
        match self.failures.get(&(method, path)) {
            Some(404) => Err(Error::NotFound),
            Some(&status) => Err(Error::UnexpectedStatus {
                status,
                body: "injected failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

pub struct FakeGitLab {
    state: Mutex<FakeState>,
}

impl FakeGitLab {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_group(self, id: u64, full_path: &str) -> Self {
        self.state.lock().unwrap().groups.insert(
            full_path.to_string(),
            Group {
                id,
                name: full_path.rsplit('/').next().unwrap_or_default().to_string(),
                full_path: full_path.to_string(),
            },
        );
        self
    }

    pub fn with_project(self, group_id: u64, id: u64, path: &str) -> Self {
        self.add_project(group_id, id, path, false)
    }

    pub fn with_subgroup_project(self, group_id: u64, id: u64, path: &str) -> Self {
        self.add_project(group_id, id, path, true)
    }

    fn add_project(self, group_id: u64, id: u64, path: &str, nested: bool) -> Self {
        self.state.lock().unwrap().projects.push((
            group_id,
            nested,
            Project {
                id,
                name: path.rsplit('/').next().unwrap_or_default().to_string(),
                path_with_namespace: path.to_string(),
                default_branch: Some("main".to_string()),
            },
        ));
        self
    }

    pub fn with_user(self, id: u64, username: &str) -> Self {
        self.state.lock().unwrap().users.push(User {
            id,
            username: username.to_string(),
        });
        self
    }

    pub fn with_branch(self, project_id: u64, branch: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .branches
            .insert((project_id, branch.to_string()));
        self
    }

    /// Seeds a protection rule that lets a whole role merge.
    pub fn with_role_protection(self, project_id: u64, branch: &str, merge_level: u8) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id();
            state.protected.insert(
                (project_id, branch.to_string()),
                ProtectedBranch {
                    id,
                    name: branch.to_string(),
                    push_access_levels: vec![role_grant(40)],
                    merge_access_levels: vec![role_grant(merge_level)],
                    allow_force_push: false,
                    code_owner_approval_required: false,
                },
            );
        }
        self
    }

    /// Seeds an approval rule scoped to the current protection rule of `branch`, if any.
    pub fn with_approval_rule(self, project_id: u64, name: &str, branch: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id();
            let protected_branches = state
                .protected
                .get(&(project_id, branch.to_string()))
                .map(|p| {
                    vec![ProtectedBranchRef {
                        id: p.id,
                        name: p.name.clone(),
                    }]
                })
                .unwrap_or_default();
            state
                .approval_rules
                .entry(project_id)
                .or_default()
                .push(ApprovalRule {
                    id,
                    name: name.to_string(),
                    approvals_required: 2,
                    users: Vec::new(),
                    protected_branches,
                });
        }
        self
    }

    /// Makes every request with this method and path fail with `status`.
    pub fn fail(self, method: &'static str, path: String, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((method, path), status);
        self
    }

    /// Caps the page size of every list endpoint.
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.lock().unwrap().page_size = Some(page_size);
        self
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<FakeCall> {
        self.calls().into_iter().filter(FakeCall::is_mutating).collect()
    }

    pub fn protection(&self, project_id: u64, branch: &str) -> Option<ProtectedBranch> {
        self.state
            .lock()
            .unwrap()
            .protected
            .get(&(project_id, branch.to_string()))
            .cloned()
    }

    pub fn approval_rules(&self, project_id: u64) -> Vec<ApprovalRule> {
        self.state
            .lock()
            .unwrap()
            .approval_rules
            .get(&project_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn role_grant(level: u8) -> AccessGrant {
    AccessGrant {
        id: None,
        access_level: level,
        access_level_description: None,
        user_id: None,
        group_id: None,
    }
}

#[async_trait]
impl GitLabApi for FakeGitLab {
    async fn get_group(&self, full_path: &str) -> Result<Group, Error> {
        let mut state = self.state.lock().unwrap();
        state.enter("GET", endpoints::group(full_path))?;
        state.groups.get(full_path).cloned().ok_or(Error::NotFound)
    }

    async fn list_group_projects(
        &self,
        group_id: u64,
        query: &ProjectPageQuery,
    ) -> Result<Vec<Project>, Error> {
        let mut state = self.state.lock().unwrap();
        state.enter("GET", endpoints::group_projects(group_id))?;
        let per_page = state
            .page_size
            .unwrap_or(query.per_page as usize)
            .min(query.per_page as usize);
        let start = (query.page.saturating_sub(1) as usize) * per_page;
        Ok(state
            .projects
            .iter()
            .filter(|(gid, nested, _)| *gid == group_id && (query.include_subgroups || !nested))
            .map(|(_, _, project)| project.clone())
            .skip(start)
            .take(per_page)
            .collect())
    }

    async fn find_users_by_username(&self, username: &str) -> Result<Vec<User>, Error> {
        let mut state = self.state.lock().unwrap();
        state.enter("GET", format!("{}?username={}", endpoints::users(), username))?;
        Ok(state
            .users
            .iter()
            .filter(|u| u.username.eq_ignore_ascii_case(username))
            .cloned()
            .collect())
    }

    async fn get_branch(&self, project_id: u64, branch: &str) -> Result<Branch, Error> {
        let mut state = self.state.lock().unwrap();
        state.enter("GET", endpoints::branch(project_id, branch))?;
        if !state.branches.contains(&(project_id, branch.to_string())) {
            return Err(Error::NotFound);
        }
        let protected = state
            .protected
            .contains_key(&(project_id, branch.to_string()));
        Ok(Branch {
            name: branch.to_string(),
            protected,
            default: false,
        })
    }

    async fn unprotect_branch(&self, project_id: u64, branch: &str) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.enter("DELETE", endpoints::protected_branch(project_id, branch))?;
        let removed = state
            .protected
            .remove(&(project_id, branch.to_string()))
            .ok_or(Error::NotFound)?;
        for rule in state.approval_rules.entry(project_id).or_default() {
            rule.protected_branches.retain(|p| p.id != removed.id);
        }
        Ok(())
    }

    async fn protect_branch(
        &self,
        project_id: u64,
        payload: &ProtectBranchPayload,
    ) -> Result<ProtectedBranch, Error> {
        let mut state = self.state.lock().unwrap();
        state.enter("POST", endpoints::protected_branches(project_id))?;
        let key = (project_id, payload.name.clone());
        if state.protected.contains_key(&key) {
            return Err(Error::UnexpectedStatus {
                status: 409,
                body: "Protected branch already exists".to_string(),
            });
        }

        let mut merge_access_levels = Vec::new();
        if u8::from(payload.merge_access_level) > 0 {
            merge_access_levels.push(role_grant(payload.merge_access_level.into()));
        }
        merge_access_levels.extend(payload.allowed_to_merge.iter().map(|grant| AccessGrant {
            id: None,
            access_level: grant.access_level.into(),
            access_level_description: None,
            user_id: Some(grant.user_id),
            group_id: None,
        }));

        let id = state.next_id();
        let protected = ProtectedBranch {
            id,
            name: payload.name.clone(),
            push_access_levels: vec![role_grant(payload.push_access_level.into())],
            merge_access_levels,
            allow_force_push: payload.allow_force_push,
            code_owner_approval_required: payload.code_owner_approval_required,
        };
        state.protected.insert(key, protected.clone());
        Ok(protected)
    }

    async fn list_approval_rules(
        &self,
        project_id: u64,
        page: u32,
    ) -> Result<Vec<ApprovalRule>, Error> {
        let mut state = self.state.lock().unwrap();
        state.enter("GET", endpoints::approval_rules(project_id))?;
        let per_page = state
            .page_size
            .unwrap_or(MAX_PAGE_SIZE as usize)
            .min(MAX_PAGE_SIZE as usize);
        let start = (page.saturating_sub(1) as usize) * per_page;
        Ok(state
            .approval_rules
            .get(&project_id)
            .map(|rules| rules.iter().skip(start).take(per_page).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_approval_rule(&self, project_id: u64, rule_id: u64) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.enter("DELETE", endpoints::approval_rule(project_id, rule_id))?;
        let rules = state.approval_rules.entry(project_id).or_default();
        let before = rules.len();
        rules.retain(|r| r.id != rule_id);
        if rules.len() == before {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn create_approval_rule(
        &self,
        project_id: u64,
        payload: &CreateApprovalRulePayload,
    ) -> Result<ApprovalRule, Error> {
        let mut state = self.state.lock().unwrap();
        state.enter("POST", endpoints::approval_rules(project_id))?;

        let mut protected_branches = Vec::new();
        for id in &payload.protected_branch_ids {
            let found = state
                .protected
                .iter()
                .find(|((pid, _), p)| *pid == project_id && p.id == *id)
                .map(|(_, p)| ProtectedBranchRef {
                    id: p.id,
                    name: p.name.clone(),
                });
            match found {
                Some(reference) => protected_branches.push(reference),
                None => {
                    return Err(Error::UnexpectedStatus {
                        status: 422,
                        body: format!("protected branch {} not found", id),
                    })
                }
            }
        }

        let users: Vec<User> = payload
            .user_ids
            .iter()
            .filter_map(|id| state.users.iter().find(|u| u.id == *id).cloned())
            .collect();

        let id = state.next_id();
        let rule = ApprovalRule {
            id,
            name: payload.name.clone(),
            approvals_required: payload.approvals_required,
            users,
            protected_branches,
        };
        state
            .approval_rules
            .entry(project_id)
            .or_default()
            .push(rule.clone());
        Ok(rule)
    }
}
