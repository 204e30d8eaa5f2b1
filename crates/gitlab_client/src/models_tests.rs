use super::*;
use serde_json::{from_str, json, to_value};

#[test]
fn test_access_level_serializes_as_number() {
    assert_eq!(to_value(AccessLevel::NoAccess).unwrap(), json!(0));
    assert_eq!(to_value(AccessLevel::Developer).unwrap(), json!(30));
    assert_eq!(to_value(AccessLevel::Maintainer).unwrap(), json!(40));
}

#[test]
fn test_access_level_deserializes_known_values() {
    let level: AccessLevel = from_str("60").expect("Failed to deserialize AccessLevel");
    assert_eq!(level, AccessLevel::Admin);
}

#[test]
fn test_access_level_rejects_unknown_values() {
    let result = from_str::<AccessLevel>("35");
    assert!(result.is_err());
}

#[test]
fn test_access_level_ordering_follows_tiers() {
    assert!(AccessLevel::Developer < AccessLevel::Maintainer);
    assert!(AccessLevel::NoAccess < AccessLevel::Guest);
    assert_eq!(AccessLevel::Maintainer.to_string(), "Maintainer (40)");
}

#[test]
fn test_project_deserialization_ignores_extra_fields() {
    let json_str = r#"{
        "id": 7,
        "name": "ledger",
        "path_with_namespace": "acme/dev-backend/ledger",
        "default_branch": "main",
        "visibility": "private",
        "archived": false
    }"#;

    let project: Project = from_str(json_str).expect("Failed to deserialize Project");

    assert_eq!(project.id, 7);
    assert_eq!(project.path_with_namespace, "acme/dev-backend/ledger");
    assert_eq!(project.default_branch.as_deref(), Some("main"));
}

#[test]
fn test_project_without_default_branch() {
    let json_str = r#"{"id": 8, "path_with_namespace": "acme/empty"}"#;

    let project: Project = from_str(json_str).expect("Failed to deserialize Project");

    assert_eq!(project.name, "");
    assert_eq!(project.default_branch, None);
}

#[test]
fn test_protected_branch_merge_user_ids() {
    let json_str = r#"{
        "id": 11,
        "name": "PROD",
        "push_access_levels": [
            {"id": 1, "access_level": 30, "access_level_description": "Developers + Maintainers"}
        ],
        "merge_access_levels": [
            {"id": 2, "access_level": 40, "user_id": 101},
            {"id": 3, "access_level": 40, "user_id": 102},
            {"id": 4, "access_level": 40, "group_id": 9}
        ]
    }"#;

    let protected: ProtectedBranch =
        from_str(json_str).expect("Failed to deserialize ProtectedBranch");

    assert_eq!(protected.merge_user_ids(), vec![101, 102]);
    assert!(!protected.has_role_based_merge_access());
    assert!(!protected.allow_force_push);
}

#[test]
fn test_protected_branch_detects_role_based_merge() {
    let json_str = r#"{
        "id": 12,
        "name": "PROD",
        "merge_access_levels": [
            {"access_level": 40, "access_level_description": "Maintainers"}
        ]
    }"#;

    let protected: ProtectedBranch =
        from_str(json_str).expect("Failed to deserialize ProtectedBranch");

    assert!(protected.has_role_based_merge_access());
    assert!(protected.merge_user_ids().is_empty());
}

#[test]
fn test_role_entry_with_no_access_is_not_merge_capable() {
    let json_str = r#"{
        "id": 13,
        "name": "PROD",
        "merge_access_levels": [{"access_level": 0}]
    }"#;

    let protected: ProtectedBranch =
        from_str(json_str).expect("Failed to deserialize ProtectedBranch");

    assert!(!protected.has_role_based_merge_access());
}

#[test]
fn test_approval_rule_deserialization() {
    let json_str = r#"{
        "id": 55,
        "name": "PROD Merge Approval",
        "rule_type": "regular",
        "approvals_required": 1,
        "users": [{"id": 101, "username": "alice", "name": "Alice"}],
        "protected_branches": [{"id": 11, "name": "PROD"}]
    }"#;

    let rule: ApprovalRule = from_str(json_str).expect("Failed to deserialize ApprovalRule");

    assert_eq!(rule.id, 55);
    assert_eq!(rule.approvals_required, 1);
    assert_eq!(rule.users[0].username, "alice");
    assert_eq!(rule.protected_branches[0].id, 11);
}

#[test]
fn test_user_deserialization() {
    let json_str = r#"{
        "id": 404,
        "username": "contributor",
        "state": "active"
    }"#;

    let user: User = from_str(json_str).expect("Failed to deserialize User");

    assert_eq!(user.id, 404);
    assert_eq!(user.username, "contributor");
}
