use super::*;

fn approval(name: &str, approvers: &[&str]) -> ApprovalPolicy {
    ApprovalPolicy {
        name: name.to_string(),
        approvals_required: 1,
        approver_usernames: approvers.iter().map(|u| u.to_string()).collect(),
    }
}

#[test]
fn test_new_policy_defaults() {
    let policy = DesiredPolicy::new("PROD");

    assert_eq!(policy.branch_name, "PROD");
    assert_eq!(policy.push_access_level, AccessLevel::Developer);
    assert_eq!(policy.merge_grant_access_level, AccessLevel::Maintainer);
    assert!(policy.merge_allowed_users.is_empty());
    assert!(!policy.allow_force_push);
    assert!(policy.approval_rule.is_none());
    assert!(policy.validate().is_ok());
}

#[test]
fn test_validate_rejects_empty_branch() {
    let policy = DesiredPolicy::new("  ");

    assert!(matches!(policy.validate(), Err(Error::InvalidPolicy(_))));
}

#[test]
fn test_validate_rejects_push_level_outside_developer_and_maintainer() {
    let policy = DesiredPolicy {
        push_access_level: AccessLevel::Reporter,
        ..DesiredPolicy::new("PROD")
    };

    let err = policy.validate().unwrap_err();
    assert!(err.to_string().contains("push access level"));
}

#[test]
fn test_validate_rejects_grant_tier_below_developer() {
    let policy = DesiredPolicy {
        merge_grant_access_level: AccessLevel::NoAccess,
        ..DesiredPolicy::new("PROD")
    };

    let err = policy.validate().unwrap_err();
    assert!(err.to_string().contains("merge grant access level"));
}

#[test]
fn test_validate_rejects_unnamed_approval_rule() {
    let policy = DesiredPolicy {
        approval_rule: Some(approval("", &["alice"])),
        ..DesiredPolicy::new("PROD")
    };

    assert!(matches!(policy.validate(), Err(Error::InvalidPolicy(_))));
}

#[test]
fn test_referenced_usernames_lists_merge_users_then_approvers() {
    let policy = DesiredPolicy {
        merge_allowed_users: vec!["alice".to_string(), "bob".to_string()],
        approval_rule: Some(approval("PROD Merge Approval", &["carol", "alice"])),
        ..DesiredPolicy::new("PROD")
    };

    assert_eq!(
        policy.referenced_usernames(),
        vec!["alice", "bob", "carol", "alice"]
    );
}

#[test]
fn test_protect_payload_disables_role_based_merge() {
    let policy = DesiredPolicy {
        merge_allowed_users: vec!["alice".to_string(), "bob".to_string()],
        ..DesiredPolicy::new("PROD")
    };

    let payload = policy.protect_payload(&[101, 102]);

    assert_eq!(payload.name, "PROD");
    assert_eq!(payload.push_access_level, AccessLevel::Developer);
    assert_eq!(payload.merge_access_level, AccessLevel::NoAccess);
    assert_eq!(
        payload.allowed_to_merge,
        vec![
            MergeAccessGrant {
                user_id: 101,
                access_level: AccessLevel::Maintainer
            },
            MergeAccessGrant {
                user_id: 102,
                access_level: AccessLevel::Maintainer
            },
        ]
    );
}

#[test]
fn test_protect_payload_sends_user_grants_as_allowed_to_merge() {
    let policy = DesiredPolicy {
        merge_allowed_users: vec!["alice".to_string(), "bob".to_string()],
        ..DesiredPolicy::new("PROD")
    };

    let body = serde_json::to_value(policy.protect_payload(&[101, 102]))
        .expect("Failed to serialize payload");

    assert_eq!(
        body["allowed_to_merge"],
        serde_json::json!([
            {"user_id": 101, "access_level": 40},
            {"user_id": 102, "access_level": 40}
        ])
    );
    assert!(body.get("merge_access_levels").is_none());
    assert_eq!(body["merge_access_level"], 0);
}

#[test]
fn test_protect_payload_uses_configured_grant_tier() {
    let policy = DesiredPolicy {
        push_access_level: AccessLevel::Maintainer,
        merge_grant_access_level: AccessLevel::Developer,
        allow_force_push: true,
        code_owner_approval_required: true,
        ..DesiredPolicy::new("PROD")
    };

    let payload = policy.protect_payload(&[7]);

    assert_eq!(payload.push_access_level, AccessLevel::Maintainer);
    assert_eq!(payload.allowed_to_merge[0].access_level, AccessLevel::Developer);
    assert!(payload.allow_force_push);
    assert!(payload.code_owner_approval_required);
}

#[test]
fn test_execution_mode_from_flag() {
    assert_eq!(ExecutionMode::from_apply_flag(true), ExecutionMode::Apply);
    assert_eq!(ExecutionMode::from_apply_flag(false), ExecutionMode::DryRun);
    assert!(ExecutionMode::DryRun.is_dry_run());
    assert_eq!(ExecutionMode::DryRun.to_string(), "dry run");
}
