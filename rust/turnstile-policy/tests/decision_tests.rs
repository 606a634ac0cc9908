//! Integration tests for building access decisions from permission tokens.

use turnstile_policy::{
    AccessDecision, ApiScope, Effect, EmptyDecisionError, HttpVerb, InvalidRuleError,
    PermissionTable, PolicyBuilder, ResourceLocator, ResourcePath, TargetResource,
    UnmatchedPermissions,
};

use pretty_assertions::assert_eq;
use testresult::TestResult;

const PREFIX: &str = "arn:aws:execute-api:us-east-1:123456789012:a1b2c3/dev";
const METHOD_ARN: &str = "arn:aws:execute-api:us-east-1:123456789012:a1b2c3/dev/GET/items";

fn target() -> TargetResource {
    TargetResource::parse_method_arn(METHOD_ARN).expect("valid method ARN")
}

/// A table where `read:items` unlocks `GET /items` and `GET /item/*`.
fn items_table() -> PermissionTable {
    PermissionTable::new()
        .with_routes(
            "read:items",
            [(HttpVerb::Get, "/items"), (HttpVerb::Get, "/item/*")],
        )
        .expect("valid routes")
}

fn strings(locators: &[ResourceLocator]) -> Vec<String> {
    locators.iter().map(ToString::to_string).collect()
}

fn locator(verb: HttpVerb, path: &str) -> ResourceLocator {
    let path = ResourcePath::new(path).expect("valid path");
    target().scope().locator(verb, &path)
}

#[test_log::test]
fn it_grants_exactly_the_mapped_routes_when_unmatched_tokens_fail_closed() -> TestResult {
    for unmatched in [
        UnmatchedPermissions::DenyAll,
        UnmatchedPermissions::MinimalAccess,
    ] {
        let mut builder =
            PolicyBuilder::for_target("user-1", &target()).with_unmatched_permissions(unmatched);
        builder.apply_permissions(&["read:items"], &items_table());
        let decision = builder.finalize()?;

        assert_eq!(
            strings(decision.allowed()),
            vec![
                format!("{PREFIX}/GET/items"),
                format!("{PREFIX}/GET/item/*"),
            ],
            "{unmatched}"
        );
        assert!(decision.denied().is_empty(), "{unmatched}");
    }
    Ok(())
}

#[test_log::test]
fn the_legacy_blanket_rule_adds_allow_all() -> TestResult {
    let mut builder = PolicyBuilder::for_target("user-1", &target())
        .with_unmatched_permissions(UnmatchedPermissions::AllowAll);
    builder.apply_permissions(&["read:items"], &items_table());
    let decision = builder.finalize()?;

    assert_eq!(
        strings(decision.allowed()),
        vec![
            format!("{PREFIX}/GET/items"),
            format!("{PREFIX}/GET/item/*"),
            format!("{PREFIX}/*/*"),
        ]
    );
    assert!(decision.permits(&locator(HttpVerb::Delete, "/item/7")));
    Ok(())
}

#[test_log::test]
fn no_permissions_fall_back_to_minimal_access() -> TestResult {
    let permissions: Vec<String> = "".split_whitespace().map(String::from).collect();

    let mut builder = PolicyBuilder::for_target("user-1", &target());
    builder.apply_permissions(&permissions, PermissionTable::standard());
    let decision = builder.finalize()?;

    assert_eq!(
        strings(decision.allowed()),
        vec![
            format!("{PREFIX}/GET/health"),
            format!("{PREFIX}/GET/hello"),
        ]
    );
    assert!(decision.denied().is_empty());
    assert_eq!(decision.policy_document().statement.len(), 1);
    Ok(())
}

#[test]
fn a_malformed_path_aborts_construction() {
    let mut builder = PolicyBuilder::for_target("user-1", &target());
    let result = builder
        .allow_method(HttpVerb::Get, "items;drop")
        .map(|_| ());
    assert_eq!(
        result,
        Err(InvalidRuleError::Path("items;drop".to_string()))
    );
    assert!(!builder.has_explicit_rules());
}

#[test_log::test]
fn unknown_tokens_deny_everything_by_default() -> TestResult {
    let mut builder = PolicyBuilder::for_target("user-1", &target());
    builder.apply_permissions(&["place:bids"], PermissionTable::standard());
    let decision = builder.finalize()?;

    assert!(decision.allowed().is_empty());
    assert_eq!(strings(decision.denied()), vec![format!("{PREFIX}/*/*")]);
    assert!(!decision.permits(&target().locator()));
    Ok(())
}

#[test_log::test]
fn unknown_tokens_can_grant_minimal_access() -> TestResult {
    let mut builder = PolicyBuilder::for_target("user-1", &target())
        .with_unmatched_permissions(UnmatchedPermissions::MinimalAccess);
    builder.apply_permissions(
        &["place:bids", "write:auctions"],
        PermissionTable::standard(),
    );
    assert!(!builder.has_explicit_rules());
    let decision = builder.finalize()?;

    assert_eq!(
        strings(decision.allowed()),
        vec![
            format!("{PREFIX}/GET/health"),
            format!("{PREFIX}/GET/hello"),
        ]
    );
    Ok(())
}

#[test]
fn deny_rules_override_mapped_grants() -> TestResult {
    let mut builder = PolicyBuilder::for_target("user-1", &target());
    builder
        .apply_permissions(
            &["read:resources", "delete:resources"],
            PermissionTable::standard(),
        )
        .deny_method(HttpVerb::Delete, "/resource/*")?;
    let decision = builder.finalize()?;

    let mapped = locator(HttpVerb::Delete, "/resource/*");
    let delete = locator(HttpVerb::Delete, "/resource/42");
    assert!(decision.allowed().contains(&mapped));
    assert_eq!(decision.effect_for(&delete), Some(Effect::Deny));
    assert!(decision.permits(&locator(HttpVerb::Get, "/resource/42")));
    assert!(!decision.permits(&locator(HttpVerb::Post, "/resource")));
    Ok(())
}

#[test]
fn permission_order_and_repetition_do_not_change_the_grant() -> TestResult {
    fn build(permissions: &[&str]) -> Result<AccessDecision, EmptyDecisionError> {
        let mut builder = PolicyBuilder::new("user-1", ApiScope::any());
        builder.apply_permissions(permissions, PermissionTable::standard());
        builder.finalize()
    }

    let forward = build(&["read:resources", "update:resources"])?;
    let backward = build(&["update:resources", "read:resources", "update:resources"])?;

    let mut forward = strings(forward.allowed());
    let mut backward = strings(backward.allowed());
    forward.sort();
    backward.sort();
    assert_eq!(forward, backward);
    assert_eq!(forward.len(), 7);
    Ok(())
}

#[test]
fn it_scopes_rules_to_the_requested_deployment() -> TestResult {
    let arn = "arn:aws:execute-api:eu-west-1:42:xyz/prod/POST/resource";
    let target: TargetResource = arn.parse()?;
    let mut builder = PolicyBuilder::for_target("user-1", &target);
    builder.apply_permissions(&["create:resources"], PermissionTable::standard());
    let decision = builder.finalize()?;

    assert!(decision.permits(&target.locator()));
    assert_eq!(
        strings(decision.allowed()),
        vec![
            "arn:aws:execute-api:eu-west-1:42:xyz/prod/POST/resource".to_string(),
            "arn:aws:execute-api:eu-west-1:42:xyz/prod/POST/auction".to_string(),
        ]
    );
    Ok(())
}
