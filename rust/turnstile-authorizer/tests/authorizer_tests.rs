//! End-to-end tests for the authorizer.
//!
//! Tokens are signed with the fixture key from `turnstile-credentials`, so
//! every test exercises real RS256 verification.

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use testresult::TestResult;
use turnstile_authorizer::{
    AuthorizationRequest, Authorizer, AuthorizerConfig, ErrorCode, gateway_context,
};
use turnstile_credentials::{
    AudienceEnforcement, CredentialVerifier,
    helpers::{TEST_AUDIENCE, TokenIssuer, test_claims, test_verifier_config},
};
use turnstile_policy::{
    ContextValue, HttpVerb, PermissionTable, ResourcePath, TargetResource, UnmatchedPermissions,
};

const METHOD_ARN: &str = "arn:aws:execute-api:us-east-1:123456789012:a1b2c3/dev/GET/resources";
const PREFIX: &str = "arn:aws:execute-api:us-east-1:123456789012:a1b2c3/dev";

fn authorizer() -> Authorizer {
    Authorizer::new(AuthorizerConfig::new(test_verifier_config())).expect("valid configuration")
}

fn claims_with(subject: &str, extra: Value) -> Value {
    let mut claims = test_claims(subject);
    if let (Some(claims), Some(extra)) = (claims.as_object_mut(), extra.as_object()) {
        claims.extend(extra.clone());
    }
    claims
}

fn request_for(claims: &Value, method_arn: &str) -> AuthorizationRequest {
    let token = TokenIssuer::new().sign(claims);
    AuthorizationRequest::new(Some(format!("Bearer {token}")), method_arn)
}

fn locator(verb: HttpVerb, path: &str) -> turnstile_policy::ResourceLocator {
    let path = ResourcePath::new(path).expect("valid path");
    TargetResource::parse_method_arn(METHOD_ARN)
        .expect("valid method ARN")
        .scope()
        .locator(verb, &path)
}

#[test_log::test(tokio::test)]
async fn it_grants_the_routes_of_the_callers_permissions() -> TestResult {
    let claims = claims_with("auth0|alice", json!({ "permissions": ["read:resources"] }));
    let decision = authorizer()
        .authorize(&request_for(&claims, METHOD_ARN))
        .await?;

    let delete = locator(HttpVerb::Delete, "/resource/17");
    assert_eq!(decision.principal(), "auth0|alice");
    assert!(decision.permits(&locator(HttpVerb::Get, "/resources")));
    assert!(decision.permits(&locator(HttpVerb::Get, "/auction/17")));
    assert!(!decision.permits(&delete));
    assert!(decision.denied().is_empty());
    Ok(())
}

#[tokio::test]
async fn scope_tokens_grant_routes_without_a_permissions_claim() -> TestResult {
    let claims = claims_with("auth0|alice", json!({ "scope": "openid create:resources" }));
    let decision = authorizer()
        .authorize(&request_for(&claims, METHOD_ARN))
        .await?;

    assert!(decision.permits(&locator(HttpVerb::Post, "/resource")));
    assert!(!decision.permits(&locator(HttpVerb::Get, "/resources")));
    Ok(())
}

#[tokio::test]
async fn callers_without_permissions_get_minimal_access() -> TestResult {
    let decision = authorizer()
        .authorize(&request_for(&test_claims("auth0|alice"), METHOD_ARN))
        .await?;

    let allowed: Vec<String> = decision
        .allowed()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        allowed,
        vec![
            format!("{PREFIX}/GET/health"),
            format!("{PREFIX}/GET/hello"),
        ]
    );
    assert!(!decision.permits(&locator(HttpVerb::Get, "/resources")));
    Ok(())
}

#[tokio::test]
async fn unmapped_permissions_are_denied_by_default() -> TestResult {
    let claims = claims_with("auth0|alice", json!({ "permissions": ["place:bids"] }));
    let decision = authorizer()
        .authorize(&request_for(&claims, METHOD_ARN))
        .await?;

    assert!(decision.allowed().is_empty());
    assert_eq!(decision.denied().len(), 1);
    assert_eq!(decision.denied()[0].as_str(), format!("{PREFIX}/*/*"));
    Ok(())
}

#[tokio::test]
async fn the_unmatched_policy_is_configurable() -> TestResult {
    let config = AuthorizerConfig::new(test_verifier_config())
        .with_unmatched_permissions(UnmatchedPermissions::MinimalAccess);
    let claims = claims_with("auth0|alice", json!({ "permissions": ["place:bids"] }));
    let decision = Authorizer::new(config)?
        .authorize(&request_for(&claims, METHOD_ARN))
        .await?;

    assert!(decision.denied().is_empty());
    assert!(decision.permits(&locator(HttpVerb::Get, "/health")));
    Ok(())
}

#[tokio::test]
async fn custom_tables_replace_the_standard_mapping() -> TestResult {
    let table = PermissionTable::new().with_routes("read:items", [(HttpVerb::Get, "/items")])?;
    let authorizer = authorizer().with_permission_table(table);

    let claims = claims_with("auth0|alice", json!({ "permissions": ["read:items"] }));
    let decision = authorizer
        .authorize(&request_for(&claims, METHOD_ARN))
        .await?;

    assert!(decision.permits(&locator(HttpVerb::Get, "/items")));
    assert!(!decision.permits(&locator(HttpVerb::Get, "/resources")));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn failures_are_opaque() -> TestResult {
    let authorizer = authorizer();

    let missing = AuthorizationRequest::new(None, METHOD_ARN);
    let rejection = authorizer.authorize(&missing).await.unwrap_err();
    assert_eq!(rejection.to_string(), "Unauthorized");
    assert_eq!(rejection.code(), ErrorCode::MissingCredential);

    let forged = TokenIssuer::generate().sign(&test_claims("auth0|mallory"));
    let request = AuthorizationRequest::new(Some(format!("Bearer {forged}")), METHOD_ARN);
    let rejection = authorizer.authorize(&request).await.unwrap_err();
    assert_eq!(rejection.to_string(), "Unauthorized");
    assert_eq!(rejection.code(), ErrorCode::SignatureInvalid);

    let expired = claims_with("auth0|alice", json!({ "exp": 1 }));
    let rejection = authorizer
        .authorize(&request_for(&expired, METHOD_ARN))
        .await
        .unwrap_err();
    assert_eq!(rejection.code(), ErrorCode::CredentialExpired);

    let rejection = authorizer
        .authorize(&request_for(&test_claims("auth0|alice"), "not-an-arn"))
        .await
        .unwrap_err();
    assert_eq!(rejection.to_string(), "Unauthorized");
    assert_eq!(rejection.code(), ErrorCode::MalformedResource);
    Ok(())
}

#[tokio::test]
async fn audience_lists_pass_in_both_modes() -> TestResult {
    let claims = claims_with(
        "auth0|alice",
        json!({ "aud": ["https://tenant.turnstile.test/userinfo", TEST_AUDIENCE] }),
    );

    for enforcement in [AudienceEnforcement::Strict, AudienceEnforcement::Relaxed] {
        let config = test_verifier_config().with_audience_enforcement(enforcement);
        let verifier = CredentialVerifier::new(config)?;
        let decision = authorizer()
            .with_verifier(verifier)
            .authorize(&request_for(&claims, METHOD_ARN))
            .await?;
        assert_eq!(decision.principal(), "auth0|alice");
    }
    Ok(())
}

#[tokio::test]
async fn it_answers_gateway_events_with_a_policy_document() -> TestResult {
    let token = TokenIssuer::new().sign(&claims_with(
        "auth0|alice",
        json!({
            "scope": "read:resources",
            "permissions": ["delete:resources", "admin:all"],
            "email": "alice@example.com",
        }),
    ));
    let event = json!({
        "type": "TOKEN",
        "authorizationToken": format!("Bearer {token}"),
        "methodArn": METHOD_ARN,
    });

    let request: AuthorizationRequest = serde_json::from_value(event)?;
    let decision = authorizer().authorize(&request).await?;

    assert_eq!(
        serde_json::to_value(&decision)?,
        json!({
            "principalId": "auth0|alice",
            "policyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Action": "execute-api:Invoke",
                    "Effect": "Allow",
                    "Resource": [format!("{PREFIX}/DELETE/resource/*")],
                }],
            },
            "context": {
                "userId": "auth0|alice",
                "scope": "read:resources",
                "email": "alice@example.com",
                "isAdmin": true,
            },
        })
    );
    Ok(())
}

#[test]
fn the_context_describes_the_caller() -> TestResult {
    let token = TokenIssuer::new().sign(&claims_with("auth0|bob", json!({ "name": "Bob" })));
    let claims = CredentialVerifier::new(test_verifier_config())?.verify_token(&token)?;
    let context = gateway_context(&claims);

    assert_eq!(
        context.get("userId"),
        Some(&ContextValue::from("auth0|bob"))
    );
    assert_eq!(context.get("scope"), Some(&ContextValue::from("")));
    assert_eq!(context.get("name"), Some(&ContextValue::from("Bob")));
    assert_eq!(context.get("email"), None);
    assert_eq!(context.get("isAdmin"), Some(&ContextValue::Boolean(false)));
    Ok(())
}

#[test]
fn admin_status_comes_from_the_permissions_claim_only() -> TestResult {
    let verifier = CredentialVerifier::new(test_verifier_config())?;
    let issuer = TokenIssuer::new();

    let scoped = issuer.sign(&claims_with(
        "auth0|carol",
        json!({ "scope": "openid admin:all" }),
    ));
    let context = gateway_context(&verifier.verify_token(&scoped)?);
    assert_eq!(context.get("isAdmin"), Some(&ContextValue::Boolean(false)));

    let granted = issuer.sign(&claims_with(
        "auth0|carol",
        json!({ "permissions": ["admin:all"] }),
    ));
    let context = gateway_context(&verifier.verify_token(&granted)?);
    assert_eq!(context.get("isAdmin"), Some(&ContextValue::Boolean(true)));
    Ok(())
}
