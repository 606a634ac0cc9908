use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use turnstile_credentials::{Claims, CredentialVerifier};
use turnstile_policy::{
    AccessDecision, Context, ContextValue, Permission, PermissionTable, PolicyBuilder,
    TargetResource, UnmatchedPermissions,
};

use crate::{AuthorizerConfig, ConfigError, Rejection};

/// A TOKEN authorizer event, as delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    /// Event type, `TOKEN` for token authorizers
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Raw `Authorization` header value
    #[serde(default)]
    pub authorization_token: Option<String>,
    /// ARN of the method being invoked
    pub method_arn: String,
}

impl AuthorizationRequest {
    /// Create a request for `method_arn` carrying `authorization_token`.
    pub fn new(authorization_token: Option<String>, method_arn: impl Into<String>) -> Self {
        Self {
            kind: Some("TOKEN".to_string()),
            authorization_token,
            method_arn: method_arn.into(),
        }
    }
}

/// Turns inbound requests into access decisions.
///
/// The authorizer holds only read-only state and can serve concurrent
/// requests. Every request gets its own claims and its own policy builder.
#[derive(Debug, Clone)]
pub struct Authorizer {
    verifier: CredentialVerifier,
    table: Cow<'static, PermissionTable>,
    unmatched: UnmatchedPermissions,
}

impl Authorizer {
    /// Create an authorizer using the standard permission table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Credential`] if the configured key cannot be
    /// read.
    pub fn new(config: AuthorizerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            verifier: CredentialVerifier::new(config.verifier)?,
            table: Cow::Borrowed(PermissionTable::standard()),
            unmatched: config.unmatched_permissions,
        })
    }

    /// Create an authorizer configured from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the environment holds an invalid
    /// setting or an unreadable key.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(AuthorizerConfig::from_env()?)
    }

    /// Replace the credential verifier.
    pub fn with_verifier(mut self, verifier: CredentialVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Replace the permission table.
    pub fn with_permission_table(mut self, table: PermissionTable) -> Self {
        self.table = Cow::Owned(table);
        self
    }

    /// Get the permission table.
    pub fn permission_table(&self) -> &PermissionTable {
        &self.table
    }

    /// Decide whether the caller of `request` may invoke the method.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] when the method ARN is malformed or the
    /// credential does not verify. The cause is logged; the rejection
    /// itself only says `Unauthorized`.
    pub async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AccessDecision, Rejection> {
        let result = self.decide(request).await;
        if let Err(rejection) = &result {
            warn!(
                code = ?rejection.code(),
                detail = rejection.detail(),
                method_arn = %request.method_arn,
                "Request rejected"
            );
        }
        result
    }

    async fn decide(&self, request: &AuthorizationRequest) -> Result<AccessDecision, Rejection> {
        let target = TargetResource::parse_method_arn(&request.method_arn)?;
        let claims = self
            .verifier
            .verify(request.authorization_token.as_deref())
            .await?;

        let permissions = claims.permissions();
        let mut builder = PolicyBuilder::for_target(claims.subject(), &target)
            .with_unmatched_permissions(self.unmatched);
        builder.apply_permissions(&permissions, &self.table);

        let decision = builder.finalize_with_context(gateway_context(&claims))?;
        info!(
            principal = decision.principal(),
            allowed = decision.allowed().len(),
            denied = decision.denied().len(),
            permitted = decision.permits(&target.locator()),
            "Access decision issued"
        );
        Ok(decision)
    }
}

/// The context forwarded to downstream handlers for a verified caller.
///
/// Carries `userId`, `scope` (empty when absent), `email` and `name` when
/// known, and `isAdmin`. Only an explicit `permissions` claim can make a
/// caller an admin; `scope` tokens never do.
pub fn gateway_context(claims: &Claims) -> Context {
    let mut context = Context::new();
    context.insert("userId".into(), claims.subject().into());
    context.insert("scope".into(), claims.scope().unwrap_or_default().into());
    if let Some(email) = claims.email() {
        context.insert("email".into(), email.into());
    }
    if let Some(name) = claims.name() {
        context.insert("name".into(), name.into());
    }
    let admin = Permission::AdminAll.as_str();
    let is_admin = claims
        .permissions_claim()
        .is_some_and(|permissions| permissions.iter().any(|p| p == admin));
    context.insert("isAdmin".into(), ContextValue::Boolean(is_admin));
    context
}
