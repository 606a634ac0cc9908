//! The access decision handed back to the gateway.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ResourceLocator;

/// Policy language version understood by the gateway.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The only action an authorizer statement grants or denies.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// A scalar forwarded to downstream handlers.
///
/// The gateway only forwards scalar context values, so nested values cannot
/// be expressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// A boolean.
    Boolean(bool),
    /// A whole number.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Boolean(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Integer(value)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Float(value)
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::String(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::String(value.to_string())
    }
}

/// Opaque key/value bag forwarded verbatim to the next stage.
pub type Context = BTreeMap<String, ContextValue>;

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Grants the action.
    Allow,
    /// Refuses the action, overriding any allow.
    Deny,
}

/// Outcome of a finished [`crate::PolicyBuilder`].
///
/// Always holds at least one statement. Deny statements win over allow
/// statements covering the same resource, and anything not covered by an
/// allow statement is implicitly denied.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessDecision {
    principal: String,
    allow: Vec<ResourceLocator>,
    deny: Vec<ResourceLocator>,
    context: Context,
}

impl AccessDecision {
    pub(crate) fn new(
        principal: String,
        allow: Vec<ResourceLocator>,
        deny: Vec<ResourceLocator>,
        context: Context,
    ) -> Self {
        Self {
            principal,
            allow,
            deny,
            context,
        }
    }

    /// Get the principal the decision was made for.
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Allowed locators, in the order they were added.
    pub fn allowed(&self) -> &[ResourceLocator] {
        &self.allow
    }

    /// Denied locators, in the order they were added.
    pub fn denied(&self) -> &[ResourceLocator] {
        &self.deny
    }

    /// Get the context forwarded to downstream handlers.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The explicit effect that applies to `locator`, if any.
    ///
    /// Returns `Some(Effect::Deny)` whenever a deny statement covers the
    /// locator, even if an allow statement covers it too.
    pub fn effect_for(&self, locator: &ResourceLocator) -> Option<Effect> {
        if self.deny.iter().any(|rule| rule.covers(locator)) {
            Some(Effect::Deny)
        } else if self.allow.iter().any(|rule| rule.covers(locator)) {
            Some(Effect::Allow)
        } else {
            None
        }
    }

    /// Whether a request for `locator` would be let through.
    pub fn permits(&self, locator: &ResourceLocator) -> bool {
        self.effect_for(locator) == Some(Effect::Allow)
    }

    /// Render the policy document: one statement per non-empty effect,
    /// allow first.
    pub fn policy_document(&self) -> PolicyDocument {
        let statement = [(Effect::Allow, &self.allow), (Effect::Deny, &self.deny)]
            .into_iter()
            .filter(|(_, resource)| !resource.is_empty())
            .map(|(effect, resource)| Statement {
                action: INVOKE_ACTION.to_string(),
                effect,
                resource: resource.clone(),
            })
            .collect();

        PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }

    /// Render the response body an authorizer returns to the gateway.
    pub fn to_response(&self) -> AuthorizerResponse {
        AuthorizerResponse {
            principal_id: self.principal.clone(),
            policy_document: self.policy_document(),
            context: self.context.clone(),
        }
    }
}

impl Serialize for AccessDecision {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_response().serialize(serializer)
    }
}

/// One policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Always [`INVOKE_ACTION`].
    pub action: String,
    /// Allow or deny.
    pub effect: Effect,
    /// Locators the statement applies to.
    pub resource: Vec<ResourceLocator>,
}

/// Policy document in the gateway's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Always [`POLICY_VERSION`].
    pub version: String,
    /// Allow statement first, then deny statement.
    pub statement: Vec<Statement>,
}

/// Authorizer response in the gateway's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    /// The principal the decision was made for.
    pub principal_id: String,
    /// The rendered policy.
    pub policy_document: PolicyDocument,
    /// Forwarded context.
    pub context: Context,
}
