//! The canonical claim set carried by a verified credential.

use serde::{Deserialize, Serialize};

/// The `aud` claim: either one audience or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience.
    One(String),
    /// Several audiences.
    Many(Vec<String>),
}

impl Audience {
    /// Whether `expected` is this audience or one of them.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::One(audience) => audience == expected,
            Audience::Many(audiences) => audiences.iter().any(|audience| audience == expected),
        }
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Audience::One(audience) => f.write_str(audience),
            Audience::Many(audiences) => write!(f, "[{}]", audiences.join(", ")),
        }
    }
}

/// Claims of a verified credential.
///
/// Produced only by [`crate::CredentialVerifier`] and immutable afterwards.
/// Claims serialize, but cannot be deserialized outside this crate:
///
/// ```compile_fail
/// let claims: turnstile_credentials::Claims =
///     serde_json::from_str(r#"{"sub":"auth0|1","iss":"https://tenant/","exp":10}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Claims {
    payload: Payload,
}

/// The decoded JWT payload, before it has been checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Payload {
    #[serde(rename = "sub", default)]
    subject: String,
    #[serde(rename = "iss", default)]
    issuer: String,
    #[serde(rename = "aud", default, skip_serializing_if = "Option::is_none")]
    audience: Option<Audience>,
    #[serde(rename = "exp")]
    expires_at: u64,
    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    issued_at: Option<u64>,
    #[serde(rename = "nbf", default, skip_serializing_if = "Option::is_none")]
    not_before: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl Claims {
    pub(crate) fn from_payload(payload: Payload) -> Self {
        Self { payload }
    }

    /// Get the subject (`sub`).
    pub fn subject(&self) -> &str {
        &self.payload.subject
    }

    /// Get the issuer (`iss`).
    pub fn issuer(&self) -> &str {
        &self.payload.issuer
    }

    /// Get the audience (`aud`), if any.
    pub fn audience(&self) -> Option<&Audience> {
        self.payload.audience.as_ref()
    }

    /// Expiry in unix seconds (`exp`).
    pub fn expires_at(&self) -> u64 {
        self.payload.expires_at
    }

    /// Issue time in unix seconds (`iat`), if any.
    pub fn issued_at(&self) -> Option<u64> {
        self.payload.issued_at
    }

    /// Start of validity in unix seconds (`nbf`), if any.
    pub fn not_before(&self) -> Option<u64> {
        self.payload.not_before
    }

    /// The raw space-delimited `scope` claim, if any.
    pub fn scope(&self) -> Option<&str> {
        self.payload.scope.as_deref()
    }

    /// Get the email profile field, if known.
    pub fn email(&self) -> Option<&str> {
        self.payload.email.as_deref()
    }

    /// Get the name profile field, if known.
    pub fn name(&self) -> Option<&str> {
        self.payload.name.as_deref()
    }

    /// The explicit `permissions` claim, if the credential carries one.
    pub fn permissions_claim(&self) -> Option<&[String]> {
        self.payload.permissions.as_deref()
    }

    /// Tokens of the `scope` claim.
    pub fn scopes(&self) -> Vec<String> {
        self.payload
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(String::from)
            .collect()
    }

    /// Effective permission tokens.
    ///
    /// An explicit `permissions` claim wins over the `scope` claim, even
    /// when it is empty.
    pub fn permissions(&self) -> Vec<String> {
        match &self.payload.permissions {
            Some(permissions) => permissions.clone(),
            None => self.scopes(),
        }
    }

    /// Whether the effective permissions include `token`.
    pub fn has_permission(&self, token: &str) -> bool {
        match &self.payload.permissions {
            Some(permissions) => permissions.iter().any(|permission| permission == token),
            None => self.scopes().iter().any(|permission| permission == token),
        }
    }

    /// The identity and grants of the caller.
    pub fn user_info(&self) -> UserInfo {
        UserInfo {
            user_id: self.payload.subject.clone(),
            permissions: self.permissions(),
            scopes: self.scopes(),
        }
    }

    pub(crate) fn needs_profile(&self) -> bool {
        self.payload.email.is_none() || self.payload.name.is_none()
    }

    /// Fill in profile fields the token itself did not carry.
    pub(crate) fn with_profile(mut self, profile: Profile) -> Self {
        self.payload.email = self.payload.email.or(profile.email);
        self.payload.name = self.payload.name.or(profile.name);
        self
    }
}

/// Optional profile fields returned by the userinfo endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Identity and grants of a verified caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// The subject of the credential.
    pub user_id: String,
    /// Effective permission tokens.
    pub permissions: Vec<String>,
    /// Tokens of the `scope` claim.
    pub scopes: Vec<String>,
}

impl UserInfo {
    /// Whether `token` is among the effective permissions.
    pub fn has_permission(&self, token: &str) -> bool {
        self.permissions.iter().any(|granted| granted == token)
    }
}
