use std::env;

use turnstile_credentials::{AudienceEnforcement, VerifierConfig, userinfo_endpoint_for_domain};
use turnstile_policy::UnmatchedPermissions;

use crate::ConfigError;

/// Tenant domain of the identity provider.
pub const DOMAIN_VAR: &str = "AUTH0_DOMAIN";
/// Audience the credentials must be addressed to.
pub const AUDIENCE_VAR: &str = "AUTH0_AUDIENCE";
/// PEM text of the trusted key.
pub const PUBLIC_KEY_VAR: &str = "AUTH0_PUBLIC_KEY";
/// `strict` or `relaxed`.
pub const AUDIENCE_ENFORCEMENT_VAR: &str = "AUTH0_AUDIENCE_ENFORCEMENT";
/// `deny-all`, `minimal-access` or `allow-all`.
pub const UNMATCHED_PERMISSIONS_VAR: &str = "AUTHORIZER_UNMATCHED_PERMISSIONS";
/// `true` to fetch missing profile fields from the userinfo endpoint.
pub const PROFILE_ENRICHMENT_VAR: &str = "AUTH0_PROFILE_ENRICHMENT";

/// Configuration for [`crate::Authorizer`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizerConfig {
    /// Credential verification settings
    pub verifier: VerifierConfig,
    /// What to grant when none of the caller's permissions is mapped
    /// (default: deny all)
    pub unmatched_permissions: UnmatchedPermissions,
}

impl AuthorizerConfig {
    /// Create a configuration from verifier settings.
    pub fn new(verifier: VerifierConfig) -> Self {
        Self {
            verifier,
            unmatched_permissions: UnmatchedPermissions::default(),
        }
    }

    /// Set the unmatched-permissions policy
    pub fn with_unmatched_permissions(mut self, unmatched: UnmatchedPermissions) -> Self {
        self.unmatched_permissions = unmatched;
        self
    }

    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a setting has an unknown value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// Unset and blank variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a setting has an unknown value, or if
    /// profile enrichment is enabled without a domain.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let domain = read(DOMAIN_VAR).unwrap_or_default();
        let audience = read(AUDIENCE_VAR).unwrap_or_default();
        let mut verifier = VerifierConfig::for_domain(domain.trim(), audience.trim());

        if let Some(pem) = read(PUBLIC_KEY_VAR) {
            verifier = verifier.with_public_key(pem);
        }

        if let Some(value) = read(AUDIENCE_ENFORCEMENT_VAR) {
            let enforcement: AudienceEnforcement =
                value.parse().map_err(|error| ConfigError::InvalidSetting {
                    name: AUDIENCE_ENFORCEMENT_VAR,
                    reason: format!("{error}"),
                })?;
            verifier = verifier.with_audience_enforcement(enforcement);
        }

        let enrichment = match read(PROFILE_ENRICHMENT_VAR) {
            Some(value) => parse_flag(&value).ok_or_else(|| ConfigError::InvalidSetting {
                name: PROFILE_ENRICHMENT_VAR,
                reason: format!("Unknown flag '{}', expected true or false", value.trim()),
            })?,
            None => false,
        };
        if enrichment {
            if domain.trim().is_empty() {
                return Err(ConfigError::MissingDomain);
            }
            let endpoint = userinfo_endpoint_for_domain(domain.trim()).map_err(|error| {
                ConfigError::InvalidSetting {
                    name: DOMAIN_VAR,
                    reason: error.to_string(),
                }
            })?;
            verifier = verifier.with_profile_endpoint(endpoint);
        }

        let unmatched_permissions = match read(UNMATCHED_PERMISSIONS_VAR) {
            Some(value) => value.parse().map_err(|error| ConfigError::InvalidSetting {
                name: UNMATCHED_PERMISSIONS_VAR,
                reason: format!("{error}"),
            })?,
            None => UnmatchedPermissions::default(),
        };

        Ok(Self {
            verifier,
            unmatched_permissions,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
