use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::UnknownEnforcementError;

/// Default bound on one userinfo request.
pub const DEFAULT_PROFILE_TIMEOUT: Duration = Duration::from_secs(2);

/// Largest `Authorization` header accepted, in bytes.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// What to do when the token's audience does not include ours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudienceEnforcement {
    /// Reject the credential.
    #[default]
    Strict,
    /// Log the mismatch and accept the credential.
    Relaxed,
}

impl AudienceEnforcement {
    /// The configuration token for this setting.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AudienceEnforcement::Strict => "strict",
            AudienceEnforcement::Relaxed => "relaxed",
        }
    }
}

impl fmt::Display for AudienceEnforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudienceEnforcement {
    type Err = UnknownEnforcementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(AudienceEnforcement::Strict),
            "relaxed" => Ok(AudienceEnforcement::Relaxed),
            _ => Err(UnknownEnforcementError(s.to_string())),
        }
    }
}

/// Configuration for [`crate::CredentialVerifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Expected `iss` claim
    pub issuer: String,
    /// Expected `aud` claim
    pub audience: String,
    /// How an audience mismatch is handled (default: strict)
    pub audience_enforcement: AudienceEnforcement,
    /// PEM text of the trusted key, possibly with escaped line breaks
    pub public_key: Option<String>,
    /// Userinfo endpoint used to fill in missing profile fields
    pub profile_endpoint: Option<Url>,
    /// Bound on one userinfo request (default: 2 seconds)
    pub profile_timeout: Duration,
    /// Largest accepted credential header (default: 8 KiB)
    pub max_header_bytes: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            audience: String::new(),
            audience_enforcement: AudienceEnforcement::default(),
            public_key: None,
            profile_endpoint: None,
            profile_timeout: DEFAULT_PROFILE_TIMEOUT,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }
}

impl VerifierConfig {
    /// Create a configuration expecting `issuer` and `audience`.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            ..Default::default()
        }
    }

    /// Create a configuration for tokens issued by the identity provider
    /// tenant at `domain`.
    pub fn for_domain(domain: &str, audience: impl Into<String>) -> Self {
        Self::new(issuer_for_domain(domain), audience)
    }

    /// Set the trusted key
    pub fn with_public_key(mut self, pem: impl Into<String>) -> Self {
        self.public_key = Some(pem.into());
        self
    }

    /// Set the audience enforcement
    pub fn with_audience_enforcement(mut self, enforcement: AudienceEnforcement) -> Self {
        self.audience_enforcement = enforcement;
        self
    }

    /// Enable profile enrichment from `endpoint`
    pub fn with_profile_endpoint(mut self, endpoint: Url) -> Self {
        self.profile_endpoint = Some(endpoint);
        self
    }

    /// Set the userinfo request timeout
    pub fn with_profile_timeout(mut self, timeout: Duration) -> Self {
        self.profile_timeout = timeout;
        self
    }

    /// Set the largest accepted credential header
    pub fn with_max_header_bytes(mut self, limit: usize) -> Self {
        self.max_header_bytes = limit;
        self
    }
}

/// The issuer URL of the tenant at `domain`.
pub fn issuer_for_domain(domain: &str) -> String {
    format!("https://{}/", domain.trim_end_matches('/'))
}

/// The userinfo endpoint of the tenant at `domain`.
pub fn userinfo_endpoint_for_domain(domain: &str) -> Result<Url, url::ParseError> {
    Url::parse(&issuer_for_domain(domain))?.join("userinfo")
}
