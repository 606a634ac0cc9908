//! Rejections returned to the gateway.
//!
//! Every failure collapses into one opaque [`Rejection`]. Its display form
//! is always `Unauthorized`; the [`ErrorCode`] and detail message exist for
//! server-side logs only.

use std::fmt;

use serde::Serialize;
use turnstile_credentials::CredentialError;
use turnstile_policy::{EmptyDecisionError, ResourceError};

/// Classification of a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Credential presentation
    /// No credential, or not a bearer credential
    MissingCredential,
    /// Credential header too large
    CredentialTooLarge,
    /// Token could not be decoded
    MalformedCredential,
    /// Algorithm other than RS256
    UnsupportedAlgorithm,

    // Credential validity
    /// Signature verification failed
    SignatureInvalid,
    /// Token has no subject
    SubjectMissing,
    /// Issuer does not match
    IssuerMismatch,
    /// Audience does not match
    AudienceMismatch,
    /// Token has expired
    CredentialExpired,
    /// Token is not valid yet
    CredentialNotYetValid,

    // Request
    /// Method ARN could not be parsed
    MalformedResource,

    // Deployment
    /// Trusted key missing or unreadable
    KeyUnavailable,
    /// Internal error
    InternalError,
}

/// An opaque authorization failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    code: ErrorCode,
    detail: String,
}

impl Rejection {
    /// Create a rejection.
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// Get the classification, for logs.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the detail message, for logs.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unauthorized")
    }
}

impl std::error::Error for Rejection {}

impl From<CredentialError> for Rejection {
    fn from(error: CredentialError) -> Self {
        let code = match &error {
            CredentialError::MissingCredential | CredentialError::UnsupportedScheme => {
                ErrorCode::MissingCredential
            }
            CredentialError::HeaderTooLarge { .. } => ErrorCode::CredentialTooLarge,
            CredentialError::Malformed(_) => ErrorCode::MalformedCredential,
            CredentialError::UnsupportedAlgorithm(_) => ErrorCode::UnsupportedAlgorithm,
            CredentialError::InvalidSignature => ErrorCode::SignatureInvalid,
            CredentialError::MissingSubject => ErrorCode::SubjectMissing,
            CredentialError::IssuerMismatch { .. } => ErrorCode::IssuerMismatch,
            CredentialError::AudienceMismatch { .. } => ErrorCode::AudienceMismatch,
            CredentialError::Expired => ErrorCode::CredentialExpired,
            CredentialError::NotYetValid => ErrorCode::CredentialNotYetValid,
            CredentialError::MissingKey | CredentialError::InvalidKey(_) => {
                ErrorCode::KeyUnavailable
            }
        };
        Rejection::new(code, error.to_string())
    }
}

impl From<ResourceError> for Rejection {
    fn from(error: ResourceError) -> Self {
        Rejection::new(ErrorCode::MalformedResource, error.to_string())
    }
}

impl From<EmptyDecisionError> for Rejection {
    fn from(error: EmptyDecisionError) -> Self {
        Rejection::new(ErrorCode::InternalError, error.to_string())
    }
}

/// The authorizer could not be configured.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A setting has a value outside of its accepted set.
    #[error("Invalid value for {name}: {reason}")]
    InvalidSetting {
        /// Name of the setting
        name: &'static str,
        /// Why the value was refused
        reason: String,
    },

    /// Profile enrichment was requested without a tenant domain.
    #[error("Profile enrichment requires AUTH0_DOMAIN")]
    MissingDomain,

    /// The configured key could not be read.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}
