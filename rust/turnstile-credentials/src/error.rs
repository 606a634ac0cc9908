//! Error types for credential verification.

use thiserror::Error;

/// Errors that can occur while verifying a bearer credential.
///
/// Every variant is fatal for the request being authorized. None of them is
/// meant to be shown to the caller; see the authorizer's rejection type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// No credential was supplied, or it was empty.
    #[error("No credential was supplied")]
    MissingCredential,

    /// The credential does not use the `Bearer` scheme.
    #[error("Credential does not use the Bearer scheme")]
    UnsupportedScheme,

    /// The credential header exceeds the accepted size.
    #[error("Credential is {size} bytes, limit is {limit}")]
    HeaderTooLarge {
        /// Size of the supplied header
        size: usize,
        /// Largest accepted header
        limit: usize,
    },

    /// No trusted key is configured.
    #[error("No trusted signing key is configured")]
    MissingKey,

    /// The configured key material could not be read.
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// The token is not a well-formed JWT.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The token is signed with an algorithm other than RS256.
    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature does not validate against the trusted key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The claim set has no subject.
    #[error("Token has no subject")]
    MissingSubject,

    /// The token was issued by someone else.
    #[error("Issuer mismatch: expected {expected}, got {got}")]
    IssuerMismatch {
        /// Configured issuer
        expected: String,
        /// Issuer found in the token
        got: String,
    },

    /// The token is addressed to another audience.
    #[error("Audience mismatch: expected {expected}, got {got}")]
    AudienceMismatch {
        /// Configured audience
        expected: String,
        /// Audience found in the token
        got: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token is not valid yet (`nbf` is in the future).
    #[error("Token not yet valid")]
    NotYetValid,
}

/// Failure to fetch profile fields from the userinfo endpoint.
///
/// Enrichment is best effort: these errors are logged and never fail
/// verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileEnrichmentError {
    /// The endpoint could not be reached or timed out.
    #[error("Profile request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("Profile endpoint returned status {0}")]
    Status(u16),

    /// The response body was not a profile document.
    #[error("Failed to decode profile: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProfileEnrichmentError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ProfileEnrichmentError::Decode(error.to_string())
        } else {
            ProfileEnrichmentError::Request(error.to_string())
        }
    }
}

/// A configuration value named an unknown audience enforcement mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown audience enforcement '{0}', expected strict or relaxed")]
pub struct UnknownEnforcementError(pub String);
