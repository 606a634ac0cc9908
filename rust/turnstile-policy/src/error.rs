//! Error types for policy construction.

use thiserror::Error;

/// A rule was rejected before it reached a [`crate::PolicyBuilder`].
///
/// Rules are validated at the boundary; a rejected rule never mutates the
/// builder it was offered to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRuleError {
    /// The verb is not one of the supported HTTP verbs.
    #[error(
        "Invalid HTTP verb {0}. Allowed verbs are '*', 'GET', 'POST', 'PUT', 'DELETE', 'PATCH', 'HEAD', and 'OPTIONS'"
    )]
    Verb(String),

    /// The path contains characters outside of `[/.A-Za-z0-9-*]`, or is empty.
    #[error("Invalid resource path: {0}. Path should match ^[/.a-zA-Z0-9-*]+$")]
    Path(String),
}

/// A method ARN could not be decomposed into a target resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The ARN does not have the `arn:aws:execute-api:region:account:api/stage/...` shape.
    #[error("Malformed method ARN: {0}")]
    MalformedArn(String),

    /// The verb or path segment of the ARN is not a valid rule.
    #[error(transparent)]
    Rule(#[from] InvalidRuleError),
}

/// A decision was finalized without a single statement.
///
/// [`crate::PolicyBuilder::finalize`] applies the minimal-access fallback
/// before finalizing, so this is only reachable through a logic defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No statements defined for the policy")]
pub struct EmptyDecisionError;

/// A configuration value named an unknown setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Unknown unmatched permissions policy '{0}', expected deny-all, minimal-access or allow-all"
)]
pub struct UnknownSettingError(pub String);
