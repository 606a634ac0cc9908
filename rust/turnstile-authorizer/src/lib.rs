//! API gateway custom authorizer.
//!
//! Composes credential verification and the policy engine: an
//! [`AuthorizationRequest`] goes in, an [`AccessDecision`] or an opaque
//! [`Rejection`] comes out.
//!
//! ```no_run
//! use turnstile_authorizer::{AuthorizationRequest, Authorizer};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let authorizer = Authorizer::from_env()?;
//! let request = AuthorizationRequest::new(
//!     Some("Bearer eyJ...".into()),
//!     "arn:aws:execute-api:us-east-1:123456789012:a1b2c3/dev/GET/resources",
//! );
//! let response = serde_json::to_value(authorizer.authorize(&request).await?)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod authorizer;
mod config;
mod error;

pub use authorizer::*;
pub use config::*;
pub use error::*;

pub use turnstile_policy::AccessDecision;
