//! Bearer credential verification for API gateway authorizers.
//!
//! A [`CredentialVerifier`] checks an RS256 JWT against a trusted RSA key,
//! validates its issuer, audience and time bounds, and produces the
//! immutable [`Claims`] the policy engine works from. When configured, it
//! fills in missing profile fields from the identity provider's userinfo
//! endpoint on a best-effort basis.

#![warn(missing_docs)]

mod claims;
mod config;
mod error;
mod key;
mod profile;
mod verifier;

pub use claims::*;
pub use config::*;
pub use error::*;
pub use key::*;
pub use profile::*;
pub use verifier::*;

#[cfg(any(test, feature = "helpers"))]
pub mod helpers;
