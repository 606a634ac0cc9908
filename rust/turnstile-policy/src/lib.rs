//! Access decisions for API gateway custom authorizers.
//!
//! A [`PolicyBuilder`] collects allow and deny rules for one principal inside
//! one deployment [`ApiScope`] and finalizes into an [`AccessDecision`]. Rules
//! come either from explicit calls or from a [`PermissionTable`] that maps
//! permission tokens to the routes they unlock.
//!
//! ```
//! use turnstile_policy::{PermissionTable, PolicyBuilder, TargetResource};
//!
//! let target: TargetResource = "arn:aws:execute-api:us-east-1:123:api/dev/GET/resources".parse()?;
//!
//! let mut builder = PolicyBuilder::for_target("user-1", &target);
//! builder.apply_permissions(&["read:resources"], PermissionTable::standard());
//!
//! let decision = builder.finalize()?;
//! assert!(decision.permits(&target.locator()));
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

mod builder;
mod decision;
mod error;
mod permission;
mod resource;
mod verb;

pub use builder::*;
pub use decision::*;
pub use error::*;
pub use permission::*;
pub use resource::*;
pub use verb::*;
