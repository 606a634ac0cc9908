//! Resource addressing for API gateway rules.
//!
//! A rule targets one `(verb, path)` pair inside one deployment scope
//! (region, account, API and stage). The pair and the scope together render
//! as a [`ResourceLocator`]:
//!
//! ```text
//! arn:aws:execute-api:{region}:{account}:{api}/{stage}/{verb}/{path}
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{HttpVerb, InvalidRuleError, ResourceError};

const WILDCARD: &str = "*";
const LOCATOR_PREFIX: &str = "arn:aws:execute-api";

/// A validated resource path.
///
/// Paths must be non-empty and consist only of ASCII letters, digits, `/`,
/// `.`, `-` and `*`. Anything else is rejected rather than sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourcePath(String);

impl ResourcePath {
    /// Validate `path` against the path grammar.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRuleError::Path`] if the path is empty or contains a
    /// character outside of `[/.A-Za-z0-9-*]`.
    pub fn new(path: impl Into<String>) -> Result<Self, InvalidRuleError> {
        let path = path.into();
        if is_valid_path(&path) {
            Ok(Self(path))
        } else {
            Err(InvalidRuleError::Path(path))
        }
    }

    /// The `*` path, matching every resource.
    pub fn any() -> Self {
        Self(WILDCARD.to_string())
    }

    /// Build a path from a literal already known to satisfy the grammar.
    pub(crate) fn trusted(path: &'static str) -> Self {
        debug_assert!(is_valid_path(path), "invalid built-in path {path}");
        Self(path.to_string())
    }

    /// Get the path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the path is absolute within the stage (starts with `/`).
    pub fn is_rooted(&self) -> bool {
        self.0.starts_with('/')
    }
}

fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '*'))
}

impl FromStr for ResourcePath {
    type Err = InvalidRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for ResourcePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let path = String::deserialize(deserializer)?;
        Self::new(path).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The deployment scope a decision applies to.
///
/// Each segment is either a concrete value or `*`. Empty segments are
/// normalized to `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiScope {
    region: String,
    account_id: String,
    api_id: String,
    stage: String,
}

impl ApiScope {
    /// Create a scope from its four segments.
    pub fn new(
        region: impl Into<String>,
        account_id: impl Into<String>,
        api_id: impl Into<String>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            region: segment_or_wildcard(region.into()),
            account_id: segment_or_wildcard(account_id.into()),
            api_id: segment_or_wildcard(api_id.into()),
            stage: segment_or_wildcard(stage.into()),
        }
    }

    /// A scope matching every region, account, API and stage.
    pub fn any() -> Self {
        Self::new(WILDCARD, WILDCARD, WILDCARD, WILDCARD)
    }

    /// Get the region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Get the account identifier.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Get the API identifier.
    pub fn api_id(&self) -> &str {
        &self.api_id
    }

    /// Get the stage.
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Render the locator for `verb` on `path` inside this scope.
    ///
    /// Rooted paths (`/items`) are appended directly after the verb segment;
    /// relative paths (`items`) get a `/` separator.
    pub fn locator(&self, verb: HttpVerb, path: &ResourcePath) -> ResourceLocator {
        let separator = if path.is_rooted() { "" } else { "/" };
        ResourceLocator(format!(
            "{LOCATOR_PREFIX}:{}:{}:{}/{}/{}{separator}{}",
            self.region, self.account_id, self.api_id, self.stage, verb, path
        ))
    }
}

fn segment_or_wildcard(segment: String) -> String {
    if segment.is_empty() {
        WILDCARD.to_string()
    } else {
        segment
    }
}

/// A fully-qualified resource locator, one per `(verb, path)` rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceLocator(String);

impl ResourceLocator {
    /// Get the locator string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this locator, read as a pattern where `*` matches any run of
    /// characters, covers `other`.
    pub fn covers(&self, other: &ResourceLocator) -> bool {
        wildcard_match(self.0.as_bytes(), other.0.as_bytes())
    }
}

impl AsRef<str> for ResourceLocator {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn wildcard_match(pattern: &[u8], candidate: &[u8]) -> bool {
    let (mut p, mut c) = (0, 0);
    // Position of the last `*` seen and the candidate offset it resumes from.
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        match pattern.get(p) {
            Some(b'*') => {
                backtrack = Some((p, c));
                p += 1;
            }
            Some(byte) if *byte == candidate[c] => {
                p += 1;
                c += 1;
            }
            _ => match backtrack {
                Some((star, resume)) => {
                    p = star + 1;
                    c = resume + 1;
                    backtrack = Some((star, resume + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|byte| *byte == b'*')
}

/// The resource an inbound request is trying to reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResource {
    scope: ApiScope,
    verb: HttpVerb,
    path: ResourcePath,
}

impl TargetResource {
    /// Create a target from its parts.
    pub fn new(scope: ApiScope, verb: HttpVerb, path: ResourcePath) -> Self {
        Self { scope, verb, path }
    }

    /// Decompose a gateway method ARN.
    ///
    /// The ARN has the shape
    /// `arn:aws:execute-api:{region}:{account}:{api}/{stage}/{verb}/{path}`.
    /// A missing verb or path is read as `*`; an empty path (the API root)
    /// is read as `/`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MalformedArn`] if the ARN does not have six
    /// colon-delimited segments or lacks a stage, and [`ResourceError::Rule`]
    /// if the verb or path is not valid.
    pub fn parse_method_arn(arn: &str) -> Result<Self, ResourceError> {
        let malformed = || ResourceError::MalformedArn(arn.to_string());

        let segments: Vec<&str> = arn.splitn(6, ':').collect();
        let [partition, _, _, region, account_id, resource] = segments[..] else {
            return Err(malformed());
        };
        if partition != "arn" {
            return Err(malformed());
        }

        let mut parts = resource.splitn(4, '/');
        let api_id = parts.next().unwrap_or_default();
        let stage = parts.next().ok_or_else(malformed)?;
        let verb = match parts.next() {
            Some(verb) if !verb.is_empty() => verb.parse()?,
            _ => HttpVerb::All,
        };
        let path = match parts.next() {
            Some(path) => ResourcePath::new(format!("/{path}"))?,
            None => ResourcePath::any(),
        };

        Ok(Self {
            scope: ApiScope::new(region, account_id, api_id, stage),
            verb,
            path,
        })
    }

    /// Get the deployment scope.
    pub fn scope(&self) -> &ApiScope {
        &self.scope
    }

    /// Get the requested verb.
    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    /// Get the requested path.
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// The locator of exactly this request.
    pub fn locator(&self) -> ResourceLocator {
        self.scope.locator(self.verb, &self.path)
    }
}

impl FromStr for TargetResource {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_method_arn(s)
    }
}
