use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::InvalidRuleError;

/// HTTP verbs an API gateway rule can be scoped to.
///
/// [`HttpVerb::All`] renders as `*` and matches every verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HttpVerb {
    /// `GET`
    #[serde(rename = "GET")]
    Get,
    /// `POST`
    #[serde(rename = "POST")]
    Post,
    /// `PUT`
    #[serde(rename = "PUT")]
    Put,
    /// `PATCH`
    #[serde(rename = "PATCH")]
    Patch,
    /// `HEAD`
    #[serde(rename = "HEAD")]
    Head,
    /// `DELETE`
    #[serde(rename = "DELETE")]
    Delete,
    /// `OPTIONS`
    #[serde(rename = "OPTIONS")]
    Options,
    /// `*`
    #[serde(rename = "*")]
    All,
}

impl HttpVerb {
    /// Every verb, in declaration order.
    pub const VARIANTS: [HttpVerb; 8] = [
        HttpVerb::Get,
        HttpVerb::Post,
        HttpVerb::Put,
        HttpVerb::Patch,
        HttpVerb::Head,
        HttpVerb::Delete,
        HttpVerb::Options,
        HttpVerb::All,
    ];

    /// The verb as it appears in a resource locator.
    pub const fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Head => "HEAD",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::All => "*",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = InvalidRuleError;

    /// Verbs are matched exactly; `get` is not `GET`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpVerb::VARIANTS
            .into_iter()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| InvalidRuleError::Verb(s.to_string()))
    }
}
