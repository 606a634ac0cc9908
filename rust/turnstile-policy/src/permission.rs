//! Permission tokens and the routes they unlock.

use std::{collections::BTreeSet, fmt, sync::LazyLock};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{HttpVerb, InvalidRuleError, ResourcePath};

/// Permission tokens known to this authorizer.
///
/// Tokens arrive as strings in a credential's `permissions` or `scope`
/// claim; [`Permission::parse`] recognizes the known ones. A
/// [`PermissionTable`] is keyed by the token string so that deployments can
/// map tokens this enum does not name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    /// `read:resources`
    #[serde(rename = "read:resources")]
    ReadResources,
    /// `create:resources`
    #[serde(rename = "create:resources")]
    CreateResources,
    /// `update:resources`
    #[serde(rename = "update:resources")]
    UpdateResources,
    /// `delete:resources`
    #[serde(rename = "delete:resources")]
    DeleteResources,
    /// `read:auctions`
    #[serde(rename = "read:auctions")]
    ReadAuctions,
    /// `write:auctions`
    #[serde(rename = "write:auctions")]
    WriteAuctions,
    /// `create:auctions`
    #[serde(rename = "create:auctions")]
    CreateAuctions,
    /// `place:bids`
    #[serde(rename = "place:bids")]
    PlaceBids,
    /// `admin:all`
    #[serde(rename = "admin:all")]
    AdminAll,
}

impl Permission {
    /// Every known permission, in declaration order.
    pub const VARIANTS: [Permission; 9] = [
        Permission::ReadResources,
        Permission::CreateResources,
        Permission::UpdateResources,
        Permission::DeleteResources,
        Permission::ReadAuctions,
        Permission::WriteAuctions,
        Permission::CreateAuctions,
        Permission::PlaceBids,
        Permission::AdminAll,
    ];

    /// The token string carried in credentials.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadResources => "read:resources",
            Permission::CreateResources => "create:resources",
            Permission::UpdateResources => "update:resources",
            Permission::DeleteResources => "delete:resources",
            Permission::ReadAuctions => "read:auctions",
            Permission::WriteAuctions => "write:auctions",
            Permission::CreateAuctions => "create:auctions",
            Permission::PlaceBids => "place:bids",
            Permission::AdminAll => "admin:all",
        }
    }

    /// Recognize a known token. Unknown tokens yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        Permission::VARIANTS
            .into_iter()
            .find(|permission| permission.as_str() == token)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(verb, path)` pair unlocked by a permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Route {
    verb: HttpVerb,
    path: ResourcePath,
}

impl Route {
    /// Create a route, validating the path.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRuleError::Path`] if `path` violates the path grammar.
    pub fn new(verb: HttpVerb, path: &str) -> Result<Self, InvalidRuleError> {
        Ok(Self {
            verb,
            path: ResourcePath::new(path)?,
        })
    }

    pub(crate) fn trusted(verb: HttpVerb, path: &'static str) -> Self {
        Self {
            verb,
            path: ResourcePath::trusted(path),
        }
    }

    /// Get the verb.
    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    /// Get the path.
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.path)
    }
}

static STANDARD: LazyLock<PermissionTable> = LazyLock::new(|| {
    use HttpVerb::*;

    let mut table = PermissionTable::new();
    for (permission, routes) in [
        (
            Permission::ReadResources,
            &[
                (Get, "/resources"),
                (Get, "/resource/*"),
                (Get, "/auctions"),
                (Get, "/auction/*"),
            ][..],
        ),
        (
            Permission::CreateResources,
            &[(Post, "/resource"), (Post, "/auction")][..],
        ),
        (
            Permission::UpdateResources,
            &[
                (Put, "/resource/*"),
                (Patch, "/resource/*"),
                (Patch, "/auction/*/bid"),
            ][..],
        ),
        (Permission::DeleteResources, &[(Delete, "/resource/*")][..]),
    ] {
        for (verb, path) in routes {
            table.insert(permission.as_str(), Route::trusted(*verb, *path));
        }
    }
    table
});

/// Lookup from permission token to the ordered routes it unlocks.
///
/// This table is the single source of truth for what a permission grants.
/// Tokens keep the order they were first inserted in. Route order only
/// affects the order statements are emitted in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTable {
    routes: IndexMap<String, Vec<Route>>,
}

impl PermissionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table, constructed once per process.
    pub fn standard() -> &'static PermissionTable {
        &STANDARD
    }

    /// Add routes for `token`, validating each path.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRuleError::Path`] for the first path that violates
    /// the grammar. Every path is checked before any route is added, and
    /// the table is dropped with the error.
    pub fn with_routes<'a>(
        mut self,
        token: impl Into<String>,
        routes: impl IntoIterator<Item = (HttpVerb, &'a str)>,
    ) -> Result<Self, InvalidRuleError> {
        let routes = routes
            .into_iter()
            .map(|(verb, path)| Route::new(verb, path))
            .collect::<Result<Vec<_>, _>>()?;

        let token = token.into();
        for route in routes {
            self.insert(token.clone(), route);
        }
        Ok(self)
    }

    /// Append `route` to the routes of `token`. Duplicate routes are ignored.
    pub fn insert(&mut self, token: impl Into<String>, route: Route) {
        let routes = self.routes.entry(token.into()).or_default();
        if !routes.contains(&route) {
            routes.push(route);
        }
    }

    /// Whether `token` has an entry.
    pub fn contains(&self, token: &str) -> bool {
        self.routes.contains_key(token)
    }

    /// Routes unlocked by `token`, in table order. Empty for unknown tokens.
    pub fn routes_for(&self, token: &str) -> &[Route] {
        self.routes
            .get(token)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every token with an entry, in insertion order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// The set of routes unlocked by any of `permissions`.
    pub fn unlocked_by<I, S>(&self, permissions: I) -> BTreeSet<Route>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        permissions
            .into_iter()
            .flat_map(|token| self.routes_for(token.as_ref()).to_vec())
            .collect()
    }
}
