//! Incremental construction of an [`AccessDecision`].

use std::{fmt, str::FromStr};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    AccessDecision, ApiScope, Context, ContextValue, EmptyDecisionError, HttpVerb, InvalidRuleError,
    PermissionTable, ResourceLocator, ResourcePath, TargetResource, UnknownSettingError,
};

/// Routes granted when a caller would otherwise have nothing.
pub const MINIMAL_ACCESS: [(HttpVerb, &str); 2] =
    [(HttpVerb::Get, "/health"), (HttpVerb::Get, "/hello")];

/// What [`PolicyBuilder::apply_permissions`] does when permission tokens were
/// supplied but none of them appears in the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmatchedPermissions {
    /// Add an explicit deny-all statement.
    #[default]
    DenyAll,
    /// Grant the [`MINIMAL_ACCESS`] routes.
    MinimalAccess,
    /// Add allow-all whenever any token is supplied, matched or not.
    ///
    /// This reproduces a legacy blanket rule and must not be used outside
    /// of development.
    AllowAll,
}

impl UnmatchedPermissions {
    /// The configuration token for this setting.
    pub const fn as_str(&self) -> &'static str {
        match self {
            UnmatchedPermissions::DenyAll => "deny-all",
            UnmatchedPermissions::MinimalAccess => "minimal-access",
            UnmatchedPermissions::AllowAll => "allow-all",
        }
    }
}

impl fmt::Display for UnmatchedPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnmatchedPermissions {
    type Err = UnknownSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deny-all" => Ok(UnmatchedPermissions::DenyAll),
            "minimal-access" => Ok(UnmatchedPermissions::MinimalAccess),
            "allow-all" => Ok(UnmatchedPermissions::AllowAll),
            _ => Err(UnknownSettingError(s.to_string())),
        }
    }
}

/// Collects allow and deny rules for one principal within one scope.
///
/// Rules are append-only and deduplicated; each effect keeps the order its
/// locators were first added in. The builder is consumed by
/// [`PolicyBuilder::finalize`], so a finished decision can never change.
///
/// ```
/// use turnstile_policy::{ApiScope, HttpVerb, PolicyBuilder};
///
/// let mut builder = PolicyBuilder::new("user-1", ApiScope::new("us-east-1", "123", "api", "dev"));
/// builder
///     .allow_method(HttpVerb::Get, "/items")?
///     .deny_method(HttpVerb::Delete, "/items/*")?;
///
/// let decision = builder.finalize()?;
/// assert_eq!(decision.allowed().len(), 1);
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    principal: String,
    scope: ApiScope,
    allow: IndexSet<ResourceLocator>,
    deny: IndexSet<ResourceLocator>,
    explicit: bool,
    unmatched: UnmatchedPermissions,
}

impl PolicyBuilder {
    /// Start an empty builder for `principal` scoped to `scope`.
    pub fn new(principal: impl Into<String>, scope: ApiScope) -> Self {
        Self {
            principal: principal.into(),
            scope,
            allow: IndexSet::new(),
            deny: IndexSet::new(),
            explicit: false,
            unmatched: UnmatchedPermissions::default(),
        }
    }

    /// Start a builder scoped to the deployment `target` belongs to.
    pub fn for_target(principal: impl Into<String>, target: &TargetResource) -> Self {
        Self::new(principal, target.scope().clone())
    }

    /// Set the unmatched-permissions policy.
    pub fn with_unmatched_permissions(mut self, unmatched: UnmatchedPermissions) -> Self {
        self.unmatched = unmatched;
        self
    }

    /// Get the principal.
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Get the scope.
    pub fn scope(&self) -> &ApiScope {
        &self.scope
    }

    /// Allow every verb on every path.
    pub fn allow_all(&mut self) -> &mut Self {
        let locator = self.scope.locator(HttpVerb::All, &ResourcePath::any());
        self.allow.insert(locator);
        self.explicit = true;
        self
    }

    /// Deny every verb on every path.
    pub fn deny_all(&mut self) -> &mut Self {
        let locator = self.scope.locator(HttpVerb::All, &ResourcePath::any());
        self.deny.insert(locator);
        self.explicit = true;
        self
    }

    /// Allow `verb` on `path`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRuleError::Path`] if `path` violates the path
    /// grammar. The builder is left unchanged.
    pub fn allow_method(
        &mut self,
        verb: HttpVerb,
        path: &str,
    ) -> Result<&mut Self, InvalidRuleError> {
        let path = ResourcePath::new(path)?;
        Ok(self.allow_route(verb, &path))
    }

    /// Deny `verb` on `path`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRuleError::Path`] if `path` violates the path
    /// grammar. The builder is left unchanged.
    pub fn deny_method(
        &mut self,
        verb: HttpVerb,
        path: &str,
    ) -> Result<&mut Self, InvalidRuleError> {
        let path = ResourcePath::new(path)?;
        Ok(self.deny_route(verb, &path))
    }

    /// Allow `verb` on an already validated `path`.
    pub fn allow_route(&mut self, verb: HttpVerb, path: &ResourcePath) -> &mut Self {
        self.allow.insert(self.scope.locator(verb, path));
        self.explicit = true;
        self
    }

    /// Deny `verb` on an already validated `path`.
    pub fn deny_route(&mut self, verb: HttpVerb, path: &ResourcePath) -> &mut Self {
        self.deny.insert(self.scope.locator(verb, path));
        self.explicit = true;
        self
    }

    /// Allow every route that `table` maps any of `permissions` to.
    ///
    /// Tokens the table does not know are skipped. When at least one token
    /// was supplied and none of them matched, the configured
    /// [`UnmatchedPermissions`] policy decides what is added. An empty
    /// `permissions` slice adds nothing.
    pub fn apply_permissions<S: AsRef<str>>(
        &mut self,
        permissions: &[S],
        table: &PermissionTable,
    ) -> &mut Self {
        let mut matched = false;
        for token in permissions {
            let token = token.as_ref();
            if !table.contains(token) {
                debug!(permission = token, "No routes mapped for permission");
                continue;
            }
            matched = true;
            for route in table.routes_for(token) {
                self.allow_route(route.verb(), route.path());
            }
        }

        if permissions.is_empty() {
            return self;
        }

        match self.unmatched {
            UnmatchedPermissions::AllowAll => {
                debug!(principal = %self.principal, "Granting allow-all for supplied permissions");
                self.allow_all();
            }
            UnmatchedPermissions::MinimalAccess if !matched => {
                debug!(
                    principal = %self.principal,
                    "No permission matched, granting minimal access"
                );
                self.allow_minimal_access();
            }
            UnmatchedPermissions::DenyAll if !matched => {
                debug!(principal = %self.principal, "No permission matched, denying all");
                self.deny_all();
            }
            _ => {}
        }
        self
    }

    /// Allow the [`MINIMAL_ACCESS`] routes.
    ///
    /// This is a fallback and does not count as an explicit rule.
    pub fn allow_minimal_access(&mut self) -> &mut Self {
        for (verb, path) in MINIMAL_ACCESS {
            let locator = self.scope.locator(verb, &ResourcePath::trusted(path));
            self.allow.insert(locator);
        }
        self
    }

    /// Whether any rule other than the minimal-access fallback was added.
    pub fn has_explicit_rules(&self) -> bool {
        self.explicit
    }

    /// Allowed locators so far, in insertion order.
    pub fn allowed(&self) -> impl Iterator<Item = &ResourceLocator> {
        self.allow.iter()
    }

    /// Denied locators so far, in insertion order.
    pub fn denied(&self) -> impl Iterator<Item = &ResourceLocator> {
        self.deny.iter()
    }

    /// Finish the decision with the default context `{ "sub": principal }`.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyDecisionError`] if the decision has no statements.
    pub fn finalize(self) -> Result<AccessDecision, EmptyDecisionError> {
        let principal = ContextValue::from(self.principal.as_str());
        let context = Context::from([("sub".to_string(), principal)]);
        self.finalize_with_context(context)
    }

    /// Finish the decision, attaching `context` verbatim.
    ///
    /// If no explicit rule was ever added, the minimal-access routes are
    /// granted first.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyDecisionError`] if the decision has no statements.
    pub fn finalize_with_context(
        mut self,
        context: Context,
    ) -> Result<AccessDecision, EmptyDecisionError> {
        if !self.explicit {
            debug!(principal = %self.principal, "No explicit rules, granting minimal access");
            self.allow_minimal_access();
        }
        self.into_decision(context)
    }

    fn into_decision(self, context: Context) -> Result<AccessDecision, EmptyDecisionError> {
        if self.allow.is_empty() && self.deny.is_empty() {
            return Err(EmptyDecisionError);
        }
        Ok(AccessDecision::new(
            self.principal,
            self.allow.into_iter().collect(),
            self.deny.into_iter().collect(),
            context,
        ))
    }
}
