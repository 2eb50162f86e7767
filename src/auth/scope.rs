//! Required-scope checks for tool calls.

use super::verifier::TokenClaims;

/// Scopes an operation requires, all of which must be granted (AND semantics).
///
/// Order is kept so that the missing scopes reported back to the client
/// follow the order the tool declared them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeRequirement {
    required: Vec<String>,
}

impl ScopeRequirement {
    /// Create an empty scope requirement (no scopes needed).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope requirement from multiple scopes.
    pub fn all(scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut requirement = Self::new();
        for scope in scopes {
            requirement = requirement.require(scope);
        }
        requirement
    }

    /// Add a required scope to this requirement.
    pub fn require(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        if !self.required.contains(&scope) {
            self.required.push(scope);
        }
        self
    }

    /// Required scopes the claims do not grant, in declaration order.
    pub fn missing(&self, claims: &TokenClaims) -> Vec<String> {
        if self.required.is_empty() {
            return Vec::new();
        }
        let granted = claims.scopes();
        self.required
            .iter()
            .filter(|s| !granted.contains(s.as_str()))
            .cloned()
            .collect()
    }

    /// Returns `Err` with the missing scopes if the claims fall short.
    pub fn check(&self, claims: &TokenClaims) -> Result<(), Vec<String>> {
        let missing = self.missing(claims);
        if missing.is_empty() { Ok(()) } else { Err(missing) }
    }

    pub fn required_scopes(&self) -> &[String] {
        &self.required
    }

    /// Returns true if no scopes are required.
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with_scope(scope: &str) -> TokenClaims {
        TokenClaims {
            scope: Some(scope.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_requirement_always_passes() {
        let req = ScopeRequirement::new();
        assert!(req.is_empty());
        assert!(req.check(&TokenClaims::default()).is_ok());
    }

    #[test]
    fn test_all_scopes_present() {
        let req = ScopeRequirement::all(["usr:read", "usr:write"]);
        assert!(req.check(&claims_with_scope("usr:write usr:read extra")).is_ok());
    }

    #[test]
    fn test_missing_scopes_in_declaration_order() {
        let req = ScopeRequirement::all(["b", "a", "c"]);
        assert_eq!(req.missing(&claims_with_scope("a")), vec!["b", "c"]);
        assert_eq!(
            req.check(&claims_with_scope("")),
            Err(vec!["b".into(), "a".into(), "c".into()])
        );
    }

    #[test]
    fn test_require_dedupes() {
        let req = ScopeRequirement::new().require("x").require("x");
        assert_eq!(req.required_scopes(), ["x".to_string()]);
    }
}
