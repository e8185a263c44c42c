//! Access decisions for SHELF endpoints.
//!
//! Reads are public; writes require a bearer token from the configured set.
//! This is the whole contract: the boolean gate runs before any write
//! handler touches the store, and is a no-op for read handlers.

use std::collections::HashSet;

/// Per-request read/write authorization.
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    tokens: HashSet<String>,
}

impl AccessControl {
    /// Build from the configured token list. An empty list denies all writes.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: HashSet<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            tracing::warn!(target: "shelf-authz", "no api tokens configured; all writes will be denied");
        }
        Self { tokens }
    }

    /// Listing and detail endpoints are open to everyone.
    pub fn may_read(&self) -> bool {
        true
    }

    /// Writes require a known bearer token.
    pub fn may_write(&self, bearer: Option<&str>) -> bool {
        match bearer {
            Some(token) => self.tokens.contains(token),
            None => false,
        }
    }
}

/// Strip the `Bearer ` scheme from an `Authorization` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_always_allowed() {
        let access = AccessControl::new(Vec::<String>::new());
        assert!(access.may_read());
    }

    #[test]
    fn writes_require_a_configured_token() {
        let access = AccessControl::new(["secret-token"]);
        assert!(access.may_write(Some("secret-token")));
        assert!(!access.may_write(Some("wrong-token")));
        assert!(!access.may_write(None));
    }

    #[test]
    fn empty_token_set_denies_all_writes() {
        let access = AccessControl::new(Vec::<String>::new());
        assert!(!access.may_write(Some("anything")));
    }

    #[test]
    fn bearer_token_strips_the_scheme() {
        assert_eq!(bearer_token("Bearer secret"), Some("secret"));
        assert_eq!(bearer_token("Basic dXNlcg=="), None);
        assert_eq!(bearer_token("Bearer "), None);
    }
}
