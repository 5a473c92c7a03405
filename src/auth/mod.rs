//! Authentication and authorization module
//!
//! Validates Cognito access tokens and exposes the calling service and its
//! scopes to handlers.

mod cognito;
mod jwks;
mod middleware;

pub use cognito::{CognitoAuth, CognitoClaims};
pub use jwks::KeyStore;
pub use middleware::{auth_middleware, check_scopes};

#[cfg(test)]
pub(crate) use cognito::tests as test_support;

use std::fmt;

/// Wildcard scope granting access to every resource
pub const ALL_SCOPES: &str = "*";

/// Service identity taken from a validated access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUser {
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
}

impl ServiceUser {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

impl fmt::Display for ServiceUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceUser({})", self.client_id.as_deref().unwrap_or("unknown"))
    }
}
