//! Bearer token authentication.
//!
//! Tokens map to user ids through an [`IdentityResolver`]. With no tokens
//! configured the server runs in development mode and every caller is
//! [`DEV_USER`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::error::ApiError;
use crate::state::AppState;

/// User id of every caller in development mode
pub const DEV_USER: &str = "local";

/// Resolves a presented token to a user id
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `None` when the caller is not authenticated
    async fn resolve(&self, token: Option<&str>) -> Option<String>;
}

/// Fixed token to user id table
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, String>,
}

impl StaticTokenResolver {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn is_dev_mode(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityResolver for StaticTokenResolver {
    async fn resolve(&self, token: Option<&str>) -> Option<String> {
        if self.is_dev_mode() {
            return Some(DEV_USER.to_string());
        }
        token
            .filter(|t| !t.is_empty())
            .and_then(|t| self.tokens.get(t).cloned())
    }
}

/// Token from an `Authorization` header value; a bare token is accepted too
pub fn bearer_token(value: &str) -> &str {
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim()
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CallerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(bearer_token);

        match state.identity.resolve(token).await {
            Some(user_id) => Ok(Self { user_id }),
            None if token.is_none() => {
                Err(ApiError::Unauthorized("Missing Authorization header".to_string()))
            }
            None => Err(ApiError::Unauthorized("Invalid authentication token".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dev_mode_accepts_everyone() {
        let resolver = StaticTokenResolver::default();
        assert_eq!(resolver.resolve(None).await.as_deref(), Some(DEV_USER));
        assert_eq!(resolver.resolve(Some("anything")).await.as_deref(), Some(DEV_USER));
    }

    #[tokio::test]
    async fn test_configured_tokens() {
        let resolver = StaticTokenResolver::new(
            [("t-alice".to_string(), "alice".to_string())].into_iter().collect(),
        );
        assert_eq!(resolver.resolve(Some("t-alice")).await.as_deref(), Some("alice"));
        assert_eq!(resolver.resolve(Some("t-bob")).await, None);
        assert_eq!(resolver.resolve(Some("")).await, None);
        assert_eq!(resolver.resolve(None).await, None);
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), "abc");
        assert_eq!(bearer_token("bearer abc "), "abc");
        assert_eq!(bearer_token("abc"), "abc");
    }
}
