//! Session lookup standing in for the external identity provider.
//!
//! A request carries at most one `Authorization: Bearer <token>` header.
//! Unknown, malformed, or missing tokens resolve to [`Caller::Anonymous`];
//! they are never an error, because anonymous callers may still prove
//! ownership of an inquiry by email.

use std::collections::HashSet;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::config::AuthConfig;
use crate::inquiry::access::Caller;

/// Maps a bearer token to a caller role.
pub trait SessionResolver: Send + Sync {
    /// Role for `token`, or [`Caller::Anonymous`] when absent or unknown.
    fn resolve(&self, token: Option<&str>) -> Caller;
}

/// Fixed token table loaded from configuration.
#[derive(Clone, Default)]
pub struct TokenSessions {
    admin: HashSet<String>,
    customer: HashSet<String>,
}

impl std::fmt::Debug for TokenSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSessions")
            .field("admin", &self.admin.len())
            .field("customer", &self.customer.len())
            .finish()
    }
}

impl TokenSessions {
    /// Build from explicit token lists. Blank tokens are ignored.
    pub fn new<A, C>(admin: A, customer: C) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        fn collect<I>(tokens: I) -> HashSet<String>
        where
            I: IntoIterator,
            I::Item: Into<String>,
        {
            tokens
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.trim().is_empty())
                .collect()
        }
        Self {
            admin: collect(admin),
            customer: collect(customer),
        }
    }

    /// Build from the `[auth]` config section.
    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(auth.admin_tokens.iter().cloned(), auth.customer_tokens.iter().cloned())
    }
}

impl SessionResolver for TokenSessions {
    fn resolve(&self, token: Option<&str>) -> Caller {
        match token {
            Some(t) if self.admin.contains(t) => Caller::Admin,
            Some(t) if self.customer.contains(t) => Caller::Customer,
            _ => Caller::Anonymous,
        }
    }
}

/// Extract the bearer token from request headers.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
