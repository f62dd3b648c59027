//! Acting-user resolution
//!
//! Account and session management live in a separate service. This module only needs
//! to turn the caller's bearer token into a user id; [`SessionVerifier`] is that seam.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use raasta_common::UserId;
use std::collections::HashMap;
use tracing::debug;

use crate::{ApiError, AppState};

/// Resolves a bearer token to the user it was issued to
pub trait SessionVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<UserId>;
}

/// Fixed token table, loaded from the `[sessions]` config section
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, UserId>,
}

impl TokenTable {
    pub fn new(tokens: HashMap<String, UserId>) -> Self {
        Self { tokens }
    }

    pub fn with(mut self, token: impl Into<String>, user: UserId) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl SessionVerifier for TokenTable {
    fn verify(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).copied()
    }
}

/// Authenticated caller of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub UserId);

impl ActingUser {
    pub fn id(&self) -> UserId {
        self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ActingUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Authentication token missing".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Expected a Bearer token".to_string()))?;

        match state.sessions.verify(token) {
            Some(user) => Ok(ActingUser(user)),
            None => {
                debug!("Rejected unknown session token");
                Err(ApiError::Unauthorized(
                    "Session expired - please login again".to_string(),
                ))
            }
        }
    }
}
