//! Credential provider capability
//!
//! The pipeline asks for a token per attempt instead of reading ambient storage, so a
//! login or logout between attempts is picked up.

use std::sync::{Arc, RwLock};

/// Supplies the bearer token for outgoing requests
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;

    /// Called when the server reports the session as expired
    fn invalidate(&self) {}
}

/// A fixed token
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Shared, replaceable session token for one process
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    token: Arc<RwLock<Option<String>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer_token().is_some()
    }
}

impl CredentialProvider for SessionContext {
    fn bearer_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn invalidate(&self) {
        tracing::info!("Session expired, clearing stored token");
        self.set_token(None);
    }
}
