//! Access credential supply for channel connections.
//!
//! Tokens can rotate mid-session, so the transport fetches a fresh token
//! on every connection attempt (including automatic reconnects) instead
//! of capturing one at construction time.

use async_trait::async_trait;

use brewlink_core::AppResult;

/// Supplies the current access credential at connect time.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The current access token.
    async fn access_token(&self) -> AppResult<String>;
}

/// Fixed-token provider for tests and single-token deployments.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    token: String,
}

impl StaticCredentialProvider {
    /// Create a provider that always returns the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn access_token(&self) -> AppResult<String> {
        Ok(self.token.clone())
    }
}
