use async_trait::async_trait;
use serde::Serialize;

/// Authenticated caller attached to protected requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
}

/// Resolves a token subject to a live account.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn resolve(&self, subject: &str) -> anyhow::Result<Option<Identity>>;
}
