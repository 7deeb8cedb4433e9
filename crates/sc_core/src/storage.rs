use async_trait::async_trait;
use crate::Result;

/// Key under which the session token is persisted.
pub const TOKEN_KEY: &str = "token";

/// Durable string key/value storage that survives process restarts.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
