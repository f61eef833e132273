use async_trait::async_trait;
use thiserror::Error;

/// Wire-agnostic document shape shared by providers and clients.
pub type Document = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("database request failed: {0}")]
    Backend(String),

    #[error("database request timed out")]
    Timeout,
}

/// Capability set a target database must expose to be driven.
///
/// Implementations are injected at construction and own their connection
/// handling; retries, if any, happen behind this trait and must collapse to
/// the single success/failure signal. The returned `bool` reports whether
/// the operation took effect (e.g. a read that matched a document).
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    async fn insert_one(&self, item: Document) -> Result<bool, ClientError>;

    async fn insert_many(&self, items: Vec<Document>) -> Result<bool, ClientError>;

    async fn read_one(&self, filter: Document) -> Result<bool, ClientError>;

    async fn update_one(&self, filter: Document, update: Document) -> Result<bool, ClientError>;
}
