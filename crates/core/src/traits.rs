use crate::error::ServiceError;
use crate::models::{RetrievalOptions, RetrievedChunk};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait LayoutProcessor {
    async fn process(&self, content: &[u8], mime_type: &str) -> Result<Value, ServiceError>;
}

#[async_trait]
pub trait ChunkRetriever {
    async fn retrieve(
        &self,
        options: &RetrievalOptions,
    ) -> Result<Vec<RetrievedChunk>, ServiceError>;
}
