//! In-memory storage provider for single-node and test deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;
use tracing::debug;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;
use huddle_core::traits::storage::{ByteStream, StorageProvider};

/// Chunk size used when streaming stored bytes back out.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Keeps every object in a map behind a tokio `RwLock`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageProvider {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStorageProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let data = self
            .objects
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("File not found: {path}")))?;

        let chunks: Vec<Result<Bytes, std::io::Error>> = (0..data.len())
            .step_by(READ_CHUNK_SIZE)
            .map(|start| Ok(data.slice(start..(start + READ_CHUNK_SIZE).min(data.len()))))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn write_stream(&self, path: &str, mut stream: ByteStream) -> AppResult<u64> {
        // Buffer fully before publishing so a failed stream stores nothing.
        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AppError::with_source(ErrorKind::Storage, "Stream read error", e))?;
            buffer.extend_from_slice(&chunk);
        }
        let total = buffer.len() as u64;
        self.objects
            .write()
            .await
            .insert(path.to_string(), buffer.freeze());
        debug!(path, bytes = total, "Stored object in memory");
        Ok(total)
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        self.objects.write().await.remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        Ok(self.objects.read().await.contains_key(path))
    }
}
