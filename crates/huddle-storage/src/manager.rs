//! Storage manager: owns the configured provider.

use std::sync::Arc;

use tracing::info;

use huddle_core::config::StorageConfig;
use huddle_core::error::AppError;
use huddle_core::result::AppResult;
use huddle_core::traits::storage::StorageProvider;

use crate::providers::{LocalStorageProvider, MemoryStorageProvider};

/// Holds the byte storage provider selected by configuration.
#[derive(Debug, Clone)]
pub struct StorageManager {
    provider: Arc<dyn StorageProvider>,
    max_upload_size_bytes: u64,
}

impl StorageManager {
    /// Wrap an existing provider.
    pub fn new(provider: Arc<dyn StorageProvider>, max_upload_size_bytes: u64) -> Self {
        Self {
            provider,
            max_upload_size_bytes,
        }
    }

    /// Build the provider named by `config.provider`.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let provider: Arc<dyn StorageProvider> = match config.provider.as_str() {
            "local" => Arc::new(LocalStorageProvider::new(&config.root_path).await?),
            "memory" => Arc::new(MemoryStorageProvider::new()),
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown storage provider: {other}"
                )));
            }
        };
        info!(
            provider = provider.provider_type(),
            max_upload_size_bytes = config.max_upload_size_bytes,
            "Storage provider ready"
        );
        Ok(Self::new(provider, config.max_upload_size_bytes))
    }

    /// The active provider.
    pub fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    /// Largest accepted upload.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_bytes
    }

    /// Check the provider is reachable.
    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await.unwrap_or(false)
    }
}
