//! Service container: builds every service over one store, one byte
//! storage, one clock and one event bus.

use std::sync::Arc;

use tracing::info;

use huddle_auth::{PasswordHasher, PermissionResolver};
use huddle_core::config::AppConfig;
use huddle_core::result::AppResult;
use huddle_core::traits::{Clock, EventPublisher, SystemClock};
use huddle_database::migration::run_migrations;
use huddle_database::{DatabasePool, MemoryStore, PgStore, Store};
use huddle_storage::StorageManager;

use crate::chat::ChatService;
use crate::events::EventBus;
use crate::file::{DownloadService, FileService, UploadService};
use crate::membership::MembershipService;
use crate::message::MessageService;
use crate::share::{ShareAccessService, ShareService};
use crate::thread::{ConferenceDirectory, ConferenceThreadSync, NoConferences, ThreadService};

/// Every service, wired together.
#[derive(Clone)]
pub struct ServiceContainer {
    /// The store every service shares.
    pub store: Arc<dyn Store>,
    /// Byte storage.
    pub storage: Arc<StorageManager>,
    /// Event bus; subscribe here for domain events.
    pub events: Arc<EventBus>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Permission resolver.
    pub resolver: Arc<PermissionResolver>,
    /// Chat lifecycle.
    pub chats: ChatService,
    /// Membership store.
    pub membership: MembershipService,
    /// Thread hierarchy.
    pub threads: ThreadService,
    /// Conference thread sync.
    pub conferences: ConferenceThreadSync,
    /// Messages.
    pub messages: MessageService,
    /// Uploads.
    pub uploads: UploadService,
    /// Downloads.
    pub downloads: DownloadService,
    /// File metadata, deletion and grants.
    pub files: FileService,
    /// Share link management.
    pub shares: ShareService,
    /// Share token downloads.
    pub share_access: ShareAccessService,
    db_pool: Option<DatabasePool>,
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("store", &self.store.backend())
            .field("storage", &self.storage.provider().provider_type())
            .finish()
    }
}

impl ServiceContainer {
    /// Build from configuration with the system clock.
    ///
    /// `database.url = "memory://"` selects the in-memory store; anything
    /// else connects to PostgreSQL and applies pending migrations.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let (store, db_pool): (Arc<dyn Store>, Option<DatabasePool>) =
            if config.database.is_in_memory() {
                info!("Using in-memory store");
                (Arc::new(MemoryStore::new()), None)
            } else {
                let pool = DatabasePool::connect(&config.database).await?;
                run_migrations(pool.pool()).await?;
                (Arc::new(PgStore::new(&pool)), Some(pool))
            };
        let storage = Arc::new(StorageManager::from_config(&config.storage).await?);

        let mut container = Self::with_parts(
            config,
            store,
            storage,
            Arc::new(SystemClock),
            Arc::new(NoConferences),
        );
        container.db_pool = db_pool;
        Ok(container)
    }

    /// Build over explicit parts.
    pub fn with_parts(
        config: &AppConfig,
        store: Arc<dyn Store>,
        storage: Arc<StorageManager>,
        clock: Arc<dyn Clock>,
        directory: Arc<dyn ConferenceDirectory>,
    ) -> Self {
        let events = Arc::new(EventBus::new(&config.events));
        let publisher: Arc<dyn EventPublisher> = events.clone();
        let resolver = Arc::new(PermissionResolver::new(Arc::clone(&clock)));
        let hasher = Arc::new(PasswordHasher::new());

        Self {
            chats: ChatService::new(store.clone(), clock.clone(), publisher.clone()),
            membership: MembershipService::new(store.clone(), clock.clone(), publisher.clone()),
            threads: ThreadService::new(store.clone(), clock.clone(), publisher.clone()),
            conferences: ConferenceThreadSync::new(
                store.clone(),
                clock.clone(),
                publisher.clone(),
                directory,
            ),
            messages: MessageService::new(
                store.clone(),
                clock.clone(),
                publisher.clone(),
                resolver.clone(),
            ),
            uploads: UploadService::new(
                store.clone(),
                storage.clone(),
                clock.clone(),
                publisher.clone(),
            ),
            downloads: DownloadService::new(store.clone(), storage.clone(), resolver.clone()),
            files: FileService::new(
                store.clone(),
                clock.clone(),
                publisher.clone(),
                resolver.clone(),
            ),
            shares: ShareService::new(
                store.clone(),
                clock.clone(),
                publisher.clone(),
                resolver.clone(),
                hasher.clone(),
                config.share.clone(),
            ),
            share_access: ShareAccessService::new(
                store.clone(),
                storage.clone(),
                clock.clone(),
                publisher,
                hasher,
            ),
            store,
            storage,
            events,
            clock,
            resolver,
            db_pool: None,
        }
    }

    /// Whether the store and byte storage are reachable.
    pub async fn health_check(&self) -> bool {
        let store_ok = self.store.health_check().await.unwrap_or(false);
        store_ok && self.storage.health_check().await
    }

    /// Release the database pool, if any.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
        info!("Services shut down");
    }
}
