//! PostgreSQL implementation of the store traits.
//!
//! [`PgTx`] wraps one `sqlx` transaction; each module here implements one of
//! the per-table traits for it. Dropping a `PgTx` rolls the transaction back.

pub mod chat;
pub mod file;
pub mod group;
pub mod message;
pub mod participant;
pub mod share;
pub mod thread;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::store::{Store, StoreTx};

/// PostgreSQL-backed [`Store`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    pub fn new(pool: &DatabasePool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &str {
        "postgres"
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// An open PostgreSQL transaction.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTx").finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })?;
        debug!("Transaction committed");
        Ok(())
    }
}

/// Map an insert error, turning unique violations into `AlreadyExists`.
pub(crate) fn insert_error(e: sqlx::Error, what: &str) -> AppError {
    let unique = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
    if unique {
        AppError::with_source(ErrorKind::AlreadyExists, format!("{what} already exists"), e)
    } else {
        AppError::with_source(ErrorKind::Database, format!("Failed to insert {what}"), e)
    }
}
