//! In-memory implementation of the store traits.
//!
//! One tokio mutex guards the whole state and a transaction holds it from
//! `begin` until it is committed or dropped, so transactions are fully
//! serialized. Writes go to a staged copy taken on the first write; commit
//! swaps the copy in and dropping the transaction throws it away.
//!
//! Suitable for single-node deployments and tests.

mod chat;
mod file;
mod state;
mod thread;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use huddle_core::result::AppResult;

use crate::store::{Store, StoreTx};

use self::state::MemoryState;

/// In-memory [`Store`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTx {
            guard,
            staged: None,
        }))
    }
}

/// An open in-memory transaction.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: Option<MemoryState>,
}

impl MemoryTx {
    /// Current view: staged writes if any, otherwise committed state.
    fn read(&self) -> &MemoryState {
        self.staged.as_ref().unwrap_or(&*self.guard)
    }

    /// Staged copy, created on first use.
    fn write(&mut self) -> &mut MemoryState {
        let committed: &MemoryState = &self.guard;
        self.staged.get_or_insert_with(|| MemoryState::clone(committed))
    }
}

impl std::fmt::Debug for MemoryTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTx")
            .field("dirty", &self.staged.is_some())
            .finish()
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, staged } = *self;
        if let Some(state) = staged {
            *guard = state;
            debug!("Memory transaction committed");
        }
        Ok(())
    }
}
