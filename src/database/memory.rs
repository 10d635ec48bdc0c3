use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::manager::DatabaseError;
use super::nav_store::NavStore;
use crate::navigation::{engine, NavItem, NavSnapshot, NavWrite};

/// Process-local store for development runs and tests.
///
/// Mirrors the PostgreSQL store's revision check and all-or-nothing batches.
#[derive(Default)]
pub struct MemoryNavStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    revision: i64,
    items: Vec<NavItem>,
}

impl MemoryNavStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<NavItem>) -> Self {
        Self {
            state: RwLock::new(MemoryState { revision: 0, items }),
        }
    }
}

fn check(items: &[NavItem], write: &NavWrite) -> Result<(), DatabaseError> {
    let exists = |id| items.iter().any(|i: &NavItem| i.id == id);
    match write {
        NavWrite::Create { item } if exists(item.id) => Err(DatabaseError::QueryError(format!(
            "duplicate navigation item {}",
            item.id
        ))),
        NavWrite::Update { id, .. } | NavWrite::Delete { id } if !exists(*id) => {
            Err(DatabaseError::NotFound(format!("navigation item {}", id)))
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl NavStore for MemoryNavStore {
    async fn snapshot(&self) -> Result<NavSnapshot, DatabaseError> {
        let state = self.state.read().await;
        let mut items = state.items.clone();
        items.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(NavSnapshot::new(state.revision, items))
    }

    async fn apply_batch(&self, expected_revision: i64, writes: &[NavWrite]) -> Result<i64, DatabaseError> {
        let mut state = self.state.write().await;
        if state.revision != expected_revision {
            warn!(
                "Rejecting navigation batch: expected revision {}, found {}",
                expected_revision, state.revision
            );
            return Err(DatabaseError::Conflict(format!(
                "navigation was modified (revision {} is now {})",
                expected_revision, state.revision
            )));
        }

        // Stage on a copy so a failing write leaves nothing behind.
        let mut staged = state.items.clone();
        for write in writes {
            check(&staged, write)?;
            staged = engine::apply(&staged, std::slice::from_ref(write));
        }

        state.items = staged;
        state.revision += 1;
        info!("Applied {} navigation write(s), revision {}", writes.len(), state.revision);
        Ok(state.revision)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
