use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::{DatabaseError, NavStore};
use crate::navigation::{
    build_tree, coalesce, engine, visible_items, Direction, NavError, NavItem, NavItemPatch,
    NavNode, NavResult, NavRules, NavSnapshot, NavWrite, NewNavItem,
};

/// Flat items plus the derived forest, as every read endpoint returns them.
#[derive(Debug, Clone, Serialize)]
pub struct NavListing {
    pub items: Vec<NavItem>,
    pub tree: Vec<NavNode>,
}

impl NavListing {
    pub fn from_items(items: Vec<NavItem>, visible_only: bool) -> Self {
        let items = if visible_only { visible_items(&items) } else { items };
        let tree = build_tree(&items);
        Self { items, tree }
    }
}

/// Runs every navigation mutation as read snapshot, compute writes, apply batch.
///
/// A batch built from a stale snapshot is rejected by the store and surfaces as
/// [`NavError::Conflict`]; nothing is retried here.
#[derive(Clone)]
pub struct NavbarService {
    store: Arc<dyn NavStore>,
    rules: NavRules,
}

impl NavbarService {
    pub fn new(store: Arc<dyn NavStore>, rules: NavRules) -> Self {
        Self { store, rules }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        self.store.health_check().await
    }

    pub async fn listing(&self, visible_only: bool) -> NavResult<NavListing> {
        let snapshot = self.store.snapshot().await?;
        Ok(NavListing::from_items(snapshot.items, visible_only))
    }

    pub async fn create(&self, fields: NewNavItem) -> NavResult<NavItem> {
        let snapshot = self.store.snapshot().await?;
        let (item, writes) = engine::insert(&snapshot.items, &self.rules, fields)?;
        self.commit(&snapshot, writes).await?;
        info!("Created navigation item {} ({})", item.id, item.label);
        Ok(item)
    }

    /// Applies `patch`, then slots the item into its (possibly new) sibling
    /// group at the requested order, appending when none was given.
    pub async fn update(&self, id: Uuid, patch: NavItemPatch) -> NavResult<NavItem> {
        let snapshot = self.store.snapshot().await?;
        let current_parent = snapshot.get(id).map(|item| item.parent_id);
        let reparents = patch.parent_id.is_some() && patch.parent_id != current_parent;
        let repositions = reparents || patch.order.is_some();
        let requested_order = patch.order;

        let (_, mut writes) = engine::update(&snapshot.items, &self.rules, id, patch)?;
        let mut next = engine::apply(&snapshot.items, &writes);

        if repositions {
            let position = requested_order.map(|o| o as usize).unwrap_or(usize::MAX);
            let placed = engine::place(&next, id, position)?;
            next = engine::apply(&next, &placed);
            writes.extend(placed);

            let renumbered = engine::normalize_orders(&next);
            next = engine::apply(&next, &renumbered);
            writes.extend(renumbered);
        }

        let items = self.commit(&snapshot, writes).await?;
        let updated = items
            .into_iter()
            .find(|i| i.id == id)
            .or_else(|| next.into_iter().find(|i| i.id == id))
            .ok_or(NavError::NotFound(id))?;
        info!("Updated navigation item {}", id);
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> NavResult<()> {
        let snapshot = self.store.snapshot().await?;
        let writes = engine::remove(&snapshot.items, id)?;
        self.commit(&snapshot, writes).await?;
        info!("Deleted navigation item {}", id);
        Ok(())
    }

    pub async fn reorder(&self, parent_id: Option<Uuid>, ordered_ids: &[Uuid]) -> NavResult<NavListing> {
        let snapshot = self.store.snapshot().await?;
        let writes = engine::reorder_siblings(&snapshot.items, parent_id, ordered_ids)?;
        let items = self.commit(&snapshot, writes).await?;
        info!("Reordered {} item(s) under {:?}", ordered_ids.len(), parent_id);
        Ok(NavListing::from_items(items, false))
    }

    pub async fn move_item(&self, id: Uuid, direction: Direction) -> NavResult<NavListing> {
        let snapshot = self.store.snapshot().await?;
        let writes = engine::move_item(&snapshot.items, id, direction)?;
        let items = self.commit(&snapshot, writes).await?;
        Ok(NavListing::from_items(items, false))
    }

    /// Renumbers every sibling group; returns how many items changed.
    pub async fn normalize(&self) -> NavResult<usize> {
        let snapshot = self.store.snapshot().await?;
        let writes = engine::normalize_orders(&snapshot.items);
        let count = writes.len();
        self.commit(&snapshot, writes).await?;
        info!("Normalized navigation orders ({} change(s))", count);
        Ok(count)
    }

    /// Coalesces and applies `writes` against `snapshot`'s revision.
    ///
    /// Returns the items as they stand afterwards, sorted by order.
    async fn commit(&self, snapshot: &NavSnapshot, writes: Vec<NavWrite>) -> NavResult<Vec<NavItem>> {
        let writes = coalesce(writes);
        if writes.is_empty() {
            debug!("Nothing to write at revision {}", snapshot.revision);
            return Ok(snapshot.items.clone());
        }

        let revision = self.store.apply_batch(snapshot.revision, &writes).await?;
        debug!("Committed {} write(s), now at revision {}", writes.len(), revision);

        let mut items = engine::apply(&snapshot.items, &writes);
        items.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }
}
