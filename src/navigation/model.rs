use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::tree::MAX_NESTING;

/// A persisted navigation entry.
///
/// `order` is the 1-based rank among items sharing the same `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    pub id: Uuid,
    pub label: String,
    pub href: String,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    pub visible: bool,
    pub parent_id: Option<Uuid>,
}

/// Fields supplied when inserting a new item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNavItem {
    /// Caller-chosen id; generated when absent.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub label: String,
    pub href: String,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Partial update. `None` leaves a field untouched.
///
/// `parent_id` is doubly optional: `Some(None)` moves the item to the root group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl NavItemPatch {
    pub fn order(order: i32) -> Self {
        Self {
            order: Some(order),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.href.is_none()
            && self.visible.is_none()
            && self.parent_id.is_none()
            && self.order.is_none()
    }

    /// Fold `later` into `self`; fields set in `later` win.
    pub fn merge(&mut self, later: NavItemPatch) {
        if later.label.is_some() {
            self.label = later.label;
        }
        if later.href.is_some() {
            self.href = later.href;
        }
        if later.visible.is_some() {
            self.visible = later.visible;
        }
        if later.parent_id.is_some() {
            self.parent_id = later.parent_id;
        }
        if later.order.is_some() {
            self.order = later.order;
        }
    }

    pub fn apply_to(&self, item: &mut NavItem) {
        if let Some(label) = &self.label {
            item.label = label.clone();
        }
        if let Some(href) = &self.href {
            item.href = href.clone();
        }
        if let Some(visible) = self.visible {
            item.visible = visible;
        }
        if let Some(parent_id) = self.parent_id {
            item.parent_id = parent_id;
        }
        if let Some(order) = self.order {
            item.order = order;
        }
    }
}

// Distinguishes an explicit `null` from an absent key.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

/// A single intended persistence write produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum NavWrite {
    Create { item: NavItem },
    Update { id: Uuid, patch: NavItemPatch },
    Delete { id: Uuid },
}

impl NavWrite {
    pub fn id(&self) -> Uuid {
        match self {
            NavWrite::Create { item } => item.id,
            NavWrite::Update { id, .. } | NavWrite::Delete { id } => *id,
        }
    }
}

/// Items read together with the revision they were read at.
#[derive(Debug, Clone, Default)]
pub struct NavSnapshot {
    pub revision: i64,
    pub items: Vec<NavItem>,
}

impl NavSnapshot {
    pub fn new(revision: i64, items: Vec<NavItem>) -> Self {
        Self { revision, items }
    }

    pub fn get(&self, id: Uuid) -> Option<&NavItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// A tree node: the item plus its ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavNode {
    #[serde(flatten)]
    pub item: NavItem,
    pub children: Vec<NavNode>,
}

/// Sibling-relative direction for move up / move down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Limits applied by insert and update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavRules {
    /// Maximum number of levels, counting roots as level 1. `None` leaves only
    /// the [`MAX_NESTING`] ceiling, which a larger value cannot lift.
    pub max_depth: Option<usize>,
}

impl NavRules {
    pub fn depth_limit(&self) -> usize {
        self.max_depth.map_or(MAX_NESTING, |max| max.min(MAX_NESTING))
    }
}
