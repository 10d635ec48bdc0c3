//! Navigation menu model and the tree/order engine.

pub mod engine;
pub mod error;
pub mod model;
pub mod tree;

pub use engine::{
    coalesce, descendants, insert, move_item, normalize_orders, place, remove, reorder_siblings,
    update, NavResult,
};
pub use error::NavError;
pub use model::{Direction, NavItem, NavItemPatch, NavNode, NavRules, NavSnapshot, NavWrite, NewNavItem};
pub use tree::{build_tree, flatten, visible_items, MAX_NESTING};
