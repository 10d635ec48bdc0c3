use std::collections::BTreeMap;

use uuid::Uuid;

use crate::navigation::NavItem;

/// Builds a standalone item with a fresh id.
pub fn item(label: &str, href: &str, order: i32, parent_id: Option<Uuid>) -> NavItem {
    NavItem {
        id: Uuid::new_v4(),
        label: label.to_string(),
        href: href.to_string(),
        order,
        visible: true,
        parent_id,
    }
}

/// Accumulates items for a test snapshot, handing back ids for wiring parents.
#[derive(Debug, Default, Clone)]
pub struct FixtureSet {
    pub items: Vec<NavItem>,
}

impl FixtureSet {
    pub fn root(&mut self, label: &str, order: i32) -> Uuid {
        self.push(label, order, None)
    }

    pub fn child(&mut self, label: &str, parent_id: Uuid, order: i32) -> Uuid {
        self.push(label, order, Some(parent_id))
    }

    fn push(&mut self, label: &str, order: i32, parent_id: Option<Uuid>) -> Uuid {
        let href = format!("/{}", label.to_lowercase());
        let item = item(label, &href, order, parent_id);
        let id = item.id;
        self.items.push(item);
        id
    }
}

/// Panics unless every sibling group is numbered exactly 1..N.
pub fn assert_contiguous(items: &[NavItem]) {
    let mut groups: BTreeMap<Option<Uuid>, Vec<i32>> = BTreeMap::new();
    for item in items {
        groups.entry(item.parent_id).or_default().push(item.order);
    }
    for (parent_id, mut orders) in groups {
        orders.sort_unstable();
        let expected: Vec<i32> = (1..=orders.len() as i32).collect();
        assert_eq!(orders, expected, "sibling group {:?} is not contiguous", parent_id);
    }
}
