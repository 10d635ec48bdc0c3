use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::model::{NavItem, NavNode};

/// Deepest level the forest nests to, counting roots as level 1.
///
/// Two JSON levels per node keeps a full listing under the 128-level recursion
/// limit common JSON parsers (serde_json included) apply.
pub const MAX_NESTING: usize = 32;

/// Builds the nested forest from a flat list.
///
/// Input order does not matter; siblings are sorted by `order` with `id` as the
/// tie-breaker. An item whose parent is missing from the set becomes a root
/// instead of being dropped, so dangling references stay visible. The same goes
/// for items on a parent cycle and for children of a node at [`MAX_NESTING`].
pub fn build_tree(items: &[NavItem]) -> Vec<NavNode> {
    let known: HashSet<Uuid> = items.iter().map(|item| item.id).collect();

    let mut children: HashMap<Uuid, Vec<&NavItem>> = HashMap::new();
    let mut roots: Vec<&NavItem> = Vec::new();
    for item in items {
        match item.parent_id {
            Some(parent_id) if parent_id != item.id && known.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(item);
            }
            _ => roots.push(item),
        }
    }
    sort_siblings(&mut roots);
    for group in children.values_mut() {
        sort_siblings(group);
    }

    let mut visited = HashSet::with_capacity(items.len());
    let mut placed = Vec::with_capacity(items.len());
    for root in roots {
        walk(root, &children, &mut visited, &mut placed);
    }

    // Anything still unvisited sits on a parent cycle.
    let mut stranded: Vec<&NavItem> = items.iter().filter(|i| !visited.contains(&i.id)).collect();
    sort_siblings(&mut stranded);
    for item in stranded {
        walk(item, &children, &mut visited, &mut placed);
    }

    assemble(placed)
}

fn sort_siblings(group: &mut [&NavItem]) {
    group.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
}

/// An item in pre-order together with the node it hangs under in the output.
struct Placed<'a> {
    item: &'a NavItem,
    under: Option<Uuid>,
}

/// Pre-order walk from `start` with an explicit stack.
fn walk<'a>(
    start: &'a NavItem,
    children: &HashMap<Uuid, Vec<&'a NavItem>>,
    visited: &mut HashSet<Uuid>,
    placed: &mut Vec<Placed<'a>>,
) {
    let mut stack = vec![(start, None, 1)];
    while let Some((item, under, level)) = stack.pop() {
        if !visited.insert(item.id) {
            continue;
        }
        placed.push(Placed { item, under });

        let Some(group) = children.get(&item.id) else {
            continue;
        };
        for &child in group.iter().rev() {
            if level < MAX_NESTING {
                stack.push((child, Some(item.id), level + 1));
            } else {
                stack.push((child, None, 1));
            }
        }
    }
}

/// Builds nodes bottom-up from a pre-order placement, so no call nests per level.
fn assemble(placed: Vec<Placed<'_>>) -> Vec<NavNode> {
    let mut pending: HashMap<Uuid, Vec<NavNode>> = HashMap::new();
    let mut forest = Vec::new();

    for Placed { item, under } in placed.into_iter().rev() {
        let mut kids = pending.remove(&item.id).unwrap_or_default();
        kids.reverse();
        let node = NavNode {
            item: item.clone(),
            children: kids,
        };
        match under {
            Some(parent_id) => pending.entry(parent_id).or_default().push(node),
            None => forest.push(node),
        }
    }

    forest.reverse();
    forest
}

/// Pre-order flattening of a forest back into items.
pub fn flatten(forest: &[NavNode]) -> Vec<NavItem> {
    let mut out = Vec::new();
    let mut stack: Vec<&NavNode> = forest.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node.item.clone());
        stack.extend(node.children.iter().rev());
    }
    out
}

/// Items that are visible along with every ancestor, in input order.
///
/// Hiding an item hides its whole subtree, however deep. The climb stops at a
/// root, a dangling parent, or a repeat on a parent cycle.
pub fn visible_items(items: &[NavItem]) -> Vec<NavItem> {
    let by_id: HashMap<Uuid, &NavItem> = items.iter().map(|item| (item.id, item)).collect();
    let mut shown: HashMap<Uuid, bool> = HashMap::with_capacity(items.len());

    for item in items {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(item);
        let verdict = loop {
            let Some(node) = current else {
                break true;
            };
            if let Some(&known) = shown.get(&node.id) {
                break known;
            }
            if !seen.insert(node.id) {
                break true;
            }
            path.push(node.id);
            if !node.visible {
                break false;
            }
            current = node.parent_id.and_then(|parent_id| by_id.get(&parent_id).copied());
        };
        for id in path {
            shown.insert(id, verdict);
        }
    }

    items
        .iter()
        .filter(|item| shown.get(&item.id).copied().unwrap_or(false))
        .cloned()
        .collect()
}
