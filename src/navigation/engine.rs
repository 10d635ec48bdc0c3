//! Ordering and acyclicity rules for the navigation forest.
//!
//! Every operation here is a pure function over a snapshot of items. Nothing is
//! mutated in place; callers get back the writes to apply as one atomic batch.

use std::collections::{BTreeMap, HashMap, HashSet};

use url::Url;
use uuid::Uuid;

use super::error::NavError;
use super::model::{Direction, NavItem, NavItemPatch, NavRules, NavWrite, NewNavItem};

const MAX_LABEL_CHARS: usize = 200;
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

pub type NavResult<T> = Result<T, NavError>;

/// Trimmed, non-empty label.
pub fn validate_label(label: &str) -> NavResult<String> {
    let label = label.trim();
    if label.is_empty() {
        return Err(NavError::validation("label must not be empty"));
    }
    if label.chars().count() > MAX_LABEL_CHARS {
        return Err(NavError::validation(format!(
            "label must be at most {} characters",
            MAX_LABEL_CHARS
        )));
    }
    Ok(label.to_string())
}

/// Accepts a site path (`/about`), a fragment (`#contact`) or an absolute
/// http/https/mailto/tel URL.
pub fn validate_href(href: &str) -> NavResult<String> {
    let href = href.trim();
    if href.is_empty() {
        return Err(NavError::validation("href must not be empty"));
    }
    if href.chars().any(char::is_whitespace) {
        return Err(NavError::validation("href must not contain whitespace"));
    }
    if href.starts_with("//") {
        return Err(NavError::validation(
            "protocol-relative hrefs are not allowed; use an absolute URL",
        ));
    }
    if href.starts_with('/') || href.starts_with('#') {
        return Ok(href.to_string());
    }

    match Url::parse(href) {
        Ok(url) if ALLOWED_SCHEMES.contains(&url.scheme()) => Ok(href.to_string()),
        Ok(url) => Err(NavError::validation(format!(
            "href scheme '{}' is not allowed",
            url.scheme()
        ))),
        Err(_) => Err(NavError::validation(
            "href must be a path starting with '/', a '#fragment' or an absolute URL",
        )),
    }
}

/// Members of one sibling group, sorted by `order` then `id`.
pub fn siblings(items: &[NavItem], parent_id: Option<Uuid>) -> Vec<&NavItem> {
    let mut group: Vec<&NavItem> = items.iter().filter(|i| i.parent_id == parent_id).collect();
    group.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    group
}

/// `max(order) + 1` within the group, or 1 when the group is empty.
pub fn next_order(items: &[NavItem], parent_id: Option<Uuid>) -> i32 {
    items
        .iter()
        .filter(|i| i.parent_id == parent_id)
        .map(|i| i.order)
        .max()
        .map_or(1, |max| max + 1)
}

fn children_index(items: &[NavItem]) -> HashMap<Uuid, Vec<Uuid>> {
    let mut index: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for item in items {
        if let Some(parent_id) = item.parent_id {
            index.entry(parent_id).or_default().push(item.id);
        }
    }
    index
}

/// Every id reachable below `id` through parent links.
pub fn descendants(items: &[NavItem], id: Uuid) -> HashSet<Uuid> {
    let index = children_index(items);
    let mut found = HashSet::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        for child in index.get(&current).into_iter().flatten() {
            if found.insert(*child) {
                stack.push(*child);
            }
        }
    }
    found
}

/// Level of an item, roots being level 1. The walk is bounded by the item count.
pub fn depth_of(items: &[NavItem], id: Uuid) -> usize {
    let parents: HashMap<Uuid, Option<Uuid>> = items.iter().map(|i| (i.id, i.parent_id)).collect();
    let mut depth = 1;
    let mut current = parents.get(&id).copied().flatten();
    while let Some(parent_id) = current {
        if depth > items.len() || !parents.contains_key(&parent_id) {
            break;
        }
        depth += 1;
        current = parents.get(&parent_id).copied().flatten();
    }
    depth
}

/// Number of levels in the subtree rooted at `id` (1 for a leaf).
fn subtree_height(items: &[NavItem], id: Uuid) -> usize {
    let index = children_index(items);
    let mut seen = HashSet::from([id]);
    let mut level = vec![id];
    let mut height = 0;
    while !level.is_empty() {
        height += 1;
        level = level
            .iter()
            .flat_map(|current| index.get(current).into_iter().flatten())
            .filter(|child| seen.insert(**child))
            .copied()
            .collect();
    }
    height
}

fn find(items: &[NavItem], id: Uuid) -> NavResult<&NavItem> {
    items.iter().find(|i| i.id == id).ok_or(NavError::NotFound(id))
}

fn check_depth(rules: &NavRules, levels: usize) -> NavResult<()> {
    let max = rules.depth_limit();
    if levels > max {
        return Err(NavError::validation(format!(
            "navigation may be at most {} level(s) deep",
            max
        )));
    }
    Ok(())
}

/// Appends a new item to the end of its target sibling group.
///
/// Existing siblings are not renumbered.
pub fn insert(
    items: &[NavItem],
    rules: &NavRules,
    fields: NewNavItem,
) -> NavResult<(NavItem, Vec<NavWrite>)> {
    let label = validate_label(&fields.label)?;
    let href = validate_href(&fields.href)?;

    if let Some(parent_id) = fields.parent_id {
        find(items, parent_id)?;
        check_depth(rules, depth_of(items, parent_id) + 1)?;
    }

    let id = fields.id.unwrap_or_else(Uuid::new_v4);
    if items.iter().any(|i| i.id == id) {
        return Err(NavError::validation(format!("item {} already exists", id)));
    }

    let item = NavItem {
        id,
        label,
        href,
        order: next_order(items, fields.parent_id),
        visible: fields.visible.unwrap_or(true),
        parent_id: fields.parent_id,
    };

    Ok((item.clone(), vec![NavWrite::Create { item }]))
}

/// Applies a partial update to one item.
///
/// A changed `parent_id` is checked against the current snapshot for cycles,
/// but the item is not renumbered into its new group; follow with [`place`]
/// and [`normalize_orders`] for that.
pub fn update(
    items: &[NavItem],
    rules: &NavRules,
    id: Uuid,
    mut patch: NavItemPatch,
) -> NavResult<(NavItem, Vec<NavWrite>)> {
    let current = find(items, id)?;

    // Restating the current parent is not a move.
    if patch.parent_id == Some(current.parent_id) {
        patch.parent_id = None;
    }

    if let Some(label) = patch.label.take() {
        patch.label = Some(validate_label(&label)?);
    }
    if let Some(href) = patch.href.take() {
        patch.href = Some(validate_href(&href)?);
    }
    if let Some(order) = patch.order {
        if order < 1 {
            return Err(NavError::validation("order must be at least 1"));
        }
    }

    if let Some(Some(parent_id)) = patch.parent_id {
        if parent_id == id || descendants(items, id).contains(&parent_id) {
            return Err(NavError::Cycle { id, parent_id });
        }
        find(items, parent_id)?;
        check_depth(
            rules,
            depth_of(items, parent_id) + subtree_height(items, id),
        )?;
    } else if let Some(None) = patch.parent_id {
        check_depth(rules, subtree_height(items, id))?;
    }

    let mut updated = current.clone();
    patch.apply_to(&mut updated);

    let writes = if patch.is_empty() {
        vec![]
    } else {
        vec![NavWrite::Update { id, patch }]
    };
    Ok((updated, writes))
}

/// Assigns `order = index + 1` to a complete sibling group.
///
/// `ordered_ids` must be exactly the group's current membership.
pub fn reorder_siblings(
    items: &[NavItem],
    parent_id: Option<Uuid>,
    ordered_ids: &[Uuid],
) -> NavResult<Vec<NavWrite>> {
    if let Some(parent_id) = parent_id {
        find(items, parent_id)?;
    }

    let group = siblings(items, parent_id);
    let members: HashSet<Uuid> = group.iter().map(|i| i.id).collect();
    let requested: HashSet<Uuid> = ordered_ids.iter().copied().collect();
    if requested.len() != ordered_ids.len() {
        return Err(NavError::validation("reorder list contains duplicate ids"));
    }
    if requested != members {
        return Err(NavError::validation(format!(
            "reorder list must contain exactly the {} current member(s) of the sibling group",
            members.len()
        )));
    }

    let orders: HashMap<Uuid, i32> = group.iter().map(|i| (i.id, i.order)).collect();
    Ok(ordered_ids
        .iter()
        .enumerate()
        .filter_map(|(index, id)| {
            let order = index as i32 + 1;
            (orders.get(id) != Some(&order)).then(|| NavWrite::Update {
                id: *id,
                patch: NavItemPatch::order(order),
            })
        })
        .collect())
}

/// Swaps an item with its neighbour. No writes at either boundary.
pub fn move_item(items: &[NavItem], id: Uuid, direction: Direction) -> NavResult<Vec<NavWrite>> {
    let item = find(items, id)?;
    let mut ids: Vec<Uuid> = siblings(items, item.parent_id).iter().map(|i| i.id).collect();
    let index = ids
        .iter()
        .position(|sibling| *sibling == id)
        .ok_or(NavError::NotFound(id))?;

    let target = match direction {
        Direction::Up if index > 0 => index - 1,
        Direction::Down if index + 1 < ids.len() => index + 1,
        _ => return Ok(vec![]),
    };
    ids.swap(index, target);
    reorder_siblings(items, item.parent_id, &ids)
}

/// Puts an item at a 1-based position within its current sibling group,
/// shifting the others. Positions past the end append.
pub fn place(items: &[NavItem], id: Uuid, position: usize) -> NavResult<Vec<NavWrite>> {
    let item = find(items, id)?;
    let mut ids: Vec<Uuid> = siblings(items, item.parent_id)
        .iter()
        .map(|i| i.id)
        .filter(|sibling| *sibling != id)
        .collect();
    let index = position.saturating_sub(1).min(ids.len());
    ids.insert(index, id);
    reorder_siblings(items, item.parent_id, &ids)
}

/// Deletes an item. Its direct children take its slot in the former parent's
/// group, keeping their relative order, and that group is renumbered.
pub fn remove(items: &[NavItem], id: Uuid) -> NavResult<Vec<NavWrite>> {
    let item = find(items, id)?;
    let group: Vec<&NavItem> = siblings(items, item.parent_id);
    let children: Vec<&NavItem> = siblings(items, Some(id));
    let child_ids: HashSet<Uuid> = children.iter().map(|c| c.id).collect();

    let index = group.iter().position(|g| g.id == id).unwrap_or(group.len());
    let regrouped = group[..index]
        .iter()
        .chain(children.iter())
        .chain(group.iter().skip(index + 1));

    let mut writes: Vec<NavWrite> = regrouped
        .enumerate()
        .filter_map(|(position, member)| {
            let order = position as i32 + 1;
            if child_ids.contains(&member.id) {
                Some(NavWrite::Update {
                    id: member.id,
                    patch: NavItemPatch {
                        parent_id: Some(item.parent_id),
                        order: Some(order),
                        ..Default::default()
                    },
                })
            } else if member.order != order {
                Some(NavWrite::Update {
                    id: member.id,
                    patch: NavItemPatch::order(order),
                })
            } else {
                None
            }
        })
        .collect();

    // Children are re-pointed before the row they referenced goes away.
    writes.push(NavWrite::Delete { id });
    Ok(writes)
}

/// Renumbers every sibling group to 1..N, keeping the current relative order.
///
/// Only items whose position differs are written, so a second run yields nothing.
pub fn normalize_orders(items: &[NavItem]) -> Vec<NavWrite> {
    let mut groups: BTreeMap<Option<Uuid>, Vec<&NavItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.parent_id).or_default().push(item);
    }

    let mut writes = Vec::new();
    for group in groups.values_mut() {
        group.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        for (index, item) in group.iter().enumerate() {
            let order = index as i32 + 1;
            if item.order != order {
                writes.push(NavWrite::Update {
                    id: item.id,
                    patch: NavItemPatch::order(order),
                });
            }
        }
    }
    writes
}

/// Applies writes to a copy of the snapshot.
pub fn apply(items: &[NavItem], writes: &[NavWrite]) -> Vec<NavItem> {
    let mut next = items.to_vec();
    for write in writes {
        match write {
            NavWrite::Create { item } => next.push(item.clone()),
            NavWrite::Update { id, patch } => {
                if let Some(item) = next.iter_mut().find(|i| i.id == *id) {
                    patch.apply_to(item);
                }
            }
            NavWrite::Delete { id } => next.retain(|i| i.id != *id),
        }
    }
    next
}

/// Collapses a write list so each id is touched at most once, except that a
/// delete always lands after every surviving update.
pub fn coalesce(writes: Vec<NavWrite>) -> Vec<NavWrite> {
    let mut out: Vec<Option<NavWrite>> = Vec::with_capacity(writes.len());
    let mut slots: HashMap<Uuid, usize> = HashMap::new();

    for write in writes {
        let id = write.id();
        match (write, slots.get(&id).copied()) {
            (NavWrite::Update { patch, .. }, Some(slot)) => match out[slot].as_mut() {
                Some(NavWrite::Create { item }) => patch.apply_to(item),
                Some(NavWrite::Update { patch: earlier, .. }) => earlier.merge(patch),
                _ => {}
            },
            (NavWrite::Delete { id }, Some(slot)) => {
                let created_here = matches!(out[slot], Some(NavWrite::Create { .. }));
                out[slot] = None;
                if !created_here {
                    slots.insert(id, out.len());
                    out.push(Some(NavWrite::Delete { id }));
                }
            }
            (write, Some(_)) => {
                tracing::warn!(%id, "dropping write for an id already written in this batch");
                drop(write);
            }
            (write, None) => {
                slots.insert(id, out.len());
                out.push(Some(write));
            }
        }
    }

    out.into_iter()
        .flatten()
        .filter(|w| !matches!(w, NavWrite::Update { patch, .. } if patch.is_empty()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::MAX_NESTING;
    use crate::testing::{assert_contiguous, FixtureSet};

    fn rules() -> NavRules {
        NavRules::default()
    }

    fn new_item(label: &str, href: &str, parent_id: Option<Uuid>) -> NewNavItem {
        NewNavItem {
            label: label.into(),
            href: href.into(),
            parent_id,
            ..Default::default()
        }
    }

    #[test]
    fn insert_then_list_scenario() {
        let (home, writes) = insert(&[], &rules(), new_item("Home", "/", None)).unwrap();
        let items = apply(&[], &writes);
        let (about, writes) = insert(&items, &rules(), new_item("About", "/about", None)).unwrap();
        let items = apply(&items, &writes);

        assert_eq!(home.order, 1);
        assert_eq!(about.order, 2);
        assert_eq!(home.parent_id, None);

        let tree = crate::navigation::build_tree(&items);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].item.id, home.id);
        assert_eq!(tree[1].item.id, about.id);
    }

    #[test]
    fn insert_appends_after_max_without_renumbering() {
        let mut set = FixtureSet::default();
        set.root("A", 1);
        set.root("B", 5);
        let (item, writes) = insert(&set.items, &rules(), new_item("C", "/c", None)).unwrap();
        assert_eq!(item.order, 6);
        assert_eq!(writes.len(), 1);
    }

    #[test]
    fn insert_under_parent_starts_at_one() {
        let mut set = FixtureSet::default();
        let shop = set.root("Shop", 1);
        let (item, _) = insert(&set.items, &rules(), new_item("Deals", "/deals", Some(shop))).unwrap();
        assert_eq!(item.order, 1);
        assert_eq!(item.parent_id, Some(shop));
    }

    #[test]
    fn insert_rejects_bad_shapes() {
        for (label, href) in [
            ("", "/"),
            ("   ", "/"),
            ("Ok", ""),
            ("Ok", "no-slash"),
            ("Ok", "javascript:alert(1)"),
            ("Ok", "//evil.example.com"),
            ("Ok", "/has space"),
        ] {
            let err = insert(&[], &rules(), new_item(label, href, None)).unwrap_err();
            assert!(matches!(err, NavError::Validation(_)), "{label:?} {href:?}: {err}");
        }
    }

    #[test]
    fn insert_accepts_urls_and_trims() {
        let (item, _) = insert(&[], &rules(), new_item("  Docs ", " https://example.com/docs ", None)).unwrap();
        assert_eq!(item.label, "Docs");
        assert_eq!(item.href, "https://example.com/docs");
        assert!(insert(&[], &rules(), new_item("Mail", "mailto:hi@example.com", None)).is_ok());
        assert!(insert(&[], &rules(), new_item("Top", "#top", None)).is_ok());
    }

    #[test]
    fn insert_rejects_unknown_parent_and_duplicate_id() {
        let err = insert(&[], &rules(), new_item("X", "/x", Some(Uuid::new_v4()))).unwrap_err();
        assert!(matches!(err, NavError::NotFound(_)));

        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let mut fields = new_item("Dup", "/dup", None);
        fields.id = Some(a);
        assert!(matches!(insert(&set.items, &rules(), fields), Err(NavError::Validation(_))));
    }

    #[test]
    fn insert_honours_max_depth() {
        let mut set = FixtureSet::default();
        let shop = set.root("Shop", 1);
        let deals = set.child("Deals", shop, 1);
        let two_levels = NavRules { max_depth: Some(2) };

        assert!(insert(&set.items, &two_levels, new_item("Ok", "/ok", Some(shop))).is_ok());
        let err = insert(&set.items, &two_levels, new_item("Deep", "/deep", Some(deals))).unwrap_err();
        assert!(matches!(err, NavError::Validation(_)));
    }

    #[test]
    fn nesting_ceiling_applies_without_configured_depth() {
        let mut set = FixtureSet::default();
        let mut parent = set.root("L1", 1);
        for level in 2..=MAX_NESTING {
            parent = set.child(&format!("L{level}"), parent, 1);
        }

        let err = insert(&set.items, &rules(), new_item("Deeper", "/deeper", Some(parent))).unwrap_err();
        assert!(matches!(err, NavError::Validation(_)));

        let lifted = NavRules {
            max_depth: Some(MAX_NESTING * 4),
        };
        assert!(insert(&set.items, &lifted, new_item("Deeper", "/deeper", Some(parent))).is_err());
    }

    #[test]
    fn restating_parent_writes_no_parent_change() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let a1 = set.child("A1", a, 1);
        let patch = NavItemPatch {
            label: Some("Renamed".into()),
            parent_id: Some(Some(a)),
            ..Default::default()
        };

        let (updated, writes) = update(&set.items, &rules(), a1, patch).unwrap();
        assert_eq!(updated.parent_id, Some(a));
        assert_eq!(updated.order, 1);
        match writes.as_slice() {
            [NavWrite::Update { patch, .. }] => {
                assert_eq!(patch.label.as_deref(), Some("Renamed"));
                assert_eq!(patch.parent_id, None);
            }
            other => panic!("unexpected writes: {other:?}"),
        }
    }

    #[test]
    fn update_only_touches_given_fields() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let patch = NavItemPatch {
            visible: Some(false),
            ..Default::default()
        };
        let (updated, writes) = update(&set.items, &rules(), a, patch.clone()).unwrap();
        assert!(!updated.visible);
        assert_eq!(updated.label, "A");
        assert_eq!(writes, vec![NavWrite::Update { id: a, patch }]);
    }

    #[test]
    fn update_missing_item_is_not_found() {
        let err = update(&[], &rules(), Uuid::new_v4(), NavItemPatch::default()).unwrap_err();
        assert!(matches!(err, NavError::NotFound(_)));
    }

    #[test]
    fn reparent_under_self_or_descendant_is_a_cycle() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.child("B", a, 1);
        let c = set.child("C", b, 1);

        for target in [a, b, c] {
            let patch = NavItemPatch {
                parent_id: Some(Some(target)),
                ..Default::default()
            };
            let err = update(&set.items, &rules(), a, patch).unwrap_err();
            assert!(matches!(err, NavError::Cycle { .. }), "target {target}");
        }
    }

    #[test]
    fn reparent_rejection_leaves_snapshot_untouched() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.child("B", a, 1);
        let before = set.items.clone();

        let patch = NavItemPatch {
            parent_id: Some(Some(b)),
            ..Default::default()
        };
        assert!(matches!(
            update(&set.items, &rules(), a, patch),
            Err(NavError::Cycle { .. })
        ));
        assert_eq!(set.items, before);
    }

    #[test]
    fn reparent_keeps_old_order_until_placed() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.root("B", 2);
        set.child("A1", a, 1);

        let patch = NavItemPatch {
            parent_id: Some(Some(a)),
            ..Default::default()
        };
        let (updated, _) = update(&set.items, &rules(), b, patch).unwrap();
        assert_eq!(updated.parent_id, Some(a));
        assert_eq!(updated.order, 2);
    }

    #[test]
    fn reparent_respects_max_depth_of_whole_subtree() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.root("B", 2);
        set.child("B1", b, 1);
        let two_levels = NavRules { max_depth: Some(2) };

        let patch = NavItemPatch {
            parent_id: Some(Some(a)),
            ..Default::default()
        };
        let err = update(&set.items, &two_levels, b, patch).unwrap_err();
        assert!(matches!(err, NavError::Validation(_)));
    }

    #[test]
    fn reorder_scenario() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.root("B", 2);
        let c = set.root("C", 3);

        let writes = reorder_siblings(&set.items, None, &[b, a, c]).unwrap();
        let items = apply(&set.items, &writes);
        let order_of = |id| items.iter().find(|i| i.id == id).unwrap().order;
        assert_eq!((order_of(b), order_of(a), order_of(c)), (1, 2, 3));
        assert_eq!(writes.len(), 2);
    }

    #[test]
    fn reorder_leaves_other_groups_alone() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.root("B", 2);
        let a1 = set.child("A1", a, 3);

        let writes = reorder_siblings(&set.items, None, &[b, a]).unwrap();
        assert!(writes.iter().all(|w| w.id() != a1));
    }

    #[test]
    fn reorder_rejects_mismatched_membership() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.root("B", 2);
        let a1 = set.child("A1", a, 1);

        for ids in [vec![a], vec![a, b, a1], vec![a, a, b], vec![a, Uuid::new_v4()]] {
            let err = reorder_siblings(&set.items, None, &ids).unwrap_err();
            assert!(matches!(err, NavError::Validation(_)), "{ids:?}");
        }
    }

    #[test]
    fn reorder_repairs_gaps() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 2);
        let b = set.root("B", 7);
        let writes = reorder_siblings(&set.items, None, &[a, b]).unwrap();
        assert_contiguous(&apply(&set.items, &writes));
    }

    #[test]
    fn move_swaps_with_neighbour_and_stops_at_edges() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.root("B", 2);

        assert!(move_item(&set.items, a, Direction::Up).unwrap().is_empty());
        assert!(move_item(&set.items, b, Direction::Down).unwrap().is_empty());

        let writes = move_item(&set.items, b, Direction::Up).unwrap();
        let items = apply(&set.items, &writes);
        let first = siblings(&items, None)[0].id;
        assert_eq!(first, b);
    }

    #[test]
    fn place_inserts_at_position() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.root("B", 2);
        let c = set.root("C", 3);

        let writes = place(&set.items, c, 1).unwrap();
        let items = apply(&set.items, &writes);
        let ids: Vec<Uuid> = siblings(&items, None).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![c, a, b]);

        let writes = place(&set.items, a, 99).unwrap();
        let items = apply(&set.items, &writes);
        let ids: Vec<Uuid> = siblings(&items, None).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![b, c, a]);
    }

    #[test]
    fn delete_renormalizes_scenario() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.root("B", 2);
        let c = set.root("C", 3);

        let writes = remove(&set.items, b).unwrap();
        let items = apply(&set.items, &writes);
        let ids: Vec<(Uuid, i32)> = siblings(&items, None).iter().map(|i| (i.id, i.order)).collect();
        assert_eq!(ids, vec![(a, 1), (c, 2)]);
    }

    #[test]
    fn delete_lifts_children_into_the_gap() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.root("B", 2);
        let c = set.root("C", 3);
        let b1 = set.child("B1", b, 1);
        let b2 = set.child("B2", b, 2);
        let b1x = set.child("B1x", b1, 1);

        let writes = remove(&set.items, b).unwrap();
        assert_eq!(writes.last(), Some(&NavWrite::Delete { id: b }));

        let items = apply(&set.items, &writes);
        let ids: Vec<Uuid> = siblings(&items, None).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a, b1, b2, c]);
        assert_eq!(items.iter().find(|i| i.id == b1x).unwrap().parent_id, Some(b1));
        assert!(items.iter().all(|i| i.parent_id != Some(b)));
        assert_contiguous(&items);
    }

    #[test]
    fn delete_nested_item_lifts_into_parent_group() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let a1 = set.child("A1", a, 1);
        let a2 = set.child("A2", a, 2);
        let a1x = set.child("A1x", a1, 1);

        let items = apply(&set.items, &remove(&set.items, a1).unwrap());
        let ids: Vec<Uuid> = siblings(&items, Some(a)).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a1x, a2]);
        assert_contiguous(&items);
    }

    #[test]
    fn delete_missing_is_not_found() {
        assert!(matches!(remove(&[], Uuid::new_v4()), Err(NavError::NotFound(_))));
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 4);
        set.root("B", 4);
        set.root("C", 9);
        set.child("A1", a, 0);
        set.child("A2", a, 3);

        let first = normalize_orders(&set.items);
        assert!(!first.is_empty());
        let items = apply(&set.items, &first);
        assert_contiguous(&items);
        assert!(normalize_orders(&items).is_empty());
    }

    #[test]
    fn normalize_keeps_relative_order() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 10);
        let b = set.root("B", 20);
        let items = apply(&set.items, &normalize_orders(&set.items));
        let ids: Vec<Uuid> = siblings(&items, None).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn descendants_walks_all_levels() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.child("B", a, 1);
        let c = set.child("C", b, 1);
        set.root("D", 2);

        assert_eq!(descendants(&set.items, a), HashSet::from([b, c]));
        assert!(descendants(&set.items, c).is_empty());
    }

    #[test]
    fn coalesce_merges_and_orders_deletes_last() {
        let mut set = FixtureSet::default();
        let a = set.root("A", 1);
        let b = set.root("B", 2);

        let writes = vec![
            NavWrite::Update { id: a, patch: NavItemPatch::order(3) },
            NavWrite::Update {
                id: a,
                patch: NavItemPatch { visible: Some(false), ..Default::default() },
            },
            NavWrite::Delete { id: b },
            NavWrite::Update { id: b, patch: NavItemPatch::order(1) },
        ];
        let merged = coalesce(writes);
        assert_eq!(
            merged,
            vec![
                NavWrite::Update {
                    id: a,
                    patch: NavItemPatch {
                        visible: Some(false),
                        order: Some(3),
                        ..Default::default()
                    },
                },
                NavWrite::Delete { id: b },
            ]
        );
    }

    #[test]
    fn coalesce_folds_updates_into_create_and_cancels_create_delete() {
        let (item, mut writes) = insert(&[], &rules(), new_item("A", "/a", None)).unwrap();
        writes.push(NavWrite::Update { id: item.id, patch: NavItemPatch::order(4) });
        let merged = coalesce(writes.clone());
        assert!(matches!(&merged[..], [NavWrite::Create { item }] if item.order == 4));

        writes.push(NavWrite::Delete { id: item.id });
        assert!(coalesce(writes).is_empty());
    }
}
