//! Forest construction from the two flat catalog collections
//!
//! `build_forest` is a pure function: records in, ordered forest out. It
//! never drops a record. Group parents that do not resolve promote the
//! group to root, and cycles in the group hierarchy are handled per
//! [`CyclePolicy`]. Items attach after all groups are placed, so a
//! subgroup always exists before its items arrive.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::catalog::{Group, Item, TreeNode};
use crate::tree::collate::compare_ru;

/// Errors that can occur during forest construction
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("cyclic group hierarchy involving group {0}")]
    CyclicHierarchy(u64),
}

pub type Result<T> = std::result::Result<T, TreeError>;

/// What to do when the group hierarchy closes a cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Cut the edge that closes the cycle and promote that group to root
    PromoteToRoot,
    /// Refuse to build; the caller keeps whatever snapshot it already has
    Reject,
}

impl Default for CyclePolicy {
    fn default() -> Self {
        CyclePolicy::PromoteToRoot
    }
}

/// Tunables for forest construction
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub cycle_policy: CyclePolicy,
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    Pending,
    InPath,
    Done,
}

/// Build the ordered forest for one catalog domain
///
/// Both passes keep every record: groups whose parent cannot be resolved
/// and items whose group cannot be resolved land at the root. Children at
/// every level are sorted groups-first, then by Russian collation on the
/// name, then by id.
pub fn build_forest(
    groups: &[Group],
    items: &[Item],
    options: &BuildOptions,
) -> Result<Vec<TreeNode>> {
    // Last record wins on a duplicated id, so each id maps to one node.
    let mut group_index: HashMap<u64, &Group> = HashMap::with_capacity(groups.len());
    for group in groups {
        if group_index.insert(group.id, group).is_some() {
            warn!(group_id = group.id, "duplicate group id, keeping the later record");
        }
    }

    let mut group_ids: Vec<u64> = group_index.keys().copied().collect();
    group_ids.sort_unstable();

    // Effective parent: the declared one when it resolves, otherwise root.
    // Self-references stay in the map here so the cycle walk reports them.
    let mut parent_of: HashMap<u64, Option<u64>> = HashMap::with_capacity(group_ids.len());
    for &id in &group_ids {
        let declared = group_index[&id].parent_group_id;
        let effective = match declared {
            Some(parent_id) if group_index.contains_key(&parent_id) => Some(parent_id),
            Some(parent_id) => {
                warn!(
                    group_id = id,
                    parent_group_id = parent_id,
                    "group references a missing parent, promoting to root"
                );
                None
            }
            None => None,
        };
        parent_of.insert(id, effective);
    }

    resolve_cycles(&group_ids, &mut parent_of, options.cycle_policy)?;

    // First pass: group adjacency.
    let mut subgroups: HashMap<u64, Vec<u64>> = HashMap::new();
    let mut root_group_ids: Vec<u64> = Vec::new();
    for &id in &group_ids {
        match parent_of[&id] {
            Some(parent_id) => subgroups.entry(parent_id).or_default().push(id),
            None => root_group_ids.push(id),
        }
    }

    // Second pass: items attach to the now-complete group layer.
    let mut item_index: HashMap<u64, &Item> = HashMap::with_capacity(items.len());
    for item in items {
        if item_index.insert(item.id, item).is_some() {
            warn!(item_id = item.id, "duplicate item id, keeping the later record");
        }
    }

    let mut items_of: HashMap<u64, Vec<&Item>> = HashMap::new();
    let mut root_items: Vec<&Item> = Vec::new();
    for item in item_index.values().copied() {
        match item.group_id {
            Some(group_id) if group_index.contains_key(&group_id) => {
                items_of.entry(group_id).or_default().push(item);
            }
            Some(group_id) => {
                warn!(
                    item_id = item.id,
                    group_id = group_id,
                    "item references a missing group, promoting to root"
                );
                root_items.push(item);
            }
            None => root_items.push(item),
        }
    }

    let mut forest: Vec<TreeNode> = root_group_ids
        .iter()
        .map(|id| materialize(group_index[id], &group_index, &subgroups, &items_of))
        .collect();
    forest.extend(root_items.into_iter().map(TreeNode::from_item));
    sort_siblings(&mut forest);

    Ok(forest)
}

/// Walk parent chains and break (or reject) every cycle
///
/// Starts are scanned in ascending id order, so which edge gets cut is a
/// deterministic function of the input set.
fn resolve_cycles(
    group_ids: &[u64],
    parent_of: &mut HashMap<u64, Option<u64>>,
    policy: CyclePolicy,
) -> Result<()> {
    let mut visit: HashMap<u64, Visit> =
        group_ids.iter().map(|&id| (id, Visit::Pending)).collect();

    for &start in group_ids {
        if visit[&start] != Visit::Pending {
            continue;
        }

        let mut path: Vec<u64> = Vec::new();
        let mut current = start;
        loop {
            match visit[&current] {
                Visit::Done => break,
                Visit::InPath => {
                    // `current` is the node the chain re-entered; its
                    // parent edge is the one that closes the cycle.
                    match policy {
                        CyclePolicy::Reject => return Err(TreeError::CyclicHierarchy(current)),
                        CyclePolicy::PromoteToRoot => {
                            warn!(
                                group_id = current,
                                "group hierarchy cycle cut, promoting to root"
                            );
                            parent_of.insert(current, None);
                            break;
                        }
                    }
                }
                Visit::Pending => {
                    visit.insert(current, Visit::InPath);
                    path.push(current);
                    match parent_of[&current] {
                        Some(parent_id) => current = parent_id,
                        None => break,
                    }
                }
            }
        }

        for id in path {
            visit.insert(id, Visit::Done);
        }
    }

    Ok(())
}

fn materialize(
    group: &Group,
    group_index: &HashMap<u64, &Group>,
    subgroups: &HashMap<u64, Vec<u64>>,
    items_of: &HashMap<u64, Vec<&Item>>,
) -> TreeNode {
    let mut node = TreeNode::from_group(group);

    if let Some(child_ids) = subgroups.get(&group.id) {
        for child_id in child_ids {
            if let Some(child) = group_index.get(child_id) {
                node.children
                    .push(materialize(child, group_index, subgroups, items_of));
            }
        }
    }
    if let Some(attached) = items_of.get(&group.id) {
        node.children
            .extend(attached.iter().map(|item| TreeNode::from_item(item)));
    }

    sort_siblings(&mut node.children);
    node
}

/// Sibling order: groups first, then Russian collation on the name, then id
fn sort_siblings(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| {
        a.key
            .kind
            .cmp(&b.key.kind)
            .then_with(|| compare_ru(&a.name, &b.name))
            .then_with(|| a.key.id.cmp(&b.key.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{find_in_forest, forest_len, NodeKey};

    fn names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|node| node.name.as_str()).collect()
    }

    fn build(groups: &[Group], items: &[Item]) -> Vec<TreeNode> {
        build_forest(groups, items, &BuildOptions::default()).unwrap()
    }

    #[test]
    fn test_builds_sample_catalog() {
        let groups = vec![Group::new(1, "Продажи"), Group::new(2, "Аренда").parent(1)];
        let items = vec![
            Item::new(10, "Розница").group(2),
            Item::new(11, "Опт").group(1),
        ];

        let forest = build(&groups, &items);
        assert_eq!(names(&forest), vec!["Продажи"]);
        assert_eq!(names(&forest[0].children), vec!["Аренда", "Опт"]);
        assert_eq!(names(&forest[0].children[0].children), vec!["Розница"]);
    }

    #[test]
    fn test_every_record_appears_exactly_once() {
        let groups = vec![
            Group::new(1, "Продажи"),
            Group::new(2, "Аренда").parent(1),
            Group::new(3, "Прочее").parent(99),
        ];
        let items = vec![
            Item::new(10, "Опт").group(2),
            Item::new(11, "Розница").group(77),
            Item::new(12, "Без группы"),
        ];

        let forest = build(&groups, &items);
        assert_eq!(forest_len(&forest), groups.len() + items.len());
        for group in &groups {
            assert!(find_in_forest(&forest, NodeKey::group(group.id)).is_some());
        }
        for item in &items {
            assert!(find_in_forest(&forest, NodeKey::item(item.id)).is_some());
        }
    }

    #[test]
    fn test_groups_sort_before_items_at_every_depth() {
        let groups = vec![Group::new(1, "Яблоки"), Group::new(2, "Аренда").parent(1)];
        let items = vec![
            Item::new(10, "Авокадо").group(1),
            Item::new(11, "Авокадо"),
        ];

        let forest = build(&groups, &items);
        // Root: the item name sorts first alphabetically, the group still wins.
        assert_eq!(names(&forest), vec!["Яблоки", "Авокадо"]);
        assert_eq!(names(&forest[0].children), vec!["Аренда", "Авокадо"]);
    }

    #[test]
    fn test_sibling_order_uses_russian_collation() {
        let groups = vec![
            Group::new(1, "Жильё"),
            Group::new(2, "Ёмкости"),
            Group::new(3, "Еда"),
        ];
        let forest = build(&groups, &[]);
        assert_eq!(names(&forest), vec!["Еда", "Ёмкости", "Жильё"]);
    }

    #[test]
    fn test_equal_names_tie_break_by_id() {
        let items = vec![
            Item::new(9, "Опт"),
            Item::new(3, "Опт"),
            Item::new(6, "Опт"),
        ];
        let forest = build(&[], &items);
        let ids: Vec<u64> = forest.iter().map(|node| node.key.id).collect();
        assert_eq!(ids, vec![3, 6, 9]);
    }

    #[test]
    fn test_input_order_does_not_change_the_forest() {
        let mut groups = vec![
            Group::new(1, "Продажи"),
            Group::new(2, "Аренда").parent(1),
            Group::new(3, "Прочее"),
        ];
        let mut items = vec![
            Item::new(10, "Опт").group(1),
            Item::new(11, "Розница").group(2),
            Item::new(12, "Разное"),
        ];

        let forward = build(&groups, &items);
        groups.reverse();
        items.reverse();
        let reversed = build(&groups, &items);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_dangling_group_parent_promotes_to_root() {
        let groups = vec![Group::new(1, "Продажи"), Group::new(2, "Аренда").parent(42)];
        let forest = build(&groups, &[]);
        assert_eq!(names(&forest), vec!["Аренда", "Продажи"]);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_dangling_item_group_promotes_to_root() {
        let items = vec![Item::new(10, "Опт").group(42)];
        let forest = build(&[], &items);
        assert_eq!(names(&forest), vec!["Опт"]);
    }

    #[test]
    fn test_cycle_is_cut_deterministically() {
        // 2 -> 3 -> 2 closes a cycle; 4 hangs off it as a tail.
        let groups = vec![
            Group::new(1, "Продажи"),
            Group::new(2, "Аренда").parent(3),
            Group::new(3, "Прочее").parent(2),
            Group::new(4, "Хвост").parent(3),
        ];

        let forest = build(&groups, &[]);
        assert_eq!(forest_len(&forest), groups.len());
        // Group 2 is the first cycle member reached from the ascending scan,
        // so its parent edge is the one cut.
        assert!(forest.iter().any(|root| root.key == NodeKey::group(2)));
        assert!(find_in_forest(&forest, NodeKey::group(3)).is_some());
        assert!(find_in_forest(&forest, NodeKey::group(4)).is_some());

        let again = build(&groups, &[]);
        assert_eq!(forest, again);
    }

    #[test]
    fn test_self_parent_counts_as_cycle() {
        let groups = vec![Group::new(7, "Сам себе").parent(7)];

        let forest = build(&groups, &[]);
        assert_eq!(names(&forest), vec!["Сам себе"]);

        let rejected = build_forest(
            &groups,
            &[],
            &BuildOptions {
                cycle_policy: CyclePolicy::Reject,
            },
        );
        assert!(matches!(rejected, Err(TreeError::CyclicHierarchy(7))));
    }

    #[test]
    fn test_reject_policy_refuses_cyclic_input() {
        let groups = vec![
            Group::new(1, "Аренда").parent(2),
            Group::new(2, "Продажи").parent(1),
        ];
        let result = build_forest(
            &groups,
            &[],
            &BuildOptions {
                cycle_policy: CyclePolicy::Reject,
            },
        );
        assert!(matches!(result, Err(TreeError::CyclicHierarchy(_))));
    }

    #[test]
    fn test_duplicate_ids_keep_the_later_record() {
        let groups = vec![Group::new(1, "Старое имя"), Group::new(1, "Новое имя")];
        let forest = build(&groups, &[]);
        assert_eq!(names(&forest), vec!["Новое имя"]);
        assert_eq!(forest_len(&forest), 1);
    }

    #[test]
    fn test_expansion_defaults_after_build() {
        let groups = vec![Group::new(1, "Продажи")];
        let items = vec![Item::new(10, "Опт").group(1)];
        let forest = build(&groups, &items);
        assert!(forest[0].expanded);
        assert!(!forest[0].children[0].expanded);
    }

    #[test]
    fn test_items_attach_to_nested_subgroups() {
        let groups = vec![
            Group::new(1, "Продажи"),
            Group::new(2, "Розница").parent(1),
            Group::new(3, "Онлайн").parent(2),
        ];
        let items = vec![Item::new(10, "Маркетплейс").group(3)];

        let forest = build(&groups, &items);
        let deep = find_in_forest(&forest, NodeKey::group(3)).unwrap();
        assert_eq!(names(&deep.children), vec!["Маркетплейс"]);
    }

    #[test]
    fn test_empty_inputs_build_empty_forest() {
        assert!(build(&[], &[]).is_empty());
    }
}
