//! Expand/collapse state over a built forest
//!
//! Every rebuild starts from the defaults (groups expanded, items leaves).
//! `toggle_expanded` flips a single group in place, and `ExpansionState`
//! carries collapsed groups across a rebuild for callers that opt in to
//! preserving the user's layout.

use std::collections::HashSet;

use crate::catalog::{NodeKey, NodeKind, TreeNode};

/// Flip the expansion of one group node, leaving every other node untouched
///
/// Returns whether the key was found. Item keys are never toggled since
/// items have no children to hide.
pub fn toggle_expanded(forest: &mut [TreeNode], key: NodeKey) -> bool {
    if key.kind != NodeKind::Group {
        return false;
    }
    for node in forest {
        if node.key == key {
            node.expanded = !node.expanded;
            return true;
        }
        if toggle_expanded(&mut node.children, key) {
            return true;
        }
    }
    false
}

/// Collapsed-group snapshot that can be re-applied after a rebuild
///
/// Only collapsed groups are recorded, so groups created between rebuilds
/// keep their expanded default. Keys that no longer resolve are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpansionState {
    collapsed: HashSet<NodeKey>,
}

impl ExpansionState {
    /// Record which groups are currently collapsed
    pub fn capture(forest: &[TreeNode]) -> Self {
        let mut collapsed = HashSet::new();
        collect_collapsed(forest, &mut collapsed);
        Self { collapsed }
    }

    /// Re-collapse the recorded groups on a freshly built forest
    pub fn apply(&self, forest: &mut [TreeNode]) {
        if self.collapsed.is_empty() {
            return;
        }
        apply_collapsed(forest, &self.collapsed);
    }

    pub fn is_empty(&self) -> bool {
        self.collapsed.is_empty()
    }
}

fn collect_collapsed(nodes: &[TreeNode], collapsed: &mut HashSet<NodeKey>) {
    for node in nodes {
        if node.is_group() && !node.expanded {
            collapsed.insert(node.key);
        }
        collect_collapsed(&node.children, collapsed);
    }
}

fn apply_collapsed(nodes: &mut [TreeNode], collapsed: &HashSet<NodeKey>) {
    for node in nodes {
        if node.is_group() && collapsed.contains(&node.key) {
            node.expanded = false;
        }
        apply_collapsed(&mut node.children, collapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Group, Item};
    use crate::tree::builder::{build_forest, BuildOptions};

    fn sample_forest() -> Vec<TreeNode> {
        let groups = vec![
            Group::new(1, "Продажи"),
            Group::new(2, "Розница").parent(1),
            Group::new(3, "Аренда"),
        ];
        let items = vec![
            Item::new(10, "Опт").group(1),
            Item::new(11, "Киоск").group(2),
        ];
        build_forest(&groups, &items, &BuildOptions::default()).unwrap()
    }

    #[test]
    fn test_toggle_flips_only_the_addressed_node() {
        let mut forest = sample_forest();
        let before = forest.clone();

        assert!(toggle_expanded(&mut forest, NodeKey::group(2)));

        let mut restored = forest.clone();
        assert!(toggle_expanded(&mut restored, NodeKey::group(2)));
        assert_eq!(restored, before);
    }

    #[test]
    fn test_toggle_reaches_nested_groups() {
        let mut forest = sample_forest();
        assert!(toggle_expanded(&mut forest, NodeKey::group(2)));

        let nested = crate::catalog::find_in_forest(&forest, NodeKey::group(2)).unwrap();
        assert!(!nested.expanded);
        // Siblings and ancestors keep their state.
        assert!(crate::catalog::find_in_forest(&forest, NodeKey::group(1))
            .unwrap()
            .expanded);
        assert!(crate::catalog::find_in_forest(&forest, NodeKey::group(3))
            .unwrap()
            .expanded);
    }

    #[test]
    fn test_toggle_unknown_key_reports_not_found() {
        let mut forest = sample_forest();
        let before = forest.clone();
        assert!(!toggle_expanded(&mut forest, NodeKey::group(99)));
        assert_eq!(forest, before);
    }

    #[test]
    fn test_item_keys_are_never_toggled() {
        let mut forest = sample_forest();
        let before = forest.clone();
        assert!(!toggle_expanded(&mut forest, NodeKey::item(10)));
        assert_eq!(forest, before);
    }

    #[test]
    fn test_expansion_state_survives_rebuild() {
        let mut forest = sample_forest();
        toggle_expanded(&mut forest, NodeKey::group(1));
        toggle_expanded(&mut forest, NodeKey::group(3));

        let state = ExpansionState::capture(&forest);
        assert!(!state.is_empty());

        let mut rebuilt = sample_forest();
        state.apply(&mut rebuilt);

        assert!(!crate::catalog::find_in_forest(&rebuilt, NodeKey::group(1))
            .unwrap()
            .expanded);
        assert!(!crate::catalog::find_in_forest(&rebuilt, NodeKey::group(3))
            .unwrap()
            .expanded);
        // Untouched groups keep the expanded default.
        assert!(crate::catalog::find_in_forest(&rebuilt, NodeKey::group(2))
            .unwrap()
            .expanded);
    }

    #[test]
    fn test_stale_keys_are_ignored_on_apply() {
        let mut forest = sample_forest();
        toggle_expanded(&mut forest, NodeKey::group(3));
        let state = ExpansionState::capture(&forest);

        // Rebuild without group 3.
        let groups = vec![Group::new(1, "Продажи")];
        let mut rebuilt = build_forest(&groups, &[], &BuildOptions::default()).unwrap();
        state.apply(&mut rebuilt);
        assert!(rebuilt[0].expanded);
    }

    #[test]
    fn test_capture_on_default_forest_is_empty() {
        let forest = sample_forest();
        assert!(ExpansionState::capture(&forest).is_empty());
    }
}
