//! Core catalog types for the reference-book hierarchy
//!
//! This module defines the records the reference-data service exchanges and
//! the in-memory tree derived from them:
//! - `Group`: a non-leaf classification category, optionally nested
//! - `Item`: a leaf classification record, attached to at most one group
//! - `TreeNode`: the merged hierarchical view of both collections
//! - `Domain`: the income/expense axis selecting which catalog to work with

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog axis: which pair of collections (groups, items) to fetch and merge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Income classification catalog
    Income,
    /// Expense classification catalog
    Expense,
}

impl Domain {
    /// Get all domains for iteration
    pub fn all() -> &'static [Domain] {
        &[Domain::Income, Domain::Expense]
    }

    /// Path segment used when addressing this catalog on the service
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Income => "income",
            Domain::Expense => "expense",
        }
    }
}

impl Default for Domain {
    fn default() -> Self {
        Domain::Expense
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Domain::Income),
            "expense" => Ok(Domain::Expense),
            other => Err(format!("unknown domain: {}. Use: income, expense", other)),
        }
    }
}

/// A classification category, optionally nested under another group
///
/// Groups form the non-leaf layer of the catalog. One level of sub-grouping
/// is typical, but the structure supports arbitrary depth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    /// Unique identifier within the group collection
    pub id: u64,
    /// Human-readable name shown in the tree
    pub name: String,
    /// Optional free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Parent group, or None for a root-level group
    #[serde(default)]
    pub parent_group_id: Option<u64>,
}

impl Group {
    /// Create a root-level group
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            parent_group_id: None,
        }
    }

    /// Builder: nest under a parent group
    pub fn parent(mut self, parent_group_id: u64) -> Self {
        self.parent_group_id = Some(parent_group_id);
        self
    }

    /// Builder: set description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A leaf classification record ("статья")
///
/// Items tag financial transactions. Each item attaches to at most one
/// group, or sits at the root when `group_id` is absent or unresolvable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Unique identifier within the item collection
    pub id: u64,
    /// Human-readable name shown in the tree
    pub name: String,
    /// Optional free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Owning group, or None for a root-level item
    #[serde(default)]
    pub group_id: Option<u64>,
}

impl Item {
    /// Create a root-level item
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            group_id: None,
        }
    }

    /// Builder: attach to a group
    pub fn group(mut self, group_id: u64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// Builder: set description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Kind of tree node; groups order before items among siblings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Group,
    Item,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Group => write!(f, "group"),
            NodeKind::Item => write!(f, "item"),
        }
    }
}

/// Identity of a tree node
///
/// Group ids and item ids are independent id spaces on the service, so the
/// kind is part of the key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub kind: NodeKind,
    pub id: u64,
}

impl NodeKey {
    /// Key of a group node
    pub fn group(id: u64) -> Self {
        Self {
            kind: NodeKind::Group,
            id,
        }
    }

    /// Key of an item node
    pub fn item(id: u64) -> Self {
        Self {
            kind: NodeKind::Item,
            id,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A node of the merged catalog forest
///
/// Built from the two flat collections by [`crate::tree::build_forest`].
/// `expanded` starts `true` for groups and `false` for items (items never
/// have children) and is mutated only by user interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeNode {
    pub key: NodeKey,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub children: Vec<TreeNode>,
    pub expanded: bool,
}

impl TreeNode {
    /// Shell node for a group; children are attached by the builder
    pub fn from_group(group: &Group) -> Self {
        Self {
            key: NodeKey::group(group.id),
            name: group.name.clone(),
            description: group.description.clone(),
            children: Vec::new(),
            expanded: true,
        }
    }

    /// Leaf node for an item
    pub fn from_item(item: &Item) -> Self {
        Self {
            key: NodeKey::item(item.id),
            name: item.name.clone(),
            description: item.description.clone(),
            children: Vec::new(),
            expanded: false,
        }
    }

    /// Whether this node is a group
    pub fn is_group(&self) -> bool {
        self.key.kind == NodeKind::Group
    }

    /// Number of nodes in this subtree, including self
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(TreeNode::subtree_len).sum::<usize>()
    }

    /// Find a node in this subtree by key
    pub fn find(&self, key: NodeKey) -> Option<&TreeNode> {
        if self.key == key {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(key))
    }
}

/// Find a node anywhere in a forest by key
pub fn find_in_forest(forest: &[TreeNode], key: NodeKey) -> Option<&TreeNode> {
    forest.iter().find_map(|root| root.find(key))
}

/// Total number of nodes in a forest
pub fn forest_len(forest: &[TreeNode]) -> usize {
    forest.iter().map(TreeNode::subtree_len).sum()
}
