//! Catalog data model
//!
//! Flat records as served by the reference-data service, plus the lenient
//! payload decoding that turns whatever the service actually sent into
//! typed collections.

pub mod decode;
pub mod types;

pub use decode::{decode_collection, DecodedCollection};
pub use types::{
    find_in_forest, forest_len, Domain, Group, Item, NodeKey, NodeKind, TreeNode,
};
