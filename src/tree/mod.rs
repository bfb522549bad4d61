//! Hierarchical tree construction and interaction
//!
//! Turns the two flat collections of a catalog domain into one ordered
//! forest, and provides the in-place operations the snapshot supports:
//! expand/collapse toggling and expansion-state carryover between rebuilds.

pub mod builder;
pub mod collate;
pub mod expand;

pub use builder::{build_forest, BuildOptions, CyclePolicy, TreeError};
pub use collate::compare_ru;
pub use expand::{toggle_expanded, ExpansionState};
