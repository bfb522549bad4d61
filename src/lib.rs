//! # Refbook
//!
//! Reference-Book Hierarchy Engine - fetches the flat income/expense
//! classification catalogs of a business dashboard from its REST backend
//! and rebuilds them into ordered trees.
//!
//! ## Features
//!
//! - **Ordered forests**: groups before items, Russian collation on names,
//!   deterministic id tie-breaks
//! - **Lenient ingestion**: non-array payloads and malformed records never
//!   blank the catalog
//! - **Resilient sessions**: a failed fetch clears the snapshot, a failed
//!   rebuild keeps the previous one, and either queues a user notice
//! - **One-shot service client**: request ids on every call, no hidden
//!   retries
//!
//! ## Modules
//!
//! - [`catalog`]: flat records and lenient payload decoding
//! - [`tree`]: forest builder, Russian collation, expand/collapse
//! - [`client`]: reference-data REST client
//! - [`session`]: snapshot holder with notifications
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use refbook::client::{CatalogClient, ClientConfig};
//! use refbook::session::{CatalogSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Arc::new(CatalogClient::new(ClientConfig::default()));
//!     let session = CatalogSession::new(client, SessionConfig::default());
//!
//!     session.refresh().await;
//!     let state = session.snapshot().await;
//!     println!("{} roots in the {} catalog", state.forest.len(), state.domain);
//!
//!     for notice in session.drain_notices().await {
//!         eprintln!("{}", notice);
//!     }
//! }
//! ```

pub mod catalog;
pub mod client;
pub mod config;
pub mod export;
pub mod notify;
pub mod session;
pub mod tree;

// Re-export top-level types for convenience
pub use catalog::{
    decode_collection, find_in_forest, forest_len, DecodedCollection, Domain, Group, Item,
    NodeKey, NodeKind, TreeNode,
};

pub use tree::{
    build_forest, compare_ru, toggle_expanded, BuildOptions, CyclePolicy, ExpansionState,
    TreeError,
};

pub use client::{CatalogApi, CatalogClient, ClientConfig, ClientError, GroupDraft, ItemDraft};

pub use session::{
    CatalogSession, RefreshOutcome, ReparentError, ReparentPlan, SessionConfig, SessionState,
};

pub use notify::{Notice, NoticeLevel, NotificationCenter};

pub use export::{export_forest, ExportError, ExportFormat};

pub use config::{
    generate_default_config, Config, ConfigError, LoggingConfig, ServiceConfig,
    SessionConfig as ConfigSessionConfig,
};
