//! Catalog session
//!
//! Holds the in-memory snapshot the CLI (or any other frontend) renders:
//! the active domain, the current forest, and the pending notifications.
//! Refreshes fetch both collections from the reference-data service and
//! rebuild the forest; mutations go to the service and, on success, refetch
//! everything rather than patching the snapshot locally.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::catalog::{find_in_forest, Domain, NodeKey, NodeKind, TreeNode};
use crate::client::{CatalogApi, ClientError, GroupDraft, ItemDraft};
use crate::notify::{Notice, NotificationCenter};
use crate::tree::{build_forest, toggle_expanded, BuildOptions, CyclePolicy, ExpansionState};

/// Session over one reference-data service
pub struct CatalogSession {
    api: Arc<dyn CatalogApi>,
    state: Arc<RwLock<SessionState>>,
    notices: Arc<Mutex<NotificationCenter>>,
    config: SessionConfig,
}

/// Configuration for session behavior
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Domain shown first
    pub domain: Domain,
    /// What to do when the fetched hierarchy contains a cycle
    pub cycle_policy: CyclePolicy,
    /// Carry collapsed groups across rebuilds instead of resetting them
    pub preserve_expansion: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            domain: Domain::default(),
            cycle_policy: CyclePolicy::default(),
            preserve_expansion: false,
        }
    }
}

/// Current state of the session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Domain the snapshot belongs to
    pub domain: Domain,
    /// Forest built from the last successful refresh, empty after a failed fetch
    pub forest: Vec<TreeNode>,
    /// When the snapshot was last rebuilt
    pub last_refresh: Option<DateTime<Utc>>,
    /// Malformed group records dropped by the last refresh
    pub skipped_groups: usize,
    /// Malformed item records dropped by the last refresh
    pub skipped_items: usize,
}

/// What a refresh did to the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot swapped for a freshly built forest
    Refreshed,
    /// A collection fetch failed; the snapshot is now empty
    FetchFailed,
    /// The forest could not be built; the previous snapshot was kept
    RebuildFailed,
}

/// Why a planned move is impossible against the current snapshot
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReparentError {
    #[error("source node {0} not found")]
    SourceNotFound(NodeKey),

    #[error("target group {0} not found")]
    TargetNotFound(NodeKey),

    #[error("target {0} is not a group")]
    TargetNotGroup(NodeKey),

    #[error("cannot move {0} into its own subtree")]
    IntoOwnSubtree(NodeKey),
}

/// A validated move that has not been sent to the service
#[derive(Debug, Clone, PartialEq)]
pub struct ReparentPlan {
    pub source: NodeKey,
    pub source_name: String,
    /// New parent group, or None for the root
    pub target: Option<NodeKey>,
    pub target_name: Option<String>,
}

impl CatalogSession {
    /// Create a session over the given service
    pub fn new(api: Arc<dyn CatalogApi>, config: SessionConfig) -> Self {
        let state = SessionState {
            domain: config.domain,
            ..SessionState::default()
        };
        Self {
            api,
            state: Arc::new(RwLock::new(state)),
            notices: Arc::new(Mutex::new(NotificationCenter::default())),
            config,
        }
    }

    /// Active domain
    pub async fn domain(&self) -> Domain {
        self.state.read().await.domain
    }

    /// Clone of the current session state
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Take all pending notices, oldest first
    pub async fn drain_notices(&self) -> Vec<Notice> {
        self.notices.lock().await.drain()
    }

    /// Refresh the snapshot for the active domain
    ///
    /// Both collections are fetched concurrently and the forest is rebuilt
    /// only after both arrive. A fetch failure empties the snapshot; a
    /// rebuild failure keeps the previous snapshot. Either way an error
    /// notice is queued. The domain is read once at entry and there is no
    /// in-flight de-duplication, so a refresh racing a domain switch can
    /// land a snapshot for the previously active tab.
    pub async fn refresh(&self) -> RefreshOutcome {
        let domain = self.domain().await;
        debug!(domain = %domain, "refreshing catalog");

        let fetched = tokio::try_join!(
            self.api.fetch_groups(domain),
            self.api.fetch_items(domain)
        );
        let (groups, items) = match fetched {
            Ok(pair) => pair,
            Err(e) => {
                error!(domain = %domain, error = %e, "catalog fetch failed, clearing snapshot");
                {
                    let mut state = self.state.write().await;
                    state.forest.clear();
                    state.last_refresh = None;
                    state.skipped_groups = 0;
                    state.skipped_items = 0;
                }
                self.notices
                    .lock()
                    .await
                    .error(format!("failed to load {} catalog: {}", domain, user_message(&e)));
                return RefreshOutcome::FetchFailed;
            }
        };

        let expansion = if self.config.preserve_expansion {
            Some(ExpansionState::capture(&self.state.read().await.forest))
        } else {
            None
        };

        let options = BuildOptions {
            cycle_policy: self.config.cycle_policy,
        };
        let mut forest = match build_forest(&groups.records, &items.records, &options) {
            Ok(forest) => forest,
            Err(e) => {
                error!(domain = %domain, error = %e, "rebuild failed, keeping previous snapshot");
                self.notices
                    .lock()
                    .await
                    .error(format!("failed to rebuild {} catalog: {}", domain, e));
                return RefreshOutcome::RebuildFailed;
            }
        };
        if let Some(expansion) = &expansion {
            expansion.apply(&mut forest);
        }

        let skipped = groups.skipped + items.skipped;
        {
            let mut state = self.state.write().await;
            state.forest = forest;
            state.last_refresh = Some(Utc::now());
            state.skipped_groups = groups.skipped;
            state.skipped_items = items.skipped;
        }
        info!(
            domain = %domain,
            groups = groups.records.len(),
            items = items.records.len(),
            skipped = skipped,
            "catalog rebuilt"
        );
        if skipped > 0 {
            self.notices
                .lock()
                .await
                .warning(format!("{} malformed records skipped", skipped));
        }
        RefreshOutcome::Refreshed
    }

    /// Switch the active tab and refresh
    pub async fn switch_domain(&self, domain: Domain) -> RefreshOutcome {
        {
            let mut state = self.state.write().await;
            state.domain = domain;
        }
        self.refresh().await
    }

    /// Flip one group's expansion on the held snapshot
    pub async fn toggle(&self, key: NodeKey) -> bool {
        let mut state = self.state.write().await;
        toggle_expanded(&mut state.forest, key)
    }

    pub async fn create_group(&self, draft: GroupDraft) -> bool {
        let domain = self.domain().await;
        let done = format!("group \"{}\" created", draft.name);
        let result = self.api.create_group(domain, &draft).await;
        self.finish_mutation("create group", done, result).await
    }

    pub async fn update_group(&self, id: u64, draft: GroupDraft) -> bool {
        let domain = self.domain().await;
        let done = format!("group {} updated", id);
        let result = self.api.update_group(domain, id, &draft).await;
        self.finish_mutation("update group", done, result).await
    }

    pub async fn delete_group(&self, id: u64) -> bool {
        let domain = self.domain().await;
        let done = format!("group {} deleted", id);
        let result = self.api.delete_group(domain, id).await;
        self.finish_mutation("delete group", done, result).await
    }

    pub async fn create_item(&self, draft: ItemDraft) -> bool {
        let domain = self.domain().await;
        let done = format!("item \"{}\" created", draft.name);
        let result = self.api.create_item(domain, &draft).await;
        self.finish_mutation("create item", done, result).await
    }

    pub async fn update_item(&self, id: u64, draft: ItemDraft) -> bool {
        let domain = self.domain().await;
        let done = format!("item {} updated", id);
        let result = self.api.update_item(domain, id, &draft).await;
        self.finish_mutation("update item", done, result).await
    }

    pub async fn delete_item(&self, id: u64) -> bool {
        let domain = self.domain().await;
        let done = format!("item {} deleted", id);
        let result = self.api.delete_item(domain, id).await;
        self.finish_mutation("delete item", done, result).await
    }

    /// Validate a drag-style move against the snapshot without sending it
    ///
    /// Groups accept both groups and items; the root accepts everything.
    /// Returns the plan that a real move would execute.
    pub async fn plan_reparent(
        &self,
        source: NodeKey,
        target: Option<NodeKey>,
    ) -> Result<ReparentPlan, ReparentError> {
        let plan = {
            let state = self.state.read().await;
            let source_node = find_in_forest(&state.forest, source)
                .ok_or(ReparentError::SourceNotFound(source))?;

            let target_name = match target {
                None => None,
                Some(target_key) => {
                    if target_key.kind != NodeKind::Group {
                        return Err(ReparentError::TargetNotGroup(target_key));
                    }
                    if source.kind == NodeKind::Group && source_node.find(target_key).is_some() {
                        return Err(ReparentError::IntoOwnSubtree(source));
                    }
                    let target_node = find_in_forest(&state.forest, target_key)
                        .ok_or(ReparentError::TargetNotFound(target_key))?;
                    Some(target_node.name.clone())
                }
            };

            ReparentPlan {
                source,
                source_name: source_node.name.clone(),
                target,
                target_name,
            }
        };

        // TODO: issue the move through the service once the backend exposes
        // a reparent endpoint.
        let target_label = plan
            .target
            .map(|key| key.to_string())
            .unwrap_or_else(|| "root".to_string());
        info!(
            source = %plan.source,
            target = %target_label,
            "reparent planned, no server call issued"
        );
        self.notices.lock().await.info(format!(
            "move of \"{}\" planned; hierarchy changes are not sent to the service yet",
            plan.source_name
        ));
        Ok(plan)
    }

    async fn finish_mutation(
        &self,
        action: &str,
        done: String,
        result: Result<(), ClientError>,
    ) -> bool {
        match result {
            Ok(()) => {
                info!(action = action, "mutation applied, refetching catalog");
                self.notices.lock().await.success(done);
                self.refresh().await;
                true
            }
            Err(e) => {
                error!(action = action, error = %e, "mutation failed");
                self.notices
                    .lock()
                    .await
                    .error(format!("{} failed: {}", action, user_message(&e)));
                false
            }
        }
    }
}

/// The message a person should see for a service error
fn user_message(error: &ClientError) -> String {
    match error {
        ClientError::Api { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
