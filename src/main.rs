//! Refbook CLI
//!
//! Command-line interface for the reference-book catalogs:
//! - Print the hierarchy tree
//! - List, create, update, and delete groups and items
//! - Plan hierarchy moves
//! - Check service status, export the catalog

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refbook::catalog::{NodeKey, TreeNode};
use refbook::client::{CatalogApi, CatalogClient, ClientConfig, GroupDraft, ItemDraft};
use refbook::config::{generate_default_config, Config, LoggingConfig};
use refbook::export::{export_forest, ExportFormat};
use refbook::session::{CatalogSession, RefreshOutcome, SessionConfig};

#[derive(Parser)]
#[command(name = "refbook")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reference-book catalogs as ordered trees")]
#[command(
    long_about = "Refbook talks to the dashboard's reference-data service.\nIt fetches the flat group and item collections of a catalog and\nrebuilds them into the ordered hierarchy the dashboard displays."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Reference-data service URL (overrides config)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Catalog domain: income or expense (overrides config)
    #[arg(short, long, global = true)]
    pub domain: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the catalog tree
    Tree {
        /// Collapse these group ids before printing
        #[arg(long)]
        collapse: Vec<u64>,
    },

    /// List groups as a flat table
    Groups,

    /// List items as a flat table
    Items,

    /// Create a group or item
    Create {
        #[command(subcommand)]
        target: CreateTarget,
    },

    /// Update a group or item
    Update {
        #[command(subcommand)]
        target: UpdateTarget,
    },

    /// Delete a group or item
    Delete {
        #[command(subcommand)]
        target: DeleteTarget,
    },

    /// Plan a hierarchy move (validated locally, not sent to the service)
    Move {
        /// Node to move, as kind:id (e.g. item:10)
        source: String,
        /// New parent group id (omit for the root)
        #[arg(long)]
        to: Option<u64>,
    },

    /// Show service status
    Status,

    /// Export the catalog
    Export {
        /// Export encoding (csv, json)
        #[arg(long, default_value = "csv")]
        encoding: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CreateTarget {
    /// Create a group
    Group {
        /// Group name
        name: String,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
        /// Parent group id
        #[arg(long)]
        parent: Option<u64>,
    },
    /// Create an item
    Item {
        /// Item name
        name: String,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
        /// Owning group id
        #[arg(long)]
        group: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum UpdateTarget {
    /// Update a group
    Group {
        /// Group id
        id: u64,
        /// New name
        #[arg(long)]
        name: String,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New parent group id
        #[arg(long)]
        parent: Option<u64>,
    },
    /// Update an item
    Item {
        /// Item id
        id: u64,
        /// New name
        #[arg(long)]
        name: String,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New owning group id
        #[arg(long)]
        group: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum DeleteTarget {
    /// Delete a group
    Group {
        /// Group id
        id: u64,
    },
    /// Delete an item
    Item {
        /// Item id
        id: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {:?}", path))?,
        None => Config::load_default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.service.base_url = base_url.clone();
    }
    if let Some(domain) = &cli.domain {
        config.session.domain = domain.parse().map_err(anyhow::Error::msg)?;
    }

    init_logging(&config.logging);

    let domain = config.session.domain;
    let client = Arc::new(CatalogClient::new(ClientConfig {
        base_url: config.service.base_url.clone(),
        token: config.service.token.clone(),
        request_timeout_ms: config.service.request_timeout_ms,
    }));
    let session = CatalogSession::new(
        client.clone(),
        SessionConfig {
            domain,
            cycle_policy: config.session.cycle_policy,
            preserve_expansion: config.session.preserve_expansion,
        },
    );

    match cli.command {
        Commands::Tree { collapse } => {
            let refreshed = session.refresh().await == RefreshOutcome::Refreshed;
            for id in collapse {
                session.toggle(NodeKey::group(id)).await;
            }
            let state = session.snapshot().await;
            render_forest(&state.forest, &cli.format)?;
            flush_notices(&session).await;
            if !refreshed {
                std::process::exit(1);
            }
        }

        Commands::Groups => {
            let collection = client.fetch_groups(domain).await?;
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&collection.records)?);
            } else {
                println!("{:<8} {:<8} {:<30} {}", "ID", "PARENT", "NAME", "DESCRIPTION");
                for group in &collection.records {
                    println!(
                        "{:<8} {:<8} {:<30} {}",
                        group.id,
                        group
                            .parent_group_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        group.name,
                        group.description.as_deref().unwrap_or("")
                    );
                }
            }
            if collection.skipped > 0 {
                eprintln!("({} malformed records skipped)", collection.skipped);
            }
        }

        Commands::Items => {
            let collection = client.fetch_items(domain).await?;
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&collection.records)?);
            } else {
                println!("{:<8} {:<8} {:<30} {}", "ID", "GROUP", "NAME", "DESCRIPTION");
                for item in &collection.records {
                    println!(
                        "{:<8} {:<8} {:<30} {}",
                        item.id,
                        item.group_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        item.name,
                        item.description.as_deref().unwrap_or("")
                    );
                }
            }
            if collection.skipped > 0 {
                eprintln!("({} malformed records skipped)", collection.skipped);
            }
        }

        Commands::Create { target } => {
            let applied = match target {
                CreateTarget::Group {
                    name,
                    description,
                    parent,
                } => {
                    session
                        .create_group(GroupDraft {
                            name,
                            description,
                            parent_group_id: parent,
                        })
                        .await
                }
                CreateTarget::Item {
                    name,
                    description,
                    group,
                } => {
                    session
                        .create_item(ItemDraft {
                            name,
                            description,
                            group_id: group,
                        })
                        .await
                }
            };
            finish_mutation_command(&session, &cli.format, applied).await?;
        }

        Commands::Update { target } => {
            let applied = match target {
                UpdateTarget::Group {
                    id,
                    name,
                    description,
                    parent,
                } => {
                    session
                        .update_group(
                            id,
                            GroupDraft {
                                name,
                                description,
                                parent_group_id: parent,
                            },
                        )
                        .await
                }
                UpdateTarget::Item {
                    id,
                    name,
                    description,
                    group,
                } => {
                    session
                        .update_item(
                            id,
                            ItemDraft {
                                name,
                                description,
                                group_id: group,
                            },
                        )
                        .await
                }
            };
            finish_mutation_command(&session, &cli.format, applied).await?;
        }

        Commands::Delete { target } => {
            let applied = match target {
                DeleteTarget::Group { id } => session.delete_group(id).await,
                DeleteTarget::Item { id } => session.delete_item(id).await,
            };
            finish_mutation_command(&session, &cli.format, applied).await?;
        }

        Commands::Move { source, to } => {
            let refreshed = session.refresh().await == RefreshOutcome::Refreshed;
            if !refreshed {
                flush_notices(&session).await;
                std::process::exit(1);
            }

            let source = parse_node_key(&source).map_err(anyhow::Error::msg)?;
            match session.plan_reparent(source, to.map(NodeKey::group)).await {
                Ok(plan) => {
                    let destination = match &plan.target_name {
                        Some(name) => format!("group \"{}\"", name),
                        None => "the root".to_string(),
                    };
                    println!("Planned move: \"{}\" to {}", plan.source_name, destination);
                    println!("No server call was issued; hierarchy changes are not persisted yet.");
                    flush_notices(&session).await;
                }
                Err(e) => {
                    eprintln!("Cannot plan move: {}", e);
                    flush_notices(&session).await;
                    std::process::exit(1);
                }
            }
        }

        Commands::Status => match client.health_check().await {
            Ok(()) => println!("Service ok: {}", config.service.base_url),
            Err(e) => {
                eprintln!("Service unreachable: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Export { encoding, output } => {
            let refreshed = session.refresh().await == RefreshOutcome::Refreshed;
            if !refreshed {
                flush_notices(&session).await;
                std::process::exit(1);
            }

            let format: ExportFormat = encoding.parse().map_err(anyhow::Error::msg)?;
            let state = session.snapshot().await;
            let data = export_forest(&state.forest, format)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &data)
                        .with_context(|| format!("writing export to {:?}", path))?;
                    println!("Exported to {:?}", path);
                }
                None => print!("{}", data),
            }
            flush_notices(&session).await;
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, &content)
                        .with_context(|| format!("writing config to {:?}", path))?;
                    println!("Wrote default config to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("refbook={}", config.level)),
    );

    if config.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Print the tree after a successful mutation, then the queued notices
async fn finish_mutation_command(
    session: &CatalogSession,
    format: &str,
    applied: bool,
) -> anyhow::Result<()> {
    if applied {
        let state = session.snapshot().await;
        render_forest(&state.forest, format)?;
    }
    flush_notices(session).await;
    if !applied {
        std::process::exit(1);
    }
    Ok(())
}

fn render_forest(forest: &[TreeNode], format: &str) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(forest)?);
        return Ok(());
    }
    if forest.is_empty() {
        println!("(empty catalog)");
        return Ok(());
    }
    for node in forest {
        print_node(node, 0);
    }
    Ok(())
}

fn print_node(node: &TreeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let marker = if !node.is_group() {
        "-"
    } else if node.expanded {
        "v"
    } else {
        ">"
    };
    match &node.description {
        Some(description) => println!(
            "{}{} {} [{}] {}",
            indent, marker, node.name, node.key, description
        ),
        None => println!("{}{} {} [{}]", indent, marker, node.name, node.key),
    }
    if node.expanded {
        for child in &node.children {
            print_node(child, depth + 1);
        }
    }
}

async fn flush_notices(session: &CatalogSession) {
    for notice in session.drain_notices().await {
        eprintln!("{}", notice);
    }
}

fn parse_node_key(s: &str) -> Result<NodeKey, String> {
    let (kind, id) = s
        .split_once(':')
        .ok_or_else(|| format!("expected kind:id (e.g. item:10), got: {}", s))?;
    let id: u64 = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid id in node key: {}", s))?;
    match kind.trim().to_lowercase().as_str() {
        "group" => Ok(NodeKey::group(id)),
        "item" => Ok(NodeKey::item(id)),
        other => Err(format!("unknown node kind: {}. Use: group, item", other)),
    }
}
