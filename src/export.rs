//! Catalog export
//!
//! Flattens a built forest into CSV rows or a JSON document for
//! spreadsheets and hand-off to other tools. The full catalog is exported
//! regardless of expansion state; rows come out in display order.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{NodeKind, TreeNode};

/// Supported export encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format: {}. Use: csv, json", other)),
        }
    }
}

/// Errors that can occur while encoding an export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer finalize failed: {0}")]
    Finish(String),

    #[error("JSON serialize failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    kind: NodeKind,
    id: u64,
    name: &'a str,
    description: &'a str,
    parent_id: Option<u64>,
    depth: usize,
}

/// Encode a forest in the requested format
pub fn export_forest(forest: &[TreeNode], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(forest)?),
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for row in flatten(forest) {
                writer.serialize(row)?;
            }
            let buffer = writer
                .into_inner()
                .map_err(|e| ExportError::Finish(e.to_string()))?;
            String::from_utf8(buffer).map_err(|e| ExportError::Finish(e.to_string()))
        }
    }
}

fn flatten(forest: &[TreeNode]) -> Vec<ExportRow<'_>> {
    let mut rows = Vec::new();
    push_rows(forest, None, 0, &mut rows);
    rows
}

fn push_rows<'a>(
    nodes: &'a [TreeNode],
    parent_id: Option<u64>,
    depth: usize,
    rows: &mut Vec<ExportRow<'a>>,
) {
    for node in nodes {
        rows.push(ExportRow {
            kind: node.key.kind,
            id: node.key.id,
            name: &node.name,
            description: node.description.as_deref().unwrap_or(""),
            parent_id,
            depth,
        });
        push_rows(&node.children, Some(node.key.id), depth + 1, rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{forest_len, Group, Item};
    use crate::tree::{build_forest, BuildOptions};

    fn sample_forest() -> Vec<TreeNode> {
        let groups = vec![
            Group::new(1, "Продажи").description("основная выручка"),
            Group::new(2, "Розница").parent(1),
        ];
        let items = vec![Item::new(10, "Киоск").group(2), Item::new(11, "Опт").group(1)];
        build_forest(&groups, &items, &BuildOptions::default()).unwrap()
    }

    #[test]
    fn test_csv_rows_follow_display_order() {
        let forest = sample_forest();
        let csv = export_forest(&forest, ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "kind,id,name,description,parent_id,depth");
        assert_eq!(lines.len(), forest_len(&forest) + 1);
        assert_eq!(lines[1], "group,1,Продажи,основная выручка,,0");
        assert_eq!(lines[2], "group,2,Розница,,1,1");
        assert_eq!(lines[3], "item,10,Киоск,,2,2");
        assert_eq!(lines[4], "item,11,Опт,,1,1");
    }

    #[test]
    fn test_json_export_round_trips() {
        let forest = sample_forest();
        let json = export_forest(&forest, ExportFormat::Json).unwrap();
        let parsed: Vec<TreeNode> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, forest);
    }

    #[test]
    fn test_collapsed_groups_still_export() {
        let mut forest = sample_forest();
        crate::tree::toggle_expanded(&mut forest, crate::catalog::NodeKey::group(1));

        let csv = export_forest(&forest, ExportFormat::Csv).unwrap();
        assert_eq!(csv.lines().count(), forest_len(&forest) + 1);
    }

    #[test]
    fn test_format_parses_case_insensitively() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
