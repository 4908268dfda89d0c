//! Tri-state selection over the tree.
//!
//! Only explicit flags are stored on nodes. Whether a node is covered by a
//! selected ancestor is always derived by walking down from the root, so
//! clearing an ancestor's flag un-implies its whole subtree at once.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::fs::path;
use crate::fs::tree::{Node, TreeStore};

/// Checkbox state shown for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    /// The node itself is explicitly selected.
    Checked,
    /// Not selected itself, but covered by a selected ancestor.
    Indeterminate,
    Unchecked,
}

impl DisplayStatus {
    pub fn from_flags(selected: bool, ancestor_selected: bool) -> Self {
        if selected {
            DisplayStatus::Checked
        } else if ancestor_selected {
            DisplayStatus::Indeterminate
        } else {
            DisplayStatus::Unchecked
        }
    }

    /// Whether the node is part of the backup/restore set.
    pub fn is_included(self) -> bool {
        !matches!(self, DisplayStatus::Unchecked)
    }

    pub fn marker(self) -> &'static str {
        match self {
            DisplayStatus::Checked => "[x]",
            DisplayStatus::Indeterminate => "[-]",
            DisplayStatus::Unchecked => "[ ]",
        }
    }
}

impl TreeStore {
    /// Flip the explicit flag on exactly the node at `target`. Returns the new flag.
    pub fn toggle_explicit(&mut self, target: &str) -> Result<bool> {
        let node = self.get_mut(target)?;
        node.selected = !node.selected;
        debug!(path = %node.path(), selected = node.selected, "toggled selection");
        Ok(node.selected)
    }

    /// Set the explicit flag on exactly the node at `target`.
    pub fn set_explicit(&mut self, target: &str, selected: bool) -> Result<()> {
        let node = self.get_mut(target)?;
        node.selected = selected;
        debug!(path = %node.path(), selected, "set selection");
        Ok(())
    }

    /// Display status of the node at `target`.
    pub fn display_status(&self, target: &str) -> Result<DisplayStatus> {
        let canonical = path::normalize(target)?;
        let mut ancestor_selected = false;
        let mut current = self.root();
        for segment in path::split(&canonical) {
            ancestor_selected |= current.is_selected();
            current = current
                .child(segment)
                .ok_or_else(|| AppError::NotFound(canonical.clone()))?;
        }
        Ok(DisplayStatus::from_flags(
            current.is_selected(),
            ancestor_selected,
        ))
    }

    /// Minimal set of paths covering every selection at or below `from`.
    ///
    /// A selected node is emitted and its subtree skipped, so no emitted path
    /// is a descendant of another.
    pub fn covering_selection(&self, from: &str) -> Result<BTreeSet<String>> {
        fn walk(node: &Node, out: &mut BTreeSet<String>) {
            if node.is_selected() {
                out.insert(node.path().to_string());
                return;
            }
            for child in node.children() {
                walk(child, out);
            }
        }

        let mut out = BTreeSet::new();
        walk(self.get(from)?, &mut out);
        Ok(out)
    }

    /// Every known path mapped to whether it is included, explicitly or
    /// through a selected ancestor.
    pub fn selection_map(&self) -> BTreeMap<String, bool> {
        fn walk(node: &Node, implied: bool, out: &mut BTreeMap<String, bool>) {
            let included = DisplayStatus::from_flags(node.is_selected(), implied).is_included();
            out.insert(node.path().to_string(), included);
            for child in node.children() {
                walk(child, included, out);
            }
        }

        let mut out = BTreeMap::new();
        walk(self.root(), false, &mut out);
        out
    }

    /// Every node carrying an explicit flag, redundant ones included.
    pub fn explicit_selections(&self) -> Vec<String> {
        fn walk(node: &Node, out: &mut Vec<String>) {
            if node.is_selected() {
                out.push(node.path().to_string());
            }
            for child in node.children() {
                walk(child, out);
            }
        }

        let mut out = Vec::new();
        walk(self.root(), &mut out);
        out
    }

    /// Paths the backend reported as saved whose flag has since been cleared.
    pub fn cleared_saves(&self) -> Vec<String> {
        fn walk(node: &Node, out: &mut Vec<String>) {
            if node.is_saved() && !node.is_selected() {
                out.push(node.path().to_string());
            }
            for child in node.children() {
                walk(child, out);
            }
        }

        let mut out = Vec::new();
        walk(self.root(), &mut out);
        out
    }
}

/// Selection body sent when saving a backup's sources.
///
/// Covering paths map to `true`; saved paths the user unchecked map to
/// `false` so the backend drops them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSelection {
    pub selections: BTreeMap<String, bool>,
}

/// Body of a restore trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreRequest {
    pub selections: BTreeMap<String, bool>,
    pub restore_path: String,
    /// Snapshot the selections are restored from.
    pub backup_timestamp: String,
}

impl BackupSelection {
    pub fn from_tree(tree: &TreeStore) -> Result<Self> {
        let mut selections = covering_map(tree)?;
        for cleared in tree.cleared_saves() {
            selections.insert(cleared, false);
        }
        Ok(Self { selections })
    }
}

impl RestoreRequest {
    pub fn from_tree(
        tree: &TreeStore,
        backup_timestamp: impl Into<String>,
        restore_path: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            selections: covering_map(tree)?,
            restore_path: restore_path.into(),
            backup_timestamp: backup_timestamp.into(),
        })
    }
}

fn covering_map(tree: &TreeStore) -> Result<BTreeMap<String, bool>> {
    Ok(tree
        .covering_selection(path::ROOT)?
        .into_iter()
        .map(|p| (p, true))
        .collect())
}
