use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{AppError, Result};
use crate::fs::path;
use crate::fs::selection::DisplayStatus;

/// Type of filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// How much of a directory's listing is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
}

/// One entry of a directory listing, already validated and reduced to a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub kind: NodeKind,
    /// Selection reported by the backend from a previous session.
    pub selected: bool,
}

/// A node in the partially-known filesystem tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    path: String,
    kind: NodeKind,
    children: BTreeMap<String, Node>,
    pub(crate) load_state: LoadState,
    pub(crate) is_open: bool,
    pub(crate) selected: bool,
    /// Flag the backend reported when the node was first listed.
    saved: bool,
}

impl Node {
    fn directory(name: &str, path: String) -> Self {
        Self {
            name: name.to_string(),
            path,
            kind: NodeKind::Directory,
            children: BTreeMap::new(),
            load_state: LoadState::Unloaded,
            is_open: false,
            selected: false,
            saved: false,
        }
    }

    fn from_entry(path: String, entry: &ChildEntry) -> Self {
        Self {
            name: entry.name.clone(),
            path,
            kind: entry.kind,
            children: BTreeMap::new(),
            load_state: LoadState::Unloaded,
            is_open: false,
            selected: entry.selected,
            saved: entry.selected,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical absolute path; fixed at creation.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Explicit selection flag stored on this node.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Whether the backend already had this node saved as selected.
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Immediate children in name order.
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// A flattened representation of a visible node, for whatever renders the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleItem {
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    pub depth: usize,
    pub is_open: bool,
    pub load_state: LoadState,
    pub status: DisplayStatus,
    pub is_last_sibling: bool,
}

/// Owner of the single rooted tree of known entries.
#[derive(Debug, Clone)]
pub struct TreeStore {
    root: Node,
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeStore {
    /// Create a tree holding only an unloaded root.
    pub fn new() -> Self {
        Self {
            root: Node::directory("/", path::ROOT.to_string()),
        }
    }

    /// Create a tree whose browsing starts below the root.
    ///
    /// Every ancestor of `start` is synthesized as an open, loaded directory
    /// holding only the next segment. `start` itself is left unloaded.
    ///
    /// Because the ancestors count as loaded, toggling them never lists their
    /// other entries; a refresh of the ancestor does.
    pub fn with_start(start: &str) -> Result<Self> {
        let start = path::normalize(start)?;
        let mut tree = Self::new();
        let segments = path::split(&start);
        let mut current = &mut tree.root;
        for (i, segment) in segments.iter().enumerate() {
            current.load_state = LoadState::Loaded;
            current.is_open = true;
            let child_path = path::from_segments(&segments[..=i]);
            current = current
                .children
                .entry(segment.to_string())
                .or_insert_with(|| Node::directory(segment, child_path));
        }
        debug!(start = %start, "synthesized start directory");
        Ok(tree)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Look up the node at `target`.
    pub fn get(&self, target: &str) -> Result<&Node> {
        let canonical = path::normalize(target)?;
        let mut current = &self.root;
        for segment in path::split(&canonical) {
            current = current
                .children
                .get(segment)
                .ok_or_else(|| AppError::NotFound(canonical.clone()))?;
        }
        Ok(current)
    }

    pub(crate) fn get_mut(&mut self, target: &str) -> Result<&mut Node> {
        let canonical = path::normalize(target)?;
        let mut current = &mut self.root;
        for segment in path::split(&canonical) {
            current = current
                .children
                .get_mut(segment)
                .ok_or_else(|| AppError::NotFound(canonical.clone()))?;
        }
        Ok(current)
    }

    /// Whether a node exists at `target`.
    pub fn contains(&self, target: &str) -> bool {
        self.get(target).is_ok()
    }

    /// Merge a directory listing into the directory at `directory`.
    ///
    /// Existing children are left untouched; only unseen names are inserted.
    /// The directory must already be loading (or loaded, for a refresh) and
    /// is marked loaded afterwards. Returns how many children were inserted.
    pub fn merge(&mut self, directory: &str, entries: &[ChildEntry]) -> Result<usize> {
        let node = self.get_mut(directory)?;
        if !node.is_dir() {
            return Err(AppError::NotADirectory(node.path.clone()));
        }
        if node.load_state == LoadState::Unloaded {
            return Err(AppError::NotLoading(node.path.clone()));
        }
        for entry in entries {
            path::validate_name(&entry.name)?;
        }

        let mut inserted = 0;
        for entry in entries {
            if node.children.contains_key(&entry.name) {
                continue;
            }
            let child_path = path::join(&node.path, &entry.name)?;
            node.children
                .insert(entry.name.clone(), Node::from_entry(child_path, entry));
            inserted += 1;
        }
        node.load_state = LoadState::Loaded;
        debug!(
            directory = %node.path,
            inserted,
            total = node.children.len(),
            "merged listing"
        );
        Ok(inserted)
    }

    /// Total number of known nodes, root included.
    pub fn node_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            1 + node.children.values().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    /// Flatten the open part of the tree, with each item's display status.
    ///
    /// Children are ordered case-insensitively by name, directories first
    /// when `dirs_first` is set.
    pub fn visible_items(&self, dirs_first: bool) -> Vec<VisibleItem> {
        let mut items = Vec::new();
        Self::flatten_node(&self.root, &mut items, 0, true, false, dirs_first);
        items
    }

    fn flatten_node(
        node: &Node,
        items: &mut Vec<VisibleItem>,
        depth: usize,
        is_last: bool,
        ancestor_selected: bool,
        dirs_first: bool,
    ) {
        items.push(VisibleItem {
            name: node.name.clone(),
            path: node.path.clone(),
            kind: node.kind,
            depth,
            is_open: node.is_open,
            load_state: node.load_state,
            status: DisplayStatus::from_flags(node.selected, ancestor_selected),
            is_last_sibling: is_last,
        });

        if !node.is_open {
            return;
        }
        let implied = ancestor_selected || node.selected;
        let children = Self::sorted_children(node, dirs_first);
        let last = children.len().saturating_sub(1);
        for (i, child) in children.into_iter().enumerate() {
            Self::flatten_node(child, items, depth + 1, i == last, implied, dirs_first);
        }
    }

    fn sorted_children(node: &Node, dirs_first: bool) -> Vec<&Node> {
        let mut children: Vec<&Node> = node.children.values().collect();
        children.sort_by(|a, b| {
            let mut cmp = std::cmp::Ordering::Equal;
            if dirs_first {
                cmp = b.is_dir().cmp(&a.is_dir());
            }
            cmp.then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        children
    }
}
