//! The directory listing collaborator and its wire types.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::fs::path;
use crate::fs::tree::{ChildEntry, NodeKind};

/// Entry type as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Directory,
}

impl From<FileType> for NodeKind {
    fn from(value: FileType) -> Self {
        match value {
            FileType::File => NodeKind::File,
            FileType::Directory => NodeKind::Directory,
        }
    }
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub directory: String,
    pub filename: String,
    pub file_type: FileType,
    #[serde(default)]
    pub selected: bool,
}

impl DirEntry {
    pub fn new(directory: &str, filename: &str, file_type: FileType) -> Self {
        Self {
            directory: directory.to_string(),
            filename: filename.to_string(),
            file_type,
            selected: false,
        }
    }

    /// Reduce to a tree child of `expected_directory`.
    ///
    /// Fails if the row belongs to another directory or its name is not a
    /// single segment.
    pub fn to_child(&self, expected_directory: &str) -> Result<ChildEntry> {
        let directory = path::normalize(&self.directory)?;
        if directory != expected_directory {
            return Err(AppError::InvalidPath(format!(
                "{} listed under {}",
                path::join(&self.directory, &self.filename)
                    .unwrap_or_else(|_| self.filename.clone()),
                expected_directory
            )));
        }
        path::validate_name(&self.filename)?;
        Ok(ChildEntry {
            name: self.filename.clone(),
            kind: self.file_type.into(),
            selected: self.selected,
        })
    }
}

/// A listing response body: `{"files": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub files: Vec<DirEntry>,
}

/// What a listing is for. Passed through to the lister untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingScope {
    /// Choosing sources for a backup.
    Backup { backup_id: Option<String> },
    /// Choosing files to restore from one snapshot of a backup.
    Restore {
        backup_id: Option<String>,
        snapshot: String,
    },
}

impl Default for ListingScope {
    fn default() -> Self {
        ListingScope::Backup { backup_id: None }
    }
}

/// Source of directory listings.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// List the immediate children of the tree directory `path`.
    async fn list_directory(&self, scope: &ListingScope, path: &str) -> Result<Vec<DirEntry>>;
}

/// Lists a local directory tree, mapping tree `/` onto `root`.
#[derive(Debug, Clone)]
pub struct LocalLister {
    root: PathBuf,
    show_hidden: bool,
    preselected: HashSet<String>,
}

impl LocalLister {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            show_hidden: true,
            preselected: HashSet::new(),
        }
    }

    pub fn show_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = show_hidden;
        self
    }

    /// Tree paths reported as already selected.
    pub fn preselected<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.preselected = paths
            .into_iter()
            .filter_map(|p| path::normalize(p.as_ref()).ok())
            .collect();
        self
    }

    fn host_path(&self, tree_path: &str) -> PathBuf {
        path::split(tree_path)
            .into_iter()
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

#[async_trait]
impl DirectoryLister for LocalLister {
    async fn list_directory(&self, scope: &ListingScope, dir: &str) -> Result<Vec<DirEntry>> {
        let dir = path::normalize(dir)?;
        let host = self.host_path(&dir);
        debug!(path = %dir, host = %host.display(), ?scope, "reading local directory");

        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&host).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(directory = %dir, name = ?raw, "skipping non UTF-8 entry");
                    continue;
                }
            };
            if !self.show_hidden && name.starts_with('.') {
                continue;
            }
            // Symlinks are listed as files and never followed.
            let file_type = match entry.file_type().await {
                Ok(ft) if ft.is_dir() => FileType::Directory,
                Ok(_) => FileType::File,
                Err(_) => continue,
            };
            let selected = self.preselected.contains(&path::join(&dir, &name)?);
            entries.push(DirEntry {
                directory: dir.clone(),
                filename: name,
                file_type,
                selected,
            });
        }
        Ok(entries)
    }
}

/// Serves recorded listings, keyed by tree path.
#[derive(Debug, Clone, Default)]
pub struct FixtureLister {
    listings: HashMap<String, Listing>,
}

impl FixtureLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{"<path>": {"files": [...]}, ...}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, Listing> = serde_json::from_str(json)?;
        let mut fixture = Self::new();
        for (dir, listing) in raw {
            fixture.listings.insert(path::normalize(&dir)?, listing);
        }
        Ok(fixture)
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(file)?;
        Self::from_json(&content)
    }

    pub fn with_listing(mut self, dir: &str, files: Vec<DirEntry>) -> Self {
        let dir = path::normalize(dir).unwrap_or_else(|_| dir.to_string());
        self.listings.insert(dir, Listing { files });
        self
    }
}

#[async_trait]
impl DirectoryLister for FixtureLister {
    async fn list_directory(&self, _scope: &ListingScope, dir: &str) -> Result<Vec<DirEntry>> {
        let dir = path::normalize(dir)?;
        self.listings
            .get(&dir)
            .map(|listing| listing.files.clone())
            .ok_or_else(|| AppError::Fetch {
                path: dir,
                message: "no recorded listing".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("etc")).unwrap();
        File::create(dir.path().join("passwd")).unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        File::create(dir.path().join("etc").join("hosts")).unwrap();
        dir
    }

    fn sorted_names(entries: &[DirEntry]) -> Vec<&str> {
        let mut names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        names.sort();
        names
    }

    #[test]
    fn dir_entry_wire_format() {
        let json = r#"{"directory":"/","filename":"etc","file_type":"directory","selected":false}"#;
        let entry: DirEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry, DirEntry::new("/", "etc", FileType::Directory));
    }

    #[test]
    fn dir_entry_selected_defaults_to_false() {
        let json = r#"{"directory":"/etc","filename":"hosts","file_type":"file"}"#;
        let entry: DirEntry = serde_json::from_str(json).unwrap();
        assert!(!entry.selected);
    }

    #[test]
    fn to_child_accepts_matching_directory() {
        let entry = DirEntry::new("/etc/", "hosts", FileType::File);
        let child = entry.to_child("/etc").unwrap();
        assert_eq!(child.name, "hosts");
        assert_eq!(child.kind, NodeKind::File);
    }

    #[test]
    fn to_child_rejects_foreign_directory_and_bad_names() {
        let foreign = DirEntry::new("/var", "log", FileType::Directory);
        assert!(matches!(
            foreign.to_child("/etc"),
            Err(AppError::InvalidPath(_))
        ));
        let nested = DirEntry::new("/etc", "ssh/config", FileType::File);
        assert!(matches!(
            nested.to_child("/etc"),
            Err(AppError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn local_lister_lists_root() {
        let dir = setup_test_dir();
        let lister = LocalLister::new(dir.path());
        let entries = lister
            .list_directory(&ListingScope::default(), "/")
            .await
            .unwrap();
        assert_eq!(sorted_names(&entries), vec![".hidden", "etc", "passwd"]);
        let etc = entries.iter().find(|e| e.filename == "etc").unwrap();
        assert_eq!(etc.file_type, FileType::Directory);
        assert_eq!(etc.directory, "/");
    }

    #[tokio::test]
    async fn local_lister_maps_nested_paths_and_preselection() {
        let dir = setup_test_dir();
        let lister = LocalLister::new(dir.path()).preselected(["/etc/hosts"]);
        let entries = lister
            .list_directory(&ListingScope::default(), "/etc")
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].directory, "/etc");
        assert!(entries[0].selected);
    }

    #[tokio::test]
    async fn local_lister_hides_dotfiles_on_request() {
        let dir = setup_test_dir();
        let lister = LocalLister::new(dir.path()).show_hidden(false);
        let entries = lister
            .list_directory(&ListingScope::default(), "/")
            .await
            .unwrap();
        assert_eq!(sorted_names(&entries), vec!["etc", "passwd"]);
    }

    #[tokio::test]
    async fn local_lister_missing_directory_is_io_error() {
        let dir = setup_test_dir();
        let lister = LocalLister::new(dir.path());
        let err = lister
            .list_directory(&ListingScope::default(), "/nope")
            .await;
        assert!(matches!(err, Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn fixture_lister_serves_recorded_listings() {
        let json = r#"{
            "/": {"files": [
                {"directory": "/", "filename": "etc", "file_type": "directory", "selected": false}
            ]}
        }"#;
        let lister = FixtureLister::from_json(json).unwrap();
        let scope = ListingScope::Restore {
            backup_id: Some("7".into()),
            snapshot: "2021-05-11".into(),
        };
        let entries = lister.list_directory(&scope, "/").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(matches!(
            lister.list_directory(&scope, "/etc").await,
            Err(AppError::Fetch { .. })
        ));
    }
}
