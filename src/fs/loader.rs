//! On-demand loading of directory children.
//!
//! Opening an unloaded directory spawns one listing task; its result comes
//! back through the session queue and is merged by [`LoadCoordinator::complete`].
//! At most one listing per path is in flight at a time.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::event::{Event, ListingComplete};
use crate::fs::lister::{DirectoryLister, ListingScope};
use crate::fs::path;
use crate::fs::tree::{ChildEntry, LoadState, TreeStore};

/// What an expansion change did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Target is a file; nothing changed.
    Ignored,
    /// Directory is now open. `fetching` is set when a listing was started.
    Opened { fetching: bool },
    Closed,
}

pub struct LoadCoordinator {
    lister: Arc<dyn DirectoryLister>,
    scope: ListingScope,
    tx: mpsc::UnboundedSender<Event>,
    /// In-flight listings, with the load state to restore if they fail.
    in_flight: HashMap<String, LoadState>,
}

impl LoadCoordinator {
    pub fn new(
        lister: Arc<dyn DirectoryLister>,
        scope: ListingScope,
        tx: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            lister,
            scope,
            tx,
            in_flight: HashMap::new(),
        }
    }

    pub fn scope(&self) -> &ListingScope {
        &self.scope
    }

    /// Number of listings still in flight.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_fetching(&self, target: &str) -> bool {
        path::normalize(target).is_ok_and(|canonical| self.in_flight.contains_key(&canonical))
    }

    /// Flip the expansion of the directory at `path`.
    pub fn toggle(&mut self, tree: &mut TreeStore, path: &str) -> Result<ToggleOutcome> {
        let open = !tree.get(path)?.is_open();
        self.set_open(tree, path, open)
    }

    /// Expand or collapse the directory at `path`.
    ///
    /// Expanding an unloaded directory starts its listing. Collapsing keeps
    /// whatever is already loaded.
    pub fn set_open(
        &mut self,
        tree: &mut TreeStore,
        path: &str,
        open: bool,
    ) -> Result<ToggleOutcome> {
        let node = tree.get_mut(path)?;
        if !node.is_dir() {
            return Ok(ToggleOutcome::Ignored);
        }
        node.is_open = open;
        if !open {
            return Ok(ToggleOutcome::Closed);
        }
        let canonical = node.path().to_string();
        if node.load_state != LoadState::Unloaded || self.in_flight.contains_key(&canonical) {
            return Ok(ToggleOutcome::Opened { fetching: false });
        }
        node.load_state = LoadState::Loading;
        self.spawn_fetch(canonical, LoadState::Unloaded);
        Ok(ToggleOutcome::Opened { fetching: true })
    }

    /// Re-fetch a directory regardless of what is cached.
    ///
    /// Returns `false` when a listing for it is already in flight. Unloaded
    /// directories are simply loaded.
    pub fn refresh(&mut self, tree: &mut TreeStore, path: &str) -> Result<bool> {
        let node = tree.get_mut(path)?;
        if !node.is_dir() {
            return Err(AppError::NotADirectory(node.path().to_string()));
        }
        let canonical = node.path().to_string();
        if self.in_flight.contains_key(&canonical) {
            return Ok(false);
        }
        let prior = node.load_state;
        node.load_state = LoadState::Loading;
        self.spawn_fetch(canonical, prior);
        Ok(true)
    }

    /// Apply a finished listing to the tree.
    ///
    /// The whole listing is validated before anything is merged. On failure
    /// the directory goes back to its state before the fetch, a directory
    /// that never loaded is collapsed so the next toggle retries, and the
    /// error is returned.
    pub fn complete(&mut self, tree: &mut TreeStore, done: ListingComplete) -> Result<usize> {
        let ListingComplete { path, result } = done;
        let Some(prior) = self.in_flight.remove(&path) else {
            debug!(path = %path, "dropping listing with no matching fetch");
            return Ok(0);
        };

        let merged = result
            .and_then(|entries| {
                entries
                    .iter()
                    .map(|entry| entry.to_child(&path))
                    .collect::<Result<Vec<ChildEntry>>>()
            })
            .and_then(|children| tree.merge(&path, &children));

        match merged {
            Ok(inserted) => Ok(inserted),
            Err(err) => {
                warn!(path = %path, error = %err, "listing failed");
                if let Ok(node) = tree.get_mut(&path) {
                    node.load_state = prior;
                    if prior == LoadState::Unloaded {
                        node.is_open = false;
                    }
                }
                Err(into_fetch_error(path, err))
            }
        }
    }

    fn spawn_fetch(&mut self, path: String, prior: LoadState) {
        debug!(path = %path, "starting listing");
        self.in_flight.insert(path.clone(), prior);
        let lister = Arc::clone(&self.lister);
        let scope = self.scope.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let listing = {
                let path = path.clone();
                tokio::spawn(async move { lister.list_directory(&scope, &path).await })
            };
            // A lister that panics still has to release its in-flight slot.
            let result = listing.await.unwrap_or_else(|err| {
                Err(AppError::Fetch {
                    path: path.clone(),
                    message: format!("listing task failed: {}", err),
                })
            });
            // The session may be gone; its tree went with it.
            let _ = tx.send(Event::ListingComplete(ListingComplete { path, result }));
        });
    }
}

fn into_fetch_error(path: String, err: AppError) -> AppError {
    match err {
        AppError::Fetch { .. } => err,
        other => AppError::Fetch {
            path,
            message: other.to_string(),
        },
    }
}
