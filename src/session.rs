use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::event::{Event, EventQueue, Intent};
use crate::fs::lister::{DirectoryLister, ListingScope};
use crate::fs::loader::{LoadCoordinator, ToggleOutcome};
use crate::fs::path;
use crate::fs::selection::{BackupSelection, DisplayStatus, RestoreRequest};
use crate::fs::tree::{TreeStore, VisibleItem};

/// How a selection session is set up.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Directory the view starts at; its ancestors are synthesized.
    pub start_path: String,
    /// List directories before files in [`Session::visible_items`].
    pub dirs_first: bool,
    pub scope: ListingScope,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            start_path: path::ROOT.to_string(),
            dirs_first: true,
            scope: ListingScope::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            start_path: config.start_path().to_string(),
            dirs_first: config.dirs_first(),
            scope: config.listing_scope(),
        }
    }
}

/// One file-selection session: the tree plus the single queue that mutates it.
///
/// Intents and listing completions are applied one at a time through
/// `&mut self`; fetch tasks only ever talk to the session through its queue.
/// Dropping the session abandons any fetches still running.
pub struct Session {
    tree: TreeStore,
    loader: LoadCoordinator,
    events: EventQueue,
    start_path: String,
    dirs_first: bool,
}

impl Session {
    pub fn new(lister: Arc<dyn DirectoryLister>, options: SessionOptions) -> Result<Self> {
        let tree = TreeStore::with_start(&options.start_path)?;
        let start_path = path::normalize(&options.start_path)?;
        let events = EventQueue::new();
        let loader = LoadCoordinator::new(lister, options.scope, events.sender());
        Ok(Self {
            tree,
            loader,
            events,
            start_path,
            dirs_first: options.dirs_first,
        })
    }

    /// Create a session and start loading its start directory.
    ///
    /// Directories above a non-root start path only hold the way down; use
    /// [`Session::refresh`] on one of them to list the rest of its entries.
    pub fn open(lister: Arc<dyn DirectoryLister>, options: SessionOptions) -> Result<Self> {
        let mut session = Self::new(lister, options)?;
        let start = session.start_path.clone();
        session.set_open(&start, true)?;
        info!(start = %start, scope = ?session.loader.scope(), "selection session opened");
        Ok(session)
    }

    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    pub fn start_path(&self) -> &str {
        &self.start_path
    }

    /// Sender for intents produced outside the session.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.events.sender()
    }

    /// Number of listings still in flight.
    pub fn pending_fetches(&self) -> usize {
        self.loader.pending()
    }

    pub fn toggle(&mut self, target: &str) -> Result<ToggleOutcome> {
        self.loader.toggle(&mut self.tree, target)
    }

    pub fn set_open(&mut self, target: &str, open: bool) -> Result<ToggleOutcome> {
        self.loader.set_open(&mut self.tree, target, open)
    }

    pub fn refresh(&mut self, target: &str) -> Result<bool> {
        self.loader.refresh(&mut self.tree, target)
    }

    pub fn toggle_explicit(&mut self, target: &str) -> Result<bool> {
        self.tree.toggle_explicit(target)
    }

    pub fn set_explicit(&mut self, target: &str, selected: bool) -> Result<()> {
        self.tree.set_explicit(target, selected)
    }

    pub fn display_status(&self, target: &str) -> Result<DisplayStatus> {
        self.tree.display_status(target)
    }

    /// Minimal covering selection of the whole tree.
    pub fn covering_selection(&self) -> Result<BTreeSet<String>> {
        self.tree.covering_selection(path::ROOT)
    }

    pub fn selection_map(&self) -> BTreeMap<String, bool> {
        self.tree.selection_map()
    }

    /// Every explicitly selected path, redundant ones included.
    pub fn explicit_selections(&self) -> Vec<String> {
        self.tree.explicit_selections()
    }

    pub fn visible_items(&self) -> Vec<VisibleItem> {
        self.tree.visible_items(self.dirs_first)
    }

    pub fn backup_selection(&self) -> Result<BackupSelection> {
        BackupSelection::from_tree(&self.tree)
    }

    /// Restore body for the snapshot this session browses.
    pub fn restore_request(&self, restore_path: &str) -> Result<RestoreRequest> {
        match self.loader.scope() {
            ListingScope::Restore { snapshot, .. } => {
                RestoreRequest::from_tree(&self.tree, snapshot.as_str(), restore_path)
            }
            ListingScope::Backup { .. } => Err(AppError::NotRestoring),
        }
    }

    /// Apply one user intent.
    pub fn apply(&mut self, intent: Intent) -> Result<()> {
        debug!(?intent, "applying intent");
        match intent {
            Intent::Toggle(p) => self.toggle(&p).map(|_| ()),
            Intent::SetOpen(p, open) => self.set_open(&p, open).map(|_| ()),
            Intent::Refresh(p) => self.refresh(&p).map(|_| ()),
            Intent::ToggleSelect(p) => self.toggle_explicit(&p).map(|_| ()),
            Intent::SetSelect(p, selected) => self.set_explicit(&p, selected),
        }
    }

    /// Process one queued event.
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Intent(intent) => self.apply(intent),
            Event::ListingComplete(done) => {
                self.loader.complete(&mut self.tree, done).map(|_| ())
            }
        }
    }

    /// Receive the next queued event.
    pub async fn next_event(&mut self) -> Result<Event> {
        self.events.next().await
    }

    /// Process queued events until no listing is in flight.
    ///
    /// Returns the failures met along the way; each affects only its own node.
    pub async fn settle(&mut self) -> Vec<AppError> {
        let mut errors = Vec::new();
        loop {
            while let Some(event) = self.events.try_next() {
                if let Err(err) = self.handle_event(event) {
                    errors.push(err);
                }
            }
            if self.loader.pending() == 0 {
                break;
            }
            match self.events.next().await {
                Ok(event) => {
                    if let Err(err) = self.handle_event(event) {
                        errors.push(err);
                    }
                }
                Err(err) => {
                    errors.push(err);
                    break;
                }
            }
        }
        errors
    }
}
