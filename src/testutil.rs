//! Listers for tests: call counting, gating, scripted failures and panics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::error::{AppError, Result};
use crate::fs::lister::{DirEntry, DirectoryLister, ListingScope};

/// Serves fixed listings and counts calls per path.
#[derive(Default)]
pub struct CountingLister {
    listings: Mutex<HashMap<String, Vec<DirEntry>>>,
    calls: Mutex<HashMap<String, usize>>,
    scopes: Mutex<Vec<ListingScope>>,
}

impl CountingLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(self, path: &str, entries: Vec<DirEntry>) -> Self {
        self.set_listing(path, entries);
        self
    }

    pub fn set_listing(&self, path: &str, entries: Vec<DirEntry>) {
        self.listings
            .lock()
            .unwrap()
            .insert(path.to_string(), entries);
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn scopes(&self) -> Vec<ListingScope> {
        self.scopes.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectoryLister for CountingLister {
    async fn list_directory(&self, scope: &ListingScope, path: &str) -> Result<Vec<DirEntry>> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_insert(0) += 1;
        self.scopes.lock().unwrap().push(scope.clone());
        self.listings
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::Fetch {
                path: path.to_string(),
                message: "no listing".to_string(),
            })
    }
}

/// Holds every listing until [`GatedLister::release`] is called.
pub struct GatedLister {
    entries: Vec<DirEntry>,
    gate: Semaphore,
    calls: AtomicUsize,
}

impl GatedLister {
    pub fn new(entries: Vec<DirEntry>) -> Self {
        Self {
            entries,
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Let one pending (or future) listing through.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryLister for GatedLister {
    async fn list_directory(&self, _scope: &ListingScope, _path: &str) -> Result<Vec<DirEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.map_err(|_| AppError::ChannelClosed)?;
        permit.forget();
        Ok(self.entries.clone())
    }
}

/// Fails the first `failures` calls, then serves `entries`.
pub struct FailingLister {
    failures: usize,
    entries: Vec<DirEntry>,
    calls: AtomicUsize,
}

impl FailingLister {
    pub fn new(failures: usize, entries: Vec<DirEntry>) -> Self {
        Self {
            failures,
            entries,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryLister for FailingLister {
    async fn list_directory(&self, _scope: &ListingScope, path: &str) -> Result<Vec<DirEntry>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(AppError::Fetch {
                path: path.to_string(),
                message: "backend unavailable".to_string(),
            });
        }
        Ok(self.entries.clone())
    }
}

/// Panics on the first `panics` calls, then serves `entries`.
pub struct PanickingLister {
    panics: usize,
    entries: Vec<DirEntry>,
    calls: AtomicUsize,
}

impl PanickingLister {
    pub fn new(panics: usize, entries: Vec<DirEntry>) -> Self {
        Self {
            panics,
            entries,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryLister for PanickingLister {
    async fn list_directory(&self, _scope: &ListingScope, path: &str) -> Result<Vec<DirEntry>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.panics {
            panic!("lister crashed while listing {}", path);
        }
        Ok(self.entries.clone())
    }
}
