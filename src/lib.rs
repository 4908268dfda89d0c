//! Lazily-loaded, selection-aware directory tree for choosing what to back up
//! and what to restore.
//!
//! A [`session::Session`] owns the tree. Directories are listed on demand
//! through a [`fs::lister::DirectoryLister`], and selections are reported as a
//! minimal covering set of paths.

pub mod config;
pub mod error;
pub mod event;
pub mod fs;
pub mod handler;
pub mod logging;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;
