//! Canonical path arithmetic for tree paths.
//!
//! Tree paths are plain strings, always absolute and `/`-separated, independent
//! of the host platform's path rules.

use crate::error::{AppError, Result};

/// Path of the tree root.
pub const ROOT: &str = "/";

/// Join a directory path and a single entry name.
///
/// A directory ending in `/` is concatenated directly, otherwise one `/` is
/// inserted. An empty directory is treated as the root.
pub fn join(directory: &str, name: &str) -> Result<String> {
    validate_name(name)?;
    if directory.is_empty() {
        return Ok(format!("/{}", name));
    }
    if directory.ends_with('/') {
        Ok(format!("{}{}", directory, name))
    } else {
        Ok(format!("{}/{}", directory, name))
    }
}

/// Split a path into its segment names, discarding empty segments.
///
/// `split("/")` is empty.
pub fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Normalize an absolute path to its canonical form.
///
/// Collapses repeated and trailing slashes. Relative paths and `.`/`..`
/// segments are rejected.
pub fn normalize(path: &str) -> Result<String> {
    if !path.starts_with('/') {
        return Err(AppError::InvalidPath(path.to_string()));
    }
    let segments = split(path);
    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(AppError::InvalidPath(path.to_string()));
    }
    Ok(from_segments(&segments))
}

/// Build a canonical path from segment names.
pub fn from_segments(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}

/// Reject names that cannot be a single path segment.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(AppError::InvalidPath(name.to_string()));
    }
    Ok(())
}
