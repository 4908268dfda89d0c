//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--root`, `--snapshot`, etc.)
//! 2. `$BFS_CONFIG` environment variable (path to config file)
//! 3. Project-local `.bfs.toml` in the current working directory
//! 4. Global `~/.config/bfs/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::fs::lister::ListingScope;

// ── Section configs ──────────────────────────────────────────────────────────

/// General session settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory the tree view starts at.
    pub start_path: Option<String>,
}

/// Tree presentation settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Directories always listed first.
    pub dirs_first: Option<bool>,
}

/// Where listings come from and what they are for.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ListingConfig {
    /// Local directory mapped onto the tree root.
    pub root: Option<PathBuf>,
    /// Include dotfiles in local listings.
    pub show_hidden: Option<bool>,
    /// Recorded JSON listings to serve instead of the local filesystem.
    pub fixture: Option<PathBuf>,
    /// Backup the selection belongs to.
    pub backup_id: Option<String>,
    /// Snapshot to restore from; switches the session to restore mode.
    pub snapshot: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive: "trace", "debug", "info", "warn", "error", "off".
    pub level: Option<String>,
    /// Output format: "text" or "json".
    pub format: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub listing: ListingConfig,
    pub logging: LoggingConfig,
}

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; that one is applied after these.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("BFS_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".bfs.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("bfs").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`: `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                start_path: other
                    .general
                    .start_path
                    .clone()
                    .or(self.general.start_path),
            },
            tree: TreeConfig {
                dirs_first: other.tree.dirs_first.or(self.tree.dirs_first),
            },
            listing: ListingConfig {
                root: other.listing.root.clone().or(self.listing.root),
                show_hidden: other.listing.show_hidden.or(self.listing.show_hidden),
                fixture: other.listing.fixture.clone().or(self.listing.fixture),
                backup_id: other.listing.backup_id.clone().or(self.listing.backup_id),
                snapshot: other.listing.snapshot.clone().or(self.listing.snapshot),
            },
            logging: LoggingConfig {
                level: other.logging.level.clone().or(self.logging.level),
                format: other.logging.format.clone().or(self.logging.format),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that highest-priority (env var) overwrites lower.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn start_path(&self) -> &str {
        self.general.start_path.as_deref().unwrap_or("/")
    }

    pub fn dirs_first(&self) -> bool {
        self.tree.dirs_first.unwrap_or(true)
    }

    pub fn listing_root(&self) -> &Path {
        self.listing
            .root
            .as_deref()
            .unwrap_or_else(|| Path::new("/"))
    }

    pub fn show_hidden(&self) -> bool {
        self.listing.show_hidden.unwrap_or(true)
    }

    pub fn fixture(&self) -> Option<&Path> {
        self.listing.fixture.as_deref()
    }

    /// Restore scope when a snapshot is configured, backup scope otherwise.
    pub fn listing_scope(&self) -> ListingScope {
        let backup_id = self.listing.backup_id.clone();
        match &self.listing.snapshot {
            Some(snapshot) => ListingScope::Restore {
                backup_id,
                snapshot: snapshot.clone(),
            },
            None => ListingScope::Backup { backup_id },
        }
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("info")
    }

    pub fn log_format(&self) -> &str {
        self.logging.format.as_deref().unwrap_or("text")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
