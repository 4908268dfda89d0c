use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed path or entry name (e.g. a name containing a separator).
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Lookup of a path whose ancestor chain has not been loaded.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A directory-only operation was aimed at a file.
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// A listing was merged into a directory that never started loading.
    #[error("Directory is not loading: {0}")]
    NotLoading(String),

    /// A restore request was built by a session browsing backup sources.
    #[error("Session is not restoring from a snapshot")]
    NotRestoring,

    /// A command line that could not be understood.
    #[error("Usage: {0}")]
    Usage(String),

    /// The directory listing collaborator failed.
    #[error("Failed to list {path}: {message}")]
    Fetch { path: String, message: String },

    /// I/O errors from filesystem-backed listers.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON listings or fixtures.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration or logging setup errors.
    #[error("Config error: {0}")]
    Config(String),

    /// The session event queue was closed.
    #[error("Event channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn invalid_path_error_display() {
        let err = AppError::InvalidPath("a/b".into());
        assert_eq!(err.to_string(), "Invalid path: a/b");
    }

    #[test]
    fn fetch_error_display() {
        let err = AppError::Fetch {
            path: "/etc".into(),
            message: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "Failed to list /etc: connection refused");
    }
}
