use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures surfaced by the filesystem and configuration layers.
///
/// The TUI turns these into notifications; only startup paths let them
/// escape as fatal `anyhow` errors.
#[derive(Debug, Error)]
pub enum PrompterError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied: {}", .0.display())]
    AccessDenied(PathBuf),

    #[error("malformed config {}: {reason}", path.display())]
    MalformedConfig { path: PathBuf, reason: String },

    #[error("could not scan {}", .0.display())]
    PartialScanFailure(PathBuf),

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Notify(#[from] notify::Error),
}

impl PrompterError {
    /// Classifies an I/O failure against the path that caused it.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::AccessDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    pub fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Self::MalformedConfig {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PrompterError>;
