//! Configuration stage errors.

use std::path::PathBuf;

use exafmm_toolchain::ToolchainError;
use thiserror::Error;

/// Errors that abort a configuration run.
///
/// Every variant is fatal: artifacts written before the failure must be
/// treated as stale until configure is rerun.
#[derive(Debug, Error)]
pub enum ConfigureError {
    #[error("unable to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to remove file {}. Did a different user create it? ({source})", path.display())]
    RemoveStaleDefaultArch {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    #[error("unable to serialize run record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigureError>;
