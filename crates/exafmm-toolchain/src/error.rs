//! Error types for toolchain operations.

use std::path::PathBuf;

use crate::language::Language;

/// Errors that can occur while detecting, loading, or querying a toolchain.
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error reading/writing toolchain files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Toolchain file not found.
    #[error("toolchain file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// No working compiler could be found for a required language.
    #[error("no working {language} compiler found (tried: {})", tried.join(", "))]
    CompilerNotFound {
        /// The language being probed.
        language: Language,
        /// Every executable that was tried, in order.
        tried: Vec<String>,
    },

    /// A language was queried that this toolchain does not provide.
    #[error("{language} is not available in this toolchain")]
    LanguageUnavailable {
        /// The requested language.
        language: Language,
    },

    /// Validation error in a toolchain definition.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },
}

/// Result type for toolchain operations.
pub type Result<T> = std::result::Result<T, ToolchainError>;
