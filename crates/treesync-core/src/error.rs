//! Error types for treesync-core

use std::path::PathBuf;

/// Result type for treesync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a sync cycle
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The candidate tree could not be acquired
    #[error("Failed to acquire candidate tree: {message}")]
    Fetch { message: String },

    /// A live file could not be copied into the backup root
    #[error("Backup of {path} failed: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The background apply failed part-way through
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// Another cycle still holds the single-flight lock for this live tree
    #[error("A sync cycle is already in flight (lock held at {lock})")]
    CycleInFlight { lock: PathBuf },

    /// The configuration is unusable
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The background apply task panicked
    #[error("Apply task panicked")]
    ApplyPanicked,

    /// Filesystem error from treesync-fs
    #[error(transparent)]
    Fs(#[from] treesync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

/// Failures raised while mutating the live tree
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {path} into the live tree: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path} from the live tree: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Apply cancelled")]
    Cancelled,
}
