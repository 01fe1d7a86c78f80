use std::io;
use std::path::PathBuf;

/// First failure of an extraction run.
///
/// Files written before the failure stay on disk.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to open archive '{path}': {source:#}")]
    Open {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to create directory '{path}': {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to open entry '{name}': {source:#}")]
    EntryOpen {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read entry '{name}': {source:#}")]
    EntryRead {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("entry '{name}' would be written outside the destination")]
    UnsafePath { name: String },

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to set permissions {mode:o} on '{path}': {source}")]
    SetPermissions {
        path: PathBuf,
        mode: u32,
        source: io::Error,
    },

    #[error("failed to remove source archive '{path}': {source}")]
    RemoveSource { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
