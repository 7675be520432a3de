//! Error taxonomy for the provisioning pipeline.
//!
//! Each component returns its own error type. The pipeline wraps them in
//! [`PipelineError`], whose message names the operation that failed. Nothing
//! is retried and nothing is rolled back.

use std::path::PathBuf;
use thiserror::Error;

/// Pre-existing filesystem state that makes provisioning impossible.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} is a directory, not a file", .0.display())]
    TarballIsDirectory(PathBuf),

    #[error("{} is not a directory", .0.display())]
    ExtractDirNotDirectory(PathBuf),
}

/// Failure while downloading the release archive.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot create {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Request(String),

    #[error("bad status: {0} {1}")]
    BadStatus(u16, String),

    #[error("transfer failed: {0}")]
    TransferFailed(String),

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

/// Failure while unpacking an archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported compression type: {0}")]
    UnsupportedCompression(String),

    #[error("archive not found: {}", .0.display())]
    ArchiveMissing(PathBuf),

    #[error("destination directory does not exist: {}", .0.display())]
    DestinationMissing(PathBuf),

    #[error("{0}")]
    ExtractionFailed(String),
}

/// Failure while relocating or removing a subtree.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("{} does not exist", .0.display())]
    SourceMissing(PathBuf),

    #[error("{} already exists", .0.display())]
    DestinationConflict(PathBuf),

    #[error("{0}")]
    Other(String),
}

/// A failed pipeline stage. The message is the single diagnostic line the
/// binary prints after `ERROR:`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Preflight failed: {0}")]
    Preflight(String),

    #[error("Failed to download L4T: {0}")]
    Fetch(#[source] FetchError),

    #[error("Failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to extract L4T: {0}")]
    Extract(#[source] ExtractError),

    #[error("Failed to extract drivers: {0}")]
    ExtractDrivers(#[source] ExtractError),

    #[error("Failed to move lib/firmware directory: {0}")]
    MoveFirmware(#[source] MoveError),

    #[error("Failed to remove lib directory: {0}")]
    RemoveLib(#[source] MoveError),
}
