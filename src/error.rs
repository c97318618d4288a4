/// Error types for the catalog collaborators
///
/// The table model itself never fails: stale events are dropped and bad
/// indices resolve to nothing. Errors only come from the layers that touch
/// the disk, the database or the network.

use thiserror::Error;

/// Errors raised by the catalog library and settings storage
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not determine user data directory")]
    NoDataDir,
}

/// Errors raised while fetching or decoding a thumbnail
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read icon: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode icon: {0}")]
    Decode(#[from] image::ImageError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
