//! Quantum Downloader - a small web service for fetching online videos
//!
//! The service asks yt-dlp for the stream variants of a media page, reduces
//! them to a handful of user-facing quality tiers plus audio options, and
//! resolves a chosen variant back into a direct URL or a local download.

pub mod cli;
pub mod config;
pub mod download;
pub mod extractors;
pub mod formats;
pub mod server;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use download::{Downloader, MediaKind, ResolvedDownload};
pub use extractors::{MediaExtractor, MediaInfo, StreamDescriptor};
pub use formats::{AudioOption, QualityTier, SearchResponse, TierName};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types surfaced to API callers
#[derive(thiserror::Error, Debug)]
pub enum DownloaderError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Failed to extract video information: {0}")]
    ExtractionFailure(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    DownloadFailure(String),

    #[error("Failed to load thumbnail")]
    Thumbnail(#[from] ThumbnailError),
}

/// Why a thumbnail could not be proxied
#[derive(thiserror::Error, Debug)]
pub enum ThumbnailError {
    #[error("thumbnail request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("thumbnail server answered HTTP {0}")]
    Status(u16),
}

impl DownloaderError {
    /// Whether the failure is the caller's fault (HTTP 4xx) rather than ours
    pub fn is_client_error(&self) -> bool {
        !matches!(self, DownloaderError::DownloadFailure(_))
    }
}
