//! spaces-dl - download Twitter/X Spaces as MP3 files
//!
//! This library wraps `yt-dlp` (and the `ffmpeg` it drives) to fetch Space metadata,
//! derive a safe output filename, and extract the audio track as MP3. It backs both the
//! interactive `spaces-dl` console program and the machine-facing `spaces-dl-api` binary.

pub mod cli;
pub mod config;
pub mod deps;
pub mod download;
pub mod extractors;
pub mod output;
pub mod utils;

pub use cli::{ApiCli, Cli};
pub use config::Config;
pub use deps::{DependencyReport, ExecutableLocator, SearchStrategy, SystemSearch, Tool};
pub use download::{DownloadPlan, DownloadResult, DownloadedSpace, SpaceDownloader};
pub use extractors::{is_valid_spaces_url, MediaExtractor, SpaceInfo, YtDlp};

/// Result type used by the binaries and the config layer
pub type Result<T> = anyhow::Result<T>;

/// Failures while fetching Space metadata
#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    #[error("Timeout while getting space information")]
    Timeout,

    #[error("Error parsing space information")]
    Parse,

    #[error("Error getting space info: {stderr}")]
    Exit { stderr: String },

    #[error("Error: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Failures while downloading and transcoding the audio
#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    #[error("Download timeout (max {limit})")]
    Timeout { limit: String },

    #[error("Download failed: {stderr}")]
    ToolFailed { stderr: String },

    #[error("Download failed with return code: {code}")]
    ExitCode { code: i32 },

    #[error("Download cancelled by user")]
    Interrupted,

    #[error("Download completed but no MP3 file found")]
    NoOutput,

    #[error("Error during download: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Error types specific to downloading a Space
#[derive(thiserror::Error, Debug)]
pub enum SpaceError {
    #[error("Invalid Twitter Spaces URL")]
    InvalidUrl,

    #[error("Missing dependencies: {}", .0.join(", "))]
    DependencyMissing(Vec<String>),

    #[error("Cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}
