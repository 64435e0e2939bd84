use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub mod ytdlp;

pub use ytdlp::YtDlp;

use crate::{DownloadError, MetadataError};

/// Title used when the extractor reports none
pub const DEFAULT_TITLE: &str = "Twitter Space";

/// Uploader used when the extractor reports none
pub const DEFAULT_UPLOADER: &str = "Unknown";

/// Information about a Space as reported by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceInfo {
    /// Title of the Space
    pub title: String,

    /// Host display name
    pub uploader: String,

    /// Duration in seconds if known
    pub duration: Option<f64>,

    /// Extractor-specific identifier
    pub id: Option<String>,
}

impl SpaceInfo {
    /// Build from the extractor's JSON record, defaulting absent or mistyped fields
    pub fn from_json(info: &Value) -> Self {
        Self {
            title: info["title"].as_str().unwrap_or(DEFAULT_TITLE).to_string(),
            uploader: info["uploader"]
                .as_str()
                .unwrap_or(DEFAULT_UPLOADER)
                .to_string(),
            duration: info["duration"].as_f64(),
            id: match &info["id"] {
                Value::String(id) => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            },
        }
    }

    /// Parse the raw stdout of a "dump single JSON" invocation
    pub fn parse(stdout: &[u8]) -> Result<Self, MetadataError> {
        let info: Value = serde_json::from_slice(stdout).map_err(|_| MetadataError::Parse)?;

        if !info.is_object() {
            return Err(MetadataError::Parse);
        }

        Ok(Self::from_json(&info))
    }
}

impl Default for SpaceInfo {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            uploader: DEFAULT_UPLOADER.to_string(),
            duration: None,
            id: None,
        }
    }
}

/// Trait for the external tool that inspects and downloads Spaces
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Fetch metadata for a Space URL
    async fn fetch_space_info(&self, url: &str) -> Result<SpaceInfo, MetadataError>;

    /// Extract the audio as MP3 using an output path template.
    ///
    /// Returns the output path the tool reported, if it reported one.
    async fn download_audio(
        &self,
        url: &str,
        output_template: &Path,
    ) -> Result<Option<PathBuf>, DownloadError>;

    /// Get the name of the underlying tool
    fn tool_name(&self) -> &'static str;
}

/// Hosts a Space link may point at, matched case-sensitively and without a port
const SPACES_HOSTS: [&str; 2] = ["twitter.com", "x.com"];

/// Check if a URL looks like a Twitter/X Space (or a tweet carrying one).
///
/// The URL must start with `http(s)://{twitter.com,x.com}/i/spaces/<word>` or
/// `http(s)://{twitter.com,x.com}/<word>/status/<digit>`; anything may follow.
pub fn is_valid_spaces_url(url: &str) -> bool {
    let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    else {
        return false;
    };

    let Some(path) = SPACES_HOSTS
        .iter()
        .find_map(|host| rest.strip_prefix(host)?.strip_prefix('/'))
    else {
        return false;
    };

    if let Some(id) = path.strip_prefix("i/spaces/") {
        return word_prefix_len(id) > 0;
    }

    let user_len = word_prefix_len(path);
    user_len > 0
        && path[user_len..]
            .strip_prefix("/status/")
            .is_some_and(starts_with_digit)
}

/// Byte length of the leading run of word characters (letters, digits, `_`)
fn word_prefix_len(text: &str) -> usize {
    text.char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map_or(text.len(), |(index, _)| index)
}

fn starts_with_digit(segment: &str) -> bool {
    segment.chars().next().is_some_and(|c| c.is_ascii_digit())
}
