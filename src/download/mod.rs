use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::extractors::{
    is_valid_spaces_url, MediaExtractor, SpaceInfo, DEFAULT_TITLE, DEFAULT_UPLOADER,
};
use crate::utils::sanitize_filename;
use crate::{DownloadError, SpaceError};

pub mod retention;

pub use retention::{list_audio_files, prune_audio_files, StoredFile};

/// Template used when metadata is unavailable and fallback is enabled
pub const FALLBACK_TEMPLATE: &str = "twitter_space_%(id)s.%(ext)s";

const EXT_PLACEHOLDER: &str = "%(ext)s";

/// A successfully downloaded Space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadedSpace {
    pub file_path: PathBuf,
    pub file_name: String,
    pub file_size: u64,
    pub title: String,
    pub uploader: String,
    pub duration: Option<f64>,
}

/// Outcome of a download as reported to machine consumers.
///
/// Serializes to `{"success": true, ...}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadResult {
    Success(DownloadedSpace),
    Failure { message: String },
}

impl DownloadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadResult::Success(_))
    }
}

impl From<Result<DownloadedSpace, SpaceError>> for DownloadResult {
    fn from(result: Result<DownloadedSpace, SpaceError>) -> Self {
        match result {
            Ok(space) => DownloadResult::Success(space),
            Err(err) => DownloadResult::Failure {
                message: err.to_string(),
            },
        }
    }
}

impl Serialize for DownloadResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct SuccessBody<'a> {
            success: bool,
            #[serde(flatten)]
            space: &'a DownloadedSpace,
        }

        #[derive(Serialize)]
        struct FailureBody<'a> {
            error: &'a str,
        }

        match self {
            DownloadResult::Success(space) => SuccessBody {
                success: true,
                space,
            }
            .serialize(serializer),
            DownloadResult::Failure { message } => {
                FailureBody { error: message }.serialize(serializer)
            }
        }
    }
}

/// What will be downloaded and under which filename template
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadPlan {
    /// Metadata, absent when falling back to the generic template
    pub info: Option<SpaceInfo>,

    /// yt-dlp output template relative to the output directory
    pub template: String,
}

impl DownloadPlan {
    /// Plan a download named after the host and title
    pub fn for_space(info: SpaceInfo) -> Self {
        let template = filename_template(&info);
        Self {
            info: Some(info),
            template,
        }
    }

    /// Plan a download with the generic `twitter_space_<id>` name
    pub fn fallback() -> Self {
        Self {
            info: None,
            template: FALLBACK_TEMPLATE.to_string(),
        }
    }

    /// File the template expands to, when it depends only on the extension
    pub fn expected_file_name(&self) -> Option<String> {
        let name = self.template.replace(EXT_PLACEHOLDER, "mp3");
        if name.contains("%(") {
            None
        } else {
            Some(name)
        }
    }
}

/// Build the `"{uploader} - {title}.%(ext)s"` output template
pub fn filename_template(info: &SpaceInfo) -> String {
    let uploader = non_empty_or(sanitize_filename(&info.uploader), DEFAULT_UPLOADER);
    let title = non_empty_or(sanitize_filename(&info.title), DEFAULT_TITLE);
    format!("{} - {}.{}", uploader, title, EXT_PLACEHOLDER)
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// Orchestrates metadata lookup, download and output resolution
pub struct SpaceDownloader {
    extractor: Box<dyn MediaExtractor>,
    output_dir: PathBuf,
    fallback_on_metadata_error: bool,
    keep_latest: Option<usize>,
}

impl SpaceDownloader {
    pub fn new(extractor: Box<dyn MediaExtractor>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            output_dir: output_dir.into(),
            fallback_on_metadata_error: false,
            keep_latest: None,
        }
    }

    pub fn from_config(extractor: Box<dyn MediaExtractor>, config: &Config) -> Self {
        Self::new(extractor, &config.download.output_dir)
            .with_metadata_fallback(config.download.fallback_on_metadata_error)
            .with_retention(config.download.keep_latest)
    }

    pub fn with_metadata_fallback(mut self, enabled: bool) -> Self {
        self.fallback_on_metadata_error = enabled;
        self
    }

    pub fn with_retention(mut self, keep_latest: Option<usize>) -> Self {
        self.keep_latest = keep_latest;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory if it does not exist yet
    pub fn ensure_output_dir(&self) -> Result<(), SpaceError> {
        fs_err::create_dir_all(&self.output_dir).map_err(|source| SpaceError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })
    }

    /// Fetch metadata and decide on the output filename
    pub async fn plan(&self, url: &str) -> Result<DownloadPlan, SpaceError> {
        tracing::info!("Fetching space information for: {}", url);

        match self.extractor.fetch_space_info(url).await {
            Ok(info) => Ok(DownloadPlan::for_space(info)),
            Err(err) if self.fallback_on_metadata_error => {
                tracing::warn!("{}; using generic filename", err);
                Ok(DownloadPlan::fallback())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Run the download described by `plan` and locate the produced file
    pub async fn execute(
        &self,
        url: &str,
        plan: &DownloadPlan,
    ) -> Result<DownloadedSpace, SpaceError> {
        let template = self.output_dir.join(&plan.template);
        tracing::info!(
            "Downloading audio with {} to: {}",
            self.extractor.tool_name(),
            template.display()
        );

        let reported = self.extractor.download_audio(url, &template).await?;
        let file_path = self.resolve_output(reported, plan)?;
        let file_size = fs_err::metadata(&file_path)
            .map_err(DownloadError::Spawn)?
            .len();

        if let Some(keep) = self.keep_latest {
            match prune_audio_files(&self.output_dir, keep, &file_path) {
                Ok(removed) if !removed.is_empty() => {
                    tracing::info!(
                        "Pruned {} old file(s) from {}",
                        removed.len(),
                        self.output_dir.display()
                    );
                }
                Ok(_) => {}
                Err(err) => tracing::warn!("Failed to prune old downloads: {}", err),
            }
        }

        let info = plan.info.clone().unwrap_or_default();
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(DownloadedSpace {
            file_path,
            file_name,
            file_size,
            title: info.title,
            uploader: info.uploader,
            duration: info.duration,
        })
    }

    /// Full pipeline: output directory, metadata, download
    pub async fn download(&self, url: &str) -> Result<DownloadedSpace, SpaceError> {
        self.ensure_output_dir()?;
        let plan = self.plan(url).await?;
        self.execute(url, &plan).await
    }

    /// Validate the URL, then download; every failure becomes a [`DownloadResult::Failure`]
    pub async fn download_checked(&self, url: &str) -> DownloadResult {
        if !is_valid_spaces_url(url) {
            return DownloadResult::Failure {
                message: SpaceError::InvalidUrl.to_string(),
            };
        }
        self.download(url).await.into()
    }

    /// Prefer the path the tool reported; fall back to the path the template expands to
    fn resolve_output(
        &self,
        reported: Option<PathBuf>,
        plan: &DownloadPlan,
    ) -> Result<PathBuf, SpaceError> {
        if let Some(path) = reported {
            if path.is_file() {
                return Ok(path);
            }
            tracing::debug!("Reported output {} does not exist", path.display());
        }

        plan.expected_file_name()
            .map(|name| self.output_dir.join(name))
            .filter(|path| path.is_file())
            .ok_or_else(|| DownloadError::NoOutput.into())
    }
}
