use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use super::{MediaExtractor, SpaceInfo};
use crate::config::Config;
use crate::utils::format_limit;
use crate::{DownloadError, MetadataError};

/// Twitter/X Spaces extractor using yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlp {
    yt_dlp_path: PathBuf,
    ffmpeg_location: Option<PathBuf>,
    audio_quality: String,
    metadata_timeout: Duration,
    download_timeout: Duration,
}

impl YtDlp {
    pub fn new(yt_dlp_path: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            ffmpeg_location: None,
            audio_quality: "0".to_string(),
            metadata_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(3600),
        }
    }

    /// Build from configuration, honouring the `tools` and `download` sections
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.yt_dlp_program())
            .with_audio_quality(&config.download.audio_quality)
            .with_timeouts(config.metadata_timeout(), config.download_timeout())
    }

    /// Point yt-dlp at a specific ffmpeg binary
    pub fn with_ffmpeg_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.ffmpeg_location = Some(location.into());
        self
    }

    pub fn with_audio_quality(mut self, quality: &str) -> Self {
        self.audio_quality = quality.to_string();
        self
    }

    pub fn with_timeouts(mut self, metadata: Duration, download: Duration) -> Self {
        self.metadata_timeout = metadata;
        self.download_timeout = download;
        self
    }

    /// Arguments for the audio extraction run
    fn download_args(&self, url: &str, output_template: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--extract-audio".into(),
            "--audio-format".into(),
            "mp3".into(),
            "--audio-quality".into(),
            self.audio_quality.clone().into(),
            "--output".into(),
            output_template.as_os_str().to_owned(),
            "--no-warnings".into(),
            // Report the final file path on stdout once post-processing has moved it
            "--print".into(),
            "after_move:filepath".into(),
        ];

        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.as_os_str().to_owned());
        }

        args.push(url.into());
        args
    }
}

/// Pick the reported output path out of yt-dlp's stdout
fn reported_path(stdout: &[u8]) -> Option<PathBuf> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(PathBuf::from)
}

/// Kill the process group led by `pid`, taking any helpers it started down with it
#[cfg(unix)]
fn stop_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };

    // SAFETY: killpg only sends a signal; the group id is the leader's pid
    if unsafe { libc::killpg(pid, libc::SIGKILL) } != 0 {
        tracing::debug!(
            "Could not signal process group {}: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn stop_process_group(_pid: Option<u32>) {}

#[async_trait]
impl MediaExtractor for YtDlp {
    async fn fetch_space_info(&self, url: &str) -> Result<SpaceInfo, MetadataError> {
        tracing::debug!("Extracting space info for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-single-json", "--no-warnings", url])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.metadata_timeout, output)
            .await
            .map_err(|_| MetadataError::Timeout)?
            .map_err(MetadataError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(MetadataError::Exit { stderr });
        }

        SpaceInfo::parse(&output.stdout)
    }

    async fn download_audio(
        &self,
        url: &str,
        output_template: &Path,
    ) -> Result<Option<PathBuf>, DownloadError> {
        tracing::debug!(
            "Downloading audio for {} to template {}",
            url,
            output_template.display()
        );

        let mut command = Command::new(&self.yt_dlp_path);
        command
            .args(self.download_args(url, output_template))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // yt-dlp leads its own group so the ffmpeg it spawns can be stopped with it
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(DownloadError::Spawn)?;
        let pid = child.id();

        let output: Output = tokio::select! {
            result = tokio::time::timeout(self.download_timeout, child.wait_with_output()) => {
                match result {
                    Ok(output) => output.map_err(DownloadError::Spawn)?,
                    Err(_) => {
                        stop_process_group(pid);
                        return Err(DownloadError::Timeout {
                            limit: format_limit(self.download_timeout),
                        });
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Download interrupted, stopping {}", self.yt_dlp_path.display());
                stop_process_group(pid);
                return Err(DownloadError::Interrupted);
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if stderr.is_empty() {
                return Err(DownloadError::ExitCode {
                    code: output.status.code().unwrap_or(-1),
                });
            }
            return Err(DownloadError::ToolFailed { stderr });
        }

        Ok(reported_path(&output.stdout))
    }

    fn tool_name(&self) -> &'static str {
        "yt-dlp"
    }
}
