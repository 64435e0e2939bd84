use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the yt-dlp executable
pub const YT_DLP_PATH_ENV: &str = "YT_DLP_PATH";

/// Environment variable overriding the ffmpeg executable
pub const FFMPEG_PATH_ENV: &str = "FFMPEG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Download behaviour
    pub download: DownloadConfig,

    /// External tool locations and limits
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory MP3 files are written to
    pub output_dir: PathBuf,

    /// URL used when none is passed on the command line
    pub default_url: Option<String>,

    /// yt-dlp `--audio-quality` value (0 is best)
    pub audio_quality: String,

    /// Download with a generic filename when metadata cannot be fetched
    pub fallback_on_metadata_error: bool,

    /// Keep only this many MP3 files in the output directory
    pub keep_latest: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// yt-dlp executable name or path
    pub yt_dlp: Option<PathBuf>,

    /// ffmpeg executable name or path
    pub ffmpeg: Option<PathBuf>,

    /// Timeout for `--version` probes
    pub probe_timeout_secs: u64,

    /// Timeout for the metadata dump
    pub metadata_timeout_secs: u64,

    /// Timeout for the download and transcode
    pub download_timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            default_url: None,
            audio_quality: "0".to_string(),
            fallback_on_metadata_error: false,
            keep_latest: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: None,
            ffmpeg: None,
            probe_timeout_secs: 10,
            metadata_timeout_secs: 30,
            download_timeout_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from file (or defaults) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file without environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Get configuration file path
    pub fn config_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir().map(|dir| dir.join("spaces-dl").join("config.yaml"))
    }

    /// Let `YT_DLP_PATH` / `FFMPEG_PATH` override the configured tools
    fn apply_env(&mut self) {
        if let Some(path) = env_path(YT_DLP_PATH_ENV) {
            self.tools.yt_dlp = Some(path);
        }
        if let Some(path) = env_path(FFMPEG_PATH_ENV) {
            self.tools.ffmpeg = Some(path);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.download.audio_quality.trim().is_empty() {
            anyhow::bail!("download.audio_quality must not be empty");
        }

        if self.download.keep_latest == Some(0) {
            anyhow::bail!("download.keep_latest must be at least 1");
        }

        let timeouts = [
            ("tools.probe_timeout_secs", self.tools.probe_timeout_secs),
            ("tools.metadata_timeout_secs", self.tools.metadata_timeout_secs),
            ("tools.download_timeout_secs", self.tools.download_timeout_secs),
        ];
        for (name, secs) in timeouts {
            if secs == 0 {
                anyhow::bail!("{} must be greater than zero", name);
            }
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        match Self::config_path() {
            Some(path) if path.exists() => println!("  Config File: {}", path.display()),
            _ => println!("  Config File: (none, using defaults)"),
        }
        println!("  Output Directory: {}", self.download.output_dir.display());
        println!(
            "  Default URL: {}",
            self.download.default_url.as_deref().unwrap_or("(not set)")
        );
        println!("  Audio Quality: {}", self.download.audio_quality);
        println!(
            "  Fallback On Metadata Error: {}",
            self.download.fallback_on_metadata_error
        );
        if let Some(keep) = self.download.keep_latest {
            println!("  Keep Latest: {}", keep);
        }
        println!("  yt-dlp: {}", self.yt_dlp_program().display());
        println!("  ffmpeg: {}", self.ffmpeg_program().display());
    }

    /// yt-dlp program to run when no probing has been done
    pub fn yt_dlp_program(&self) -> PathBuf {
        self.tools
            .yt_dlp
            .clone()
            .unwrap_or_else(|| PathBuf::from("yt-dlp"))
    }

    pub fn ffmpeg_program(&self) -> PathBuf {
        self.tools
            .ffmpeg
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.probe_timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.metadata_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.download_timeout_secs)
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
