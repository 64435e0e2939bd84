//! Locating and probing the external tools.
//!
//! [`ExecutableLocator`] asks a [`SearchStrategy`] for candidate executables and runs each
//! one with its version argument until one succeeds. [`SystemSearch`] is the real strategy;
//! tests swap in a fixed list of candidates.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::Config;
use crate::SpaceError;

/// An external tool the downloader depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    YtDlp,
    Ffmpeg,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::YtDlp, Tool::Ffmpeg];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::YtDlp => "yt-dlp",
            Tool::Ffmpeg => "ffmpeg",
        }
    }

    /// Argument that makes the tool print its version and exit 0
    pub fn version_arg(&self) -> &'static str {
        match self {
            Tool::YtDlp => "--version",
            Tool::Ffmpeg => "-version",
        }
    }

    pub fn install_hints(&self) -> &'static [&'static str] {
        match self {
            Tool::YtDlp => &["pip install yt-dlp"],
            Tool::Ffmpeg => &[
                "# Install ffmpeg from https://ffmpeg.org/download.html",
                "# Or use package manager:",
                "# Windows: choco install ffmpeg",
                "# macOS: brew install ffmpeg",
                "# Ubuntu/Debian: sudo apt install ffmpeg",
            ],
        }
    }

    /// Well-known install locations that are often missing from `PATH`
    pub fn fallback_locations(&self) -> Vec<PathBuf> {
        if !cfg!(windows) {
            return Vec::new();
        }

        match self {
            Tool::YtDlp => Vec::new(),
            Tool::Ffmpeg => {
                let mut paths = vec![
                    PathBuf::from(r"C:\ffmpeg\bin\ffmpeg.exe"),
                    PathBuf::from(r"C:\Program Files\ffmpeg\bin\ffmpeg.exe"),
                ];
                if let Some(home) = dirs::home_dir() {
                    paths.push(
                        home.join("AppData")
                            .join("Local")
                            .join("Microsoft")
                            .join("WinGet")
                            .join("Links")
                            .join("ffmpeg.exe"),
                    );
                }
                paths
            }
        }
    }
}

/// Produces candidate executables for a tool, in preference order
pub trait SearchStrategy: Send + Sync {
    fn candidates(&self, tool: Tool) -> Vec<PathBuf>;
}

/// Configured override, then `PATH`, then platform fallback locations
#[derive(Debug, Clone, Default)]
pub struct SystemSearch {
    yt_dlp: Option<PathBuf>,
    ffmpeg: Option<PathBuf>,
}

impl SystemSearch {
    pub fn from_config(config: &Config) -> Self {
        Self {
            yt_dlp: config.tools.yt_dlp.clone(),
            ffmpeg: config.tools.ffmpeg.clone(),
        }
    }

    fn override_for(&self, tool: Tool) -> Option<&PathBuf> {
        match tool {
            Tool::YtDlp => self.yt_dlp.as_ref(),
            Tool::Ffmpeg => self.ffmpeg.as_ref(),
        }
    }
}

impl SearchStrategy for SystemSearch {
    fn candidates(&self, tool: Tool) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(path) = self.override_for(tool) {
            candidates.push(path.clone());
        }

        if let Ok(path) = which::which(tool.name()) {
            candidates.push(path);
        }

        for path in tool.fallback_locations() {
            if path.exists() {
                candidates.push(path);
            }
        }

        candidates.dedup();
        candidates
    }
}

/// Whether a tool was found, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStatus {
    pub tool: Tool,
    pub location: Option<PathBuf>,
}

impl DependencyStatus {
    pub fn is_present(&self) -> bool {
        self.location.is_some()
    }
}

/// Result of probing every required tool
#[derive(Debug, Clone, Default)]
pub struct DependencyReport {
    pub statuses: Vec<DependencyStatus>,
}

impl DependencyReport {
    pub fn all_present(&self) -> bool {
        self.statuses.iter().all(DependencyStatus::is_present)
    }

    pub fn missing(&self) -> Vec<Tool> {
        self.statuses
            .iter()
            .filter(|status| !status.is_present())
            .map(|status| status.tool)
            .collect()
    }

    /// Fail with the names of the missing tools, if any
    pub fn ensure_all_present(&self) -> Result<(), SpaceError> {
        let missing = self.missing();
        if missing.is_empty() {
            return Ok(());
        }
        Err(SpaceError::DependencyMissing(
            missing.iter().map(|tool| tool.name().to_string()).collect(),
        ))
    }

    pub fn location(&self, tool: Tool) -> Option<&PathBuf> {
        self.statuses
            .iter()
            .find(|status| status.tool == tool)
            .and_then(|status| status.location.as_ref())
    }
}

/// Finds working executables through a [`SearchStrategy`]
pub struct ExecutableLocator<S = SystemSearch> {
    strategy: S,
    probe_timeout: Duration,
}

impl<S: SearchStrategy> ExecutableLocator<S> {
    pub fn new(strategy: S, probe_timeout: Duration) -> Self {
        Self {
            strategy,
            probe_timeout,
        }
    }

    /// Return the first candidate whose version probe succeeds
    pub async fn locate(&self, tool: Tool) -> Option<PathBuf> {
        for candidate in self.strategy.candidates(tool) {
            if self.probe(&candidate, tool.version_arg()).await {
                tracing::debug!("Found {} at {}", tool.name(), candidate.display());
                return Some(candidate);
            }
            tracing::debug!("{} candidate {} failed probe", tool.name(), candidate.display());
        }
        None
    }

    /// Probe every tool and collect the results
    pub async fn check(&self, tools: &[Tool]) -> DependencyReport {
        let mut statuses = Vec::with_capacity(tools.len());
        for &tool in tools {
            statuses.push(DependencyStatus {
                tool,
                location: self.locate(tool).await,
            });
        }
        DependencyReport { statuses }
    }

    async fn probe(&self, program: &Path, version_arg: &str) -> bool {
        let output = Command::new(program)
            .arg(version_arg)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.probe_timeout, output).await {
            Ok(Ok(output)) => output.status.success(),
            _ => false,
        }
    }
}

impl ExecutableLocator<SystemSearch> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(SystemSearch::from_config(config), config.probe_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSearch(Vec<PathBuf>);

    impl SearchStrategy for FixedSearch {
        fn candidates(&self, _tool: Tool) -> Vec<PathBuf> {
            self.0.clone()
        }
    }

    #[test]
    fn test_tool_probe_args() {
        assert_eq!(Tool::YtDlp.version_arg(), "--version");
        assert_eq!(Tool::Ffmpeg.version_arg(), "-version");
        assert!(Tool::YtDlp.fallback_locations().is_empty());
    }

    #[test]
    fn test_system_search_puts_override_first() {
        let search = SystemSearch {
            yt_dlp: Some(PathBuf::from("/custom/yt-dlp")),
            ffmpeg: None,
        };
        let candidates = search.candidates(Tool::YtDlp);
        assert_eq!(candidates.first(), Some(&PathBuf::from("/custom/yt-dlp")));
    }

    #[test]
    fn test_report_aggregates() {
        let report = DependencyReport {
            statuses: vec![
                DependencyStatus {
                    tool: Tool::YtDlp,
                    location: Some(PathBuf::from("/usr/bin/yt-dlp")),
                },
                DependencyStatus {
                    tool: Tool::Ffmpeg,
                    location: None,
                },
            ],
        };

        assert!(!report.all_present());
        assert_eq!(report.missing(), vec![Tool::Ffmpeg]);
        assert_eq!(
            report.ensure_all_present().unwrap_err().to_string(),
            "Missing dependencies: ffmpeg"
        );
        assert_eq!(
            report.location(Tool::YtDlp),
            Some(&PathBuf::from("/usr/bin/yt-dlp"))
        );
        assert_eq!(report.location(Tool::Ffmpeg), None);
    }

    #[tokio::test]
    async fn test_locate_with_no_candidates() {
        let locator = ExecutableLocator::new(FixedSearch(Vec::new()), Duration::from_secs(1));
        assert_eq!(locator.locate(Tool::YtDlp).await, None);

        let report = locator.check(&Tool::ALL).await;
        assert_eq!(report.missing(), Tool::ALL.to_vec());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_locate_skips_failing_candidates() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let write_stub = |name: &str, body: &str| {
            let path = dir.path().join(name);
            fs_err::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs_err::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        };

        let broken = write_stub("broken", "exit 1");
        let hanging = write_stub("hanging", "sleep 5");
        let working = write_stub("working", "echo 2024.08.06");
        let missing = dir.path().join("missing");

        let locator = ExecutableLocator::new(
            FixedSearch(vec![missing, broken, hanging, working.clone()]),
            Duration::from_millis(300),
        );

        assert_eq!(locator.locate(Tool::YtDlp).await, Some(working));
    }
}
