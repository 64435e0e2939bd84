//! Stub yt-dlp / ffmpeg executables and an isolated working directory for binary tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SPACE_URL: &str = "https://x.com/i/spaces/1BdGYZmdzlQJX";

pub const MY_SHOW_JSON: &str =
    r#"{"id": "1BdGYZmdzlQJX", "title": "My Show", "uploader": "Host1", "duration": 120}"#;

/// How the stub behaves when asked for metadata
pub enum Metadata<'a> {
    Json(&'a str),
    Malformed,
    Fail(&'a str),
}

/// How the stub behaves when asked to extract audio
pub enum Download<'a> {
    /// Write `bytes` to the templated path and print that path
    Write(&'a str),
    /// Write the file but print nothing
    WriteQuietly(&'a str),
    /// Print to stderr and exit non-zero
    Fail(&'a str),
    /// Start a background helper that touches `finished` after a few seconds, touch
    /// `started`, then wait for the helper
    Hang { started: &'a Path, finished: &'a Path },
}

/// A scratch directory that doubles as the working directory and config home
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write_executable(&self, name: &str, script: &str) -> PathBuf {
        let bin_dir = self.path().join("bin");
        fs_err::create_dir_all(&bin_dir).unwrap();
        let path = bin_dir.join(name);
        fs_err::write(&path, script).unwrap();
        fs_err::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Write a yt-dlp stand-in; only the hanging download calls an external command
    pub fn yt_dlp(&self, metadata: Metadata<'_>, download: Download<'_>) -> PathBuf {
        let metadata_branch = match metadata {
            Metadata::Json(json) => format!("printf '%s\\n' '{}'; exit 0", json),
            Metadata::Malformed => "printf 'WARNING: not json at all\\n'; exit 0".to_string(),
            Metadata::Fail(stderr) => format!("printf '%s' '{}' >&2; exit 1", stderr),
        };

        let download_branch = match download {
            Download::Write(bytes) => {
                format!("printf '%s' '{}' > \"$file\"; printf '%s\\n' \"$file\"; exit 0", bytes)
            }
            Download::WriteQuietly(bytes) => format!("printf '%s' '{}' > \"$file\"; exit 0", bytes),
            Download::Fail(stderr) => format!("printf '%s' '{}' >&2; exit 1", stderr),
            Download::Hang { started, finished } => format!(
                "({sleep} 3; : > '{finished}') & : > '{started}'; wait; exit 0",
                sleep = sleep_binary().display(),
                finished = finished.display(),
                started = started.display(),
            ),
        };

        let script = format!(
            r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--output" ]; then out="$arg"; fi
  prev="$arg"
done
suffix='%(ext)s'
file="${{out%"$suffix"}}mp3"
case "$1" in
  --version) printf '2024.08.06\n'; exit 0 ;;
  --dump-single-json) {metadata_branch} ;;
  --extract-audio) {download_branch} ;;
esac
exit 2
"#
        );

        self.write_executable("yt-dlp", &script)
    }

    pub fn ffmpeg(&self) -> PathBuf {
        self.write_executable(
            "ffmpeg",
            "#!/bin/sh\n\
             if [ \"$1\" = \"-version\" ]; then printf 'ffmpeg version 6.1\\n'; exit 0; fi\n\
             exit 1\n",
        )
    }

    /// A process for `bin` running inside the sandbox with no inherited tools or config
    pub fn process(&self, bin: &str) -> std::process::Command {
        let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin(bin));
        cmd.current_dir(self.path())
            .env("PATH", self.path().join("empty-path"))
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join("config-home"))
            .env_remove("YT_DLP_PATH")
            .env_remove("FFMPEG_PATH")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Like [`Sandbox::process`], wrapped for assertions and fed an empty stdin
    pub fn command(&self, bin: &str) -> Command {
        let mut cmd = Command::from_std(self.process(bin));
        cmd.write_stdin("");
        cmd
    }
}

/// `sleep` is not a shell builtin, so stubs that need it call it by absolute path
fn sleep_binary() -> PathBuf {
    ["/bin/sleep", "/usr/bin/sleep"]
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
        .expect("no sleep binary found")
}
