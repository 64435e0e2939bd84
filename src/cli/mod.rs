use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "spaces-dl",
    about = "Download Twitter/X Spaces as MP3 files",
    version,
    long_about = "Download Twitter/X Spaces as MP3 audio files. \
                  Uses yt-dlp to locate the stream and ffmpeg to transcode it."
)]
pub struct Cli {
    /// Twitter Spaces URL (falls back to download.default_url from the config file)
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Output directory (default: downloads)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Check dependencies and exit
    #[arg(long)]
    pub check_deps: bool,

    /// Continue without asking when the URL does not look like a Space
    #[arg(short, long)]
    pub yes: bool,

    /// Keep only the newest N MP3 files in the output directory
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub keep: Option<u64>,

    /// Show current configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments of the machine-facing binary: exactly one URL
#[derive(Parser, Debug)]
#[command(
    name = "spaces-dl-api",
    about = "Download a Twitter/X Space as MP3 and print the result as JSON",
    version
)]
pub struct ApiCli {
    /// Twitter Spaces URL
    #[arg(value_name = "URL")]
    pub url: String,
}
