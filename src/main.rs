use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spaces_dl::deps::{ExecutableLocator, Tool};
use spaces_dl::download::{list_audio_files, SpaceDownloader};
use spaces_dl::extractors::{is_valid_spaces_url, YtDlp};
use spaces_dl::{output, Cli, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "spaces_dl=debug"
    } else {
        "spaces_dl=warn"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load()?;
    if let Some(dir) = cli.output.clone() {
        config.download.output_dir = dir;
    }
    if let Some(keep) = cli.keep {
        config.download.keep_latest = Some(keep as usize);
    }

    if cli.show_config {
        config.display();
        return Ok(());
    }

    // Check for required external dependencies before touching the network
    let locator = ExecutableLocator::from_config(&config);
    let report = locator.check(&Tool::ALL).await;
    output::print_dependency_report(&report);

    if cli.check_deps {
        return Ok(());
    }

    if let Err(err) = report.ensure_all_present() {
        tracing::warn!("{}", err);
        println!("\nPlease install missing dependencies before running the script.");
        return Ok(());
    }

    let Some(url) = cli.url.clone().or_else(|| config.download.default_url.clone()) else {
        print_missing_url();
        return Ok(());
    };

    if !is_valid_spaces_url(&url) {
        println!(
            "{} URL might not be a valid Twitter Spaces URL: {}",
            style("Warning:").yellow(),
            url
        );
        if !cli.yes && !confirm_continue() {
            return Ok(());
        }
    }

    // Run the binaries the probe found rather than searching PATH again
    if let Some(path) = report.location(Tool::YtDlp) {
        config.tools.yt_dlp = Some(path.clone());
    }
    let mut ytdlp = YtDlp::from_config(&config);
    if let Some(path) = report.location(Tool::Ffmpeg) {
        ytdlp = ytdlp.with_ffmpeg_location(path);
    }

    let downloader = SpaceDownloader::from_config(Box::new(ytdlp), &config);

    if run(&downloader, &url, cli.quiet).await {
        println!("\n{} Successfully downloaded Twitter Space!", style("✓").green());
        println!(
            "Check the '{}' folder for your MP3 file.",
            config.download.output_dir.display()
        );
    } else {
        println!("\n{} Failed to download Twitter Space.", style("✗").red());
    }

    Ok(())
}

/// Download one Space, reporting progress on the console. Returns whether it succeeded.
async fn run(downloader: &SpaceDownloader, url: &str, quiet: bool) -> bool {
    println!("Downloading from: {}", url);

    if let Err(err) = downloader.ensure_output_dir() {
        println!("{} {}", style("✗").red(), err);
        return false;
    }

    let progress = spinner(quiet, "Getting space information...");
    let plan = downloader.plan(url).await;
    progress.finish_and_clear();

    let plan = match plan {
        Ok(plan) => plan,
        Err(err) => {
            println!("{} {}", style("✗").red(), err);
            return false;
        }
    };

    match &plan.info {
        Some(info) => output::print_space_info(info),
        None => println!("Could not get space info, using default filename"),
    }

    println!("\nStarting download...");
    let progress = spinner(quiet, "Downloading and converting to MP3...");
    let result = downloader.execute(url, &plan).await;
    progress.finish_and_clear();

    match result {
        Ok(space) => {
            println!("{} Download completed successfully!", style("✓").green());
            println!("Saved: {}", space.file_path.display());

            match list_audio_files(downloader.output_dir()) {
                Ok(files) => output::print_stored_files(downloader.output_dir(), &files),
                Err(err) => tracing::warn!("Could not list downloads: {}", err),
            }
            true
        }
        Err(err) => {
            println!("{} {}", style("✗").red(), err);
            false
        }
    }
}

fn spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(spinner_style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        progress.set_style(spinner_style);
    }
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

/// Ask whether to go on with a suspicious URL; without a terminal the answer is no
fn confirm_continue() -> bool {
    if !console::Term::stderr().is_term() {
        return false;
    }

    dialoguer::Confirm::new()
        .with_prompt("Continue anyway?")
        .default(false)
        .interact()
        .unwrap_or(false)
}

fn print_missing_url() {
    println!("Error: No URL provided!");
    println!("Either:");
    println!("1. Pass URL as argument: spaces-dl <url>");
    println!("2. Set download.default_url in the config file");
    println!("\nExample URLs:");
    println!("  https://twitter.com/i/spaces/1dRJZlEPOqmGB");
    println!("  https://x.com/i/spaces/1dRJZlEPOqmGB");
}
