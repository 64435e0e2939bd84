//! Machine-facing entry point: downloads one Space and prints a single JSON result.
//!
//! Exit code is 1 only for bad arguments; download failures are reported in the JSON.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spaces_dl::download::{DownloadResult, SpaceDownloader};
use spaces_dl::extractors::YtDlp;
use spaces_dl::{output, ApiCli, Config};

const USAGE: &str = "Usage: spaces-dl-api <url>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the result, so logs go to stderr as JSON lines
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spaces_dl=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = match ApiCli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            tracing::debug!("Argument error: {}", err);
            output::print_json(&DownloadResult::Failure {
                message: USAGE.to_string(),
            })?;
            std::process::exit(1);
        }
    };

    let result = match Config::load() {
        Ok(config) => {
            let extractor = YtDlp::from_config(&config);
            SpaceDownloader::from_config(Box::new(extractor), &config)
                .download_checked(&cli.url)
                .await
        }
        Err(err) => DownloadResult::Failure {
            message: format!("{:#}", err),
        },
    };

    if !result.is_success() {
        tracing::info!("Download of {} failed", cli.url);
    }

    output::print_json(&result)?;
    Ok(())
}
