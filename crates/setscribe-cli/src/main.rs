// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use setscribe_artifact::render_tracklist;
use setscribe_config::{load as load_config, ProviderKind};
use setscribe_pipeline::PipelineError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Character budget per rendered tracklist page; matches the consuming chat
/// surfaces' message cap.
const PAGE_BUDGET: usize = 1900;

/// Identify the tracks played in a recorded DJ set.
#[derive(Debug, Parser)]
#[command(name = "setscribe", version, about)]
struct Args {
    /// Media file to process.
    media_file: PathBuf,

    /// Artifact destination; defaults to `{stem}_tracklist.json` in the
    /// configured output directory.
    output: Option<PathBuf>,

    /// Recognition backend for this run.
    #[arg(long, value_parser = clap::value_parser!(ProviderKind))]
    provider: Option<ProviderKind>,

    /// Configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum provider score (0-100) for a raw match to count.
    #[arg(long)]
    min_confidence: Option<u8>,

    /// Consecutive matches required to confirm a track.
    #[arg(long)]
    min_consecutive: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(provider) = args.provider {
        config.recognition.provider = provider;
    }
    if let Some(min_confidence) = args.min_confidence {
        config.recognition.min_confidence = min_confidence;
    }
    if let Some(min_consecutive) = args.min_consecutive {
        config.recognition.min_consecutive = min_consecutive;
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(target: "cli", "interrupt received, finishing current chunk");
            signal_cancel.cancel();
        }
    });

    match setscribe_pipeline::run(&args.media_file, args.output, &config, cancel).await {
        Ok(artifact) => {
            info!(
                target: "cli",
                tracks = artifact.tracklist.len(),
                gaps = artifact.unidentified.len(),
                "run complete"
            );
            for page in render_tracklist(&artifact, PAGE_BUDGET) {
                println!("{}", page);
            }
            Ok(())
        }
        Err(PipelineError::Cancelled) => {
            warn!(target: "cli", "run cancelled, no artifact written");
            std::process::exit(130);
        }
        Err(err) => Err(err.into()),
    }
}

fn init_tracing() {
    let fmt_layer = fmt::layer().with_target(true).with_level(true);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
