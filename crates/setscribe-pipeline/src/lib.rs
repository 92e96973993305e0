// SPDX-License-Identifier: GPL-3.0-or-later

//! One identification run end to end: probe the source, schedule chunks,
//! extract and identify each chunk strictly in start-time order, fuse the
//! raw matches, synthesize the unidentified gaps, and persist the artifact.

pub mod error;

pub use error::{PipelineError, Result};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use setscribe_artifact::{artifact_path, RunArtifact, RunSettings};
use setscribe_config::AppConfig;
use setscribe_domain::{format_timestamp, RawMatch};
use setscribe_fusion::{fuse, synthesize_gaps, FusionOutcome, FusionSettings};
use setscribe_media::{chunk_plan, extract_chunk, Chunk, MediaSource};
use setscribe_recognition::{build_provider, RateLimiter, RecognitionProvider};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Derive the fusion knobs for the active provider. The confidence gate is
/// skipped for backends whose score is a fixed stand-in for "matched at
/// all"; fusion itself stays provider-agnostic.
pub fn settings_for_provider(
    config: &AppConfig,
    provider: &dyn RecognitionProvider,
) -> FusionSettings {
    FusionSettings {
        min_confidence: config.recognition.min_confidence,
        min_consecutive: config.recognition.min_consecutive,
        apply_confidence_gate: !provider.bypasses_confidence_gate(),
        chunk_stride: config.recognition.chunk_stride,
    }
}

/// Run the full identification pipeline for `source_path`.
///
/// Per-chunk failures (extraction, provider errors, no match) are logged and
/// skipped; only an undeterminable duration, a source shorter than one
/// sampling window, cancellation, or the terminal artifact write abort the
/// run. A cancelled run writes nothing.
pub async fn run(
    source_path: impl AsRef<Path>,
    output_override: Option<PathBuf>,
    config: &AppConfig,
    cancel: CancellationToken,
) -> Result<RunArtifact> {
    let source = MediaSource::probe(source_path.as_ref()).await?;
    let provider = build_provider(config)?;

    info!(
        target: "pipeline",
        set = %source.set_name(),
        duration = %format_timestamp(source.duration()),
        api = provider.name(),
        "processing set"
    );

    let chunks = chunk_plan(
        source.duration(),
        provider.chunk_length(),
        config.recognition.chunk_stride,
    );
    if chunks.is_empty() {
        return Err(PipelineError::SourceTooShort {
            duration: source.duration(),
            chunk_length: provider.chunk_length(),
        });
    }

    let raw_matches = collect_raw_matches(&source, provider.clone(), &chunks, &cancel).await?;

    let settings = settings_for_provider(config, provider.as_ref());
    let FusionOutcome { tracklist, genres } = fuse(&raw_matches, &settings);
    let unidentified = synthesize_gaps(&tracklist, source.duration());

    info!(
        target: "pipeline",
        confirmed = tracklist.len(),
        gaps = unidentified.len(),
        "confidence filtering complete"
    );

    let artifact = RunArtifact {
        set_name: source.set_name(),
        source_file: source.path().display().to_string(),
        duration_seconds: source.duration(),
        processed_at: Utc::now(),
        api_used: provider.name().to_string(),
        genres,
        settings: RunSettings {
            chunk_length: provider.chunk_length(),
            chunk_stride: config.recognition.chunk_stride,
            min_confidence: config.recognition.min_confidence,
            min_consecutive: config.recognition.min_consecutive,
        },
        raw_matches,
        tracklist,
        unidentified,
    };

    let path = output_override
        .unwrap_or_else(|| artifact_path(&config.output.directory, &artifact.set_name));
    artifact.write_atomic(&path).await?;

    Ok(artifact)
}

/// Upper bound on a single ffmpeg extraction; a wedged encoder must not
/// stall the whole run.
const EXTRACT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// Extract and identify every chunk, strictly sequential and in start-time
/// order: the fusion engine assumes already-sorted input, and the providers
/// impose request-rate ceilings.
async fn collect_raw_matches(
    source: &MediaSource,
    provider: Arc<dyn RecognitionProvider>,
    chunks: &[Chunk],
    cancel: &CancellationToken,
) -> Result<Vec<RawMatch>> {
    let clip_dir = tempfile::tempdir().map_err(PipelineError::ClipDir)?;
    let limiter = RateLimiter::new(provider.request_interval());
    let total = chunks.len();
    let mut raw_matches = Vec::new();

    for chunk in chunks {
        // Cancellation is only honoured between chunks, never mid-request.
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let clip_path = clip_dir
            .path()
            .join(format!("chunk_{:04}.mp3", chunk.index));

        match tokio::time::timeout(EXTRACT_TIMEOUT, extract_chunk(source, chunk, &clip_path)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(
                    target: "pipeline",
                    chunk = chunk.index,
                    offset = %format_timestamp(chunk.start_time),
                    %err,
                    "extraction failed, skipping chunk"
                );
                continue;
            }
            Err(_) => {
                warn!(
                    target: "pipeline",
                    chunk = chunk.index,
                    offset = %format_timestamp(chunk.start_time),
                    "extraction timed out, skipping chunk"
                );
                continue;
            }
        }

        limiter.acquire().await;

        match provider.identify(&clip_path).await {
            Ok(Some(track)) => {
                info!(
                    target: "pipeline",
                    "[{}/{}] {} - {} - {} (score: {})",
                    chunk.index + 1,
                    total,
                    format_timestamp(chunk.start_time),
                    track.artists.first().map(String::as_str).unwrap_or("Unknown"),
                    track.title,
                    track.score
                );
                raw_matches.push(RawMatch {
                    chunk_index: chunk.index,
                    start_time: chunk.start_time,
                    track,
                });
            }
            Ok(None) => {
                info!(
                    target: "pipeline",
                    "[{}/{}] {} - no match",
                    chunk.index + 1,
                    total,
                    format_timestamp(chunk.start_time)
                );
            }
            Err(err) => {
                // Folded into "no match": the fusion engine cannot
                // distinguish cause, and a failed chunk is never retried
                // within a run.
                warn!(
                    target: "pipeline",
                    chunk = chunk.index,
                    offset = %format_timestamp(chunk.start_time),
                    %err,
                    "recognition failed, treating as no match"
                );
            }
        }
    }

    Ok(raw_matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use setscribe_config::{AppConfig, ProviderKind};
    use setscribe_domain::TrackGuess;
    use std::time::Duration;

    struct BinaryHitStub;

    #[async_trait]
    impl RecognitionProvider for BinaryHitStub {
        async fn identify(&self, _clip: &Path) -> setscribe_recognition::Result<Option<TrackGuess>> {
            Ok(None)
        }
        fn name(&self) -> &'static str {
            "stub"
        }
        fn chunk_length(&self) -> u64 {
            5
        }
        fn request_interval(&self) -> Duration {
            Duration::from_millis(0)
        }
        fn bypasses_confidence_gate(&self) -> bool {
            true
        }
    }

    struct ScoredStub;

    #[async_trait]
    impl RecognitionProvider for ScoredStub {
        async fn identify(&self, _clip: &Path) -> setscribe_recognition::Result<Option<TrackGuess>> {
            Ok(None)
        }
        fn name(&self) -> &'static str {
            "stub"
        }
        fn chunk_length(&self) -> u64 {
            20
        }
        fn request_interval(&self) -> Duration {
            Duration::from_millis(0)
        }
        fn bypasses_confidence_gate(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_settings_skip_gate_for_binary_provider() {
        let config = AppConfig::default();
        let settings = settings_for_provider(&config, &BinaryHitStub);
        assert!(!settings.apply_confidence_gate);
        assert_eq!(settings.min_consecutive, 2);
        assert_eq!(settings.chunk_stride, 30);
    }

    #[test]
    fn test_settings_apply_gate_for_scored_provider() {
        let config = AppConfig::default();
        let settings = settings_for_provider(&config, &ScoredStub);
        assert!(settings.apply_confidence_gate);
        assert_eq!(settings.min_confidence, 30);
    }

    #[tokio::test]
    async fn test_run_fails_fast_on_unprobeable_source() {
        let mut config = AppConfig::default();
        config.recognition.provider = ProviderKind::Shazam;
        config.shazam.api_key = Some("key".to_string());

        let result = run(
            "/nonexistent/set.mp4",
            None,
            &config,
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(PipelineError::Media(_))));
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_collection() {
        let source = MediaSource::with_duration("/sets/fake.mp4", 3600).unwrap();
        let chunks = chunk_plan(3600, 5, 30);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result =
            collect_raw_matches(&source, Arc::new(BinaryHitStub), &chunks, &cancel).await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }
}
