// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use tokio::process::Command;
use tracing::trace;

use crate::chunk::Chunk;
use crate::error::{MediaError, Result};
use crate::source::MediaSource;

/// Extract one chunk's audio to `out_path` as mono 44.1kHz 128kbps MP3, a
/// format both recognition backends accept and small enough for the Shazam
/// endpoint's body cap.
///
/// Extraction failures are per-chunk recoverable: the caller logs and skips
/// the chunk, the run continues.
pub async fn extract_chunk(source: &MediaSource, chunk: &Chunk, out_path: &Path) -> Result<()> {
    trace!(
        target: "media",
        index = chunk.index,
        start = chunk.start_time,
        "extracting chunk"
    );

    let output = Command::new("ffmpeg")
        .arg("-y")
        .args(["-ss", &chunk.start_time.to_string()])
        .arg("-i")
        .arg(source.path())
        .args(["-t", &chunk.length.to_string()])
        .arg("-vn")
        .args(["-acodec", "libmp3lame"])
        .args(["-ar", "44100"])
        .args(["-ac", "1"])
        .args(["-b:a", "128k"])
        .arg(out_path)
        .output()
        .await
        .map_err(|source| MediaError::ToolSpawn {
            tool: "ffmpeg",
            source,
        })?;

    if !output.status.success() {
        return Err(MediaError::Extraction {
            start_time: chunk.start_time,
            detail: String::from_utf8_lossy(&output.stderr)
                .lines()
                .last()
                .unwrap_or("unknown ffmpeg failure")
                .to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extract_from_missing_source_fails() {
        let source = MediaSource::with_duration("/nonexistent/set.mp4", 3600).unwrap();
        let chunk = Chunk {
            index: 0,
            start_time: 0,
            length: 5,
        };
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("chunk_0000.mp3");
        // ffmpeg missing or source missing: either way, an error, never a panic.
        assert!(extract_chunk(&source, &chunk, &out).await.is_err());
    }
}
