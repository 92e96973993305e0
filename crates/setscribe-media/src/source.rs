// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, Result};

/// A single immutable input file. The duration is probed exactly once; the
/// source is read-only for the pipeline's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    path: PathBuf,
    duration: u64,
}

impl MediaSource {
    /// Probe `path` with ffprobe and capture its duration in whole seconds.
    ///
    /// A probing failure or a zero duration is fatal for the run: without a
    /// trustworthy duration there is nothing to schedule.
    pub async fn probe(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(&path)
            .output()
            .await
            .map_err(|source| MediaError::ToolSpawn {
                tool: "ffprobe",
                source,
            })?;

        if !output.status.success() {
            return Err(MediaError::Probe {
                path,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration = stdout
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| *d > 0.0)
            .map(|d| d as u64)
            .ok_or_else(|| MediaError::EmptyDuration { path: path.clone() })?;

        debug!(target: "media", path = %path.display(), duration, "probed source");

        Ok(Self { path, duration })
    }

    /// Construct a source with a known duration, bypassing ffprobe.
    pub fn with_duration(path: impl Into<PathBuf>, duration: u64) -> Result<Self> {
        let path = path.into();
        if duration == 0 {
            return Err(MediaError::EmptyDuration { path });
        }
        Ok(Self { path, duration })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total duration in whole seconds.
    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// File stem used to key the run artifact.
    pub fn set_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_duration_rejects_zero() {
        let result = MediaSource::with_duration("/sets/andrea.mp4", 0);
        assert!(matches!(result, Err(MediaError::EmptyDuration { .. })));
    }

    #[test]
    fn test_set_name_is_file_stem() {
        let source = MediaSource::with_duration("/sets/andrea_live.mp4", 3600).unwrap();
        assert_eq!(source.set_name(), "andrea_live");
    }

    #[tokio::test]
    async fn test_probe_missing_file_fails() {
        // Either ffprobe is absent (spawn error) or it reports an error for
        // the nonexistent path; both are failures.
        let result = MediaSource::probe("/nonexistent/definitely_missing.mp4").await;
        assert!(result.is_err());
    }
}
