// SPDX-License-Identifier: GPL-3.0-or-later

//! The persisted result of one identification run, and the operations the
//! out-of-process surfaces (bots, query layers) need against it: atomic
//! persistence, loading, positional tracklist edits, and length-budgeted
//! rendering.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use setscribe_domain::{ConfirmedTrack, GenreCount, RawMatch, UnidentifiedGap};
use thiserror::Error;
use tracing::info;

pub type Result<T> = std::result::Result<T, ArtifactError>;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("tracklist position {position} out of range (len {len})")]
    PositionOutOfRange { position: usize, len: usize },
}

/// The knobs that shaped one run, persisted for reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub chunk_length: u64,
    pub chunk_stride: u64,
    pub min_confidence: u8,
    pub min_consecutive: u32,
}

/// The whole of one run: identity, diagnostics, confirmed tracklist and the
/// unidentified complement. Created once per run and written exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArtifact {
    pub set_name: String,
    pub source_file: String,
    pub duration_seconds: u64,
    pub processed_at: DateTime<Utc>,
    pub api_used: String,
    pub genres: Vec<GenreCount>,
    pub settings: RunSettings,
    pub raw_matches: Vec<RawMatch>,
    pub tracklist: Vec<ConfirmedTrack>,
    pub unidentified: Vec<UnidentifiedGap>,
}

impl RunArtifact {
    /// Load a previously persisted artifact.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| {
            ArtifactError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Persist via write-temp-then-rename so a failure never corrupts a
    /// previously-existing artifact.
    pub async fn write_atomic(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(self)?;

        let mut tmp = path.to_path_buf();
        tmp.set_extension("json.tmp");

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|source| ArtifactError::Write {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| ArtifactError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            target: "artifact",
            path = %path.display(),
            tracks = self.tracklist.len(),
            "artifact written"
        );
        Ok(())
    }

    /// Insert a manually identified track at `position` (0-based, up to and
    /// including the current length), then re-sort by start time so the
    /// tracklist stays chronological no matter where the edit landed.
    pub fn insert_track(&mut self, position: usize, track: ConfirmedTrack) -> Result<()> {
        if position > self.tracklist.len() {
            return Err(ArtifactError::PositionOutOfRange {
                position,
                len: self.tracklist.len(),
            });
        }
        self.tracklist.insert(position, track);
        self.tracklist.sort_by_key(|t| t.start_time);
        Ok(())
    }

    /// Remove the track at `position` (0-based) and return it.
    pub fn remove_track(&mut self, position: usize) -> Result<ConfirmedTrack> {
        if position >= self.tracklist.len() {
            return Err(ArtifactError::PositionOutOfRange {
                position,
                len: self.tracklist.len(),
            });
        }
        Ok(self.tracklist.remove(position))
    }
}

/// Deterministic artifact location for a source file: `{stem}_tracklist.json`
/// in the output directory.
pub fn artifact_path(output_dir: impl AsRef<Path>, set_name: &str) -> PathBuf {
    output_dir
        .as_ref()
        .join(format!("{}_tracklist.json", set_name))
}

/// Render the confirmed tracklist as numbered `[m:ss] Artists - Title`
/// lines, split into pages no longer than `page_budget` characters (the
/// consuming chat surfaces cap message length).
pub fn render_tracklist(artifact: &RunArtifact, page_budget: usize) -> Vec<String> {
    let mut pages: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, track) in artifact.tracklist.iter().enumerate() {
        let artists = if track.artists.is_empty() {
            "Unknown".to_string()
        } else {
            track.artists.join(", ")
        };
        let line = format!(
            "{}. [{}] {} - {}",
            i + 1,
            track.start_time_formatted,
            artists,
            track.title
        );

        if !current.is_empty() && current.len() + line.len() + 1 > page_budget {
            pages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(&line);
    }

    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use setscribe_domain::{ExternalIds, TrackGuess};

    fn track(acrid: &str, start_time: u64) -> ConfirmedTrack {
        let guess = TrackGuess {
            acrid: acrid.to_string(),
            title: format!("Track {}", acrid),
            artists: vec!["Some Artist".to_string()],
            album: String::new(),
            label: String::new(),
            release_date: String::new(),
            score: 80,
            play_offset_ms: 0,
            genres: Vec::new(),
            external_ids: ExternalIds::default(),
        };
        ConfirmedTrack::from_streak(&guess, start_time, start_time + 200, 3).unwrap()
    }

    fn artifact() -> RunArtifact {
        RunArtifact {
            set_name: "andrea_live".to_string(),
            source_file: "/sets/andrea_live.mp4".to_string(),
            duration_seconds: 3600,
            processed_at: Utc::now(),
            api_used: "shazam".to_string(),
            genres: Vec::new(),
            settings: RunSettings {
                chunk_length: 5,
                chunk_stride: 30,
                min_confidence: 30,
                min_consecutive: 2,
            },
            raw_matches: Vec::new(),
            tracklist: vec![track("A", 0), track("B", 600)],
            unidentified: Vec::new(),
        }
    }

    #[test]
    fn test_artifact_path_from_stem() {
        assert_eq!(
            artifact_path("/out", "andrea_live"),
            PathBuf::from("/out/andrea_live_tracklist.json")
        );
    }

    #[tokio::test]
    async fn test_write_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = artifact_path(dir.path(), "andrea_live");

        let original = artifact();
        original.write_atomic(&path).await.unwrap();
        let loaded = RunArtifact::load(&path).await.unwrap();

        assert_eq!(loaded, original);
        // The temp sibling is gone after the rename.
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_replaces_existing_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = artifact_path(dir.path(), "andrea_live");

        let mut first = artifact();
        first.write_atomic(&path).await.unwrap();

        first.tracklist.push(track("C", 1200));
        first.write_atomic(&path).await.unwrap();

        let loaded = RunArtifact::load(&path).await.unwrap();
        assert_eq!(loaded.tracklist.len(), 3);
    }

    #[tokio::test]
    async fn test_load_malformed_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken_tracklist.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        assert!(matches!(
            RunArtifact::load(&path).await,
            Err(ArtifactError::Malformed(_))
        ));
    }

    #[test]
    fn test_insert_track_resorts_by_start_time() {
        let mut a = artifact();
        // Appended at the end, but starting before track B.
        a.insert_track(2, track("C", 300)).unwrap();
        let order: Vec<&str> = a.tracklist.iter().map(|t| t.acrid.as_str()).collect();
        assert_eq!(order, vec!["A", "C", "B"]);
    }

    #[test]
    fn test_insert_track_out_of_range() {
        let mut a = artifact();
        assert!(matches!(
            a.insert_track(5, track("C", 300)),
            Err(ArtifactError::PositionOutOfRange { position: 5, len: 2 })
        ));
    }

    #[test]
    fn test_remove_track() {
        let mut a = artifact();
        let removed = a.remove_track(0).unwrap();
        assert_eq!(removed.acrid, "A");
        assert_eq!(a.tracklist.len(), 1);
        assert!(a.remove_track(7).is_err());
    }

    #[test]
    fn test_render_tracklist_lines() {
        let pages = render_tracklist(&artifact(), 4000);
        assert_eq!(pages.len(), 1);
        assert_eq!(
            pages[0],
            "1. [0:00] Some Artist - Track A\n2. [10:00] Some Artist - Track B"
        );
    }

    #[test]
    fn test_render_tracklist_paginates_by_budget() {
        let mut a = artifact();
        for i in 0..20 {
            a.tracklist.push(track(&format!("T{}", i), 700 + i * 30));
        }
        let pages = render_tracklist(&a, 200);
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.len() <= 200);
        }
    }

    #[test]
    fn test_render_empty_tracklist_is_no_pages() {
        let mut a = artifact();
        a.tracklist.clear();
        assert!(render_tracklist(&a, 200).is_empty());
    }
}
