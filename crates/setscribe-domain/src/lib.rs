// SPDX-License-Identifier: GPL-3.0-or-later
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("track identity key must not be empty")]
    EmptyAcrid,

    #[error("time range end {end} precedes start {start}")]
    InvertedTimeRange { start: u64, end: u64 },

    #[error("gap must have positive length (start {start}, end {end})")]
    EmptyGap { start: u64, end: u64 },
}

// ============================================================================
// Time formatting
// ============================================================================

/// Format a second offset as `m:ss`, or `h:mm:ss` for offsets of an hour or
/// more. This is the human-readable twin stored next to every integer
/// timestamp in the run artifact.
pub fn format_timestamp(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Parse `m:ss` or `h:mm:ss` back into seconds. Returns `None` for anything
/// else, including negative or non-numeric parts.
pub fn parse_timestamp(value: &str) -> Option<u64> {
    let parts: Vec<&str> = value.split(':').collect();
    match parts.as_slice() {
        [m, s] => {
            let m: u64 = m.parse().ok()?;
            let s: u64 = s.parse().ok()?;
            (s < 60).then_some(m * 60 + s)
        }
        [h, m, s] => {
            let h: u64 = h.parse().ok()?;
            let m: u64 = m.parse().ok()?;
            let s: u64 = s.parse().ok()?;
            (m < 60 && s < 60).then_some(h * 3600 + m * 60 + s)
        }
        _ => None,
    }
}

// ============================================================================
// Raw recognition output
// ============================================================================

/// Cross-referenced streaming identifiers reported by a provider, when the
/// provider carries them (ACRCloud does, Shazam does not).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotify: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deezer: Option<String>,
}

/// One provider's best guess for a single audio window.
///
/// `acrid` is the provider-namespaced stable identity key; guesses from
/// different providers never collide because each provider stamps its own
/// namespace (ACRCloud ids are used as-is, Shazam keys carry a `shazam_`
/// prefix).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackGuess {
    pub acrid: String,
    pub title: String,
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub release_date: String,
    /// Provider-normalized confidence, 0-100. Providers without native
    /// scoring report a fixed high value since a hit is binary.
    pub score: u8,
    #[serde(default)]
    pub play_offset_ms: u64,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub external_ids: ExternalIds,
}

/// Output of one recognition attempt, pinned to the chunk that produced it.
/// Nothing mutates a `RawMatch` after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    pub chunk_index: usize,
    pub start_time: u64,
    pub track: TrackGuess,
}

// ============================================================================
// Confirmed tracklist
// ============================================================================

/// Confidence tier of a confirmed track, derived from streak length rather
/// than the provider's raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
}

impl Confidence {
    /// `High` requires at least three consecutive matches.
    pub fn from_streak(consecutive_matches: u32) -> Self {
        if consecutive_matches >= 3 {
            Confidence::High
        } else {
            Confidence::Medium
        }
    }
}

/// A fused, time-bounded identification. Within one run's tracklist each
/// `acrid` appears at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedTrack {
    pub acrid: String,
    pub title: String,
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub start_time: u64,
    pub start_time_formatted: String,
    pub end_time: u64,
    pub end_time_formatted: String,
    pub consecutive_matches: u32,
    pub confidence: Confidence,
}

impl ConfirmedTrack {
    /// Build a confirmed track from the guess that anchored a qualifying
    /// streak. `end_time` is approximate: last matched start plus one chunk
    /// stride.
    pub fn from_streak(
        guess: &TrackGuess,
        start_time: u64,
        end_time: u64,
        consecutive_matches: u32,
    ) -> Result<Self, DomainError> {
        if guess.acrid.is_empty() {
            return Err(DomainError::EmptyAcrid);
        }
        if end_time < start_time {
            return Err(DomainError::InvertedTimeRange {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            acrid: guess.acrid.clone(),
            title: guess.title.clone(),
            artists: guess.artists.clone(),
            album: guess.album.clone(),
            label: guess.label.clone(),
            genres: guess.genres.clone(),
            start_time,
            start_time_formatted: format_timestamp(start_time),
            end_time,
            end_time_formatted: format_timestamp(end_time),
            consecutive_matches,
            confidence: Confidence::from_streak(consecutive_matches),
        })
    }
}

// ============================================================================
// Unidentified gaps
// ============================================================================

/// Assumed average track length used to estimate how many tracks hide inside
/// an unidentified gap.
pub const AVERAGE_TRACK_LENGTH_SECS: u64 = 300;

/// A time range not covered by any confirmed track, surfaced for manual
/// identification rather than silently dropped. The placeholder title and
/// artists follow the "ID" convention used for crowd-sourced tracklists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnidentifiedGap {
    pub start_time: u64,
    pub start_time_formatted: String,
    pub end_time: u64,
    pub end_time_formatted: String,
    pub estimated_tracks: u32,
    pub title: String,
    pub artists: Vec<String>,
}

impl UnidentifiedGap {
    pub fn new(start_time: u64, end_time: u64) -> Result<Self, DomainError> {
        if end_time <= start_time {
            return Err(DomainError::EmptyGap {
                start: start_time,
                end: end_time,
            });
        }
        let length = end_time - start_time;
        let estimated = ((length as f64 / AVERAGE_TRACK_LENGTH_SECS as f64).round() as u32).max(1);
        Ok(Self {
            start_time,
            start_time_formatted: format_timestamp(start_time),
            end_time,
            end_time_formatted: format_timestamp(end_time),
            estimated_tracks: estimated,
            title: "ID".to_string(),
            artists: vec!["ID".to_string()],
        })
    }
}

// ============================================================================
// Genre aggregate
// ============================================================================

/// One entry of the run's aggregated "vibe" descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreCount {
    pub name: String,
    pub count: u32,
}
