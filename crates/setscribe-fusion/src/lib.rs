// SPDX-License-Identifier: GPL-3.0-or-later

//! Match fusion: turns the ordered stream of raw per-chunk guesses into a
//! deduplicated, time-bounded tracklist, and computes the unidentified gaps
//! left between confirmed spans.
//!
//! Everything here is pure. Fusion is a function of the ordered input and
//! the settings alone, so the same raw matches always produce the same
//! tracklist.

pub mod gaps;

pub use gaps::synthesize_gaps;

use serde::{Deserialize, Serialize};
use setscribe_domain::{ConfirmedTrack, GenreCount, RawMatch, TrackGuess};
use tracing::debug;

/// Matches further apart than this are treated as a new occurrence of the
/// same song (e.g. a replay later in the set), not a continuation.
pub const STREAK_GAP_TOLERANCE_SECS: u64 = 60;

/// How many aggregated genre tags describe the run.
const TOP_GENRES: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FusionSettings {
    /// Raw matches scoring below this are dropped before grouping. This is
    /// the recall/precision knob: lower values admit noisier but more
    /// complete identification of rare audio.
    pub min_confidence: u8,
    /// Consecutive matches required to promote a streak.
    pub min_consecutive: u32,
    /// False for backends whose score is a fixed stand-in for "matched at
    /// all"; the gate is skipped entirely for those.
    pub apply_confidence_gate: bool,
    /// Seconds between chunk starts; a confirmed span is assumed to end one
    /// stride after its last matched chunk.
    pub chunk_stride: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionOutcome {
    pub tracklist: Vec<ConfirmedTrack>,
    pub genres: Vec<GenreCount>,
}

/// Accumulating state for the streak under construction.
struct Streak<'a> {
    guess: &'a TrackGuess,
    first_seen: u64,
    last_seen: u64,
    count: u32,
}

/// Fuse the ordered raw-match sequence into the confirmed tracklist.
///
/// The input must be ordered by `start_time`; chunks with no match are
/// simply absent. A streak extends only while the identity stays the same
/// and the spacing stays within [`STREAK_GAP_TOLERANCE_SECS`]; qualifying
/// streaks (length >= `min_consecutive`) become confirmed tracks, and each
/// identity is reported once, anchored at its first confirmed occurrence.
pub fn fuse(raw_matches: &[RawMatch], settings: &FusionSettings) -> FusionOutcome {
    let gated: Vec<&RawMatch> = if settings.apply_confidence_gate {
        raw_matches
            .iter()
            .filter(|m| m.track.score >= settings.min_confidence)
            .collect()
    } else {
        raw_matches.iter().collect()
    };

    let mut tracklist: Vec<ConfirmedTrack> = Vec::new();
    let mut current: Option<Streak<'_>> = None;

    for m in gated {
        let extends = current.as_ref().map_or(false, |streak| {
            streak.guess.acrid == m.track.acrid
                && m.start_time.saturating_sub(streak.last_seen) <= STREAK_GAP_TOLERANCE_SECS
        });

        if extends {
            if let Some(streak) = current.as_mut() {
                streak.last_seen = m.start_time;
                streak.count += 1;
            }
        } else {
            // Identity changed, or the same song resurfaced after too long a
            // silence: finalize and start over.
            if let Some(streak) = current.take() {
                promote(streak, settings, &mut tracklist);
            }
            current = Some(Streak {
                guess: &m.track,
                first_seen: m.start_time,
                last_seen: m.start_time,
                count: 1,
            });
        }
    }

    // The last streak has no following match to trigger its finalization.
    if let Some(streak) = current.take() {
        promote(streak, settings, &mut tracklist);
    }

    let genres = aggregate_genres(&tracklist);

    debug!(
        target: "fusion",
        raw = raw_matches.len(),
        confirmed = tracklist.len(),
        "fusion complete"
    );

    FusionOutcome { tracklist, genres }
}

fn promote(streak: Streak<'_>, settings: &FusionSettings, tracklist: &mut Vec<ConfirmedTrack>) {
    if streak.count < settings.min_consecutive {
        return;
    }
    // First-qualifying occurrence wins; a looped or replayed track is
    // suppressed, not merged.
    if tracklist.iter().any(|t| t.acrid == streak.guess.acrid) {
        return;
    }
    let end_time = streak.last_seen + settings.chunk_stride;
    match ConfirmedTrack::from_streak(streak.guess, streak.first_seen, end_time, streak.count) {
        Ok(track) => tracklist.push(track),
        Err(err) => debug!(target: "fusion", %err, "discarding malformed streak"),
    }
}

/// Tally genre tags across the confirmed tracks and keep the most frequent
/// five, ties broken by first appearance.
fn aggregate_genres(tracklist: &[ConfirmedTrack]) -> Vec<GenreCount> {
    let mut counts: Vec<GenreCount> = Vec::new();
    for track in tracklist {
        for genre in &track.genres {
            if genre.is_empty() {
                continue;
            }
            match counts.iter_mut().find(|g| g.name == *genre) {
                Some(entry) => entry.count += 1,
                None => counts.push(GenreCount {
                    name: genre.clone(),
                    count: 1,
                }),
            }
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(TOP_GENRES);
    counts
}
