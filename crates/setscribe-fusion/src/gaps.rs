// SPDX-License-Identifier: GPL-3.0-or-later

//! Complement of the confirmed tracklist: the time ranges nobody identified,
//! surfaced as placeholder entries for crowd-sourced completion.

use setscribe_domain::{ConfirmedTrack, UnidentifiedGap};
use tracing::debug;

/// Two confirmed spans closer than this are bridged by a transition, not an
/// unidentified section; their covered ranges merge.
pub const SPAN_MERGE_TOLERANCE_SECS: u64 = 60;

/// Uncovered intervals at or under this length are too short to bother the
/// crowd with.
pub const MIN_GAP_TO_REPORT_SECS: u64 = 120;

/// Compute the unidentified gaps left between confirmed track spans.
///
/// Spans are sorted by start, near-adjacent spans (gap <= 60s) merge into
/// one covered range, and every uncovered interval longer than 120s is
/// reported, including the head interval from 0 and the tail interval to
/// `duration`. An empty tracklist yields exactly one gap spanning the whole
/// set.
pub fn synthesize_gaps(tracklist: &[ConfirmedTrack], duration: u64) -> Vec<UnidentifiedGap> {
    if duration == 0 {
        return Vec::new();
    }

    if tracklist.is_empty() {
        return UnidentifiedGap::new(0, duration).into_iter().collect();
    }

    let mut spans: Vec<(u64, u64)> = tracklist
        .iter()
        .map(|t| (t.start_time, t.end_time.min(duration)))
        .collect();
    spans.sort_by_key(|(start, _)| *start);

    // Merge transitions into contiguous covered ranges.
    let mut covered: Vec<(u64, u64)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match covered.last_mut() {
            Some((_, last_end)) if start.saturating_sub(*last_end) <= SPAN_MERGE_TOLERANCE_SECS => {
                *last_end = (*last_end).max(end);
            }
            _ => covered.push((start, end)),
        }
    }

    let mut gaps = Vec::new();
    let mut cursor = 0u64;
    for (start, end) in &covered {
        if start.saturating_sub(cursor) > MIN_GAP_TO_REPORT_SECS {
            if let Ok(gap) = UnidentifiedGap::new(cursor, *start) {
                gaps.push(gap);
            }
        }
        cursor = cursor.max(*end);
    }
    if duration.saturating_sub(cursor) > MIN_GAP_TO_REPORT_SECS {
        if let Ok(gap) = UnidentifiedGap::new(cursor, duration) {
            gaps.push(gap);
        }
    }

    debug!(
        target: "fusion",
        covered = covered.len(),
        gaps = gaps.len(),
        "gap synthesis complete"
    );

    gaps
}
