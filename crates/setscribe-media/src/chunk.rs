// SPDX-License-Identifier: GPL-3.0-or-later

/// A scheduled sampling window within the source media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based run order.
    pub index: usize,
    /// Offset of the window start, in seconds.
    pub start_time: u64,
    /// Window length in seconds, fixed per run.
    pub length: u64,
}

/// Partition a duration into fixed-length windows at a fixed stride.
///
/// Starts run `0, stride, 2*stride, ...` up to the last start that still
/// leaves a full window before the end of the file. The stride may exceed
/// the chunk length (sampling gaps) or undercut it (overlap). A source no
/// longer than one window yields an empty plan; the caller must treat that
/// as a degenerate run.
pub fn chunk_plan(duration: u64, chunk_length: u64, stride: u64) -> Vec<Chunk> {
    if duration <= chunk_length || stride == 0 {
        return Vec::new();
    }

    let last_start = duration - chunk_length;
    (0..=last_start)
        .step_by(stride as usize)
        .enumerate()
        .map(|(index, start_time)| Chunk {
            index,
            start_time,
            length: chunk_length,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_covers_duration_at_stride() {
        let plan = chunk_plan(3600, 20, 30);
        assert_eq!(plan.first().unwrap().start_time, 0);
        assert_eq!(plan[1].start_time, 30);
        // Last start must leave a full 20s window: 3580 is the final
        // stride-aligned start <= 3600 - 20.
        assert_eq!(plan.last().unwrap().start_time, 3570);
        assert!(plan.iter().all(|c| c.start_time + c.length <= 3600));
    }

    #[test]
    fn test_plan_indices_are_run_order() {
        let plan = chunk_plan(300, 5, 30);
        for (i, chunk) in plan.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.start_time, i as u64 * 30);
        }
    }

    #[test]
    fn test_plan_allows_overlap() {
        // Stride shorter than the window overlaps neighbouring chunks.
        let plan = chunk_plan(100, 20, 10);
        assert_eq!(plan[0].start_time, 0);
        assert_eq!(plan[1].start_time, 10);
        assert_eq!(plan.last().unwrap().start_time, 80);
    }

    #[test]
    fn test_short_source_yields_empty_plan() {
        assert!(chunk_plan(20, 20, 30).is_empty());
        assert!(chunk_plan(5, 20, 30).is_empty());
    }

    #[test]
    fn test_zero_stride_yields_empty_plan() {
        assert!(chunk_plan(3600, 20, 0).is_empty());
    }

    #[test]
    fn test_exact_boundary_start_included() {
        // duration 50, chunk 20: last valid start is exactly 30.
        let plan = chunk_plan(50, 20, 30);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].start_time, 30);
    }
}
