//! Export progress reporting.

use serde::Serialize;

/// Progress callback for export rendering.
///
/// Called synchronously from the frame loop, in frame order. The callback
/// cannot slow the export down beyond its own running time.
pub type ProgressCallback = Box<dyn FnMut(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExportProgress {
    /// Completion in `[0, 100]`.
    pub percent: u8,

    /// Frames rendered and written so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    /// Nothing rendered yet. Only reported for zero-frame exports.
    Preparing,
    /// A frame has been written.
    Rendering,
    /// Every frame is written; the encoder is finishing the file.
    Finalizing,
}

/// Percentage reported after frame `index` of `total_frames`:
/// `floor(index * 100 / total_frames)`, or 100 when there are no frames.
pub fn progress_percent(index: u64, total_frames: u64) -> u8 {
    if total_frames == 0 {
        return 100;
    }
    let percent = (index as u128 * 100) / total_frames as u128;
    percent.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_percent_truncates() {
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 66);
        assert_eq!(progress_percent(149, 150), 99);
    }

    #[test]
    fn test_percent_without_frames() {
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn test_percent_does_not_overflow() {
        assert_eq!(progress_percent(u64::MAX - 1, u64::MAX), 99);
    }

    proptest! {
        #[test]
        fn prop_percent_is_monotonic_and_below_100(total in 1u64..100_000, a in 0u64..100_000, b in 0u64..100_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assume!(hi < total);
            prop_assert!(progress_percent(lo, total) <= progress_percent(hi, total));
            prop_assert!(progress_percent(hi, total) < 100);
        }
    }
}
