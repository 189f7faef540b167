//! Export timing utilities.
//!
//! An export is anchored to a monotonic epoch recorded when the controller
//! starts work. This module provides:
//! - Elapsed time since the epoch
//! - The wall-clock start time for summaries
//! - ETA estimation from the completed fraction

use std::time::Instant;

/// A clock anchored to the moment an export started.
#[derive(Debug, Clone)]
pub struct ExportClock {
    /// The instant the export started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl ExportClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the export started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at export start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Estimated seconds remaining, given the completed fraction in `[0, 1]`.
    pub fn eta_secs(&self, fraction: f64) -> f64 {
        estimate_remaining_secs(self.elapsed_secs(), fraction)
    }
}

/// Remaining time for a job that took `elapsed_secs` to reach `fraction`.
///
/// Returns 0 when nothing has completed yet, since no rate is known.
pub fn estimate_remaining_secs(elapsed_secs: f64, fraction: f64) -> f64 {
    if fraction <= 0.0 || !fraction.is_finite() {
        return 0.0;
    }
    let fraction = fraction.min(1.0);
    ((elapsed_secs / fraction) - elapsed_secs).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = ExportClock::start();
        assert!(clock.elapsed_secs() < 1.0);
        assert!(chrono::DateTime::parse_from_rfc3339(clock.epoch_wall()).is_ok());
    }

    #[test]
    fn test_eta_halfway() {
        assert!((estimate_remaining_secs(10.0, 0.5) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_eta_unknown_rate() {
        assert_eq!(estimate_remaining_secs(3.0, 0.0), 0.0);
        assert_eq!(estimate_remaining_secs(3.0, f64::NAN), 0.0);
    }

    #[test]
    fn test_eta_complete() {
        assert_eq!(estimate_remaining_secs(7.0, 1.0), 0.0);
        assert_eq!(estimate_remaining_secs(7.0, 1.5), 0.0);
    }
}
