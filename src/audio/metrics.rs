//! Loudness metrics published for each processed chunk

use serde::{Deserialize, Serialize};

/// Scale factors applied to the short-window average.
///
/// These are placeholder values, not an EBU R128 calculation. Each derived
/// field is `average_short * (1 + k)`.
pub const LOUDNESS_RANGE_K: f64 = 0.9;
pub const REALTIME_DYNAMICS_K: f64 = 0.8;
pub const AVERAGE_REALTIME_DYNAMICS_K: f64 = 0.7;
pub const TRUE_PEAK_MAX_K: f64 = 0.6;
pub const INTEGRATED_LUFS_K: f64 = 0.5;
pub const MOMENTARY_MAX_LUFS_K: f64 = 0.4;
pub const SHORT_TERM_MAX_LUFS_K: f64 = 0.3;

/// Snapshot of the meter after one chunk (Send-safe, Copy)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Short-window average loudness
    pub loudness: f64,

    /// Long-window average loudness
    pub short_term_lufs: f64,

    pub integrated_lufs: f64,
    pub loudness_range: f64,
    pub realtime_dynamics: f64,
    pub average_realtime_dynamics: f64,
    pub momentary_max_lufs: f64,
    pub short_term_max_lufs: f64,
    pub true_peak_max: f64,
}

impl MetricsSnapshot {
    /// All-zero snapshot, used before any audio has been measured
    pub fn silent() -> Self {
        Self::default()
    }

    /// Derive the nine published fields from the two window averages
    pub fn from_averages(average_short: f64, average_long: f64) -> Self {
        let scaled = |k: f64| average_short + average_short * k;

        Self {
            loudness: average_short,
            short_term_lufs: average_long,
            integrated_lufs: scaled(INTEGRATED_LUFS_K),
            loudness_range: scaled(LOUDNESS_RANGE_K),
            realtime_dynamics: scaled(REALTIME_DYNAMICS_K),
            average_realtime_dynamics: scaled(AVERAGE_REALTIME_DYNAMICS_K),
            momentary_max_lufs: scaled(MOMENTARY_MAX_LUFS_K),
            short_term_max_lufs: scaled(SHORT_TERM_MAX_LUFS_K),
            true_peak_max: scaled(TRUE_PEAK_MAX_K),
        }
    }

    /// Field values in declaration order
    pub fn values(&self) -> [f64; 9] {
        [
            self.loudness,
            self.short_term_lufs,
            self.integrated_lufs,
            self.loudness_range,
            self.realtime_dynamics,
            self.average_realtime_dynamics,
            self.momentary_max_lufs,
            self.short_term_max_lufs,
            self.true_peak_max,
        ]
    }

    /// True when every field is a finite number
    pub fn is_finite(&self) -> bool {
        self.values().iter().all(|v| v.is_finite())
    }
}
