//! Chunk-to-loudness pipeline
//!
//! Converts PCM16 little-endian chunks into a decibel-like loudness value,
//! keeps short and long sliding windows of recent values and derives the
//! published metrics from their averages.

use super::metrics::MetricsSnapshot;
use super::window::SlidingWindow;
use crate::config::MeterConfig;

/// PCM16 full-scale divisor
const PCM16_SCALE: f32 = 32768.0;

/// Decode PCM16 little-endian bytes into normalized samples.
///
/// A trailing odd byte is ignored.
pub fn decode_pcm16_le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM16_SCALE)
        .collect()
}

/// Root-mean-square of the samples, 0.0 for an empty slice
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// RMS of PCM16 LE bytes without materializing the samples.
///
/// `None` when the buffer holds no complete sample.
pub fn pcm16_rms(bytes: &[u8]) -> Option<f64> {
    let mut sum_sq = 0.0f64;
    let mut count = 0usize;
    for pair in bytes.chunks_exact(2) {
        let s = (i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM16_SCALE) as f64;
        sum_sq += s * s;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some((sum_sq / count as f64).sqrt())
}

/// `20 * log10(rms * calibration)`.
///
/// Zero, subnormal and non-finite inputs resolve to `floor_db`.
pub fn to_loudness_db(rms: f64, calibration: f64, floor_db: f64) -> f64 {
    let scaled = rms * calibration;
    if !scaled.is_normal() || scaled < 0.0 {
        return floor_db;
    }
    20.0 * scaled.log10()
}

/// Loudness meter state for one capture session
#[derive(Debug, Clone)]
pub struct LoudnessMeter {
    short: SlidingWindow,
    long: SlidingWindow,
    calibration: f64,
    floor_db: f64,
    chunks_processed: u64,
    last_sample_rate: Option<u32>,
}

impl Default for LoudnessMeter {
    fn default() -> Self {
        Self::new(&MeterConfig::default())
    }
}

impl LoudnessMeter {
    pub fn new(config: &MeterConfig) -> Self {
        Self {
            short: SlidingWindow::new(config.short_window),
            long: SlidingWindow::new(config.long_window),
            calibration: config.calibration,
            floor_db: config.floor_db,
            chunks_processed: 0,
            last_sample_rate: None,
        }
    }

    /// Process one chunk of PCM16 LE audio and return the updated metrics.
    ///
    /// Chunks with fewer than two bytes leave the windows untouched and
    /// return the metrics of the current windows.
    pub fn process_chunk(&mut self, buffer: &[u8], sample_rate: u32) -> MetricsSnapshot {
        if self.last_sample_rate != Some(sample_rate) {
            log::trace!("Meter chunk sample rate: {} Hz", sample_rate);
            self.last_sample_rate = Some(sample_rate);
        }

        let Some(chunk_rms) = pcm16_rms(buffer) else {
            return self.snapshot();
        };

        let loudness = to_loudness_db(chunk_rms, self.calibration, self.floor_db);
        self.short.push(loudness);
        self.long.push(loudness);
        self.chunks_processed += 1;

        self.snapshot()
    }

    /// Metrics derived from the current window contents
    pub fn snapshot(&self) -> MetricsSnapshot {
        match (self.short.mean(), self.long.mean()) {
            (Some(short), Some(long)) => MetricsSnapshot::from_averages(short, long),
            _ => MetricsSnapshot::silent(),
        }
    }

    /// Clear both windows for a new capture session
    pub fn reset(&mut self) {
        self.short.clear();
        self.long.clear();
        self.chunks_processed = 0;
    }

    pub fn short_window(&self) -> &SlidingWindow {
        &self.short
    }

    pub fn long_window(&self) -> &SlidingWindow {
        &self.long
    }

    /// Number of chunks that contributed a sample since the last reset
    pub fn chunks_processed(&self) -> u64 {
        self.chunks_processed
    }

    pub fn last_sample_rate(&self) -> Option<u32> {
        self.last_sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} +/- {tolerance}, got {actual}"
        );
    }

    fn pcm16(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Constant-amplitude chunk; distinct amplitudes give distinct loudness
    fn tone_chunk(amplitude: i16) -> Vec<u8> {
        pcm16(&[amplitude, -amplitude, amplitude, -amplitude])
    }

    #[test]
    fn decode_normalizes_to_unit_range() {
        let samples = decode_pcm16_le(&pcm16(&[i16::MIN, 0, 16384, i16::MAX]));

        assert_eq!(samples[0], -1.0);
        assert_eq!(samples[1], 0.0);
        assert_eq!(samples[2], 0.5);
        assert!(samples[3] < 1.0 && samples[3] > 0.9999);
    }

    #[test]
    fn decode_ignores_trailing_odd_byte() {
        let mut bytes = pcm16(&[16384]);
        bytes.push(0x7f);

        assert_eq!(decode_pcm16_le(&bytes), vec![0.5]);
    }

    #[test]
    fn half_scale_chunk_matches_reference_loudness() {
        let mut meter = LoudnessMeter::default();

        let snapshot = meter.process_chunk(&pcm16(&[16384, -16384]), 44100);

        let expected = 20.0 * 0.6_f64.log10();
        assert_approx(expected, -4.437, 1e-3);
        let window: Vec<f64> = meter.short_window().iter().copied().collect();
        assert_eq!(window.len(), 1);
        assert_approx(window[0], expected, 1e-6);
        assert_approx(snapshot.loudness, expected, 1e-6);
        assert_approx(snapshot.short_term_lufs, expected, 1e-6);
    }

    #[test]
    fn silence_resolves_to_floor() {
        let mut meter = LoudnessMeter::default();

        let snapshot = meter.process_chunk(&[0u8; 64], 44100);

        assert_eq!(meter.short_window().latest(), Some(-100.0));
        assert_eq!(snapshot.loudness, -100.0);
        assert!(snapshot.is_finite());
    }

    #[test]
    fn to_loudness_db_guards_degenerate_input() {
        assert_eq!(to_loudness_db(0.0, 1.2, -100.0), -100.0);
        assert_eq!(to_loudness_db(f64::MIN_POSITIVE / 4.0, 1.2, -100.0), -100.0);
        assert_eq!(to_loudness_db(f64::NAN, 1.2, -100.0), -100.0);
        assert_approx(to_loudness_db(1e-9, 1.2, -100.0), 20.0 * 1.2e-9_f64.log10(), 1e-9);
    }

    #[test]
    fn pcm16_rms_matches_decoded_samples() {
        let bytes = pcm16(&[16384, -16384, 8192, 0]);

        let direct = pcm16_rms(&bytes).unwrap();
        assert_approx(direct, rms(&decode_pcm16_le(&bytes)), 1e-12);
        assert_eq!(pcm16_rms(&[]), None);
        assert_eq!(pcm16_rms(&[0x01]), None);
    }

    #[test]
    fn one_lsb_chunk_reports_quiet_level_below_floor() {
        let mut meter = LoudnessMeter::default();
        let mut samples = vec![0i16; 1764];
        samples[0] = 1;

        let snapshot = meter.process_chunk(&pcm16(&samples), 44100);

        let rms = (1.0_f64 / 32768.0) / 1764.0_f64.sqrt();
        let expected = 20.0 * (rms * 1.2).log10();
        assert!(expected < -100.0);
        assert_approx(snapshot.loudness, expected, 1e-6);
        assert_approx(meter.short_window().latest().unwrap(), expected, 1e-6);
    }

    #[test]
    fn empty_chunks_do_not_touch_windows() {
        let mut meter = LoudnessMeter::default();
        meter.process_chunk(&tone_chunk(8000), 44100);
        let before: Vec<f64> = meter.long_window().iter().copied().collect();

        for _ in 0..5 {
            meter.process_chunk(&[], 44100);
            meter.process_chunk(&[0x12], 44100);
        }

        let after: Vec<f64> = meter.long_window().iter().copied().collect();
        assert_eq!(before, after);
        assert_eq!(meter.chunks_processed(), 1);
    }

    #[test]
    fn empty_chunk_before_any_audio_is_silent_snapshot() {
        let mut meter = LoudnessMeter::default();

        let snapshot = meter.process_chunk(&[], 44100);

        assert_eq!(snapshot, MetricsSnapshot::silent());
        assert!(meter.short_window().is_empty());
    }

    #[test]
    fn short_window_keeps_last_ten_chunks() {
        let mut meter = LoudnessMeter::default();
        let mut values = Vec::new();

        for i in 0..11 {
            meter.process_chunk(&tone_chunk(1000 + i * 1000), 44100);
            values.push(meter.short_window().latest().unwrap());
        }

        let window: Vec<f64> = meter.short_window().iter().copied().collect();
        assert_eq!(window, values[1..].to_vec());

        let expected_avg = values[1..].iter().sum::<f64>() / 10.0;
        assert_approx(meter.snapshot().loudness, expected_avg, 1e-9);

        let long_avg = values.iter().sum::<f64>() / 11.0;
        assert_approx(meter.snapshot().short_term_lufs, long_avg, 1e-9);
    }

    #[test]
    fn windows_respect_capacity_over_long_sessions() {
        let mut meter = LoudnessMeter::default();

        for i in 0..500 {
            let snapshot = meter.process_chunk(&tone_chunk((i % 30000) as i16 + 1), 48000);
            assert!(meter.short_window().len() <= 10);
            assert!(meter.long_window().len() <= 200);
            assert!(snapshot.is_finite());
        }
        assert_eq!(meter.long_window().len(), 200);
    }

    #[test]
    fn full_scale_chunk_is_finite() {
        let mut meter = LoudnessMeter::default();
        let chunk = pcm16(&[i16::MIN; 512]);

        let snapshot = meter.process_chunk(&chunk, 44100);

        assert!(snapshot.is_finite());
        assert_approx(snapshot.loudness, 20.0 * 1.2_f64.log10(), 1e-6);
    }

    #[test]
    fn reset_clears_session_state() {
        let mut meter = LoudnessMeter::default();
        meter.process_chunk(&tone_chunk(4000), 44100);

        meter.reset();

        assert!(meter.short_window().is_empty());
        assert!(meter.long_window().is_empty());
        assert_eq!(meter.chunks_processed(), 0);
        assert_eq!(meter.snapshot(), MetricsSnapshot::silent());
    }

    #[test]
    fn sample_rate_only_tags_the_chunk() {
        let mut a = LoudnessMeter::default();
        let mut b = LoudnessMeter::default();

        let sa = a.process_chunk(&tone_chunk(12000), 44100);
        let sb = b.process_chunk(&tone_chunk(12000), 8000);

        assert_eq!(sa, sb);
        assert_eq!(b.last_sample_rate(), Some(8000));
    }

    #[test]
    fn custom_config_sets_window_sizes() {
        let config = MeterConfig {
            short_window: 3,
            long_window: 5,
            ..Default::default()
        };
        let mut meter = LoudnessMeter::new(&config);

        for _ in 0..8 {
            meter.process_chunk(&tone_chunk(2000), 44100);
        }

        assert_eq!(meter.short_window().len(), 3);
        assert_eq!(meter.long_window().len(), 5);
    }
}
