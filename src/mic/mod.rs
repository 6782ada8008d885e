//! Vocal Sampler
//!
//! Captures the singer's microphone during playback and reduces each
//! audio block to one RMS energy sample. The capture hardware path
//! lives behind the `microphone` feature; the energy math and the
//! sample series are always available so the scorer and the session can
//! be exercised without a device.

use parking_lot::Mutex;
use std::sync::Arc;

#[cfg(feature = "microphone")]
mod sampler;
#[cfg(feature = "microphone")]
pub use sampler::VocalSampler;

/// Capture sample rate in Hz.
pub const SAMPLE_RATE: u32 = 22_050;

/// Samples per energy block (~46ms at 22.05 kHz).
pub const BLOCK_SIZE: usize = 2_048;

/// Default input gain applied before energy measurement.
pub const DEFAULT_GAIN: f32 = 3.0;

/// Operator-adjustable gain bounds.
pub const GAIN_MIN: f32 = 1.0;
/// Upper gain bound.
pub const GAIN_MAX: f32 = 10.0;

/// Full-scale amplitude of the 16-bit capture domain.
const FULL_SCALE: f32 = 32_768.0;

/// Meter floor in dBFS.
const DB_FLOOR: f32 = -60.0;

/// Energy samples captured for the current track.
///
/// Cloning yields a handle to the same series: the capture worker
/// appends while the session resets at track start and drains once at
/// scoring time.
#[derive(Clone, Default)]
pub struct EnergySeries {
    inner: Arc<Mutex<Vec<f32>>>,
}

impl EnergySeries {
    /// New empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one block's energy sample.
    pub fn push(&self, energy: f32) {
        self.inner.lock().push(energy);
    }

    /// Discard everything captured so far.
    pub fn reset(&self) {
        self.inner.lock().clear();
    }

    /// Number of samples captured so far.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Take the captured samples, leaving the series empty.
    pub fn take(&self) -> Vec<f32> {
        std::mem::take(&mut *self.inner.lock())
    }
}

/// RMS energy of one block of normalized [-1, 1] samples.
///
/// Gain is applied in the 16-bit integer domain and clipped there, so a
/// hot gain saturates the same way the capture hardware would. The
/// result lies in [0, 32768].
pub fn block_rms(samples: &[f32], gain: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples
        .iter()
        .map(|&s| {
            let amplified = (s * gain * FULL_SCALE).clamp(-FULL_SCALE, FULL_SCALE - 1.0);
            f64::from(amplified) * f64::from(amplified)
        })
        .sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Convert an RMS energy sample to a dBFS meter reading, floored at -60.
///
/// Presentational only; the meter value never feeds the score.
pub fn rms_to_db(rms: f32) -> f32 {
    if rms <= 0.0 {
        return DB_FLOOR;
    }
    (20.0 * (rms / FULL_SCALE).log10()).max(DB_FLOOR)
}

/// Clamp an operator-requested gain into the supported range.
pub fn clamp_gain(gain: f32) -> f32 {
    gain.clamp(GAIN_MIN, GAIN_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn silence_has_zero_energy_and_floored_meter() {
        let block = vec![0.0_f32; BLOCK_SIZE];
        let rms = block_rms(&block, DEFAULT_GAIN);
        assert_relative_eq!(rms, 0.0);
        assert_relative_eq!(rms_to_db(rms), -60.0);
    }

    #[test]
    fn full_scale_meters_near_zero_db() {
        let block = vec![1.0_f32; 64];
        let rms = block_rms(&block, 1.0);
        let db = rms_to_db(rms);
        assert!(db > -0.1, "full-scale signal should meter near 0 dBFS, got {}", db);
    }

    #[test]
    fn gain_scales_energy_until_clipping() {
        let block = vec![0.1_f32; 64];
        let quiet = block_rms(&block, 1.0);
        let loud = block_rms(&block, 3.0);
        assert_relative_eq!(loud, quiet * 3.0, epsilon = 1.0);

        // Past full scale the clip caps the energy.
        let clipped = block_rms(&block, 100.0);
        assert!(clipped <= 32_768.0);
    }

    #[test]
    fn gain_clamps_to_supported_range() {
        assert_relative_eq!(clamp_gain(0.0), 1.0);
        assert_relative_eq!(clamp_gain(3.0), 3.0);
        assert_relative_eq!(clamp_gain(50.0), 10.0);
    }

    #[test]
    fn meter_never_reads_below_floor() {
        assert_relative_eq!(rms_to_db(0.0001), -60.0);
        assert_relative_eq!(rms_to_db(-5.0), -60.0);
    }

    #[test]
    fn series_reset_and_take() {
        let series = EnergySeries::new();
        let handle = series.clone();
        handle.push(1.0);
        handle.push(2.0);
        assert_eq!(series.len(), 2);

        series.reset();
        assert!(series.is_empty());

        handle.push(3.0);
        let drained = series.take();
        assert_eq!(drained, vec![3.0]);
        assert!(series.is_empty());
    }
}
