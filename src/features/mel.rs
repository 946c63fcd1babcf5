//! Slaney mel scale, filterbank generation and the analysis window.

use std::f64::consts::PI;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Periodic Hann window (the DFT-even form used for spectral analysis).
pub fn hann_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// Hz to mel on the Slaney scale: linear below 1kHz, logarithmic above.
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Inverse of [`hz_to_mel`].
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// One triangular filter, stored as the first non-zero FFT bin plus its weights.
#[derive(Debug, Clone)]
pub struct MelFilter {
    pub start: usize,
    pub weights: Vec<f64>,
}

impl MelFilter {
    /// Weighted sum of the power spectrum under this filter.
    pub fn apply(&self, power: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(&power[self.start..])
            .map(|(w, p)| w * p)
            .sum()
    }
}

/// Creates an area-normalized (Slaney) triangular mel filterbank.
///
/// Returns `num_mels` filters over `fft_size / 2 + 1` bins.
pub fn mel_filter_bank(
    num_mels: usize,
    fft_size: usize,
    sample_rate: u32,
    low_freq: f64,
    high_freq: f64,
) -> Vec<MelFilter> {
    let half_fft = fft_size / 2 + 1;
    let fft_freqs: Vec<f64> = (0..half_fft)
        .map(|k| k as f64 * sample_rate as f64 / fft_size as f64)
        .collect();

    // num_mels + 2 band edges equally spaced on the mel axis
    let low_mel = hz_to_mel(low_freq);
    let high_mel = hz_to_mel(high_freq);
    let step = (high_mel - low_mel) / (num_mels + 1) as f64;
    let edges: Vec<f64> = (0..num_mels + 2)
        .map(|i| mel_to_hz(low_mel + i as f64 * step))
        .collect();

    (0..num_mels)
        .map(|m| {
            let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
            let norm = 2.0 / (right - left);
            let dense: Vec<f64> = fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - left) / (center - left);
                    let upper = (right - f) / (right - center);
                    lower.min(upper).max(0.0) * norm
                })
                .collect();

            let start = dense.iter().position(|&w| w > 0.0).unwrap_or(0);
            let end = dense
                .iter()
                .rposition(|&w| w > 0.0)
                .map_or(start, |i| i + 1);
            MelFilter {
                start,
                weights: dense[start..end].to_vec(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_is_periodic() {
        let w = hann_window(8);
        assert_eq!(w.len(), 8);
        assert!(w[0].abs() < 1e-12);
        assert!((w[4] - 1.0).abs() < 1e-12);
        // Periodic form: symmetric around n/2, not (n-1)/2
        assert!((w[1] - w[7]).abs() < 1e-12);
    }

    #[test]
    fn test_slaney_scale_anchor_points() {
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
        assert!((hz_to_mel(200.0) - 3.0).abs() < 1e-9);
        assert!((mel_to_hz(15.0) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_hz_mel_roundtrip() {
        for &hz in &[0.0, 100.0, 440.0, 1000.0, 4000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((hz - back).abs() < 1e-6, "roundtrip failed for {} Hz", hz);
        }
    }

    #[test]
    fn test_mel_filter_bank_shape() {
        let bank = mel_filter_bank(128, 2048, 16000, 0.0, 8000.0);
        assert_eq!(bank.len(), 128);
        for filter in &bank {
            assert!(filter.start + filter.weights.len() <= 1025);
            assert!(filter.weights.iter().all(|&w| w >= 0.0));
        }
        // Every band covers at least one bin at this resolution
        assert!(bank.iter().all(|f| !f.weights.is_empty()));
    }

    #[test]
    fn test_filter_apply_uses_offset() {
        let filter = MelFilter {
            start: 2,
            weights: vec![0.5, 1.0],
        };
        let power = [100.0, 100.0, 2.0, 3.0, 100.0];
        assert!((filter.apply(&power) - 4.0).abs() < 1e-12);
    }
}
