//! Mean MFCC feature extraction.
//!
//! Short-time front-end with the conventional speech-analysis defaults:
//! - FFT size / window: 2048, periodic Hann
//! - Hop: 512, frames centered with FFT/2 zero padding
//! - Mel bands: 128, Slaney scale and normalization, 0 Hz to Nyquist
//! - Log: 10·log10 power, clamped to 80 dB below the spectrogram peak
//! - Cepstrum: orthonormal DCT-II, first 13 coefficients
//!
//! The per-frame coefficients are averaged into one 13-value vector.

use crate::audio::wav::decode_wav_file;
use crate::defaults::{AMIN, HOP_LENGTH, N_FFT, N_MELS, N_MFCC, SAMPLE_RATE, TOP_DB};
use crate::error::{LafalError, Result};
use crate::features::fft::PowerSpectrum;
use crate::features::mel::{MelFilter, hann_window, mel_filter_bank};
use crate::features::{FeatureExtractor, FeatureVector};
use std::f64::consts::PI;
use std::path::Path;

/// Configuration for MFCC extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct MfccConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub n_mfcc: usize,
    pub top_db: f64,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            n_fft: N_FFT,
            hop_length: HOP_LENGTH,
            n_mels: N_MELS,
            n_mfcc: N_MFCC,
            top_db: TOP_DB,
        }
    }
}

/// MFCC extractor with precomputed window, filterbank and DCT basis.
///
/// Holds no per-call state, so one instance can serve concurrent requests.
pub struct MfccExtractor {
    cfg: MfccConfig,
    window: Vec<f64>,
    mel_bank: Vec<MelFilter>,
    dct: Vec<Vec<f64>>,
}

impl MfccExtractor {
    pub fn new(cfg: MfccConfig) -> Self {
        let window = hann_window(cfg.n_fft);
        let mel_bank = mel_filter_bank(
            cfg.n_mels,
            cfg.n_fft,
            cfg.sample_rate,
            0.0,
            cfg.sample_rate as f64 / 2.0,
        );
        let dct = dct_basis(cfg.n_mfcc, cfg.n_mels);
        Self {
            cfg,
            window,
            mel_bank,
            dct,
        }
    }

    pub fn config(&self) -> &MfccConfig {
        &self.cfg
    }

    /// Number of analysis frames for a signal of `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        if len == 0 { 0 } else { 1 + len / self.cfg.hop_length }
    }

    /// Log-mel spectrogram in dB, `[frames][n_mels]`, before the top-dB clamp.
    fn log_mel_frames(&self, samples: &[f32]) -> Vec<Vec<f64>> {
        let cfg = &self.cfg;
        let n_frames = self.frame_count(samples.len());
        let pad = cfg.n_fft / 2;
        let half_fft = cfg.n_fft / 2 + 1;

        let mut spectrum = PowerSpectrum::new(cfg.n_fft);
        let mut frame = vec![0.0f64; cfg.n_fft];
        let mut power = vec![0.0f64; half_fft];
        let mut frames = Vec::with_capacity(n_frames);

        for t in 0..n_frames {
            let start = t * cfg.hop_length;
            for (i, slot) in frame.iter_mut().enumerate() {
                // Index into the zero-padded signal
                let sample = (start + i)
                    .checked_sub(pad)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = sample as f64 * self.window[i];
            }
            spectrum.compute(&frame, &mut power);

            let mel_db: Vec<f64> = self
                .mel_bank
                .iter()
                .map(|filter| 10.0 * filter.apply(&power).max(AMIN).log10())
                .collect();
            frames.push(mel_db);
        }
        frames
    }

    /// Mean MFCC vector from normalized mono samples at the configured rate.
    pub fn features(&self, samples: &[f32]) -> Result<FeatureVector> {
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(LafalError::AudioDecode {
                message: "audio contains non-finite samples".to_string(),
            });
        }

        let mut frames = self.log_mel_frames(samples);
        if frames.is_empty() {
            return Err(LafalError::AudioDecode {
                message: "audio yields zero analysis frames".to_string(),
            });
        }

        let peak = frames
            .iter()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let floor = peak - self.cfg.top_db;
        for v in frames.iter_mut().flatten() {
            *v = v.max(floor);
        }

        let mut sums = vec![0.0f64; self.cfg.n_mfcc];
        for mel_db in &frames {
            for (sum, basis) in sums.iter_mut().zip(&self.dct) {
                *sum += basis.iter().zip(mel_db).map(|(b, x)| b * x).sum::<f64>();
            }
        }

        let n = frames.len() as f64;
        Ok(FeatureVector::new(
            sums.into_iter().map(|s| (s / n) as f32).collect(),
        ))
    }
}

impl Default for MfccExtractor {
    fn default() -> Self {
        Self::new(MfccConfig::default())
    }
}

impl FeatureExtractor for MfccExtractor {
    fn extract(&self, audio: &Path) -> Result<FeatureVector> {
        let samples = decode_wav_file(audio)?;
        self.features(&samples)
    }
}

/// Orthonormal DCT-II rows `[n_out][n_in]`.
fn dct_basis(n_out: usize, n_in: usize) -> Vec<Vec<f64>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}
