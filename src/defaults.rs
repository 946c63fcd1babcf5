//! Default configuration constants for lafal.
//!
//! Shared constants for the feature front-end, the decision rule and the
//! service defaults, so every layer agrees on the same values.

/// Analysis sample rate in Hz.
///
/// Every input is resampled to 16kHz mono before feature extraction.
pub const SAMPLE_RATE: u32 = 16000;

/// Lowest declared source sample rate accepted by the decoder, in Hz.
pub const MIN_SOURCE_RATE: u32 = 4000;

/// Highest declared source sample rate accepted by the decoder, in Hz.
pub const MAX_SOURCE_RATE: u32 = 384_000;

/// Longest utterance accepted, in seconds.
///
/// Bounds the decoded buffer regardless of what the WAV header claims.
pub const MAX_AUDIO_SECONDS: u32 = 300;

/// Input block size handed to the resampler, in frames.
pub const RESAMPLE_CHUNK: usize = 1024;

/// Number of MFCC coefficients per frame, and the length of every feature vector.
pub const N_MFCC: usize = 13;

/// FFT size (and Hann window length) for the short-time spectrum.
pub const N_FFT: usize = 2048;

/// Hop between successive analysis frames, in samples.
pub const HOP_LENGTH: usize = 512;

/// Number of mel bands fed into the cepstral transform.
pub const N_MELS: usize = 128;

/// Dynamic range kept by the power-to-decibel conversion.
pub const TOP_DB: f64 = 80.0;

/// Floor applied to power values before taking the logarithm.
pub const AMIN: f64 = 1e-10;

/// Probability of the "correct" class that must be exceeded to label an
/// utterance correct. The comparison is strict: exactly 0.65 is incorrect.
pub const CORRECT_THRESHOLD: f64 = 0.65;

/// Default HTTP bind address.
pub const BIND_ADDR: &str = "127.0.0.1:5000";

/// Default upper bound for a multipart upload (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Header carrying the pre-shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// File name of the bundled classifier artifact.
pub const MODEL_FILE_NAME: &str = "random_forest_v1_6_0.json";

/// Prefix for staged upload files.
pub const STAGING_PREFIX: &str = "lafal-";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_a_probability() {
        assert!((0.0..=1.0).contains(&CORRECT_THRESHOLD));
    }

    #[test]
    fn source_rate_bounds_include_common_rates() {
        for rate in [8000, 16000, 22050, 44100, 48000, 96000] {
            assert!((MIN_SOURCE_RATE..=MAX_SOURCE_RATE).contains(&rate));
        }
    }

    #[test]
    fn fft_size_is_power_of_two() {
        assert!(N_FFT.is_power_of_two());
        assert!(HOP_LENGTH < N_FFT);
    }
}
