//! Acoustic feature extraction.
//!
//! A staged audio file becomes one fixed-length [`FeatureVector`]: the mean
//! of 13 MFCCs over all analysis frames of the 16kHz mono signal.

mod fft;
mod mel;
pub mod mfcc;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use mfcc::{MfccConfig, MfccExtractor};

/// Ordered feature values, coefficient index ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Converts a decodable audio resource into a feature vector.
///
/// Implementations must be safe for concurrent use.
pub trait FeatureExtractor: Send + Sync {
    /// Read and summarize the audio at `audio`.
    ///
    /// # Errors
    /// `LafalError::AudioDecode` when the file cannot be decoded or yields
    /// zero analysis frames.
    fn extract(&self, audio: &Path) -> Result<FeatureVector>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LafalError;
    use std::io::Write;

    fn write_wav(path: &Path, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_extract_from_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = (0..8000)
            .map(|i| ((i as f64 * 0.07).sin() * 8000.0) as i16)
            .collect();
        write_wav(&path, &samples);

        let extractor: Box<dyn FeatureExtractor> = Box::new(MfccExtractor::default());
        let features = extractor.extract(&path).unwrap();
        assert_eq!(features.len(), 13);
    }

    #[test]
    fn test_extract_header_only_wav_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, &[]);

        let result = MfccExtractor::default().extract(&path);
        assert!(matches!(result, Err(LafalError::AudioDecode { .. })));
    }

    #[test]
    fn test_extract_zero_byte_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.wav");
        std::fs::File::create(&path).unwrap().flush().unwrap();

        let result = MfccExtractor::default().extract(&path);
        assert!(matches!(result, Err(LafalError::AudioDecode { .. })));
    }

    #[test]
    fn test_feature_vector_serializes_as_array() {
        let v = FeatureVector::new(vec![1.0, 2.5]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[1.0,2.5]");
    }
}
