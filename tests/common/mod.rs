//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use lafal::classifier::forest::{ForestArtifact, TreeArtifact};
use std::io::Cursor;
use std::path::Path;

pub const SAMPLE_RATE: u32 = 16000;

/// Encode mono samples as a 16-bit PCM WAV.
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer
                .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// One second of a clearly audible tone.
pub fn tone_wav() -> Vec<u8> {
    let samples: Vec<f32> = (0..SAMPLE_RATE)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
        })
        .collect();
    wav_bytes(&samples, SAMPLE_RATE)
}

/// One second of digital silence.
pub fn silent_wav() -> Vec<u8> {
    wav_bytes(&vec![0.0; SAMPLE_RATE as usize], SAMPLE_RATE)
}

/// A one-split forest keyed on the energy coefficient.
///
/// Silence has c0 = -100 * sqrt(128), about -1131, so it lands left and is
/// labelled incorrect with P = [0.9, 0.1]. Audible input lands right with
/// P = [0.2, 0.8].
pub fn energy_forest() -> ForestArtifact {
    ForestArtifact {
        version: "1.6.0-test".to_string(),
        n_features: 13,
        n_classes: 2,
        trees: vec![TreeArtifact {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![-1000.0, -2.0, -2.0],
            value: vec![vec![11.0, 9.0], vec![9.0, 1.0], vec![2.0, 8.0]],
        }],
    }
}

pub fn write_forest(path: &Path, artifact: &ForestArtifact) {
    std::fs::write(path, serde_json::to_vec(artifact).unwrap()).unwrap();
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
