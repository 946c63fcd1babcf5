//! WAV decoding to normalized mono PCM at the analysis rate.

use crate::defaults::{
    MAX_AUDIO_SECONDS, MAX_SOURCE_RATE, MIN_SOURCE_RATE, RESAMPLE_CHUNK, SAMPLE_RATE,
};
use crate::error::{LafalError, Result};
use rubato::{FftFixedInOut, Resampler};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Decode WAV data from any reader.
///
/// Accepts integer PCM (8/16/24/32-bit) and 32-bit float. Samples are
/// normalized to [-1.0, 1.0], averaged down to mono and resampled to 16kHz
/// through a band-limited resampler.
///
/// # Errors
/// `AudioDecode` for unparsable data, a zero channel count, a declared
/// sample rate outside the accepted range, or audio longer than
/// [`MAX_AUDIO_SECONDS`].
pub fn decode_wav<R: Read>(reader: R) -> Result<Vec<f32>> {
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| LafalError::AudioDecode {
        message: format!("Failed to parse WAV file: {}", e),
    })?;

    let spec = wav_reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(LafalError::AudioDecode {
            message: "WAV header declares zero channels".to_string(),
        });
    }
    if !(MIN_SOURCE_RATE..=MAX_SOURCE_RATE).contains(&spec.sample_rate) {
        return Err(LafalError::AudioDecode {
            message: format!(
                "Unsupported sample rate {} Hz (accepted {}-{} Hz)",
                spec.sample_rate, MIN_SOURCE_RATE, MAX_SOURCE_RATE
            ),
        });
    }
    check_duration(wav_reader.duration(), spec.sample_rate)?;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => wav_reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>(),
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            wav_reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
        }
    }
    .map_err(|e| LafalError::AudioDecode {
        message: format!("Failed to read WAV samples: {}", e),
    })?;

    let mono = downmix(&interleaved, channels);

    resample(&mono, spec.sample_rate, SAMPLE_RATE)
}

/// Decode a WAV file from disk.
pub fn decode_wav_file(path: &Path) -> Result<Vec<f32>> {
    let file = File::open(path).map_err(|e| LafalError::AudioDecode {
        message: format!("Failed to open {}: {}", path.display(), e),
    })?;
    decode_wav(BufReader::new(file))
}

/// Reject utterances longer than the accepted maximum.
fn check_duration(frames: u32, sample_rate: u32) -> Result<()> {
    let limit = u64::from(MAX_AUDIO_SECONDS) * u64::from(sample_rate);
    if u64::from(frames) > limit {
        return Err(LafalError::AudioDecode {
            message: format!(
                "Audio is {:.1}s long, the limit is {}s",
                f64::from(frames) / f64::from(sample_rate),
                MAX_AUDIO_SECONDS
            ),
        });
    }
    Ok(())
}

/// Average interleaved frames to a single channel.
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn resample_error(e: impl std::fmt::Display) -> LafalError {
    LafalError::AudioDecode {
        message: format!("Resampling failed: {}", e),
    }
}

/// Band-limited sample rate conversion of a mono signal.
///
/// Output has `ceil(len * to / from)` samples, aligned with the input: the
/// resampler's group delay is trimmed from the front and the tail is
/// flushed with silence.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 1)
            .map_err(resample_error)?;
    let delay = resampler.output_delay();
    let expected = (samples.len() as u64 * u64::from(to_rate)).div_ceil(u64::from(from_rate)) as usize;

    let mut output = Vec::with_capacity(delay + expected + resampler.output_frames_max());
    let mut block = Vec::with_capacity(resampler.input_frames_max());
    let mut consumed = 0;
    while output.len() < delay + expected {
        let needed = resampler.input_frames_next();
        let end = (consumed + needed).min(samples.len());
        block.clear();
        block.extend_from_slice(&samples[consumed..end]);
        block.resize(needed, 0.0);
        consumed = end;

        let frames = resampler
            .process(std::slice::from_ref(&block), None)
            .map_err(resample_error)?;
        output.extend_from_slice(&frames[0]);
    }

    output.drain(..delay);
    output.truncate(expected);
    Ok(output)
}
