//! Audio decoding.

pub mod wav;

pub use wav::{decode_wav, decode_wav_file};
