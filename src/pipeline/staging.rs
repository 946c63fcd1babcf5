//! Scoped on-disk staging for uploaded audio.

use crate::defaults::STAGING_PREFIX;
use crate::error::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// An uploaded payload written to a uniquely named temporary file.
///
/// The file is removed when the value is dropped, on every exit path.
/// [`StagedAudio::release`] removes it eagerly and reports failures.
#[derive(Debug)]
pub struct StagedAudio {
    file: NamedTempFile,
}

impl StagedAudio {
    /// Write `bytes` to `<dir>/lafal-<request id>.wav`.
    ///
    /// The name comes from the request id, and the file is created
    /// exclusively, so concurrent requests never share a path.
    pub fn stage(dir: &Path, request_id: Uuid, bytes: &[u8]) -> Result<Self> {
        let prefix = format!("{}{}", STAGING_PREFIX, request_id.simple());
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".wav")
            .rand_bytes(0)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        tracing::debug!(path = %file.path().display(), bytes = bytes.len(), "Staged audio");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Remove the file now, logging instead of failing if that goes wrong.
    pub fn release(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "Released staged audio"),
            Err(e) => tracing::warn!(path = %path.display(), "Failed to remove staged audio: {e}"),
        }
    }
}

/// Directory used when no staging directory is configured.
pub fn default_staging_dir() -> PathBuf {
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_stage_writes_payload_under_request_id() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let staged = StagedAudio::stage(dir.path(), id, b"RIFF....").unwrap();

        let name = staged.path().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("lafal-{}.wav", id.simple()));
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"RIFF....");
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedAudio::stage(dir.path(), Uuid::new_v4(), b"data").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_release_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedAudio::stage(dir.path(), Uuid::new_v4(), b"").unwrap();
        staged.release();
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_same_request_id_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let _first = StagedAudio::stage(dir.path(), id, b"one").unwrap();
        assert!(StagedAudio::stage(dir.path(), id, b"two").is_err());
    }

    #[test]
    fn test_distinct_requests_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = StagedAudio::stage(dir.path(), Uuid::new_v4(), b"a").unwrap();
        let b = StagedAudio::stage(dir.path(), Uuid::new_v4(), b"b").unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(entries(dir.path()), 2);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = StagedAudio::stage(&dir.path().join("absent"), Uuid::new_v4(), b"x");
        assert!(result.is_err());
    }
}
