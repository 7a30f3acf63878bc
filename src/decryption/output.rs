//! src/decryption/output.rs
//! Atomic creation of the reconstructed container

use crate::builders::OutputTarget;
use crate::error::DecryptError;
use chrono::Local;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;

static OUTPUT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `<timestamp>_<counter>_<input stem>.db`
///
/// The process-wide counter keeps names distinct for jobs started within the
/// same millisecond.
pub fn unique_output_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "container".to_string());
    let seq = OUTPUT_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{seq}_{stem}.db", Local::now().format("%Y%m%d_%H%M%S%3f"))
}

/// Output being written to a temporary file next to its destination.
///
/// Nothing appears at the destination until [`persist`](Self::persist)
/// succeeds; dropping an `OutputFile` removes the temporary file.
pub struct OutputFile {
    temp: NamedTempFile,
    destination: PathBuf,
}

impl OutputFile {
    /// Resolve `target` for the container at `input` and open the temporary
    /// file.
    pub fn create(target: &OutputTarget, input: &Path) -> Result<Self, DecryptError> {
        let destination = match target {
            OutputTarget::Directory(dir) => dir.join(unique_output_name(input)),
            OutputTarget::File(path) => path.clone(),
        };
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(DecryptError::OutputWriteFailed)?;

        let temp = tempfile::Builder::new()
            .prefix(".wxdb-")
            .suffix(".part")
            .tempfile_in(&dir)
            .map_err(DecryptError::OutputWriteFailed)?;

        tracing::debug!(
            destination = %destination.display(),
            temp = %temp.path().display(),
            "output staged"
        );
        Ok(Self { temp, destination })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn file_mut(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }

    /// Flush to disk and move the file to its destination.
    pub fn persist(self) -> Result<PathBuf, DecryptError> {
        self.temp
            .as_file()
            .sync_all()
            .map_err(DecryptError::OutputWriteFailed)?;
        self.temp
            .persist(&self.destination)
            .map_err(|e| DecryptError::OutputWriteFailed(e.error))?;
        Ok(self.destination)
    }
}
