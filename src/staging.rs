//! Temporary storage for uploads awaiting ingestion.
//!
//! A [`StagedUpload`] owns its file; dropping it removes the file, so
//! every exit path of an ingestion (success, failure, panic in a
//! background task) leaves the staging directory clean.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    original_name: Option<String>,
}

impl StagedUpload {
    /// Write `bytes` to a fresh file under `dir`, creating `dir` if needed.
    pub fn write(dir: &Path, original_name: Option<&str>, bytes: &[u8]) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create staging dir: {}", dir.display()))?;

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".pdf")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to stage upload in {}", dir.display()))?;
        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self {
            file,
            original_name: original_name.map(str::to_string),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    /// Remove the file now rather than on drop.
    pub fn discard(self) -> Result<()> {
        let path: PathBuf = self.file.path().to_path_buf();
        self.file
            .close()
            .with_context(|| format!("Failed to remove staged upload: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedUpload::write(dir.path(), Some("report.pdf"), b"%PDF-1.5").unwrap();
        let path = staged.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5");
        assert_eq!(staged.original_name(), Some("report.pdf"));

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedUpload::write(&dir.path().join("nested"), None, b"x").unwrap();
        let path = staged.path().to_path_buf();
        staged.discard().unwrap();
        assert!(!path.exists());
    }
}
