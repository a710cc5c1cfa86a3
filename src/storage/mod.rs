use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

const OUTPUT_PREFIX: &str = "annotated_";
const FALLBACK_FILE_NAME: &str = "document.pdf";
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("output file name is empty")]
    MissingFileName,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone)]
pub struct StorageService {
    output_dir: PathBuf,
}

impl StorageService {
    pub const fn with_output_dir(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn target_path(&self, file_name: &str) -> StorageResult<PathBuf> {
        let file_name = Path::new(file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.trim().is_empty())
            .ok_or(StorageError::MissingFileName)?;
        Ok(self.output_dir.join(file_name))
    }

    /// Writes `bytes` beside the target first and renames it into place, so
    /// an interrupted write never leaves a truncated PDF under the final name.
    pub fn save_export(&self, file_name: &str, bytes: &[u8]) -> StorageResult<PathBuf> {
        let target = self.target_path(file_name)?;
        fs::create_dir_all(&self.output_dir)?;

        let mut partial = target.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);

        if let Err(err) = fs::write(&partial, bytes).and_then(|()| fs::rename(&partial, &target)) {
            let _ = fs::remove_file(&partial);
            return Err(StorageError::Io(err));
        }
        tracing::info!(path = %target.display(), size = bytes.len(), "annotated PDF saved");
        Ok(target)
    }
}

/// `annotated_<original name>`, using only the final path component of the source.
pub fn output_file_name(source_name: &str) -> String {
    let base = Path::new(source_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(FALLBACK_FILE_NAME);
    format!("{OUTPUT_PREFIX}{base}")
}

pub fn read_document(path: &Path) -> StorageResult<Vec<u8>> {
    Ok(fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_prefixes_the_source_file_name() {
        assert_eq!(output_file_name("contract.pdf"), "annotated_contract.pdf");
        assert_eq!(
            output_file_name("/home/me/inbox/lease.pdf"),
            "annotated_lease.pdf"
        );
        assert_eq!(output_file_name(""), "annotated_document.pdf");
    }

    #[test]
    fn target_path_strips_directories_from_the_name() {
        let service = StorageService::with_output_dir(PathBuf::from("/tmp/out"));
        assert_eq!(
            service.target_path("../../etc/annotated_x.pdf").expect("path"),
            PathBuf::from("/tmp/out/annotated_x.pdf")
        );
        assert!(matches!(
            service.target_path("   "),
            Err(StorageError::MissingFileName)
        ));
    }

    #[test]
    fn save_export_creates_directory_and_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = StorageService::with_output_dir(dir.path().join("exports"));

        let first = service
            .save_export("annotated_a.pdf", b"first")
            .expect("first save");
        let second = service
            .save_export("annotated_a.pdf", b"second")
            .expect("second save");

        assert_eq!(first, second);
        assert_eq!(fs::read(&second).expect("read back"), b"second");
        let leftovers = fs::read_dir(service.output_dir())
            .expect("list")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(PARTIAL_SUFFIX))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn read_document_reports_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            read_document(&dir.path().join("missing.pdf")),
            Err(StorageError::Io(_))
        ));
    }
}
