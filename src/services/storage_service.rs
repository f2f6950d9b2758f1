//! src/services/storage_service.rs
//!
//! StorageService: persists raw document bytes on local disk. The layout is
//! owned entirely by this service: `base_path/{document_id}/{version_label}.yaml`.
//! Metadata lives in the key-value store; records only keep the returned path.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("version label `{0}` cannot be used as a file name")]
    InvalidLabel(String),
    #[error("invalid document id `{0}`")]
    InvalidDocumentId(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// StorageService provides the filesystem half of the document lifecycle:
/// - Save a version's bytes (temp file + fsync + rename)
/// - Read / open a stored version
/// - Delete a single version file or a whole document tree
#[derive(Clone, Debug)]
pub struct StorageService {
    /// Base directory on disk where document trees are stored.
    pub base_path: PathBuf,
}

const MAX_LABEL_LEN: usize = 128;
const FILE_EXTENSION: &str = "yaml";

impl StorageService {
    /// Create a new StorageService rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Reject labels that would escape the document directory or produce
    /// hidden / unprintable file names.
    fn ensure_label_safe(label: &str) -> StorageResult<()> {
        let invalid = || StorageError::InvalidLabel(label.to_string());
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(invalid());
        }
        if label.starts_with('.') || label.contains("..") {
            return Err(invalid());
        }
        if label
            .chars()
            .any(|c| c.is_control() || c == '/' || c == '\\' || c == '\0')
        {
            return Err(invalid());
        }
        Ok(())
    }

    /// Document ids are generated internally, but they still arrive through
    /// URLs, so keep them to plain alphanumerics.
    fn ensure_document_id_safe(document_id: &str) -> StorageResult<()> {
        if document_id.is_empty() || !document_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StorageError::InvalidDocumentId(document_id.to_string()));
        }
        Ok(())
    }

    /// Physical directory holding every version of a document.
    fn document_root(&self, document_id: &str) -> PathBuf {
        self.base_path.join(document_id)
    }

    /// Path of a single version file. Parent directories may not exist yet.
    pub fn version_path(&self, document_id: &str, label: &str) -> PathBuf {
        self.document_root(document_id)
            .join(format!("{}.{}", label, FILE_EXTENSION))
    }

    /// Check a label without touching the filesystem.
    pub fn check_label(&self, label: &str) -> StorageResult<()> {
        Self::ensure_label_safe(label)
    }

    /// Write a version's bytes and return the stored path.
    ///
    /// - Creates the per-document directory if needed.
    /// - Writes to a temporary file, flushes and syncs it.
    /// - Renames into the final location, replacing any previous file.
    pub async fn save(
        &self,
        document_id: &str,
        label: &str,
        content: &[u8],
    ) -> StorageResult<PathBuf> {
        Self::ensure_document_id_safe(document_id)?;
        Self::ensure_label_safe(label)?;

        let dir = self.document_root(document_id);
        fs::create_dir_all(&dir).await?;

        let file_path = self.version_path(document_id, label);
        let tmp_path = dir.join(format!(".tmp-{}", Uuid::new_v4()));

        if let Err(err) = write_synced(&tmp_path, content).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }

        debug!(
            "stored {} bytes for document {} at {}",
            content.len(),
            document_id,
            file_path.display()
        );
        Ok(file_path)
    }

    /// Read a stored file fully into memory.
    pub async fn read(&self, path: &Path) -> StorageResult<Vec<u8>> {
        Ok(fs::read(path).await?)
    }

    /// Open a stored file for streaming.
    pub async fn open(&self, path: &Path) -> StorageResult<File> {
        Ok(File::open(path).await?)
    }

    /// Remove a single version file and prune the document directory if it
    /// is left empty. Missing files are not an error.
    pub async fn delete_file(&self, path: &Path) -> StorageResult<()> {
        match fs::remove_file(path).await {
            Ok(_) => debug!("removed version file {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", path.display());
            }
            Err(err) => return Err(StorageError::Io(err)),
        }

        if let Some(parent) = path.parent() {
            if parent.starts_with(&self.base_path) && parent != self.base_path {
                match fs::remove_dir(parent).await {
                    Ok(_) => debug!("pruned empty directory {}", parent.display()),
                    Err(err) => debug!("kept directory {}: {}", parent.display(), err),
                }
            }
        }
        Ok(())
    }

    /// Recursively remove a document's directory. Idempotent.
    pub async fn delete_document_tree(&self, document_id: &str) -> StorageResult<()> {
        Self::ensure_document_id_safe(document_id)?;
        let root = self.document_root(document_id);
        match fs::remove_dir_all(&root).await {
            Ok(_) => {
                debug!("removed document tree {}", root.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Best-effort write/read/delete round trip under `base_path`.
    pub async fn check_writable(&self) -> Result<(), String> {
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz")
            .await
            .map_err(|e| format!("could not write tmp file: {}", e))?;
        let read_back = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        match read_back {
            Ok(bytes) if bytes == b"readyz" => Ok(()),
            Ok(_) => Err("file content mismatch".to_string()),
            Err(e) => Err(format!("could not read tmp file: {}", e)),
        }
    }
}

async fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(dir.path());

        let path = storage.save("abc123", "v1", b"openapi: 3.0.0").await.unwrap();
        assert_eq!(path, dir.path().join("abc123").join("v1.yaml"));
        assert_eq!(storage.read(&path).await.unwrap(), b"openapi: 3.0.0");

        // Overwrite keeps a single file.
        storage.save("abc123", "v1", b"second").await.unwrap();
        assert_eq!(storage.read(&path).await.unwrap(), b"second");
        let entries = std::fs::read_dir(dir.path().join("abc123")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn rejects_path_escaping_labels() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(dir.path());
        for label in ["", "../etc", "a/b", ".hidden", "a\\b", "x\ny"] {
            assert!(
                matches!(
                    storage.save("abc", label, b"x").await,
                    Err(StorageError::InvalidLabel(_))
                ),
                "label {:?} should be rejected",
                label
            );
        }
        assert!(matches!(
            storage.save("../abc", "v1", b"x").await,
            Err(StorageError::InvalidDocumentId(_))
        ));
    }

    #[tokio::test]
    async fn read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(dir.path());
        let err = storage
            .read(&dir.path().join("nope.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(e) if e.kind() == ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn delete_tree_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(dir.path());
        storage.save("doc1", "v1", b"a").await.unwrap();
        storage.save("doc1", "v2", b"b").await.unwrap();

        storage.delete_document_tree("doc1").await.unwrap();
        assert!(!dir.path().join("doc1").exists());
        storage.delete_document_tree("doc1").await.unwrap();
    }

    #[tokio::test]
    async fn delete_file_prunes_empty_document_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(dir.path());
        let v1 = storage.save("doc1", "v1", b"a").await.unwrap();
        let v2 = storage.save("doc1", "v2", b"b").await.unwrap();

        storage.delete_file(&v1).await.unwrap();
        assert!(dir.path().join("doc1").exists());
        storage.delete_file(&v2).await.unwrap();
        assert!(!dir.path().join("doc1").exists());
        storage.delete_file(&v2).await.unwrap();
    }

    #[tokio::test]
    async fn writable_root_passes_check() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(dir.path());
        assert_eq!(storage.check_writable().await, Ok(()));
    }
}
