//! Blob storage for uploaded images and the lifecycle rules around it.
//!
//! Blob writes and row updates cannot share a transaction, so `replace`
//! orders them: write the new blob, commit the row, then drop the old blob.
//! A failed commit removes the new blob again. A failed cleanup of the old
//! blob is only logged; an orphaned file is acceptable, a dangling
//! reference is not.

use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::database::store::StoreError;

/// Every stored reference lives under this prefix
pub const UPLOAD_PREFIX: &str = "uploads/";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid blob reference '{0}'")]
    InvalidReference(String),

    #[error("blob storage error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Store(StoreError),
}

/// Storage for blobs addressed by relative references like `uploads/x.png`
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, reference: &str, bytes: &[u8]) -> io::Result<()>;
    async fn remove(&self, reference: &str) -> io::Result<()>;
    async fn exists(&self, reference: &str) -> bool;
}

/// Rejects references that could escape the upload directory
pub fn validate_reference(reference: &str) -> Result<(), MediaError> {
    let invalid = || MediaError::InvalidReference(reference.to_string());

    let rest = reference.strip_prefix(UPLOAD_PREFIX).ok_or_else(invalid)?;
    if rest.is_empty() || reference.contains('\\') {
        return Err(invalid());
    }

    let clean_segments = rest.split('/').all(|s| !s.is_empty() && s != "." && s != "..");
    if !clean_segments {
        return Err(invalid());
    }
    Ok(())
}

/// Blobs as files below a root directory
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &str) -> io::Result<PathBuf> {
        validate_reference(reference).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        Ok(self.root.join(reference))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, reference: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.resolve(reference)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await
    }

    async fn remove(&self, reference: &str) -> io::Result<()> {
        let path = self.resolve(reference)?;
        tokio::fs::remove_file(&path).await
    }

    async fn exists(&self, reference: &str) -> bool {
        match self.resolve(reference) {
            Ok(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// Keeps `[A-Za-z0-9._-]` and replaces everything else. Leading dots are
/// stripped and over-long names are shortened.
pub fn sanitize_file_name(original: &str) -> String {
    // Browsers on some platforms send the full client path
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        cap_length(trimmed)
    }
}

/// Longest sanitized name kept; the unique prefix must still fit a 255-byte file name
pub const MAX_FILE_NAME_LEN: usize = 100;

const MAX_EXTENSION_LEN: usize = 16;

/// Shortens the stem of `name` so the whole name fits, keeping a short extension
fn cap_length(name: &str) -> String {
    if name.len() <= MAX_FILE_NAME_LEN {
        return name.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_LEN => name.split_at(dot),
        _ => (name, ""),
    };

    let mut end = MAX_FILE_NAME_LEN - extension.len();
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &stem[..end], extension)
}

/// `<unix-nanos>_<8 hex>_<sanitized name>`
pub fn unique_name(original: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let nonce = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", nanos, &nonce[..8], sanitize_file_name(original))
}

#[derive(Clone)]
pub struct MediaManager {
    blobs: Arc<dyn BlobStore>,
}

impl MediaManager {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Writes a new blob and returns its reference
    pub async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let reference = format!("{}{}", UPLOAD_PREFIX, unique_name(file_name));
        self.blobs.put(&reference, bytes).await?;
        tracing::debug!(bytes = bytes.len(), "Stored blob {}", reference);
        Ok(reference)
    }

    /// Swaps the blob behind a reference-holding row.
    ///
    /// `commit` receives the new reference and must persist it. On commit
    /// failure the new blob is removed and the old reference stays valid.
    pub async fn replace<F, Fut>(
        &self,
        existing: Option<&str>,
        file_name: &str,
        bytes: &[u8],
        commit: F,
    ) -> Result<String, MediaError>
    where
        F: FnOnce(String) -> Fut + Send,
        Fut: Future<Output = Result<(), StoreError>> + Send,
    {
        let reference = self.store(file_name, bytes).await?;

        if let Err(e) = commit(reference.clone()).await {
            tracing::warn!("Commit of {} failed, discarding new blob: {}", reference, e);
            if let Err(cleanup) = self.blobs.remove(&reference).await {
                tracing::error!("Could not remove uncommitted blob {}: {}", reference, cleanup);
            }
            return Err(MediaError::Store(e));
        }

        if let Some(old) = existing.filter(|old| !old.is_empty() && *old != reference) {
            self.delete(old).await;
        }

        Ok(reference)
    }

    /// Best-effort removal. Failures are logged, never returned.
    pub async fn delete(&self, reference: &str) {
        if let Err(e) = validate_reference(reference) {
            tracing::warn!("Skipping blob delete: {}", e);
            return;
        }

        match self.blobs.remove(reference).await {
            Ok(()) => tracing::debug!("Deleted blob {}", reference),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("Blob {} already gone", reference)
            }
            Err(e) => tracing::error!("Failed to delete blob {}: {}", reference, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FlakyBlobStore;
    use tempfile::TempDir;

    fn fs_manager() -> (TempDir, Arc<FsBlobStore>, MediaManager) {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(FsBlobStore::new(dir.path()));
        let manager = MediaManager::new(blobs.clone());
        (dir, blobs, manager)
    }

    #[test]
    fn references_must_stay_under_uploads() {
        assert!(validate_reference("uploads/1_abcd1234_a.png").is_ok());

        for bad in [
            "",
            "uploads/",
            "/etc/passwd",
            "uploads/../secret",
            "uploads/./a.png",
            "images/a.png",
            "uploads\\..\\a",
            "https://cdn.example.com/a.png",
        ] {
            assert!(
                matches!(validate_reference(bad), Err(MediaError::InvalidReference(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("house front.JPG"), "house_front.JPG");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\pic.png"), "pic.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("..."), "file");
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name("dom\u{e9}.png"), "dom_.png");
    }

    #[test]
    fn long_file_names_are_shortened() {
        let name = sanitize_file_name(&format!("{}.jpg", "a".repeat(240)));
        assert_eq!(name.len(), MAX_FILE_NAME_LEN);
        assert!(name.ends_with("aaaa.jpg"));

        let no_extension = sanitize_file_name(&"b".repeat(300));
        assert_eq!(no_extension, "b".repeat(MAX_FILE_NAME_LEN));

        let exact = "c".repeat(MAX_FILE_NAME_LEN);
        assert_eq!(sanitize_file_name(&exact), exact);
    }

    #[tokio::test]
    async fn store_accepts_long_client_names() {
        let (_dir, blobs, media) = fs_manager();
        let reference = media
            .store(&format!("{}.jpg", "a".repeat(240)), b"x")
            .await
            .unwrap();

        assert!(reference.ends_with(".jpg"));
        assert!(reference.len() - UPLOAD_PREFIX.len() < 255);
        assert!(blobs.exists(&reference).await);
    }

    #[test]
    fn unique_names_do_not_collide() {
        let a = unique_name("a.png");
        let b = unique_name("a.png");
        assert_ne!(a, b);
        assert!(a.ends_with("_a.png"));
        assert_eq!(a.split('_').nth(1).map(str::len), Some(8));
    }

    #[tokio::test]
    async fn store_writes_under_uploads() {
        let (dir, blobs, media) = fs_manager();
        let reference = media.store("front.png", b"png").await.unwrap();

        assert!(reference.starts_with(UPLOAD_PREFIX));
        assert!(blobs.exists(&reference).await);
        assert_eq!(std::fs::read(dir.path().join(&reference)).unwrap(), b"png");
    }

    #[tokio::test]
    async fn replace_commits_then_drops_old_blob() {
        let (_dir, blobs, media) = fs_manager();
        let old = media.store("old.png", b"old").await.unwrap();

        let new = media
            .replace(Some(&old), "new.png", b"new", |_reference| async { Ok(()) })
            .await
            .unwrap();

        assert_ne!(new, old);
        assert!(blobs.exists(&new).await);
        assert!(!blobs.exists(&old).await);
    }

    #[tokio::test]
    async fn failed_commit_keeps_old_and_discards_new() {
        let (dir, blobs, media) = fs_manager();
        let old = media.store("old.png", b"old").await.unwrap();

        let err = media
            .replace(Some(&old), "new.png", b"new", |_reference| async {
                Err(StoreError::Backend("connection reset".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::Store(_)));
        assert!(blobs.exists(&old).await);
        let remaining: Vec<_> = std::fs::read_dir(dir.path().join("uploads")).unwrap().collect();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn failed_write_never_commits() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(FlakyBlobStore::new(FsBlobStore::new(dir.path())).failing_puts(|_| true));
        let media = MediaManager::new(blobs);

        let mut committed = false;
        let result = media
            .replace(None, "a.png", b"a", |_reference| {
                committed = true;
                async { Ok(()) }
            })
            .await;

        assert!(matches!(result, Err(MediaError::Io(_))));
        assert!(!committed);
    }

    #[tokio::test]
    async fn old_blob_cleanup_failure_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let inner = FsBlobStore::new(dir.path());
        let blobs = Arc::new(FlakyBlobStore::new(inner).failing_removes(|_| true));
        let media = MediaManager::new(blobs.clone());
        let old = media.store("old.png", b"old").await.unwrap();

        let new = media
            .replace(Some(&old), "new.png", b"new", |_reference| async { Ok(()) })
            .await
            .unwrap();

        assert!(blobs.exists(&new).await);
        assert!(blobs.exists(&old).await);
    }

    #[tokio::test]
    async fn delete_tolerates_missing_and_foreign_references() {
        let (_dir, _blobs, media) = fs_manager();
        media.delete("uploads/never_written.png").await;
        media.delete("../outside.png").await;
        media.delete("").await;
    }
}
