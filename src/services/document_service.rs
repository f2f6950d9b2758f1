//! src/services/document_service.rs
//!
//! DocumentService: owns the document/version lifecycle on top of a
//! [`KeyValueStore`] (records) and a [`StorageService`] (bytes).
//!
//! Key layout:
//! - `document:{id}`                 document record, TTL = time left until expiry
//! - `version:{document_id}:{id}`    version record, same TTL as its document
//! - `share:{slug}`                  document id claimed by a share slug
//! - `active_documents`              set of ids that have not been deleted
//!
//! Mutations of one document are serialized through a per-document async
//! mutex, so "demote all, then add one latest" cannot interleave within a
//! process.

use crate::{
    models::document::{Document, Version},
    services::{
        kv_store::{KeyValueStore, StoreError},
        storage_service::{StorageError, StorageService},
    },
};
use chrono::{DateTime, Duration, Utc};
use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

const ACTIVE_DOCUMENTS_KEY: &str = "active_documents";
pub const DEFAULT_DOCUMENT_TTL_DAYS: i64 = 30;
pub const DEFAULT_MAX_VERSIONS: usize = 20;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document `{0}` not found or expired")]
    DocumentNotFound(String),
    #[error("version `{version}` not found for document `{document_id}`")]
    VersionNotFound { document_id: String, version: String },
    #[error("share link already set for document `{0}`")]
    SlugAlreadySet(String),
    #[error("share slug `{0}` is already taken")]
    SlugTaken(String),
    #[error("version `{0}` already exists")]
    VersionExists(String),
    #[error("document already has the maximum of {0} versions")]
    VersionLimitReached(usize),
    #[error("record `{key}` could not be encoded or decoded: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Lifecycle knobs supplied by configuration.
#[derive(Debug, Clone)]
pub struct DocumentPolicy {
    pub document_ttl: Duration,
    pub max_versions: usize,
}

impl Default for DocumentPolicy {
    fn default() -> Self {
        Self {
            document_ttl: Duration::days(DEFAULT_DOCUMENT_TTL_DAYS),
            max_versions: DEFAULT_MAX_VERSIONS,
        }
    }
}

/// DocumentService is the sole writer of lifecycle fields:
/// - create / fetch / soft-delete documents
/// - add, list and delete versions while keeping exactly one latest
/// - assign share slugs
#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn KeyValueStore>,
    storage: StorageService,
    policy: DocumentPolicy,
    locks: LockMap,
}

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Held while one document is being mutated. Dropping the last holder
/// removes the document's entry from the lock map.
struct DocumentLock {
    id: String,
    locks: LockMap,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        // One reference in the map, one here; anything more is a waiter.
        let idle = Arc::strong_count(&self.lock) <= 2;
        let ours = locks
            .get(&self.id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock));
        if idle && ours {
            locks.remove(&self.id);
        }
    }
}

fn document_key(id: &str) -> String {
    format!("document:{}", id)
}

fn version_key(document_id: &str, version_id: &str) -> String {
    format!("version:{}:{}", document_id, version_id)
}

fn version_pattern(document_id: &str) -> String {
    format!("version:{}:*", document_id)
}

fn share_key(slug: &str) -> String {
    format!("share:{}", slug)
}

/// Time left until `expires_at`, as a store TTL.
fn remaining_ttl(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (expires_at - now).to_std().unwrap_or_default()
}

/// Next free `vN` label: one past the highest numeric suffix in use.
///
/// When that would overflow (a custom `v18446744073709551615`), the lowest
/// unused number is taken instead.
pub fn next_version_label(existing: &[Version]) -> String {
    let used: HashSet<u64> = existing.iter().filter_map(Version::label_number).collect();
    let next = used
        .iter()
        .max()
        .copied()
        .unwrap_or(0)
        .checked_add(1)
        .or_else(|| (1..u64::MAX).find(|n| !used.contains(n)))
        .unwrap_or(u64::MAX);
    format!("v{}", next)
}

impl DocumentService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        storage: StorageService,
        policy: DocumentPolicy,
    ) -> Self {
        Self {
            store,
            storage,
            policy,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn policy(&self) -> &DocumentPolicy {
        &self.policy
    }

    /// Acquire the mutation lock for one document.
    async fn lock_document(&self, id: &str) -> DocumentLock {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            locks
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.clone().lock_owned().await;
        DocumentLock {
            id: id.to_string(),
            locks: self.locks.clone(),
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Persist a document record without its version list.
    async fn save_document(&self, doc: &Document) -> DocumentResult<()> {
        let mut record = doc.clone();
        record.versions.clear();
        let json = serde_json::to_string(&record).map_err(|source| DocumentError::Codec {
            key: document_key(&doc.id),
            source,
        })?;
        let ttl = remaining_ttl(doc.expires_at, Utc::now());
        self.store
            .set(&document_key(&doc.id), &json, Some(ttl))
            .await?;
        Ok(())
    }

    async fn save_version(&self, version: &Version, ttl: std::time::Duration) -> DocumentResult<()> {
        let key = version_key(&version.document_id, &version.id);
        let json = serde_json::to_string(version)
            .map_err(|source| DocumentError::Codec { key: key.clone(), source })?;
        self.store.set(&key, &json, Some(ttl)).await?;
        Ok(())
    }

    /// Fetch the raw record, applying the visibility rule.
    async fn load_document(&self, id: &str) -> DocumentResult<Document> {
        let key = document_key(id);
        let json = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| DocumentError::DocumentNotFound(id.to_string()))?;
        let doc: Document =
            serde_json::from_str(&json).map_err(|source| DocumentError::Codec { key, source })?;
        if !doc.is_visible_at(Utc::now()) {
            return Err(DocumentError::DocumentNotFound(id.to_string()));
        }
        Ok(doc)
    }

    /// Create an empty, active document that expires after the configured TTL.
    pub async fn create_document(&self, name: &str, description: &str) -> DocumentResult<Document> {
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: now,
            expires_at: now + self.policy.document_ttl,
            is_active: true,
            share_slug: None,
            versions: Vec::new(),
        };

        self.save_document(&doc).await?;
        self.store.set_add(ACTIVE_DOCUMENTS_KEY, &doc.id).await?;

        info!("created document {} ({})", doc.id, doc.name);
        Ok(doc)
    }

    /// Fetch a visible document with its versions attached.
    ///
    /// Inactive or expired documents are reported as not found even if the
    /// record still sits in the store.
    pub async fn get_document_by_id(&self, id: &str) -> DocumentResult<Document> {
        let mut doc = self.load_document(id).await?;
        doc.versions = self.list_versions(id).await?;
        Ok(doc)
    }

    /// Resolve a share slug to its document.
    pub async fn get_document_by_slug(&self, slug: &str) -> DocumentResult<Document> {
        let id = self
            .store
            .get(&share_key(slug))
            .await?
            .ok_or_else(|| DocumentError::DocumentNotFound(slug.to_string()))?;
        self.get_document_by_id(&id).await
    }

    /// All version records of a document, oldest first. Records that fail to
    /// decode or vanish between scan and read are skipped.
    pub async fn list_versions(&self, document_id: &str) -> DocumentResult<Vec<Version>> {
        let keys = self.store.keys(&version_pattern(document_id)).await?;
        let mut versions = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(json) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<Version>(&json) {
                Ok(version) => versions.push(version),
                Err(err) => debug!("skipping undecodable version record {}: {}", key, err),
            }
        }
        versions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(versions)
    }

    /// Record a new latest version pointing at `file_path`.
    ///
    /// Every existing version is demoted first. An empty `custom_label`
    /// selects the next free `vN` label.
    pub async fn add_version(
        &self,
        document_id: &str,
        file_path: PathBuf,
        custom_label: &str,
    ) -> DocumentResult<Version> {
        let _guard = self.lock_document(document_id).await;
        let doc = self.load_document(document_id).await?;
        let existing = self.list_versions(document_id).await?;
        let label = if custom_label.is_empty() {
            next_version_label(&existing)
        } else {
            custom_label.to_string()
        };
        self.add_version_locked(&doc, existing, file_path, label).await
    }

    /// Store `content` as a new version and record it, as one serialized step.
    ///
    /// Rejects duplicate custom labels and uploads past the version limit.
    /// If the record cannot be written, the freshly stored file is removed.
    pub async fn upload_version(
        &self,
        document_id: &str,
        custom_label: &str,
        content: &[u8],
    ) -> DocumentResult<Version> {
        let _guard = self.lock_document(document_id).await;
        let doc = self.load_document(document_id).await?;
        let existing = self.list_versions(document_id).await?;

        if existing.len() >= self.policy.max_versions {
            return Err(DocumentError::VersionLimitReached(self.policy.max_versions));
        }

        let label = if custom_label.is_empty() {
            next_version_label(&existing)
        } else {
            if existing.iter().any(|v| v.version == custom_label) {
                return Err(DocumentError::VersionExists(custom_label.to_string()));
            }
            custom_label.to_string()
        };

        let file_path = self.storage.save(document_id, &label, content).await?;
        match self
            .add_version_locked(&doc, existing, file_path.clone(), label)
            .await
        {
            Ok(version) => Ok(version),
            Err(err) => {
                if let Err(cleanup) = self.storage.delete_file(&file_path).await {
                    warn!("failed to remove orphaned file {}: {}", file_path.display(), cleanup);
                }
                Err(err)
            }
        }
    }

    async fn add_version_locked(
        &self,
        doc: &Document,
        existing: Vec<Version>,
        file_path: PathBuf,
        label: String,
    ) -> DocumentResult<Version> {
        let now = Utc::now();
        let ttl = remaining_ttl(doc.expires_at, now);

        for mut version in existing {
            version.is_latest = false;
            self.save_version(&version, ttl).await?;
        }

        let version = Version {
            id: Uuid::new_v4().to_string(),
            document_id: doc.id.clone(),
            version: label,
            file_path,
            created_at: now,
            is_latest: true,
        };
        self.save_version(&version, ttl).await?;

        info!("document {} now at version {}", doc.id, version.version);
        Ok(version)
    }

    /// Remove one version record by label and return it so the caller can
    /// delete the underlying file. If it was the latest, the newest remaining
    /// version takes over the flag.
    pub async fn delete_version(
        &self,
        document_id: &str,
        label: &str,
    ) -> DocumentResult<Version> {
        let _guard = self.lock_document(document_id).await;
        let doc = self.load_document(document_id).await?;
        let versions = self.list_versions(document_id).await?;

        let (removed, remaining): (Vec<Version>, Vec<Version>) =
            versions.into_iter().partition(|v| v.version == label);
        let Some(removed) = removed.into_iter().next() else {
            return Err(DocumentError::VersionNotFound {
                document_id: document_id.to_string(),
                version: label.to_string(),
            });
        };

        self.store
            .delete(&version_key(document_id, &removed.id))
            .await?;

        if removed.is_latest {
            if let Some(mut newest) = remaining.into_iter().last() {
                newest.is_latest = true;
                let ttl = remaining_ttl(doc.expires_at, Utc::now());
                self.save_version(&newest, ttl).await?;
            }
        }

        info!("deleted version {} of document {}", label, document_id);
        Ok(removed)
    }

    /// Soft-delete: clear `is_active`, keep the record until its TTL fires and
    /// drop the id from the active index. Files are the caller's concern.
    pub async fn delete_document(&self, id: &str) -> DocumentResult<()> {
        let _guard = self.lock_document(id).await;
        let mut doc = self.load_document(id).await?;
        doc.is_active = false;
        self.save_document(&doc).await?;
        self.store.set_remove(ACTIVE_DOCUMENTS_KEY, id).await?;

        info!("deleted document {}", id);
        Ok(())
    }

    /// Assign a share slug once. The slug claim expires with the document.
    pub async fn set_share_slug(&self, document: &Document, slug: &str) -> DocumentResult<Document> {
        let _guard = self.lock_document(&document.id).await;
        let mut doc = self.load_document(&document.id).await?;
        if doc.share_slug.is_some() {
            return Err(DocumentError::SlugAlreadySet(doc.id));
        }

        let ttl = remaining_ttl(doc.expires_at, Utc::now());
        let claimed = self
            .store
            .set_if_absent(&share_key(slug), &doc.id, Some(ttl))
            .await?;
        if !claimed {
            return Err(DocumentError::SlugTaken(slug.to_string()));
        }

        doc.share_slug = Some(slug.to_string());
        if let Err(err) = self.save_document(&doc).await {
            let _ = self.store.delete(&share_key(slug)).await;
            return Err(err);
        }

        doc.versions = document.versions.clone();
        info!("document {} shared as {}", doc.id, slug);
        Ok(doc)
    }

    /// Ids currently in the active-documents index.
    pub async fn active_document_ids(&self) -> DocumentResult<Vec<String>> {
        Ok(self.store.set_members(ACTIVE_DOCUMENTS_KEY).await?)
    }

    /// Read a version's bytes.
    pub async fn read_version(&self, version: &Version) -> DocumentResult<Vec<u8>> {
        Ok(self.storage.read(&version.file_path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::kv_store::MemoryStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<MemoryStore>,
        service: DocumentService,
    }

    fn fixture() -> Fixture {
        fixture_with(DocumentPolicy::default())
    }

    fn fixture_with(policy: DocumentPolicy) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let service = DocumentService::new(
            store.clone(),
            StorageService::new(dir.path()),
            policy,
        );
        Fixture {
            _dir: dir,
            store,
            service,
        }
    }

    fn latest_count(doc: &Document) -> usize {
        doc.versions.iter().filter(|v| v.is_latest).count()
    }

    #[tokio::test]
    async fn create_document_sets_lifecycle_fields() {
        let fx = fixture();
        let doc = fx.service.create_document("Petstore", "demo").await.unwrap();

        assert_eq!(doc.id.len(), 32);
        assert!(!doc.id.contains('-'));
        assert!(doc.is_active);
        assert!(doc.versions.is_empty());
        assert_eq!(doc.expires_at - doc.created_at, Duration::days(30));
        assert_eq!(
            fx.service.active_document_ids().await.unwrap(),
            vec![doc.id.clone()]
        );

        let fetched = fx.service.get_document_by_id(&doc.id).await.unwrap();
        assert_eq!(fetched, doc);
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let fx = fixture();
        assert!(matches!(
            fx.service.get_document_by_id("nope").await,
            Err(DocumentError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn auto_labels_increment_with_single_latest() {
        let fx = fixture();
        let doc = fx.service.create_document("d", "").await.unwrap();

        for expected in ["v1", "v2", "v3"] {
            let version = fx
                .service
                .add_version(&doc.id, PathBuf::from(format!("/tmp/{expected}.yaml")), "")
                .await
                .unwrap();
            assert_eq!(version.version, expected);
            assert!(version.is_latest);

            let loaded = fx.service.get_document_by_id(&doc.id).await.unwrap();
            assert_eq!(latest_count(&loaded), 1);
            assert_eq!(loaded.latest_version().unwrap().version, expected);
        }

        let loaded = fx.service.get_document_by_id(&doc.id).await.unwrap();
        let labels: Vec<_> = loaded.versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(labels, vec!["v1", "v2", "v3"]);
    }

    #[tokio::test]
    async fn auto_label_skips_past_custom_and_gaps() {
        let fx = fixture();
        let doc = fx.service.create_document("d", "").await.unwrap();
        fx.service
            .add_version(&doc.id, PathBuf::from("/a"), "release-candidate")
            .await
            .unwrap();
        let v = fx.service.add_version(&doc.id, PathBuf::from("/b"), "").await.unwrap();
        assert_eq!(v.version, "v1");
        fx.service.add_version(&doc.id, PathBuf::from("/c"), "v7").await.unwrap();
        let v = fx.service.add_version(&doc.id, PathBuf::from("/d"), "").await.unwrap();
        assert_eq!(v.version, "v8");
    }

    #[tokio::test]
    async fn expired_document_is_hidden_while_record_remains() {
        let fx = fixture();
        let past = Utc::now() - Duration::days(31);
        let stale = Document {
            id: "stale0000".into(),
            name: "old".into(),
            description: String::new(),
            created_at: past,
            expires_at: past + Duration::days(30),
            is_active: true,
            share_slug: None,
            versions: vec![],
        };
        fx.store
            .set(
                &document_key(&stale.id),
                &serde_json::to_string(&stale).unwrap(),
                None,
            )
            .await
            .unwrap();

        assert!(fx.store.get(&document_key(&stale.id)).await.unwrap().is_some());
        assert!(matches!(
            fx.service.get_document_by_id(&stale.id).await,
            Err(DocumentError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn soft_delete_hides_document_but_keeps_versions() {
        let fx = fixture();
        let doc = fx.service.create_document("d", "").await.unwrap();
        let version = fx
            .service
            .add_version(&doc.id, PathBuf::from("/a"), "")
            .await
            .unwrap();

        fx.service.delete_document(&doc.id).await.unwrap();

        assert!(matches!(
            fx.service.get_document_by_id(&doc.id).await,
            Err(DocumentError::DocumentNotFound(_))
        ));
        assert!(fx.service.active_document_ids().await.unwrap().is_empty());
        assert!(
            fx.store
                .get(&version_key(&doc.id, &version.id))
                .await
                .unwrap()
                .is_some()
        );
        // No resurrection, and a second delete reports not found.
        assert!(matches!(
            fx.service.delete_document(&doc.id).await,
            Err(DocumentError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn undecodable_version_records_are_skipped() {
        let fx = fixture();
        let doc = fx.service.create_document("d", "").await.unwrap();
        fx.service.add_version(&doc.id, PathBuf::from("/a"), "").await.unwrap();
        fx.store
            .set(&version_key(&doc.id, "garbage"), "{not json", None)
            .await
            .unwrap();

        let loaded = fx.service.get_document_by_id(&doc.id).await.unwrap();
        assert_eq!(loaded.versions.len(), 1);
    }

    #[tokio::test]
    async fn delete_version_promotes_newest_remaining() {
        let fx = fixture();
        let doc = fx.service.create_document("d", "").await.unwrap();
        for _ in 0..3 {
            fx.service.add_version(&doc.id, PathBuf::from("/x"), "").await.unwrap();
        }

        let removed = fx.service.delete_version(&doc.id, "v3").await.unwrap();
        assert_eq!(removed.version, "v3");

        let loaded = fx.service.get_document_by_id(&doc.id).await.unwrap();
        assert_eq!(loaded.versions.len(), 2);
        assert_eq!(latest_count(&loaded), 1);
        assert_eq!(loaded.latest_version().unwrap().version, "v2");

        fx.service.delete_version(&doc.id, "v1").await.unwrap();
        let loaded = fx.service.get_document_by_id(&doc.id).await.unwrap();
        assert_eq!(loaded.latest_version().unwrap().version, "v2");

        assert!(matches!(
            fx.service.delete_version(&doc.id, "v9").await,
            Err(DocumentError::VersionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn upload_version_stores_bytes_and_enforces_rules() {
        let fx = fixture_with(DocumentPolicy {
            max_versions: 2,
            ..DocumentPolicy::default()
        });
        let doc = fx.service.create_document("d", "").await.unwrap();

        let v1 = fx.service.upload_version(&doc.id, "", b"one").await.unwrap();
        assert_eq!(v1.version, "v1");
        assert_eq!(fx.service.read_version(&v1).await.unwrap(), b"one");

        assert!(matches!(
            fx.service.upload_version(&doc.id, "v1", b"dup").await,
            Err(DocumentError::VersionExists(_))
        ));

        fx.service.upload_version(&doc.id, "beta", b"two").await.unwrap();
        assert!(matches!(
            fx.service.upload_version(&doc.id, "", b"three").await,
            Err(DocumentError::VersionLimitReached(2))
        ));
    }

    #[tokio::test]
    async fn upload_to_missing_document_writes_nothing() {
        let fx = fixture();
        assert!(matches!(
            fx.service.upload_version("abc", "", b"x").await,
            Err(DocumentError::DocumentNotFound(_))
        ));
        assert!(!fx._dir.path().join("abc").exists());
    }

    #[tokio::test]
    async fn concurrent_uploads_keep_one_latest() {
        let fx = fixture();
        let doc = fx.service.create_document("d", "").await.unwrap();

        let uploads = (0..8).map(|i| {
            let service = fx.service.clone();
            let id = doc.id.clone();
            let body = format!("rev {i}");
            tokio::spawn(async move { service.upload_version(&id, "", body.as_bytes()).await })
        });
        for result in futures::future::join_all(uploads).await {
            result.unwrap().unwrap();
        }

        let loaded = fx.service.get_document_by_id(&doc.id).await.unwrap();
        assert_eq!(loaded.versions.len(), 8);
        assert_eq!(latest_count(&loaded), 1);
        let mut labels: Vec<_> = loaded.versions.iter().map(|v| v.version.clone()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 8);
    }

    #[tokio::test]
    async fn share_slug_is_assigned_once_and_unique() {
        let fx = fixture();
        let first = fx.service.create_document("a", "").await.unwrap();
        let second = fx.service.create_document("b", "").await.unwrap();

        let shared = fx.service.set_share_slug(&first, "petstore").await.unwrap();
        assert_eq!(shared.share_slug.as_deref(), Some("petstore"));

        assert!(matches!(
            fx.service.set_share_slug(&first, "another").await,
            Err(DocumentError::SlugAlreadySet(_))
        ));
        assert!(matches!(
            fx.service.set_share_slug(&second, "petstore").await,
            Err(DocumentError::SlugTaken(_))
        ));

        let resolved = fx.service.get_document_by_slug("petstore").await.unwrap();
        assert_eq!(resolved.id, first.id);
        assert!(matches!(
            fx.service.get_document_by_slug("unknown").await,
            Err(DocumentError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn next_label_defaults_to_v1() {
        assert_eq!(next_version_label(&[]), "v1");
    }

    #[tokio::test]
    async fn auto_label_survives_largest_numeric_suffix() {
        let fx = fixture();
        let doc = fx.service.create_document("d", "").await.unwrap();
        fx.service
            .upload_version(&doc.id, "v18446744073709551615", b"max")
            .await
            .unwrap();

        let next = fx.service.upload_version(&doc.id, "", b"next").await.unwrap();
        assert_eq!(next.version, "v1");
        let after = fx.service.upload_version(&doc.id, "", b"after").await.unwrap();
        assert_eq!(after.version, "v2");
    }

    #[tokio::test]
    async fn lock_entries_are_released_after_use() {
        let fx = fixture();
        for i in 0..100 {
            let missing = format!("missing{i}");
            assert!(matches!(
                fx.service.upload_version(&missing, "", b"x").await,
                Err(DocumentError::DocumentNotFound(_))
            ));
        }
        assert_eq!(fx.service.tracked_locks(), 0);

        let doc = fx.service.create_document("d", "").await.unwrap();
        fx.service.upload_version(&doc.id, "", b"one").await.unwrap();
        fx.service.set_share_slug(&doc, "locks-demo").await.unwrap();
        assert_eq!(fx.service.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn waiting_uploads_keep_the_lock_entry_shared() {
        let fx = fixture();
        let doc = fx.service.create_document("d", "").await.unwrap();

        let held = fx.service.lock_document(&doc.id).await;
        let service = fx.service.clone();
        let id = doc.id.clone();
        let waiter = tokio::spawn(async move { service.upload_version(&id, "", b"w").await });
        tokio::task::yield_now().await;
        assert_eq!(fx.service.tracked_locks(), 1);

        drop(held);
        waiter.await.unwrap().unwrap();
        assert_eq!(fx.service.tracked_locks(), 0);
    }

    #[test]
    fn next_label_falls_back_to_lowest_free_number() {
        let make = |label: &str| Version {
            id: label.into(),
            document_id: "doc".into(),
            version: label.into(),
            file_path: PathBuf::from("/x"),
            created_at: Utc::now(),
            is_latest: false,
        };
        let existing = vec![make("v1"), make("v18446744073709551615"), make("v3")];
        assert_eq!(next_version_label(&existing), "v2");
        assert_eq!(next_version_label(&[make("v4")]), "v5");
        assert_eq!(next_version_label(&[]), "v1");
    }
}
