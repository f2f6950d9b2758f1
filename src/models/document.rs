//! Represents an uploaded API description and its stored revisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A hosted OpenAPI/Swagger document.
///
/// Visible to readers only while `is_active` is set and `expires_at` lies in
/// the future, regardless of whether the record still exists in the store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Document {
    /// Random identifier (UUID without dashes).
    pub id: String,

    pub name: String,

    pub description: String,

    pub created_at: DateTime<Utc>,

    /// Fixed lifetime policy: `created_at` + document TTL.
    pub expires_at: DateTime<Utc>,

    /// Soft-delete flag. Cleared once, never set again.
    pub is_active: bool,

    /// Public share slug, assigned at most once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_slug: Option<String>,

    /// Loaded from version records on read; never persisted with the document.
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl Document {
    /// Whether readers may see this document at `now`.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expires_at
    }

    /// The version currently flagged as latest, if any.
    pub fn latest_version(&self) -> Option<&Version> {
        self.versions.iter().find(|v| v.is_latest)
    }

    /// Look up a version by its human label.
    pub fn find_version(&self, label: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.version == label)
    }
}

/// One stored revision of a document's content.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Version {
    /// Unique record id (UUID).
    pub id: String,

    pub document_id: String,

    /// Human label, e.g. `v1` or a user-supplied string.
    pub version: String,

    /// Location of the bytes, as returned by the storage service.
    pub file_path: PathBuf,

    pub created_at: DateTime<Utc>,

    /// Exactly one version per document carries this flag.
    pub is_latest: bool,
}

impl Version {
    /// Numeric suffix of an auto-generated `vN` label (`v12` → 12,
    /// `v3-beta` → 3). Custom labels without a leading `v<digits>` yield `None`.
    pub fn label_number(&self) -> Option<u64> {
        let rest = self.version.strip_prefix('v')?;
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}
