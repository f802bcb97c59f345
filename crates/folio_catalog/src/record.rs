//! Book records and the last-writer-wins merge rule.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Content hash identifying a book across devices.
///
/// The hash is derived from the book's content, not its metadata, so
/// the same book imported on two devices resolves to the same identity.
/// It never changes and is the sole join key between local and remote
/// records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookHash(String);

impl BookHash {
    /// Creates a hash from an existing digest string.
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Computes the hash of raw book content.
    #[must_use]
    pub fn of_bytes(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self(digest.iter().map(|byte| format!("{byte:02x}")).collect())
    }

    /// Returns the digest string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One catalog entry.
///
/// All timestamps are logical, in milliseconds. Records are
/// soft-deleted by setting `deleted_at`; physical removal is the
/// storage layer's concern, never the sync core's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Content hash. Never changes after import.
    pub hash: BookHash,
    /// Logical last-modified timestamp.
    pub updated_at: u64,
    /// Tombstone timestamp, set on soft delete.
    pub deleted_at: Option<u64>,
    /// Set once the remote copy of this book exists.
    pub uploaded_at: Option<u64>,
    /// Set once a local cover asset has been materialized.
    pub cover_downloaded_at: Option<u64>,
    /// Local cache reference for the cover asset.
    pub cover_image_url: Option<String>,
    /// Descriptive metadata: title, author, language, and so on.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl BookRecord {
    /// Creates a record with the given identity and timestamp.
    pub fn new(hash: BookHash, updated_at: u64) -> Self {
        Self {
            hash,
            updated_at,
            deleted_at: None,
            uploaded_at: None,
            cover_downloaded_at: None,
            cover_image_url: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Sets a descriptive metadata field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true if the record carries a tombstone.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true once the remote copy of this record exists.
    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        self.uploaded_at.is_some()
    }

    /// Bumps the logical modification timestamp.
    pub fn touch(&mut self, timestamp: u64) {
        self.updated_at = timestamp;
    }

    /// Soft-deletes the record at the given timestamp.
    pub fn tombstone(&mut self, timestamp: u64) {
        self.deleted_at = Some(timestamp);
        self.updated_at = timestamp;
    }

    /// Merges a matched local/remote pair with whole-record
    /// last-writer-wins.
    ///
    /// The side with the greater `updated_at` wins wholesale: its
    /// defined values override the other side's key by key, and the
    /// metadata maps are unioned with the winner's entries taking
    /// precedence. A tie keeps the local side. This is a shallow merge;
    /// individual fields carry no timestamps of their own.
    #[must_use]
    pub fn merged(local: &BookRecord, remote: &BookRecord) -> BookRecord {
        if remote.updated_at > local.updated_at {
            overlay(local, remote)
        } else {
            overlay(remote, local)
        }
    }
}

/// Overlays `winner` on top of `loser`: the winner's defined values
/// take precedence, the loser fills the gaps.
fn overlay(loser: &BookRecord, winner: &BookRecord) -> BookRecord {
    let mut metadata = loser.metadata.clone();
    metadata.extend(winner.metadata.clone());

    BookRecord {
        hash: winner.hash.clone(),
        updated_at: winner.updated_at,
        deleted_at: winner.deleted_at.or(loser.deleted_at),
        uploaded_at: winner.uploaded_at.or(loser.uploaded_at),
        cover_downloaded_at: winner.cover_downloaded_at.or(loser.cover_downloaded_at),
        cover_image_url: winner
            .cover_image_url
            .clone()
            .or_else(|| loser.cover_image_url.clone()),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(hash: &str, updated_at: u64) -> BookRecord {
        BookRecord::new(BookHash::new(hash), updated_at)
    }

    #[test]
    fn hash_of_bytes_is_stable() {
        let a = BookHash::of_bytes(b"some book content");
        let b = BookHash::of_bytes(b"some book content");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_distinguishes_content() {
        assert_ne!(BookHash::of_bytes(b"alpha"), BookHash::of_bytes(b"beta"));
    }

    #[test]
    fn tombstone_bumps_updated_at() {
        let mut rec = record("a", 10);
        rec.tombstone(25);
        assert!(rec.is_deleted());
        assert_eq!(rec.deleted_at, Some(25));
        assert_eq!(rec.updated_at, 25);
    }

    #[test]
    fn newer_remote_wins_wholesale() {
        let local = record("a", 100)
            .with_field("title", json!("Local Title"))
            .with_field("notes", json!("kept from local"));
        let mut remote = record("a", 200)
            .with_field("title", json!("Remote Title"))
            .with_field("author", json!("Remote Author"));
        remote.uploaded_at = Some(150);

        let merged = BookRecord::merged(&local, &remote);
        assert_eq!(merged.updated_at, 200);
        assert!(merged.is_uploaded());
        assert_eq!(merged.uploaded_at, Some(150));
        assert_eq!(merged.metadata["title"], json!("Remote Title"));
        assert_eq!(merged.metadata["author"], json!("Remote Author"));
        // Union: keys only the loser defines survive.
        assert_eq!(merged.metadata["notes"], json!("kept from local"));
    }

    #[test]
    fn older_remote_loses_but_fills_gaps() {
        let mut local = record("a", 300);
        local.cover_downloaded_at = Some(280);
        let mut remote = record("a", 200);
        remote.uploaded_at = Some(150);
        remote.cover_image_url = Some("covers/a.jpg".into());

        let merged = BookRecord::merged(&local, &remote);
        assert_eq!(merged.updated_at, 300);
        assert_eq!(merged.cover_downloaded_at, Some(280));
        // Fields the local side never defined come from the remote.
        assert_eq!(merged.uploaded_at, Some(150));
        assert_eq!(merged.cover_image_url.as_deref(), Some("covers/a.jpg"));
    }

    #[test]
    fn tie_keeps_local() {
        let local = record("a", 100).with_field("title", json!("Local"));
        let remote = record("a", 100).with_field("title", json!("Remote"));
        let merged = BookRecord::merged(&local, &remote);
        assert_eq!(merged.metadata["title"], json!("Local"));
    }

    #[test]
    fn newer_tombstone_propagates() {
        let local = record("a", 100);
        let mut remote = record("a", 200);
        remote.tombstone(200);

        let merged = BookRecord::merged(&local, &remote);
        assert!(merged.is_deleted());
        assert_eq!(merged.deleted_at, Some(200));
    }

    #[test]
    fn merge_is_idempotent() {
        let local = record("a", 100).with_field("title", json!("Local"));
        let remote = record("a", 200).with_field("title", json!("Remote"));

        let once = BookRecord::merged(&local, &remote);
        let twice = BookRecord::merged(&once, &remote);
        assert_eq!(once, twice);
    }
}
