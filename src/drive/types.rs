//! Snapshot types and wire DTOs for the remote folder store.

use serde::{Deserialize, Serialize};

/// A single remote media file.
///
/// Immutable once fetched; thumbnail and raw-content URLs are derived
/// deterministically from `id` by
/// [`DriveClient`](crate::drive::DriveClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Opaque remote file id.
    pub id: String,
    /// Display name, extension not guaranteed.
    pub name: String,
}

/// A folder snapshot enriched for album browsing.
///
/// Read-only: re-fetched per visit, never mutated in place. Whether a folder
/// is password-protected does not change for the duration of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    /// Opaque remote folder id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Asset used as the album cover, when one could be resolved (a curated
    /// "cover" subfolder's first image wins over the folder's own first
    /// image).
    pub cover_asset_id: Option<String>,
    /// Whether a password marker gates access to the folder.
    pub password_protected: bool,
    /// Whether the download marker enables bulk download of the folder.
    pub download_enabled: bool,
}

/// Opaque continuation state for a paginated listing.
///
/// `token == None` means the start of the listing. `has_more` transitions
/// monotonically from `true` to `false` and never back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    /// Continuation token for the next page, if any.
    pub token: Option<String>,
    /// Whether another page may exist.
    pub has_more: bool,
}

impl PageCursor {
    /// Cursor positioned at the start of a listing.
    #[must_use]
    pub fn start() -> Self {
        Self {
            token: None,
            has_more: true,
        }
    }

    /// Advances past a fetched page carrying `token` as its continuation.
    ///
    /// A page without a continuation token marks the listing exhausted.
    pub fn advance(&mut self, token: Option<String>) {
        self.has_more = token.is_some();
        self.token = token;
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::start()
    }
}

/// Wire shape of a single listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Opaque remote file id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// MIME type as reported by the listing, when requested.
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Wire shape of one page of a listing response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    /// Entries on this page, in listing order.
    #[serde(default)]
    pub files: Vec<FileEntry>,
    /// Continuation token, present only when more pages exist.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl From<FileEntry> for MediaAsset {
    fn from(entry: FileEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_starts_open() {
        let cursor = PageCursor::start();
        assert_eq!(cursor.token, None);
        assert!(cursor.has_more);
    }

    #[test]
    fn test_cursor_advance_is_monotonic() {
        let mut cursor = PageCursor::start();
        cursor.advance(Some("t1".to_string()));
        assert!(cursor.has_more);
        assert_eq!(cursor.token.as_deref(), Some("t1"));

        cursor.advance(None);
        assert!(!cursor.has_more);
        assert_eq!(cursor.token, None);
    }

    #[test]
    fn test_file_list_deserializes_camel_case() {
        let json = r#"{
            "files": [{"id": "a1", "name": "one.jpg", "mimeType": "image/jpeg"}],
            "nextPageToken": "t1"
        }"#;
        let list: FileList = serde_json::from_str(json).unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].id, "a1");
        assert_eq!(list.files[0].mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(list.next_page_token.as_deref(), Some("t1"));
    }

    #[test]
    fn test_file_list_tolerates_missing_fields() {
        let list: FileList = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
        assert!(list.next_page_token.is_none());
    }
}
