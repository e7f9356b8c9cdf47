//! Remote folder store access.
//!
//! This module wraps the remote read-only file/folder listing service:
//! - [`DriveClient`] - the HTTP client (list children, fetch content,
//!   derive thumbnail/content URLs)
//! - [`ListQuery`] / [`EntryKind`] - listing query construction
//! - [`FetchError`] / [`ClientError`] - typed failures
//! - snapshot types ([`MediaAsset`], [`FolderNode`], [`PageCursor`]) and
//!   wire DTOs ([`FileEntry`], [`FileList`])

mod client;
mod error;
mod types;

pub use client::{
    DriveClient, EntryKind, FileContent, ListQuery, THUMB_WIDTH_BROWSE, THUMB_WIDTH_FULL,
    THUMB_WIDTH_GRID,
};
pub use error::{ClientError, FetchError};
pub use types::{FileEntry, FileList, FolderNode, MediaAsset, PageCursor};
