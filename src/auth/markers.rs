//! Sentinel marker files gating folder access and downloads.
//!
//! A folder is password-protected when it contains a child named
//! [`PASSWORD_MARKER`]; the marker's text content is the secret. Bulk
//! download is enabled when a child named [`DOWNLOAD_MARKER`] exists and its
//! content normalizes to `"true"`. The two gates are independent: a folder
//! can be downloadable without being password-protected and vice versa.

use std::sync::Arc;

use crate::drive::{DriveClient, FetchError, FileEntry};
use crate::retry::{RetryPolicy, retry_with_backoff};

/// Password gate marker, a text child of the folder.
pub const PASSWORD_MARKER: &str = "password.txt";

/// Download gate marker, a text child of the folder.
pub const DOWNLOAD_MARKER: &str = "download.txt";

/// Strips every whitespace character from `raw`.
///
/// Both sides of every marker comparison pass through this. The rule is
/// deliberately looser than byte equality so secrets copied with stray
/// spaces or a trailing newline still match; it is a usability rule, not a
/// security property.
#[must_use]
pub fn normalize_secret(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Whether download-marker content enables downloads.
///
/// The content must equal `true` after whitespace stripping, compared
/// ASCII-case-insensitively: `"  TRUE\n"` counts, `"yes"` does not.
#[must_use]
pub fn marker_enables_download(content: &str) -> bool {
    normalize_secret(content).eq_ignore_ascii_case("true")
}

/// Locates the password marker of `folder_id`, if any.
pub(crate) async fn find_password_marker(
    client: &Arc<DriveClient>,
    policy: &RetryPolicy,
    folder_id: &str,
) -> Result<Option<FileEntry>, FetchError> {
    retry_with_backoff(policy, || {
        let client = Arc::clone(client);
        async move { client.find_child(folder_id, PASSWORD_MARKER, None).await }
    })
    .await
}

/// Evaluates the download-permission marker of `folder_id`.
///
/// A folder without the marker is not downloadable.
///
/// # Errors
///
/// Returns [`FetchError`] when the marker lookup or its content fetch fails
/// after retries.
pub async fn download_enabled(
    client: &Arc<DriveClient>,
    policy: &RetryPolicy,
    folder_id: &str,
) -> Result<bool, FetchError> {
    let marker = retry_with_backoff(policy, || {
        let client = Arc::clone(client);
        async move { client.find_child(folder_id, DOWNLOAD_MARKER, None).await }
    })
    .await?;
    let Some(marker) = marker else {
        return Ok(false);
    };
    let content = retry_with_backoff(policy, || {
        let client = Arc::clone(client);
        let id = marker.id.clone();
        async move { client.fetch_text(&id).await }
    })
    .await?;
    Ok(marker_enables_download(&content))
}
