//! HTTP client for the remote folder store.
//!
//! The remote service is a read-only file/folder listing API. The engine
//! depends on exactly three query shapes: list the children of a folder
//! (optionally filtered by kind or exact name, paginated with an opaque
//! continuation token), fetch a file's raw content, and derive a
//! deterministic thumbnail URL from a file id and pixel width.
//!
//! The client is cheap to clone behind an [`Arc`](std::sync::Arc) and reuses
//! one connection pool for all requests. It performs no retries itself;
//! callers wrap operations in
//! [`retry_with_backoff`](crate::retry::retry_with_backoff).

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use super::error::{ClientError, FetchError};
use super::types::{FileEntry, FileList};
use crate::config::DriveConfig;

/// Thumbnail width used by the browsing mosaic.
pub const THUMB_WIDTH_BROWSE: u32 = 400;

/// Thumbnail width used by gallery grids and album covers.
pub const THUMB_WIDTH_GRID: u32 = 640;

/// Thumbnail width used by the full-size viewer.
pub const THUMB_WIDTH_FULL: u32 = 1920;

/// MIME type the remote store assigns to folders.
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Fields requested from every listing call.
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";

/// Which children a listing query should match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Media files (`mimeType contains 'image/'`).
    Image,
    /// Subfolders.
    Folder,
}

/// Parameters for a single list-children request.
///
/// Built fluently:
///
/// ```
/// use gallery_core::drive::ListQuery;
///
/// let query = ListQuery::children_of("folder-1").images().page_size(50);
/// ```
#[derive(Debug, Clone)]
pub struct ListQuery {
    parent: String,
    kind: Option<EntryKind>,
    name: Option<String>,
    page_size: Option<u32>,
    page_token: Option<String>,
}

impl ListQuery {
    /// Query for the children of `parent`.
    #[must_use]
    pub fn children_of(parent: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            kind: None,
            name: None,
            page_size: None,
            page_token: None,
        }
    }

    /// Restricts the query to media files.
    #[must_use]
    pub fn images(mut self) -> Self {
        self.kind = Some(EntryKind::Image);
        self
    }

    /// Restricts the query to subfolders.
    #[must_use]
    pub fn folders(mut self) -> Self {
        self.kind = Some(EntryKind::Folder);
        self
    }

    /// Restricts the query to children with this exact name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restricts the query to the given kind, when one is supplied.
    #[must_use]
    pub fn of_kind(mut self, kind: Option<EntryKind>) -> Self {
        self.kind = kind;
        self
    }

    /// Overrides the page size for this query.
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Continues a listing from `token`.
    #[must_use]
    pub fn page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }

    /// Returns the parent folder id this query lists.
    #[must_use]
    pub fn parent(&self) -> &str {
        &self.parent
    }

    /// Renders the query expression the listing API expects.
    fn to_expression(&self) -> String {
        let mut expr = format!("'{}' in parents", self.parent);
        if let Some(name) = &self.name {
            expr.push_str(&format!(" and name='{name}'"));
        }
        match self.kind {
            Some(EntryKind::Image) => expr.push_str(" and mimeType contains 'image/'"),
            Some(EntryKind::Folder) => expr.push_str(&format!(" and mimeType='{FOLDER_MIME_TYPE}'")),
            None => {}
        }
        expr
    }
}

/// Raw bytes of a fetched file plus the content type the server reported.
#[derive(Debug, Clone)]
pub struct FileContent {
    /// The file's bytes.
    pub bytes: Vec<u8>,
    /// `Content-Type` header value, when present.
    pub content_type: Option<String>,
}

/// HTTP client for the remote folder store.
///
/// # Example
///
/// ```no_run
/// use gallery_core::config::DriveConfig;
/// use gallery_core::drive::{DriveClient, ListQuery};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DriveClient::new(&DriveConfig::new("api-key"))?;
/// let page = client
///     .list_children(&ListQuery::children_of("folder-id").images())
///     .await?;
/// println!("{} entries", page.files.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: Client,
    api_base: String,
    thumbnail_base: String,
    api_key: String,
    page_size: u32,
}

impl DriveClient {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] when a configured base URL
    /// does not parse, and [`ClientError::Http`] when the underlying HTTP
    /// client cannot be built.
    #[instrument(skip(config), fields(api_base = %config.api_base))]
    pub fn new(config: &DriveConfig) -> Result<Self, ClientError> {
        let api_base = validated_base(&config.api_base)?;
        let thumbnail_base = validated_base(&config.thumbnail_base)?;
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()?;
        Ok(Self {
            http,
            api_base,
            thumbnail_base,
            api_key: config.api_key.clone(),
            page_size: config.page_size,
        })
    }

    /// Returns the configured default page size.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Lists one page of children matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the request fails, the server answers
    /// with a non-success status, or the body does not decode.
    #[instrument(skip(self, query), fields(parent = %query.parent()))]
    pub async fn list_children(&self, query: &ListQuery) -> Result<FileList, FetchError> {
        let url = format!("{}/files", self.api_base);
        let page_size = query.page_size.unwrap_or(self.page_size);
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.to_expression()),
            ("pageSize", page_size.to_string()),
            ("fields", LIST_FIELDS.to_string()),
            ("key", self.api_key.clone()),
        ];
        if let Some(token) = &query.page_token {
            params.push(("pageToken", token.clone()));
        }

        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| FetchError::network(&url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(&url, status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(&url, e))?;
        let list: FileList = serde_json::from_str(&body).map_err(|e| FetchError::decode(&url, e))?;
        debug!(
            count = list.files.len(),
            has_more = list.next_page_token.is_some(),
            "listed children"
        );
        Ok(list)
    }

    /// Finds a single child of `parent_id` by exact name, optionally
    /// restricted to a kind.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the underlying listing call fails.
    pub async fn find_child(
        &self,
        parent_id: &str,
        name: &str,
        kind: Option<EntryKind>,
    ) -> Result<Option<FileEntry>, FetchError> {
        let query = ListQuery::children_of(parent_id)
            .named(name)
            .of_kind(kind)
            .page_size(1);
        let list = self.list_children(&query).await?;
        Ok(list.files.into_iter().next())
    }

    /// Fetches the raw bytes of a file, streaming the body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the request fails or the server answers
    /// with a non-success status.
    #[instrument(skip(self))]
    pub async fn fetch_bytes(&self, file_id: &str) -> Result<FileContent, FetchError> {
        let url = self.content_url(file_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::network(&url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(&url, status.as_u16()));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        let mut stream = response.bytes_stream();
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::network(&url, e))?;
            bytes.extend_from_slice(&chunk);
        }
        debug!(bytes = bytes.len(), "fetched file content");
        Ok(FileContent {
            bytes,
            content_type,
        })
    }

    /// Fetches the textual content of a file (used for marker files).
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`fetch_bytes`](Self::fetch_bytes).
    pub async fn fetch_text(&self, file_id: &str) -> Result<String, FetchError> {
        let content = self.fetch_bytes(file_id).await?;
        Ok(String::from_utf8_lossy(&content.bytes).into_owned())
    }

    /// Deterministic raw-content URL for a file.
    #[must_use]
    pub fn content_url(&self, file_id: &str) -> String {
        format!(
            "{}/files/{}?alt=media&key={}",
            self.api_base, file_id, self.api_key
        )
    }

    /// Deterministic thumbnail URL for a file at the requested pixel width.
    #[must_use]
    pub fn thumbnail_url(&self, file_id: &str, width: u32) -> String {
        format!("{}?sz=w{}&id={}", self.thumbnail_base, width, file_id)
    }
}

/// Parses a configured base URL and normalizes away any trailing slash.
fn validated_base(base: &str) -> Result<String, ClientError> {
    Url::parse(base).map_err(|source| ClientError::InvalidBaseUrl {
        url: base.to_string(),
        source,
    })?;
    Ok(base.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_client() -> DriveClient {
        DriveClient::new(&DriveConfig::new("test-key")).unwrap()
    }

    #[test]
    fn test_query_expression_images() {
        let query = ListQuery::children_of("f1").images();
        assert_eq!(
            query.to_expression(),
            "'f1' in parents and mimeType contains 'image/'"
        );
    }

    #[test]
    fn test_query_expression_folders() {
        let query = ListQuery::children_of("f1").folders();
        assert_eq!(
            query.to_expression(),
            "'f1' in parents and mimeType='application/vnd.google-apps.folder'"
        );
    }

    #[test]
    fn test_query_expression_named_folder() {
        let query = ListQuery::children_of("f1").named("cover").folders();
        assert_eq!(
            query.to_expression(),
            "'f1' in parents and name='cover' and mimeType='application/vnd.google-apps.folder'"
        );
    }

    #[test]
    fn test_query_expression_named_only() {
        let query = ListQuery::children_of("f1").named("password.txt");
        assert_eq!(
            query.to_expression(),
            "'f1' in parents and name='password.txt'"
        );
    }

    #[test]
    fn test_thumbnail_url_is_deterministic() {
        let client = test_client();
        assert_eq!(
            client.thumbnail_url("abc", THUMB_WIDTH_GRID),
            "https://drive.google.com/thumbnail?sz=w640&id=abc"
        );
    }

    #[test]
    fn test_content_url_carries_key() {
        let client = test_client();
        assert_eq!(
            client.content_url("abc"),
            "https://www.googleapis.com/drive/v3/files/abc?alt=media&key=test-key"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = DriveConfig::new("k").with_api_base("not a url");
        assert!(matches!(
            DriveClient::new(&config),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let config = DriveConfig::new("k").with_api_base("http://localhost:9000/");
        let client = DriveClient::new(&config).unwrap();
        assert_eq!(client.content_url("x"), "http://localhost:9000/files/x?alt=media&key=k");
    }
}
