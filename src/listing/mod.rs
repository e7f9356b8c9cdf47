//! Cursor-based incremental folder listings and album browsing.
//!
//! [`PagedListing`] drives the remote "list folder contents" protocol one
//! page at a time, accumulating entries in arrival order. Its lifecycle:
//!
//! ```text
//! Idle → Fetching → Ready ⇄ FetchingMore → Exhausted
//!              ↘ Failed ↙
//! ```
//!
//! A page fetch that exhausts its retry budget moves the listing to
//! `Failed` without touching the entries accumulated from earlier pages or
//! advancing the cursor, so the same page can be requested again. A page
//! without a continuation token moves the listing to `Exhausted`, where
//! further "load more" requests are no-ops.
//!
//! [`list_albums`] builds the album-browsing view: the subfolders of a root
//! folder, each enriched into a [`FolderNode`](crate::drive::FolderNode)
//! with its cover image and gate flags.

mod albums;
mod cover;

pub use albums::list_albums;

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::drive::{DriveClient, FetchError, ListQuery, MediaAsset, PageCursor};
use crate::retry::{RetryPolicy, retry_with_backoff};

/// Lifecycle state of a [`PagedListing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingState {
    /// No fetch has started yet.
    Idle,
    /// The first page is being fetched.
    Fetching,
    /// At least one page is loaded and more may exist.
    Ready,
    /// A subsequent page is being fetched.
    FetchingMore,
    /// The final page has been loaded; "load more" is a no-op.
    Exhausted,
    /// A page fetch failed after retries; earlier entries are preserved.
    Failed,
}

/// Incrementally paginated media listing of one folder.
pub struct PagedListing {
    client: Arc<DriveClient>,
    policy: RetryPolicy,
    folder_id: String,
    entries: Vec<MediaAsset>,
    cursor: PageCursor,
    state: ListingState,
}

impl PagedListing {
    /// Creates an idle listing for `folder_id`.
    #[must_use]
    pub fn new(client: Arc<DriveClient>, policy: RetryPolicy, folder_id: impl Into<String>) -> Self {
        Self {
            client,
            policy,
            folder_id: folder_id.into(),
            entries: Vec::new(),
            cursor: PageCursor::start(),
            state: ListingState::Idle,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ListingState {
        self.state
    }

    /// Returns the entries accumulated so far, in listing order.
    #[must_use]
    pub fn entries(&self) -> &[MediaAsset] {
        &self.entries
    }

    /// Returns the folder this listing reads.
    #[must_use]
    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    /// Whether another page may exist.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.cursor.has_more
    }

    /// Returns the continuation cursor.
    #[must_use]
    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    /// Starts (or restarts) the listing from its first page.
    ///
    /// Any previously accumulated entries and cursor state are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the page fetch fails after retries; the
    /// listing is then in [`ListingState::Failed`] with no entries.
    #[instrument(skip(self), fields(folder = %self.folder_id))]
    pub async fn fetch_first(&mut self) -> Result<&[MediaAsset], FetchError> {
        self.entries.clear();
        self.cursor = PageCursor::start();
        self.state = ListingState::Fetching;
        self.fetch_page().await?;
        Ok(&self.entries)
    }

    /// Fetches the next page and appends its entries.
    ///
    /// A no-op once the listing is exhausted, and before the first fetch.
    /// After a failure, calling this again retries the same page.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the page fetch fails after retries;
    /// entries from earlier pages are preserved and the cursor does not
    /// advance.
    #[instrument(skip(self), fields(folder = %self.folder_id))]
    pub async fn fetch_more(&mut self) -> Result<&[MediaAsset], FetchError> {
        match self.state {
            ListingState::Ready | ListingState::Failed => {}
            ListingState::Exhausted => {
                debug!("listing exhausted, load-more is a no-op");
                return Ok(&self.entries);
            }
            ListingState::Idle | ListingState::Fetching | ListingState::FetchingMore => {
                debug!(state = ?self.state, "load-more ignored in current state");
                return Ok(&self.entries);
            }
        }
        self.state = ListingState::FetchingMore;
        self.fetch_page().await?;
        Ok(&self.entries)
    }

    /// Fetches the page the cursor points at and folds it into the listing.
    async fn fetch_page(&mut self) -> Result<(), FetchError> {
        let mut query = ListQuery::children_of(&self.folder_id).images();
        if let Some(token) = self.cursor.token.clone() {
            query = query.page_token(token);
        }

        let client = Arc::clone(&self.client);
        let result = retry_with_backoff(&self.policy, || {
            let client = Arc::clone(&client);
            let query = query.clone();
            async move { client.list_children(&query).await }
        })
        .await;

        match result {
            Ok(page) => {
                let added = page.files.len();
                self.entries
                    .extend(page.files.into_iter().map(MediaAsset::from));
                self.cursor.advance(page.next_page_token);
                self.state = if self.cursor.has_more {
                    ListingState::Ready
                } else {
                    ListingState::Exhausted
                };
                debug!(added, total = self.entries.len(), state = ?self.state, "page appended");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "page fetch failed after retries, keeping prior entries");
                self.state = ListingState::Failed;
                Err(err)
            }
        }
    }
}
