//! Album browsing: subfolder listing enriched into folder snapshots.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{info, instrument, warn};

use super::cover;
use crate::auth::markers;
use crate::drive::{DriveClient, FetchError, FolderNode, ListQuery};
use crate::queue::TaskQueue;
use crate::retry::{RetryPolicy, retry_with_backoff};

/// Lists the albums (subfolders) of `root_folder_id` as enriched snapshots.
///
/// Each album is resolved into a [`FolderNode`]: its cover image, whether a
/// password marker gates it, and whether its download marker enables bulk
/// download. Enrichment lookups for different albums run concurrently
/// through `queue`; result order follows the listing order regardless.
///
/// A marker lookup that fails after retries degrades that album to
/// "unprotected"/"downloads disabled" with a warning instead of failing the
/// whole listing; only the initial subfolder listing itself is fatal.
///
/// # Errors
///
/// Returns [`FetchError`] when the subfolder listing fails after retries.
#[instrument(skip(client, queue, policy))]
pub async fn list_albums(
    client: &Arc<DriveClient>,
    queue: &TaskQueue,
    policy: &RetryPolicy,
    root_folder_id: &str,
) -> Result<Vec<FolderNode>, FetchError> {
    let folders = retry_with_backoff(policy, || {
        let client = Arc::clone(client);
        async move {
            client
                .list_children(&ListQuery::children_of(root_folder_id).folders())
                .await
        }
    })
    .await?;

    info!(albums = folders.files.len(), "enriching album listing");

    let enrichments = folders.files.into_iter().map(|folder| {
        let client = Arc::clone(client);
        let policy = policy.clone();
        let queue = queue.clone();
        async move {
            queue
                .submit(move || async move {
                    let cover_asset_id = cover::resolve_cover(&client, &policy, &folder.id).await;

                    let password_protected =
                        match markers::find_password_marker(&client, &policy, &folder.id).await {
                            Ok(found) => found.is_some(),
                            Err(err) => {
                                warn!(folder = %folder.id, error = %err,
                                    "password probe failed, treating album as unprotected");
                                false
                            }
                        };

                    let download_enabled =
                        match markers::download_enabled(&client, &policy, &folder.id).await {
                            Ok(enabled) => enabled,
                            Err(err) => {
                                warn!(folder = %folder.id, error = %err,
                                    "download probe failed, downloads disabled for album");
                                false
                            }
                        };

                    FolderNode {
                        id: folder.id,
                        name: folder.name,
                        cover_asset_id,
                        password_protected,
                        download_enabled,
                    }
                })
                .await
        }
    });

    Ok(join_all(enrichments).await)
}
