//! Cover image resolution for album folders.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::drive::{DriveClient, EntryKind, FetchError, ListQuery};
use crate::retry::{RetryPolicy, retry_with_backoff};

/// Name of the subfolder that designates curated cover images.
const COVER_FOLDER_NAME: &str = "cover";

/// Resolves the cover asset for `folder_id`.
///
/// Precedence: the first image inside a subfolder literally named "cover",
/// then the first image directly inside the folder, then none. A failure at
/// any lookup step falls through to the next step instead of aborting the
/// listing the folder appears in.
pub(crate) async fn resolve_cover(
    client: &Arc<DriveClient>,
    policy: &RetryPolicy,
    folder_id: &str,
) -> Option<String> {
    match find_cover_folder(client, policy, folder_id).await {
        Ok(Some(cover_folder_id)) => match first_image(client, policy, &cover_folder_id).await {
            Ok(Some(id)) => return Some(id),
            Ok(None) => debug!(folder_id, "cover folder holds no images, falling back"),
            Err(err) => {
                warn!(folder_id, error = %err, "cover folder listing failed, falling back");
            }
        },
        Ok(None) => {}
        Err(err) => warn!(folder_id, error = %err, "cover folder probe failed, falling back"),
    }

    match first_image(client, policy, folder_id).await {
        Ok(first) => first,
        Err(err) => {
            warn!(folder_id, error = %err, "first-image lookup failed, album rendered without cover");
            None
        }
    }
}

async fn find_cover_folder(
    client: &Arc<DriveClient>,
    policy: &RetryPolicy,
    folder_id: &str,
) -> Result<Option<String>, FetchError> {
    let entry = retry_with_backoff(policy, || {
        let client = Arc::clone(client);
        async move {
            client
                .find_child(folder_id, COVER_FOLDER_NAME, Some(EntryKind::Folder))
                .await
        }
    })
    .await?;
    Ok(entry.map(|e| e.id))
}

async fn first_image(
    client: &Arc<DriveClient>,
    policy: &RetryPolicy,
    folder_id: &str,
) -> Result<Option<String>, FetchError> {
    let list = retry_with_backoff(policy, || {
        let client = Arc::clone(client);
        async move {
            client
                .list_children(&ListQuery::children_of(folder_id).images().page_size(1))
                .await
        }
    })
    .await?;
    Ok(list.files.into_iter().next().map(|e| e.id))
}
