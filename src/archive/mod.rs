//! Bulk archive assembly with partial-failure accounting.
//!
//! [`ArchiveAssembler`] turns a folder's complete asset listing into a
//! single deflate-compressed zip: every asset is retrieved through a
//! [`TaskQueue`] (serial for bulk work, respecting the remote service's
//! burst limits) with each retrieval wrapped in
//! [`retry_with_backoff`](crate::retry::retry_with_backoff). Individual
//! assets that still fail after retries are counted and skipped; one bad
//! asset never aborts the run. Only a run where *every* asset fails is a
//! terminal failure.
//!
//! Status callbacks fire at each phase transition
//! (`Preparing → Packaging → Done|Failed`) so the caller can surface
//! interim feedback. The archive bytes are handed over only after the
//! container is finalized; no partially written archive is ever surfaced.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gallery_core::archive::{ArchiveAssembler, BULK_CONCURRENCY};
//! use gallery_core::config::DriveConfig;
//! use gallery_core::drive::DriveClient;
//! use gallery_core::queue::TaskQueue;
//! use gallery_core::retry::RetryPolicy;
//!
//! # async fn example(assets: &[gallery_core::drive::MediaAsset])
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(DriveClient::new(&DriveConfig::new("api-key"))?);
//! let queue = TaskQueue::new(BULK_CONCURRENCY)?;
//! let assembler = ArchiveAssembler::new(client, queue, RetryPolicy::default());
//! let output = assembler
//!     .assemble("Wedding", assets, |status| println!("{status:?}"))
//!     .await?;
//! println!(
//!     "{}: {} ok, {} failed",
//!     output.file_name, output.summary.success_count, output.summary.error_count
//! );
//! # Ok(())
//! # }
//! ```

mod filename;

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::drive::{DriveClient, MediaAsset};
use crate::queue::TaskQueue;
use crate::retry::{RetryPolicy, retry_with_backoff};

/// Queue concurrency for bulk retrieval.
///
/// Deliberately serial, and more conservative than interactive browsing:
/// bulk runs issue one request per asset back-to-back and are the first to
/// hit the remote service's burst limits.
pub const BULK_CONCURRENCY: usize = 1;

/// Deflate level used for the archive container.
const COMPRESSION_LEVEL: i64 = 6;

/// Phase of an archive run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStatus {
    /// Assets are being retrieved.
    Preparing,
    /// Retrieved assets are being written into the container.
    Packaging,
    /// The archive was finalized; a summary accompanies it.
    Done,
    /// No archive was produced.
    Failed,
}

/// Tally of per-asset outcomes for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Assets retrieved and packaged.
    pub success_count: usize,
    /// Assets abandoned after exhausting retries.
    pub error_count: usize,
}

/// A finalized archive plus its outcome tally.
#[derive(Debug, Clone)]
pub struct ArchiveOutput {
    /// Suggested file name, derived from the folder's display name.
    pub file_name: String,
    /// The complete zip container.
    pub bytes: Vec<u8>,
    /// Per-asset outcome tally.
    pub summary: ArchiveSummary,
}

/// Error type for archive runs.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Every asset failed retrieval; no archive was produced.
    #[error("no assets could be retrieved ({attempted} attempted)")]
    AllFailed {
        /// How many assets were attempted.
        attempted: usize,
    },

    /// The zip container could not be written.
    #[error("failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Buffered container I/O failed.
    #[error("failed to finalize archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Assembles bulk-download archives for folders.
pub struct ArchiveAssembler {
    client: Arc<DriveClient>,
    queue: TaskQueue,
    policy: RetryPolicy,
}

impl ArchiveAssembler {
    /// Creates an assembler retrieving through `queue`.
    ///
    /// Bulk pipelines should pass a queue of [`BULK_CONCURRENCY`]; the queue
    /// is taken as a parameter so callers can share or tune it explicitly.
    #[must_use]
    pub fn new(client: Arc<DriveClient>, queue: TaskQueue, policy: RetryPolicy) -> Self {
        Self {
            client,
            queue,
            policy,
        }
    }

    /// Retrieves every asset and packages the successes into a zip archive.
    ///
    /// Assets are processed in listing order. `on_status` fires at each
    /// phase transition.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::AllFailed`] when not a single asset could be
    /// retrieved, and [`ArchiveError::Zip`]/[`ArchiveError::Io`] when the
    /// container itself cannot be written. Individual asset failures are
    /// *not* errors; they are tallied in the returned summary.
    #[instrument(skip(self, assets, on_status), fields(folder = %folder_name, assets = assets.len()))]
    pub async fn assemble<F>(
        &self,
        folder_name: &str,
        assets: &[MediaAsset],
        on_status: F,
    ) -> Result<ArchiveOutput, ArchiveError>
    where
        F: Fn(ArchiveStatus) + Send + Sync,
    {
        on_status(ArchiveStatus::Preparing);
        info!("starting bulk retrieval");

        let retrievals = assets.iter().map(|asset| {
            let client = Arc::clone(&self.client);
            let policy = self.policy.clone();
            let queue = self.queue.clone();
            async move {
                queue
                    .submit(move || async move {
                        retry_with_backoff(&policy, || {
                            let client = Arc::clone(&client);
                            let id = asset.id.clone();
                            async move { client.fetch_bytes(&id).await }
                        })
                        .await
                    })
                    .await
            }
        });
        let results = futures_util::future::join_all(retrievals).await;

        on_status(ArchiveStatus::Packaging);

        let mut summary = ArchiveSummary::default();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL));
        let mut used_names = HashSet::new();

        for (asset, result) in assets.iter().zip(results) {
            match result {
                Ok(content) => {
                    let name = filename::entry_name(&asset.name, content.content_type.as_deref());
                    let name = filename::unique_entry_name(name, &mut used_names);
                    if let Err(err) = writer.start_file(name.as_str(), options) {
                        on_status(ArchiveStatus::Failed);
                        return Err(err.into());
                    }
                    if let Err(err) = writer.write_all(&content.bytes) {
                        on_status(ArchiveStatus::Failed);
                        return Err(err.into());
                    }
                    summary.success_count += 1;
                    debug!(asset = %asset.id, entry = %name, "asset packaged");
                }
                Err(err) => {
                    summary.error_count += 1;
                    warn!(asset = %asset.id, error = %err, "asset failed after retries, continuing");
                }
            }
        }

        if summary.success_count == 0 {
            on_status(ArchiveStatus::Failed);
            warn!(attempted = assets.len(), "bulk download failed entirely");
            return Err(ArchiveError::AllFailed {
                attempted: assets.len(),
            });
        }

        let cursor = match writer.finish() {
            Ok(cursor) => cursor,
            Err(err) => {
                on_status(ArchiveStatus::Failed);
                return Err(err.into());
            }
        };
        let bytes = cursor.into_inner();
        on_status(ArchiveStatus::Done);
        info!(
            success = summary.success_count,
            failed = summary.error_count,
            bytes = bytes.len(),
            "archive finalized"
        );

        let display_name = if folder_name.is_empty() {
            "folder"
        } else {
            folder_name
        };
        Ok(ArchiveOutput {
            file_name: format!("{display_name}.zip"),
            bytes,
            summary,
        })
    }
}
