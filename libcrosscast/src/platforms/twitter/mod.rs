//! Twitter/X publishing
//!
//! Drives the chunked media upload protocol (INIT → APPEND → FINALIZE →
//! STATUS) for each file, fans uploads out concurrently, and creates the
//! tweet once every upload has produced a media id. A failed upload
//! aborts the publish before any tweet-create call; there is no partial
//! success.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::backoff::{poll_until, BackoffPolicy, PollOutcome};
use crate::config::TwitterConfig;
use crate::error::PublishError;
use crate::platforms::Publisher;
use crate::types::{Credentials, MediaCategory, MediaFile, ProcessingState};

pub mod api;

pub use api::{TwitterHttpApi, TwitterMediaApi};

/// Upper bound on a single APPEND payload.
pub const MAX_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Minimum delay between STATUS polls, also used when the server gives
/// no `check_after_secs` hint.
const PROCESSING_POLL_FLOOR: Duration = Duration::from_secs(5);

/// Hard wall-clock ceiling on waiting for media processing.
const PROCESSING_BUDGET: Duration = Duration::from_secs(5 * 60);

/// Publisher for Twitter/X.
pub struct TwitterPublisher {
    api: Arc<dyn TwitterMediaApi>,
}

impl TwitterPublisher {
    pub fn new(api: Arc<dyn TwitterMediaApi>) -> Self {
        Self { api }
    }

    pub fn from_config(client: reqwest::Client, config: &TwitterConfig) -> Self {
        Self::new(Arc::new(TwitterHttpApi::new(client, &config.api_base_url)))
    }

    /// Upload one file through the chunked protocol and return its media
    /// id, ready to be referenced by a post.
    async fn upload_single(
        &self,
        credentials: &Credentials,
        file: &MediaFile,
    ) -> Result<String, PublishError> {
        let mime_type = file.mime_type().ok_or_else(|| {
            PublishError::UnsupportedMedia(format!("unrecognized content in {}", file.filename))
        })?;
        let category = MediaCategory::from_mime(mime_type)?;

        let media_id = self
            .api
            .init_upload(credentials, file.len(), mime_type, category)
            .await?;
        debug!(filename = %file.filename, %media_id, mime_type, "upload initialized");

        // Segment indices are contiguous from zero; any non-success
        // append aborts the whole upload and is never retried.
        for (segment_index, chunk) in file.bytes.chunks(MAX_CHUNK_SIZE).enumerate() {
            self.api
                .append_upload(credentials, &media_id, chunk, segment_index)
                .await?;
        }

        // Exactly one FINALIZE per upload session.
        self.api.finalize_upload(credentials, &media_id).await?;

        if category.needs_processing() {
            self.wait_for_processing(credentials, &media_id).await?;
        }

        info!(filename = %file.filename, %media_id, "media upload complete");
        Ok(media_id)
    }

    /// Poll STATUS until processing reaches a terminal state.
    ///
    /// Sleeps the server-suggested delay (floored at 5 s) between polls;
    /// a terminal `failed` is fatal and never retried; the 5-minute
    /// wall-clock budget covers the initial delay too.
    async fn wait_for_processing(
        &self,
        credentials: &Credentials,
        media_id: &str,
    ) -> Result<(), PublishError> {
        debug!(media_id, "media requires processing, polling status");

        // The server needs a moment before the first STATUS is
        // meaningful; this initial wait counts against the budget.
        sleep(PROCESSING_POLL_FLOOR).await;

        let api = &self.api;
        let policy = BackoffPolicy::new(PROCESSING_POLL_FLOOR, PROCESSING_BUDGET);
        poll_until(
            policy,
            PROCESSING_BUDGET - PROCESSING_POLL_FLOOR,
            "media processing",
            move || async move {
                let status = api.upload_status(credentials, media_id).await?;
                debug!(
                    media_id,
                    state = ?status.state,
                    progress = status.progress_percent,
                    "processing status"
                );
                match status.state {
                    ProcessingState::Succeeded => Ok(PollOutcome::Ready(())),
                    ProcessingState::Failed => Err(PublishError::Protocol(format!(
                        "media processing failed: {}",
                        status.error_message.unwrap_or_default()
                    ))),
                    ProcessingState::Pending | ProcessingState::InProgress => {
                        Ok(PollOutcome::RetryAfter(Duration::from_secs(
                            status.check_after_secs.unwrap_or(0),
                        )))
                    }
                }
            },
        )
        .await
    }

    /// Upload every file concurrently and collect media ids in input
    /// order.
    ///
    /// All uploads start together and every in-flight upload runs to
    /// completion even once a failure exists; the error reported is the
    /// first in input order. On success the id list length always equals
    /// the file count; a partial list is never returned.
    async fn upload_all(
        &self,
        credentials: &Credentials,
        files: &[MediaFile],
    ) -> Result<Vec<String>, PublishError> {
        info!(count = files.len(), "starting concurrent media uploads");

        let uploads = files.iter().map(|file| self.upload_single(credentials, file));
        let results = join_all(uploads).await;

        let mut media_ids = Vec::with_capacity(results.len());
        for (result, file) in results.into_iter().zip(files) {
            match result {
                Ok(media_id) => media_ids.push(media_id),
                Err(error) => {
                    warn!(filename = %file.filename, %error, "media upload failed");
                    return Err(error);
                }
            }
        }

        Ok(media_ids)
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    fn name(&self) -> &str {
        "twitter"
    }

    fn validate_request(&self, caption: &str, files: &[MediaFile]) -> Result<(), PublishError> {
        if caption.trim().is_empty() && files.is_empty() {
            return Err(PublishError::NoMedia);
        }
        for file in files {
            let mime_type = file.mime_type().ok_or_else(|| {
                PublishError::UnsupportedMedia(format!(
                    "unrecognized content in {}",
                    file.filename
                ))
            })?;
            MediaCategory::from_mime(mime_type)?;
        }
        Ok(())
    }

    async fn check_credentials(&self, credentials: &Credentials) -> Result<(), PublishError> {
        self.api.verify_credentials(credentials).await
    }

    async fn publish(
        &self,
        credentials: &Credentials,
        caption: &str,
        files: &[MediaFile],
    ) -> Result<String, PublishError> {
        let media_ids = if files.is_empty() {
            Vec::new()
        } else {
            self.upload_all(credentials, files).await?
        };

        let post_id = self.api.create_post(credentials, caption, &media_ids).await?;
        info!(%post_id, media_count = media_ids.len(), "tweet created");
        Ok(post_id)
    }
}
