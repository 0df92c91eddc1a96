//! Instagram publishing
//!
//! Turns files plus a caption into a published post through the Graph
//! container protocol: quota gate, per-file staging and container
//! creation, the single-vs-carousel branch, readiness polling, and the
//! final publish call. Carousel creation is the one place a transient
//! platform error is retried.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backoff::{poll_until, retry_transient, BackoffPolicy, PollOutcome};
use crate::config::{InstagramConfig, StagerConfig};
use crate::error::PublishError;
use crate::platforms::Publisher;
use crate::stager::{HttpBucketStager, MediaStager};
use crate::types::{ContainerStatus, Credentials, MediaFile};

pub mod api;

pub use api::{ContainerSpec, InstagramGraphApi, InstagramHttpApi, InstagramMediaType};

/// Backoff for the readiness poll and the transient carousel retry.
const GRAPH_BACKOFF: BackoffPolicy = BackoffPolicy::new(
    Duration::from_secs(2),
    Duration::from_secs(10),
);

/// Hard wall-clock ceiling on waiting for a container to finish.
const READINESS_BUDGET: Duration = Duration::from_secs(2 * 60);

/// Total attempts for a transiently failing carousel create.
const CAROUSEL_MAX_ATTEMPTS: u32 = 5;

/// Publisher for Instagram.
pub struct InstagramPublisher {
    api: Arc<dyn InstagramGraphApi>,
    stager: Arc<dyn MediaStager>,
}

impl InstagramPublisher {
    pub fn new(api: Arc<dyn InstagramGraphApi>, stager: Arc<dyn MediaStager>) -> Self {
        Self { api, stager }
    }

    pub fn from_config(
        client: reqwest::Client,
        config: &InstagramConfig,
        stager_config: &StagerConfig,
        stager_token: Option<String>,
    ) -> Self {
        let api = InstagramHttpApi::new(client.clone(), &config.graph_base_url);
        let stager = HttpBucketStager::new(
            client,
            &stager_config.endpoint,
            &stager_config.public_base_url,
            stager_token,
        );
        Self::new(Arc::new(api), Arc::new(stager))
    }

    /// Sniff a file's MIME type, rejecting anything the platform cannot
    /// accept.
    fn sniff_supported(file: &MediaFile) -> Result<&'static str, PublishError> {
        file.mime_type().ok_or_else(|| {
            PublishError::UnsupportedMedia(format!("unrecognized content in {}", file.filename))
        })
    }

    /// Map a sniffed MIME type onto the container designation.
    ///
    /// Standalone videos publish as short-form REELS; carousel-child
    /// videos keep the generic VIDEO type.
    fn media_type_for(
        mime_type: &str,
        is_carousel_item: bool,
    ) -> Result<InstagramMediaType, PublishError> {
        if mime_type.starts_with("image/") {
            Ok(InstagramMediaType::Image)
        } else if mime_type.starts_with("video/") {
            if is_carousel_item {
                Ok(InstagramMediaType::Video)
            } else {
                Ok(InstagramMediaType::Reels)
            }
        } else {
            Err(PublishError::UnsupportedMedia(mime_type.to_string()))
        }
    }

    /// Stage one file and create its media container.
    async fn create_media_container(
        &self,
        credentials: &Credentials,
        ig_user_id: &str,
        caption: Option<&str>,
        file: &MediaFile,
        is_carousel_item: bool,
    ) -> Result<String, PublishError> {
        let mime_type = Self::sniff_supported(file)?;
        let media_type = Self::media_type_for(mime_type, is_carousel_item)?;

        let media_url = self
            .stager
            .store(&file.bytes, &file.filename, mime_type)
            .await?;
        debug!(filename = %file.filename, %media_url, "media staged for container");

        let container_id = self
            .api
            .create_container(
                credentials,
                ig_user_id,
                &ContainerSpec {
                    media_url,
                    media_type,
                    caption: caption.map(str::to_string),
                    is_carousel_item,
                },
            )
            .await?;

        debug!(filename = %file.filename, %container_id, "container created");
        Ok(container_id)
    }

    /// Poll a container until FINISHED; ERROR and EXPIRED are fatal.
    async fn wait_for_container(
        &self,
        credentials: &Credentials,
        container_id: &str,
    ) -> Result<(), PublishError> {
        let api = &self.api;
        poll_until(
            GRAPH_BACKOFF,
            READINESS_BUDGET,
            "container readiness",
            move || async move {
                match api.container_status(credentials, container_id).await? {
                    ContainerStatus::Finished => Ok(PollOutcome::Ready(())),
                    ContainerStatus::InProgress => Ok(PollOutcome::Retry),
                    ContainerStatus::Error => Err(PublishError::Protocol(format!(
                        "container {} entered ERROR state",
                        container_id
                    ))),
                    ContainerStatus::Expired => Err(PublishError::Protocol(format!(
                        "container {} expired before publish",
                        container_id
                    ))),
                }
            },
        )
        .await
    }

    /// Build the carousel: children first (in input order, each brought
    /// to FINISHED before the aggregate references it), then the parent
    /// container carrying the caption.
    async fn create_carousel(
        &self,
        credentials: &Credentials,
        ig_user_id: &str,
        caption: &str,
        files: &[MediaFile],
    ) -> Result<String, PublishError> {
        let mut children = Vec::with_capacity(files.len());
        for file in files {
            let child = self
                .create_media_container(credentials, ig_user_id, None, file, true)
                .await?;
            children.push(child);
        }
        for child in &children {
            self.wait_for_container(credentials, child).await?;
        }

        // The only retried call in the pipeline: the platform may flag
        // carousel creation as transient while children settle.
        let api = &self.api;
        let children_ref = &children;
        retry_transient(
            GRAPH_BACKOFF,
            CAROUSEL_MAX_ATTEMPTS,
            "carousel create",
            move || async move {
                api.create_carousel(credentials, ig_user_id, caption, children_ref)
                    .await
            },
        )
        .await
    }
}

#[async_trait]
impl Publisher for InstagramPublisher {
    fn name(&self) -> &str {
        "instagram"
    }

    fn validate_request(&self, _caption: &str, files: &[MediaFile]) -> Result<(), PublishError> {
        // Instagram has no text-only posts.
        if files.is_empty() {
            return Err(PublishError::NoMedia);
        }
        for file in files {
            Self::media_type_for(Self::sniff_supported(file)?, false)?;
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
        let ig_user_id = credentials.account_id.as_deref().ok_or_else(|| {
            PublishError::CredentialsNotFound(
                "instagram credentials carry no account id".to_string(),
            )
        })?;

        // Cheap fail-fast before any staging or container work.
        let quota = self.api.publishing_limit(credentials, ig_user_id).await?;
        if quota.is_exhausted() {
            warn!(
                usage = quota.quota_usage,
                total = quota.quota_total,
                "publish quota exhausted"
            );
            return Err(PublishError::QuotaExceeded {
                usage: quota.quota_usage,
                total: quota.quota_total,
            });
        }

        if files.is_empty() {
            return Err(PublishError::NoMedia);
        }

        let container_id = if files.len() == 1 {
            self.create_media_container(credentials, ig_user_id, Some(caption), &files[0], false)
                .await?
        } else {
            self.create_carousel(credentials, ig_user_id, caption, files)
                .await?
        };

        self.wait_for_container(credentials, &container_id).await?;

        let post_id = self
            .api
            .publish_container(credentials, ig_user_id, &container_id)
            .await?;
        info!(%post_id, %container_id, files = files.len(), "instagram post published");
        Ok(post_id)
    }
}
