//! Core types for Crosscast

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PublishError;

/// One file queued for publishing.
///
/// The pipeline never touches the filesystem; callers hand in the raw
/// bytes (the CLI reads them, a web layer would take them from a
/// multipart form) and the content type is sniffed from the leading
/// bytes, not trusted from the filename.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Sniffed MIME type of the payload, if recognized.
    pub fn mime_type(&self) -> Option<&'static str> {
        sniff_mime(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Detect a MIME type from a payload's magic bytes.
///
/// Covers the formats the supported platforms accept. Anything else is
/// reported as unsupported by the coordinators, so there is no fallback
/// to `application/octet-stream`.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    // ISO base media: size box then "ftyp".
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return Some("video/mp4");
    }
    None
}

/// Upload category a media file falls into on the chunked-upload side.
///
/// Images are ready as soon as the upload is finalized; gif and video
/// uploads go through server-side processing and must be polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaCategory {
    Image,
    Gif,
    Video,
}

impl MediaCategory {
    /// Map a sniffed MIME type onto a category.
    pub fn from_mime(mime: &str) -> std::result::Result<Self, PublishError> {
        match mime {
            "image/gif" => Ok(MediaCategory::Gif),
            "video/mp4" => Ok(MediaCategory::Video),
            "image/jpeg" | "image/png" => Ok(MediaCategory::Image),
            other => Err(PublishError::UnsupportedMedia(other.to_string())),
        }
    }

    /// The `media_category` value the upload endpoint expects.
    pub fn as_upload_category(&self) -> &'static str {
        match self {
            MediaCategory::Image => "tweet_image",
            MediaCategory::Gif => "tweet_gif",
            MediaCategory::Video => "tweet_video",
        }
    }

    /// Whether this category requires a processing-status poll after
    /// finalize.
    pub fn needs_processing(&self) -> bool {
        matches!(self, MediaCategory::Gif | MediaCategory::Video)
    }
}

/// Server-side processing state of a finalized chunked upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl ProcessingState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingState::Succeeded | ProcessingState::Failed)
    }
}

/// One STATUS poll result for a chunked upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingStatus {
    pub state: ProcessingState,
    pub progress_percent: u8,
    /// Server-suggested delay before the next poll, if any.
    pub check_after_secs: Option<u64>,
    pub error_message: Option<String>,
}

/// Lifecycle state of an Instagram media container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    InProgress,
    Finished,
    Error,
    Expired,
}

/// Snapshot of the account's publishing allowance, fetched before any
/// container work begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishQuota {
    pub quota_usage: u32,
    pub quota_total: u32,
}

impl PublishQuota {
    pub fn is_exhausted(&self) -> bool {
        self.quota_usage >= self.quota_total
    }
}

/// Opaque account credentials handed to a coordinator for one publish.
///
/// Credentials are an immutable value passed into every call; the
/// pipeline never reads ambient process state. `secret` is only set by
/// providers that store one, `account_id` carries the platform-side
/// account identifier where the API paths require it (Instagram).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub secret: Option<String>,
    pub account_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: None,
            account_id: None,
            expires_at: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// The single value returned across the pipeline boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub success: bool,
    pub platform_post_id: Option<String>,
    pub error: Option<PublishError>,
}

impl PublishResult {
    pub fn ok(platform_post_id: impl Into<String>) -> Self {
        Self {
            success: true,
            platform_post_id: Some(platform_post_id.into()),
            error: None,
        }
    }

    pub fn failure(error: PublishError) -> Self {
        Self {
            success: false,
            platform_post_id: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn jpeg_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.resize(len, 0);
        bytes
    }

    fn mp4_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0, 0, 0, 0x18];
        bytes.extend_from_slice(b"ftypisom");
        bytes.resize(len, 0);
        bytes
    }

    #[test]
    fn test_sniff_jpeg() {
        assert_eq!(sniff_mime(&jpeg_bytes(64)), Some("image/jpeg"));
    }

    #[test]
    fn test_sniff_png() {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.resize(32, 0);
        assert_eq!(sniff_mime(&bytes), Some("image/png"));
    }

    #[test]
    fn test_sniff_gif_both_versions() {
        assert_eq!(sniff_mime(b"GIF87a trailing"), Some("image/gif"));
        assert_eq!(sniff_mime(b"GIF89a trailing"), Some("image/gif"));
    }

    #[test]
    fn test_sniff_mp4() {
        assert_eq!(sniff_mime(&mp4_bytes(64)), Some("video/mp4"));
    }

    #[test]
    fn test_sniff_unknown() {
        assert_eq!(sniff_mime(b"plain text payload"), None);
        assert_eq!(sniff_mime(&[]), None);
        // Too short to carry an ftyp box.
        assert_eq!(sniff_mime(b"\0\0\0\x18ftyp"), None);
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            MediaCategory::from_mime("image/jpeg").unwrap(),
            MediaCategory::Image
        );
        assert_eq!(
            MediaCategory::from_mime("image/png").unwrap(),
            MediaCategory::Image
        );
        assert_eq!(
            MediaCategory::from_mime("image/gif").unwrap(),
            MediaCategory::Gif
        );
        assert_eq!(
            MediaCategory::from_mime("video/mp4").unwrap(),
            MediaCategory::Video
        );
    }

    #[test]
    fn test_category_mapping_unsupported() {
        let err = MediaCategory::from_mime("application/pdf").unwrap_err();
        assert_eq!(
            err,
            PublishError::UnsupportedMedia("application/pdf".to_string())
        );
    }

    #[test]
    fn test_upload_category_names() {
        assert_eq!(MediaCategory::Image.as_upload_category(), "tweet_image");
        assert_eq!(MediaCategory::Gif.as_upload_category(), "tweet_gif");
        assert_eq!(MediaCategory::Video.as_upload_category(), "tweet_video");
    }

    #[test]
    fn test_only_gif_and_video_need_processing() {
        assert!(!MediaCategory::Image.needs_processing());
        assert!(MediaCategory::Gif.needs_processing());
        assert!(MediaCategory::Video.needs_processing());
    }

    #[test]
    fn test_processing_state_serde_names() {
        let state: ProcessingState = serde_json::from_str(r#""in_progress""#).unwrap();
        assert_eq!(state, ProcessingState::InProgress);
        let state: ProcessingState = serde_json::from_str(r#""succeeded""#).unwrap();
        assert_eq!(state, ProcessingState::Succeeded);
    }

    #[test]
    fn test_processing_state_terminal() {
        assert!(!ProcessingState::Pending.is_terminal());
        assert!(!ProcessingState::InProgress.is_terminal());
        assert!(ProcessingState::Succeeded.is_terminal());
        assert!(ProcessingState::Failed.is_terminal());
    }

    #[test]
    fn test_container_status_serde_names() {
        let status: ContainerStatus = serde_json::from_str(r#""IN_PROGRESS""#).unwrap();
        assert_eq!(status, ContainerStatus::InProgress);
        let status: ContainerStatus = serde_json::from_str(r#""FINISHED""#).unwrap();
        assert_eq!(status, ContainerStatus::Finished);
        let status: ContainerStatus = serde_json::from_str(r#""EXPIRED""#).unwrap();
        assert_eq!(status, ContainerStatus::Expired);
    }

    #[test]
    fn test_quota_exhaustion() {
        assert!(!PublishQuota {
            quota_usage: 3,
            quota_total: 25
        }
        .is_exhausted());
        assert!(PublishQuota {
            quota_usage: 25,
            quota_total: 25
        }
        .is_exhausted());
        assert!(PublishQuota {
            quota_usage: 26,
            quota_total: 25
        }
        .is_exhausted());
    }

    #[test]
    fn test_credentials_expiry() {
        let now = Utc::now();
        let creds = Credentials::bearer("token").with_expiry(now + Duration::hours(1));
        assert!(!creds.is_expired_at(now));
        assert!(creds.is_expired_at(now + Duration::hours(2)));

        // No expiry recorded means never expired.
        assert!(!Credentials::bearer("token").is_expired_at(now));
    }

    #[test]
    fn test_credentials_builders() {
        let creds = Credentials::bearer("tok")
            .with_secret("sec")
            .with_account_id("178414");
        assert_eq!(creds.token, "tok");
        assert_eq!(creds.secret.as_deref(), Some("sec"));
        assert_eq!(creds.account_id.as_deref(), Some("178414"));
    }

    #[test]
    fn test_publish_result_constructors() {
        let ok = PublishResult::ok("1234567890");
        assert!(ok.success);
        assert_eq!(ok.platform_post_id.as_deref(), Some("1234567890"));
        assert!(ok.error.is_none());

        let failed = PublishResult::failure(PublishError::NoMedia);
        assert!(!failed.success);
        assert!(failed.platform_post_id.is_none());
        assert_eq!(failed.error, Some(PublishError::NoMedia));
    }

    #[test]
    fn test_media_file_mime() {
        let file = MediaFile::new("photo.jpg", jpeg_bytes(2000));
        assert_eq!(file.mime_type(), Some("image/jpeg"));
        assert_eq!(file.len(), 2000);
        assert!(!file.is_empty());
    }
}
