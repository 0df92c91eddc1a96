//! Media staging for platforms that fetch media by URL
//!
//! Instagram's container protocol does not accept raw bytes; it fetches
//! media from a public URL. The [`MediaStager`] seam covers "store these
//! bytes, give me a fetchable URL" and is the only place the pipeline
//! touches object storage.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::PublishError;

/// Object storage capability consumed by the Instagram path.
#[async_trait]
pub trait MediaStager: Send + Sync {
    /// Store `bytes` under a fresh key and return a publicly fetchable
    /// URL.
    ///
    /// # Errors
    ///
    /// [`PublishError::Storage`] on any upload failure.
    async fn store(
        &self,
        bytes: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<String, PublishError>;
}

/// File extension the staged object key gets for a sniffed MIME type.
fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => ".png",
        "image/gif" => ".gif",
        "video/mp4" => ".mp4",
        // Platform CDNs key off Content-Type, not the suffix.
        _ => ".jpg",
    }
}

/// Collision-free object key: a UUID plus a type-appropriate extension.
fn object_key(mime_type: &str) -> String {
    format!("{}{}", Uuid::new_v4(), extension_for(mime_type))
}

/// Stager backed by an HTTP bucket gateway: PUT the bytes, serve them
/// from a public base URL.
pub struct HttpBucketStager {
    client: Client,
    endpoint: String,
    public_base_url: String,
    token: Option<String>,
}

impl HttpBucketStager {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        public_base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl MediaStager for HttpBucketStager {
    async fn store(
        &self,
        bytes: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<String, PublishError> {
        let key = object_key(mime_type);
        debug!(filename, %key, mime_type, size = bytes.len(), "staging media");

        let mut request = self
            .client
            .put(format!("{}/{}", self.endpoint, key))
            .header("Content-Type", mime_type)
            .body(bytes.to_vec());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PublishError::Storage(format!("failed to stage {}: {}", filename, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Storage(format!(
                "staging {} returned status {}: {}",
                filename, status, body
            )));
        }

        let public_url = format!("{}/{}", self.public_base_url, key);
        info!(filename, %public_url, "media staged");
        Ok(public_url)
    }
}

/// In-memory stager for tests and demos: records every stored object
/// and hands back deterministic URLs.
#[derive(Default)]
pub struct MemoryStager {
    stored: Mutex<Vec<StoredObject>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
    pub url: String,
}

impl MemoryStager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> Vec<StoredObject> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStager for MemoryStager {
    async fn store(
        &self,
        bytes: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<String, PublishError> {
        let mut stored = self.stored.lock().unwrap();
        let url = format!("memory://staged/{}-{}", stored.len(), filename);
        stored.push(StoredObject {
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len(),
            url: url.clone(),
        });
        Ok(url)
    }
}
