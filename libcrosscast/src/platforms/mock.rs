//! Mock publisher for testing
//!
//! A configurable stand-in for a real platform so dispatcher behavior
//! (routing, normalization, preconditions) can be exercised without
//! credentials or network access.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::PublishError;
use crate::platforms::Publisher;
use crate::types::{Credentials, MediaFile};

/// Configuration for mock publisher behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name reported by the mock (e.g. "mock-twitter")
    pub name: String,

    /// Post id returned on success
    pub post_id: String,

    /// Error returned by publish, if any
    pub publish_error: Option<PublishError>,

    /// Error returned by the credential check, if any
    pub credentials_error: Option<PublishError>,

    /// Delay before publish completes (simulates network latency)
    pub delay: Duration,

    /// Number of times publish has been called
    pub publish_call_count: Arc<Mutex<usize>>,

    /// Captions and file counts of every publish call, for verification
    pub published: Arc<Mutex<Vec<(String, usize)>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            post_id: "mock-post-1".to_string(),
            publish_error: None,
            credentials_error: None,
            delay: Duration::from_millis(0),
            publish_call_count: Arc::new(Mutex::new(0)),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock publisher for testing
pub struct MockPublisher {
    config: MockConfig,
}

impl MockPublisher {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Mock that always succeeds with the given post id.
    pub fn succeeding(name: &str, post_id: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            post_id: post_id.to_string(),
            ..MockConfig::default()
        })
    }

    /// Mock whose publish always fails with the given error.
    pub fn failing(name: &str, error: PublishError) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            publish_error: Some(error),
            ..MockConfig::default()
        })
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn validate_request(&self, caption: &str, files: &[MediaFile]) -> Result<(), PublishError> {
        if caption.trim().is_empty() && files.is_empty() {
            return Err(PublishError::NoMedia);
        }
        Ok(())
    }

    async fn check_credentials(&self, _credentials: &Credentials) -> Result<(), PublishError> {
        match &self.config.credentials_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn publish(
        &self,
        _credentials: &Credentials,
        caption: &str,
        files: &[MediaFile],
    ) -> Result<String, PublishError> {
        if self.config.delay > Duration::from_millis(0) {
            sleep(self.config.delay).await;
        }

        *self.config.publish_call_count.lock().unwrap() += 1;
        self.config
            .published
            .lock()
            .unwrap()
            .push((caption.to_string(), files.len()));

        match &self.config.publish_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.config.post_id.clone()),
        }
    }
}
