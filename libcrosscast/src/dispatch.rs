//! Platform publish dispatching
//!
//! The single entry point of the pipeline: parse the platform name,
//! enforce the precondition every platform shares, route to the
//! platform's [`Publisher`], and normalize every failure into a
//! [`PublishResult`]. Platform-specific error types never cross this
//! boundary, and the dispatcher itself never retries; retry safety is
//! a coordinator-local concern.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::credentials::CredentialProvider;
use crate::error::{ConfigError, CrosscastError, PublishError};
use crate::platforms::instagram::InstagramPublisher;
use crate::platforms::twitter::TwitterPublisher;
use crate::platforms::{PlatformKind, Publisher};
use crate::types::{Credentials, MediaFile, PublishResult};

/// Routes publish requests to the closed set of platform publishers.
pub struct Dispatcher {
    twitter: Box<dyn Publisher>,
    instagram: Box<dyn Publisher>,
}

impl Dispatcher {
    /// Build a dispatcher from explicit publishers (tests swap in
    /// mocks here).
    pub fn new(twitter: Box<dyn Publisher>, instagram: Box<dyn Publisher>) -> Self {
        Self { twitter, instagram }
    }

    /// Build the real publishers from configuration, sharing one HTTP
    /// client.
    ///
    /// Instagram needs a stager to serve media by URL; enabling it
    /// without a `[stager]` section is a configuration error. A platform
    /// left unconfigured still parses but fails at publish time.
    pub fn from_config(
        config: &Config,
        client: reqwest::Client,
        stager_token: Option<String>,
    ) -> Result<Self, CrosscastError> {
        let twitter: Box<dyn Publisher> = match &config.twitter {
            Some(twitter_config) if twitter_config.enabled => Box::new(
                TwitterPublisher::from_config(client.clone(), twitter_config),
            ),
            _ => Box::new(Unconfigured(PlatformKind::Twitter)),
        };

        let instagram: Box<dyn Publisher> = match &config.instagram {
            Some(instagram_config) if instagram_config.enabled => {
                let stager_config = config.stager.as_ref().ok_or_else(|| {
                    ConfigError::MissingField("stager (required for instagram)".to_string())
                })?;
                Box::new(InstagramPublisher::from_config(
                    client,
                    instagram_config,
                    stager_config,
                    stager_token,
                ))
            }
            _ => Box::new(Unconfigured(PlatformKind::Instagram)),
        };

        Ok(Self::new(twitter, instagram))
    }

    fn publisher_for(&self, kind: PlatformKind) -> &dyn Publisher {
        match kind {
            PlatformKind::Twitter => self.twitter.as_ref(),
            PlatformKind::Instagram => self.instagram.as_ref(),
        }
    }

    /// Publish to one platform. Never returns a platform error; every
    /// failure lands in the result's `error` field.
    pub async fn publish(
        &self,
        platform: &str,
        credentials: &Credentials,
        caption: &str,
        files: &[MediaFile],
    ) -> PublishResult {
        let kind: PlatformKind = match platform.parse() {
            Ok(kind) => kind,
            Err(error) => return PublishResult::failure(error),
        };

        // Common precondition: a post needs text or media.
        if caption.trim().is_empty() && files.is_empty() {
            return PublishResult::failure(PublishError::NoMedia);
        }

        let publisher = self.publisher_for(kind);
        if let Err(error) = publisher.validate_request(caption, files) {
            return PublishResult::failure(error);
        }

        info!(platform = %kind, files = files.len(), "publishing");
        match publisher.publish(credentials, caption, files).await {
            Ok(post_id) => {
                info!(platform = %kind, %post_id, "publish succeeded");
                PublishResult::ok(post_id)
            }
            Err(error) => {
                warn!(platform = %kind, %error, "publish failed");
                PublishResult::failure(error)
            }
        }
    }

    /// Fetch credentials for the user and publish in one step.
    pub async fn publish_for_user(
        &self,
        provider: &dyn CredentialProvider,
        user_id: &str,
        platform: &str,
        caption: &str,
        files: &[MediaFile],
    ) -> PublishResult {
        let kind: PlatformKind = match platform.parse() {
            Ok(kind) => kind,
            Err(error) => return PublishResult::failure(error),
        };
        match provider.credentials(user_id, kind).await {
            Ok(credentials) => self.publish(platform, &credentials, caption, files).await,
            Err(error) => PublishResult::failure(error),
        }
    }

    /// Probe whether the platform still accepts the credentials.
    pub async fn check_credentials(
        &self,
        platform: &str,
        credentials: &Credentials,
    ) -> Result<(), PublishError> {
        let kind: PlatformKind = platform.parse()?;
        self.publisher_for(kind).check_credentials(credentials).await
    }
}

/// Placeholder for a platform present in the closed set but absent from
/// the configuration.
struct Unconfigured(PlatformKind);

impl Unconfigured {
    fn error(&self) -> PublishError {
        PublishError::UnsupportedPlatform(format!("{} is not configured", self.0))
    }
}

#[async_trait]
impl Publisher for Unconfigured {
    fn name(&self) -> &str {
        self.0.as_str()
    }

    fn validate_request(&self, _caption: &str, _files: &[MediaFile]) -> Result<(), PublishError> {
        Err(self.error())
    }

    async fn check_credentials(&self, _credentials: &Credentials) -> Result<(), PublishError> {
        Err(self.error())
    }

    async fn publish(
        &self,
        _credentials: &Credentials,
        _caption: &str,
        _files: &[MediaFile],
    ) -> Result<String, PublishError> {
        Err(self.error())
    }
}
