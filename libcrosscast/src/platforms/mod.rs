//! Platform abstraction and implementations
//!
//! Each supported platform provides one implementation of the
//! [`Publisher`] capability: validate a request, check credentials, and
//! turn a caption plus media files into a platform post id. The
//! dispatcher selects an implementation once per publish; coordinators
//! never know about each other.

use async_trait::async_trait;
use std::str::FromStr;

use crate::error::PublishError;
use crate::types::{Credentials, MediaFile};

pub mod instagram;
pub mod twitter;

// Mock publisher is available for all builds (not just tests) to support
// integration tests
pub mod mock;

/// The closed set of platforms the pipeline can publish to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    Twitter,
    Instagram,
}

impl PlatformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Twitter => "twitter",
            PlatformKind::Instagram => "instagram",
        }
    }
}

impl FromStr for PlatformKind {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twitter" | "x" => Ok(PlatformKind::Twitter),
            "instagram" => Ok(PlatformKind::Instagram),
            other => Err(PublishError::UnsupportedPlatform(other.to_string())),
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publishing capability of a single platform.
///
/// Credentials are passed into every call as an immutable value; an
/// implementation holds only its HTTP client and endpoint configuration,
/// so one instance can serve any number of accounts concurrently.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Lowercase platform identifier (e.g. "twitter").
    fn name(&self) -> &str;

    /// Platform-specific request validation, run before any network
    /// call.
    ///
    /// # Errors
    ///
    /// Returns the taxonomy error the request would inevitably hit, e.g.
    /// [`PublishError::NoMedia`] for an Instagram request without files
    /// or [`PublishError::UnsupportedMedia`] for a payload the platform
    /// cannot accept.
    fn validate_request(
        &self,
        caption: &str,
        files: &[MediaFile],
    ) -> Result<(), PublishError>;

    /// Probe whether the credentials are still accepted by the platform.
    ///
    /// # Errors
    ///
    /// [`PublishError::CredentialsNotFound`] for revoked or expired
    /// tokens, [`PublishError::Protocol`] for anything else unexpected.
    async fn check_credentials(&self, credentials: &Credentials) -> Result<(), PublishError>;

    /// Publish a caption plus media files, returning the platform post
    /// id.
    ///
    /// Implementations drive their platform's full upload pipeline; the
    /// first error aborts the publish and no post-create call is made
    /// after a failed upload.
    async fn publish(
        &self,
        credentials: &Credentials,
        caption: &str,
        files: &[MediaFile],
    ) -> Result<String, PublishError>;
}
