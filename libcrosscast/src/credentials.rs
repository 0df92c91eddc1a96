//! Credential access for the publishing pipeline
//!
//! The pipeline consumes credentials through the [`CredentialProvider`]
//! seam: "give me valid credentials for this user on this platform".
//! How tokens got there (OAuth handshakes, refresh, secure storage) is a
//! collaborator's concern and stays outside this crate.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::PublishError;
use crate::platforms::PlatformKind;
use crate::types::Credentials;

/// Source of per-user, per-platform credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fetch valid credentials for `user_id` on `platform`.
    ///
    /// # Errors
    ///
    /// [`PublishError::CredentialsNotFound`] when the account is not
    /// linked or the stored token has expired.
    async fn credentials(
        &self,
        user_id: &str,
        platform: PlatformKind,
    ) -> Result<Credentials, PublishError>;
}

/// In-memory provider, used by the CLI (tokens read from files at
/// startup) and by tests.
///
/// Expiry is enforced here, before any network call: handing out a
/// token known to be expired would only move the failure to the first
/// platform request.
#[derive(Default)]
pub struct StaticCredentialProvider {
    entries: HashMap<(String, PlatformKind), Credentials>,
}

impl StaticCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        user_id: impl Into<String>,
        platform: PlatformKind,
        credentials: Credentials,
    ) {
        self.entries.insert((user_id.into(), platform), credentials);
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credentials(
        &self,
        user_id: &str,
        platform: PlatformKind,
    ) -> Result<Credentials, PublishError> {
        let credentials = self
            .entries
            .get(&(user_id.to_string(), platform))
            .ok_or_else(|| {
                PublishError::CredentialsNotFound(format!(
                    "no {} credentials linked for user {}",
                    platform, user_id
                ))
            })?;

        if credentials.is_expired() {
            return Err(PublishError::CredentialsNotFound(format!(
                "{} token expired for user {}",
                platform, user_id
            )));
        }

        Ok(credentials.clone())
    }
}

/// Read a token from a file, expanding `~` and trimming whitespace.
///
/// # Errors
///
/// [`PublishError::CredentialsNotFound`] if the file is missing,
/// unreadable, or empty.
pub fn load_token_file(path: &str) -> Result<String, PublishError> {
    let expanded = shellexpand::full(path).map_err(|e| {
        PublishError::CredentialsNotFound(format!("failed to expand token file path: {}", e))
    })?;

    let token = std::fs::read_to_string(expanded.as_ref())
        .map_err(|e| {
            PublishError::CredentialsNotFound(format!(
                "failed to read token file {}: {}",
                expanded, e
            ))
        })?
        .trim()
        .to_string();

    if token.is_empty() {
        return Err(PublishError::CredentialsNotFound(format!(
            "token file {} is empty",
            expanded
        )));
    }

    Ok(token)
}
