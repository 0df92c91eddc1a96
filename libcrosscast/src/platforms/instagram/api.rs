//! Wire protocol for the Instagram Graph publishing API
//!
//! Container create, carousel create, status, publish, and the
//! publishing-limit lookup, behind the [`InstagramGraphApi`] seam the
//! coordinator drives. The Graph API takes its parameters as query
//! strings and reports errors in a JSON envelope; an error flagged
//! `is_transient` surfaces as [`PublishError::Transient`] so the
//! carousel-create path can retry it.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::PublishError;
use crate::types::{ContainerStatus, Credentials, PublishQuota};

/// How a container describes its media to the Graph API.
///
/// Images send no `media_type`; standalone videos are published as
/// short-form `REELS`; videos inside a carousel keep the generic
/// `VIDEO` designation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstagramMediaType {
    Image,
    Video,
    Reels,
}

impl InstagramMediaType {
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            InstagramMediaType::Image => None,
            InstagramMediaType::Video => Some("VIDEO"),
            InstagramMediaType::Reels => Some("REELS"),
        }
    }

    pub fn is_video(&self) -> bool {
        !matches!(self, InstagramMediaType::Image)
    }
}

/// Everything one container-create call needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub media_url: String,
    pub media_type: InstagramMediaType,
    /// Caption goes only on the single/parent container, never on
    /// carousel children.
    pub caption: Option<String>,
    pub is_carousel_item: bool,
}

/// The fallible remote calls the container coordinator drives.
#[async_trait]
pub trait InstagramGraphApi: Send + Sync {
    /// Fetch the account's publishing-quota snapshot.
    async fn publishing_limit(
        &self,
        credentials: &Credentials,
        ig_user_id: &str,
    ) -> Result<PublishQuota, PublishError>;

    /// Create one media container; returns the container id.
    async fn create_container(
        &self,
        credentials: &Credentials,
        ig_user_id: &str,
        spec: &ContainerSpec,
    ) -> Result<String, PublishError>;

    /// Create a carousel container referencing finished children, in
    /// order; returns the carousel container id.
    async fn create_carousel(
        &self,
        credentials: &Credentials,
        ig_user_id: &str,
        caption: &str,
        children: &[String],
    ) -> Result<String, PublishError>;

    /// Current lifecycle state of a container.
    async fn container_status(
        &self,
        credentials: &Credentials,
        container_id: &str,
    ) -> Result<ContainerStatus, PublishError>;

    /// Publish a finished container; returns the media post id.
    async fn publish_container(
        &self,
        credentials: &Credentials,
        ig_user_id: &str,
        creation_id: &str,
    ) -> Result<String, PublishError>;

    /// Probe whether the token is still accepted.
    async fn verify_credentials(&self, credentials: &Credentials) -> Result<(), PublishError>;
}

#[derive(Debug, Deserialize)]
struct QuotaResponse {
    #[serde(default)]
    quota_usage: u32,
    #[serde(default)]
    config: QuotaConfig,
}

#[derive(Debug, Default, Deserialize)]
struct QuotaConfig {
    #[serde(default)]
    quota_total: u32,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status_code: ContainerStatus,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: Option<GraphError>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    is_transient: bool,
}

/// Map a non-success Graph response onto the taxonomy.
fn graph_error(operation: &str, status: reqwest::StatusCode, body: &str) -> PublishError {
    if let Ok(envelope) = serde_json::from_str::<GraphErrorEnvelope>(body) {
        if let Some(error) = envelope.error {
            if error.is_transient {
                return PublishError::Transient(format!("{}: {}", operation, error.message));
            }
            return PublishError::Protocol(format!(
                "{} failed with status {}: {}",
                operation, status, error.message
            ));
        }
    }
    PublishError::Protocol(format!(
        "{} failed with status {}: {}",
        operation, status, body
    ))
}

fn request_failed(operation: &str, error: reqwest::Error) -> PublishError {
    PublishError::Protocol(format!("{} request failed: {}", operation, error))
}

/// `reqwest` implementation against a versioned Graph API base.
#[derive(Clone)]
pub struct InstagramHttpApi {
    client: Client,
    base_url: String,
}

impl InstagramHttpApi {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn parse_id(
        operation: &str,
        response: reqwest::Response,
    ) -> Result<String, PublishError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_failed(operation, e))?;

        if !status.is_success() {
            return Err(graph_error(operation, status, &body));
        }

        let parsed: IdResponse = serde_json::from_str(&body).map_err(|e| {
            PublishError::Protocol(format!("failed to parse {} response: {}", operation, e))
        })?;
        if parsed.id.is_empty() {
            return Err(PublishError::Protocol(format!(
                "{} response did not contain an id",
                operation
            )));
        }
        Ok(parsed.id)
    }
}

#[async_trait]
impl InstagramGraphApi for InstagramHttpApi {
    async fn publishing_limit(
        &self,
        credentials: &Credentials,
        ig_user_id: &str,
    ) -> Result<PublishQuota, PublishError> {
        let response = self
            .client
            .get(self.url(&format!("{}/content_publishing_limit", ig_user_id)))
            .query(&[
                ("fields", "quota_usage,rate_limit_settings"),
                ("access_token", credentials.token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| request_failed("publishing limit", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_failed("publishing limit", e))?;

        if !status.is_success() {
            return Err(graph_error("publishing limit", status, &body));
        }

        let parsed: QuotaResponse = serde_json::from_str(&body).map_err(|e| {
            PublishError::Protocol(format!("failed to parse publishing limit: {}", e))
        })?;

        Ok(PublishQuota {
            quota_usage: parsed.quota_usage,
            quota_total: parsed.config.quota_total,
        })
    }

    async fn create_container(
        &self,
        credentials: &Credentials,
        ig_user_id: &str,
        spec: &ContainerSpec,
    ) -> Result<String, PublishError> {
        let mut query: Vec<(String, String)> = vec![(
            "access_token".to_string(),
            credentials.token.clone(),
        )];
        if spec.media_type.is_video() {
            query.push(("video_url".to_string(), spec.media_url.clone()));
        } else {
            query.push(("image_url".to_string(), spec.media_url.clone()));
        }
        if let Some(media_type) = spec.media_type.as_param() {
            query.push(("media_type".to_string(), media_type.to_string()));
        }
        if spec.is_carousel_item {
            query.push(("is_carousel_item".to_string(), "true".to_string()));
        } else if let Some(caption) = &spec.caption {
            query.push(("caption".to_string(), caption.clone()));
        }

        debug!(ig_user_id, media_type = ?spec.media_type, carousel_item = spec.is_carousel_item, "creating container");

        let response = self
            .client
            .post(self.url(&format!("{}/media", ig_user_id)))
            .query(&query)
            .send()
            .await
            .map_err(|e| request_failed("container create", e))?;

        Self::parse_id("container create", response).await
    }

    async fn create_carousel(
        &self,
        credentials: &Credentials,
        ig_user_id: &str,
        caption: &str,
        children: &[String],
    ) -> Result<String, PublishError> {
        let mut query: Vec<(String, String)> = vec![
            ("access_token".to_string(), credentials.token.clone()),
            ("media_type".to_string(), "CAROUSEL".to_string()),
            ("caption".to_string(), caption.to_string()),
        ];
        for (index, child) in children.iter().enumerate() {
            query.push((format!("children[{}]", index), child.clone()));
        }

        let response = self
            .client
            .post(self.url(&format!("{}/media", ig_user_id)))
            .query(&query)
            .send()
            .await
            .map_err(|e| request_failed("carousel create", e))?;

        Self::parse_id("carousel create", response).await
    }

    async fn container_status(
        &self,
        credentials: &Credentials,
        container_id: &str,
    ) -> Result<ContainerStatus, PublishError> {
        let response = self
            .client
            .get(self.url(container_id))
            .query(&[
                ("fields", "status_code"),
                ("access_token", credentials.token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| request_failed("container status", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_failed("container status", e))?;

        if !status.is_success() {
            return Err(graph_error("container status", status, &body));
        }

        let parsed: StatusResponse = serde_json::from_str(&body).map_err(|e| {
            PublishError::Protocol(format!("failed to parse container status: {}", e))
        })?;
        Ok(parsed.status_code)
    }

    async fn publish_container(
        &self,
        credentials: &Credentials,
        ig_user_id: &str,
        creation_id: &str,
    ) -> Result<String, PublishError> {
        let response = self
            .client
            .post(self.url(&format!("{}/media_publish", ig_user_id)))
            .query(&[
                ("access_token", credentials.token.as_str()),
                ("creation_id", creation_id),
            ])
            .send()
            .await
            .map_err(|e| request_failed("media publish", e))?;

        Self::parse_id("media publish", response).await
    }

    async fn verify_credentials(&self, credentials: &Credentials) -> Result<(), PublishError> {
        let response = self
            .client
            .get(self.url("me"))
            .query(&[
                ("fields", "id"),
                ("access_token", credentials.token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| request_failed("verify credentials", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(PublishError::CredentialsNotFound(
                "tokens have been revoked, please connect the account again".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_params() {
        assert_eq!(InstagramMediaType::Image.as_param(), None);
        assert_eq!(InstagramMediaType::Video.as_param(), Some("VIDEO"));
        assert_eq!(InstagramMediaType::Reels.as_param(), Some("REELS"));
        assert!(!InstagramMediaType::Image.is_video());
        assert!(InstagramMediaType::Video.is_video());
        assert!(InstagramMediaType::Reels.is_video());
    }

    #[test]
    fn test_quota_response_parsing() {
        let body = r#"{"quota_usage": 3, "config": {"quota_total": 25}}"#;
        let parsed: QuotaResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.quota_usage, 3);
        assert_eq!(parsed.config.quota_total, 25);
    }

    #[test]
    fn test_status_response_parsing() {
        let parsed: StatusResponse =
            serde_json::from_str(r#"{"status_code": "FINISHED"}"#).unwrap();
        assert_eq!(parsed.status_code, ContainerStatus::Finished);
    }

    #[test]
    fn test_graph_error_transient_flag() {
        let body = r#"{"error": {"message": "Please retry your request later", "is_transient": true}}"#;
        let error = graph_error(
            "carousel create",
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body,
        );
        assert!(matches!(error, PublishError::Transient(_)));
    }

    #[test]
    fn test_graph_error_permanent() {
        let body = r#"{"error": {"message": "Invalid parameter", "is_transient": false}}"#;
        let error = graph_error("container create", reqwest::StatusCode::BAD_REQUEST, body);
        match error {
            PublishError::Protocol(msg) => assert!(msg.contains("Invalid parameter")),
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_graph_error_unparseable_body() {
        let error = graph_error(
            "container create",
            reqwest::StatusCode::BAD_GATEWAY,
            "<html>bad gateway</html>",
        );
        assert!(matches!(error, PublishError::Protocol(_)));
    }

    #[test]
    fn test_base_url_trimmed() {
        let api = InstagramHttpApi::new(Client::new(), "https://graph.example.test/v24.0/");
        assert_eq!(
            api.url("17841400000000000/media"),
            "https://graph.example.test/v24.0/17841400000000000/media"
        );
    }
}
