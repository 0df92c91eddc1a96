//! Wire protocol for the v2 chunked media upload and tweet creation
//!
//! The coordinator in the parent module only sees [`TwitterMediaApi`];
//! this file holds the remote-call seam plus the `reqwest`
//! implementation speaking the actual endpoints: JSON initialize,
//! multipart append, empty-body finalize, `command=STATUS` polling, and
//! the tweet create call.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PublishError;
use crate::types::{Credentials, MediaCategory, ProcessingState, ProcessingStatus};

/// The fallible remote calls the chunked-upload coordinator drives.
#[async_trait]
pub trait TwitterMediaApi: Send + Sync {
    /// INIT: declare size, MIME type, and category; returns the media id.
    async fn init_upload(
        &self,
        credentials: &Credentials,
        total_bytes: usize,
        media_type: &str,
        category: MediaCategory,
    ) -> Result<String, PublishError>;

    /// APPEND: send one chunk under the given segment index.
    async fn append_upload(
        &self,
        credentials: &Credentials,
        media_id: &str,
        chunk: &[u8],
        segment_index: usize,
    ) -> Result<(), PublishError>;

    /// FINALIZE: seal the chunk stream.
    async fn finalize_upload(
        &self,
        credentials: &Credentials,
        media_id: &str,
    ) -> Result<(), PublishError>;

    /// STATUS: fetch the server-side processing state.
    async fn upload_status(
        &self,
        credentials: &Credentials,
        media_id: &str,
    ) -> Result<ProcessingStatus, PublishError>;

    /// Create the post carrying the caption and uploaded media ids.
    async fn create_post(
        &self,
        credentials: &Credentials,
        text: &str,
        media_ids: &[String],
    ) -> Result<String, PublishError>;

    /// Probe whether the token is still accepted.
    async fn verify_credentials(&self, credentials: &Credentials) -> Result<(), PublishError>;
}

#[derive(Debug, Serialize)]
struct InitRequest<'a> {
    total_bytes: usize,
    media_type: &'a str,
    media_category: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitResponse {
    #[serde(default)]
    data: Option<InitData>,
}

#[derive(Debug, Deserialize)]
struct InitData {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    data: Option<StatusData>,
    #[serde(default)]
    error: Option<StatusError>,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    #[serde(default)]
    processing_info: Option<ProcessingInfo>,
}

#[derive(Debug, Deserialize)]
struct ProcessingInfo {
    state: ProcessingState,
    #[serde(default)]
    progress_percent: u8,
    #[serde(default)]
    check_after_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct StatusError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreatePostResponse {
    #[serde(default)]
    data: Option<CreatePostData>,
}

#[derive(Debug, Deserialize)]
struct CreatePostData {
    #[serde(default)]
    id: String,
}

/// `reqwest` implementation against the v2 API.
#[derive(Clone)]
pub struct TwitterHttpApi {
    client: Client,
    base_url: String,
}

impl TwitterHttpApi {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn request_failed(operation: &str, error: reqwest::Error) -> PublishError {
    PublishError::Protocol(format!("{} request failed: {}", operation, error))
}

fn bad_status(operation: &str, status: reqwest::StatusCode, body: &str) -> PublishError {
    PublishError::Protocol(format!(
        "bad status on {}: {}, response: {}",
        operation, status, body
    ))
}

#[async_trait]
impl TwitterMediaApi for TwitterHttpApi {
    async fn init_upload(
        &self,
        credentials: &Credentials,
        total_bytes: usize,
        media_type: &str,
        category: MediaCategory,
    ) -> Result<String, PublishError> {
        let response = self
            .client
            .post(self.url("/2/media/upload/initialize"))
            .bearer_auth(&credentials.token)
            .json(&InitRequest {
                total_bytes,
                media_type,
                media_category: category.as_upload_category(),
            })
            .send()
            .await
            .map_err(|e| request_failed("INIT", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_failed("INIT", e))?;
        debug!(%status, "INIT response");

        if status != reqwest::StatusCode::OK {
            return Err(bad_status("INIT", status, &body));
        }

        let parsed: InitResponse = serde_json::from_str(&body)
            .map_err(|e| PublishError::Protocol(format!("failed to parse INIT response: {}", e)))?;

        match parsed.data {
            Some(data) if !data.id.is_empty() => Ok(data.id),
            _ => Err(PublishError::Protocol(
                "INIT response did not contain a media id".to_string(),
            )),
        }
    }

    async fn append_upload(
        &self,
        credentials: &Credentials,
        media_id: &str,
        chunk: &[u8],
        segment_index: usize,
    ) -> Result<(), PublishError> {
        // Field names are fixed by the protocol: "media" for the chunk,
        // "segment_index" for its position.
        let form = Form::new()
            .part("media", Part::bytes(chunk.to_vec()).file_name("media.bin"))
            .text("segment_index", segment_index.to_string());

        let response = self
            .client
            .post(self.url(&format!("/2/media/upload/{}/append", media_id)))
            .bearer_auth(&credentials.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_failed("APPEND", e))?;

        let status = response.status();
        if status != reqwest::StatusCode::NO_CONTENT && status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(bad_status("APPEND", status, &body));
        }

        Ok(())
    }

    async fn finalize_upload(
        &self,
        credentials: &Credentials,
        media_id: &str,
    ) -> Result<(), PublishError> {
        let response = self
            .client
            .post(self.url(&format!("/2/media/upload/{}/finalize", media_id)))
            .bearer_auth(&credentials.token)
            .send()
            .await
            .map_err(|e| request_failed("FINALIZE", e))?;

        let status = response.status();
        debug!(%status, media_id, "FINALIZE response");
        if status != reqwest::StatusCode::NO_CONTENT && status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(bad_status("FINALIZE", status, &body));
        }

        Ok(())
    }

    async fn upload_status(
        &self,
        credentials: &Credentials,
        media_id: &str,
    ) -> Result<ProcessingStatus, PublishError> {
        let response = self
            .client
            .get(self.url("/2/media/upload"))
            .bearer_auth(&credentials.token)
            .query(&[("media_id", media_id), ("command", "STATUS")])
            .send()
            .await
            .map_err(|e| request_failed("STATUS", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_failed("STATUS", e))?;

        if status != reqwest::StatusCode::OK {
            return Err(bad_status("STATUS", status, &body));
        }

        let parsed: StatusResponse = serde_json::from_str(&body).map_err(|e| {
            PublishError::Protocol(format!("failed to parse STATUS response: {}", e))
        })?;

        let info = parsed
            .data
            .and_then(|d| d.processing_info)
            .ok_or_else(|| {
                PublishError::Protocol("STATUS response missing processing_info".to_string())
            })?;

        Ok(ProcessingStatus {
            state: info.state,
            progress_percent: info.progress_percent,
            check_after_secs: info.check_after_secs,
            error_message: parsed.error.map(|e| e.message),
        })
    }

    async fn create_post(
        &self,
        credentials: &Credentials,
        text: &str,
        media_ids: &[String],
    ) -> Result<String, PublishError> {
        let mut payload = serde_json::json!({ "text": text });
        if !media_ids.is_empty() {
            payload["media"] = serde_json::json!({ "media_ids": media_ids });
        }

        let response = self
            .client
            .post(self.url("/2/tweets"))
            .bearer_auth(&credentials.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| request_failed("post create", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_failed("post create", e))?;

        if status != reqwest::StatusCode::CREATED && status != reqwest::StatusCode::OK {
            return Err(bad_status("post create", status, &body));
        }

        let parsed: CreatePostResponse = serde_json::from_str(&body).map_err(|e| {
            PublishError::Protocol(format!("failed to parse post create response: {}", e))
        })?;

        match parsed.data {
            Some(data) if !data.id.is_empty() => Ok(data.id),
            _ => Err(PublishError::Protocol(
                "post create response did not contain a post id".to_string(),
            )),
        }
    }

    async fn verify_credentials(&self, credentials: &Credentials) -> Result<(), PublishError> {
        let response = self
            .client
            .get(self.url("/2/users/me"))
            .bearer_auth(&credentials.token)
            .send()
            .await
            .map_err(|e| request_failed("verify credentials", e))?;

        match response.status() {
            reqwest::StatusCode::OK => Ok(()),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Err(
                PublishError::CredentialsNotFound("tokens invalid or revoked".to_string()),
            ),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(bad_status("verify credentials", status, &body))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        let api = TwitterHttpApi::new(Client::new(), "https://api.example.test/");
        assert_eq!(
            api.url("/2/media/upload/initialize"),
            "https://api.example.test/2/media/upload/initialize"
        );
    }

    #[test]
    fn test_init_response_parsing() {
        let parsed: InitResponse =
            serde_json::from_str(r#"{"data":{"id":"1146654567674912769"}}"#).unwrap();
        assert_eq!(parsed.data.unwrap().id, "1146654567674912769");

        let parsed: InitResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(parsed.data.is_none());
    }

    #[test]
    fn test_status_response_parsing() {
        let body = r#"{
            "data": {
                "processing_info": {
                    "state": "in_progress",
                    "progress_percent": 45,
                    "check_after_secs": 10
                }
            }
        }"#;
        let parsed: StatusResponse = serde_json::from_str(body).unwrap();
        let info = parsed.data.unwrap().processing_info.unwrap();
        assert_eq!(info.state, ProcessingState::InProgress);
        assert_eq!(info.progress_percent, 45);
        assert_eq!(info.check_after_secs, Some(10));
    }

    #[test]
    fn test_status_response_with_error_message() {
        let body = r#"{
            "data": {"processing_info": {"state": "failed"}},
            "error": {"message": "InvalidMedia: unsupported codec"}
        }"#;
        let parsed: StatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.data.unwrap().processing_info.unwrap().state,
            ProcessingState::Failed
        );
        assert_eq!(
            parsed.error.unwrap().message,
            "InvalidMedia: unsupported codec"
        );
    }

    #[test]
    fn test_init_request_serialization() {
        let request = InitRequest {
            total_bytes: 10_485_760,
            media_type: "video/mp4",
            media_category: MediaCategory::Video.as_upload_category(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["total_bytes"], 10_485_760);
        assert_eq!(json["media_type"], "video/mp4");
        assert_eq!(json["media_category"], "tweet_video");
    }
}
