//! Episode publishing through the hosting platform's REST API.
//!
//! Publishing is three calls: create a draft episode carrying title and
//! description, attach the MP3 as a multipart upload, then flip the draft
//! to published. The publish response carries the public episode URL the
//! pipeline writes back to the board.

use super::{PublishAdapter, UploadReceipt};
use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::podcast::ConvertedPodcast;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const PUBLISH_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct CreateEpisodeRequest<'a> {
    title: &'a str,
    description: &'a str,
}

/// Episode resource as the hosting API returns it. `public_url` is only
/// present once the episode is published.
#[derive(Debug, Deserialize)]
struct EpisodeResponse {
    id: String,
    #[serde(default)]
    public_url: Option<String>,
}

/// `PublishAdapter` backed by the hosting platform's REST API.
pub struct HostingApiPublisher {
    client: Client,
    endpoint: String,
    api_token: String,
}

impl HostingApiPublisher {
    pub fn new(config: &PublishConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .connect_timeout(PUBLISH_HTTP_CONNECT_TIMEOUT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| PublishError::RequestFailed(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn episodes_url(&self) -> String {
        format!("{}/episodes", self.endpoint)
    }

    fn episode_url(&self, episode_id: &str, action: &str) -> String {
        format!("{}/episodes/{}/{}", self.endpoint, episode_id, action)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_token)
    }

    async fn create_draft(&self, title: &str, description: &str) -> Result<String, PublishError> {
        let request = CreateEpisodeRequest { title, description };
        let response = self
            .client
            .post(self.episodes_url())
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await
            .map_err(map_publish_http_error)?;
        let response = require_success(response, "create episode").await?;

        let episode: EpisodeResponse = response
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(format!("create episode: {e}")))?;
        debug!(episode_id = %episode.id, "Draft episode created");
        Ok(episode.id)
    }

    async fn attach_audio(
        &self,
        episode_id: &str,
        podcast: &ConvertedPodcast,
    ) -> Result<(), PublishError> {
        let bytes = tokio::fs::read(&podcast.mp3_path)
            .await
            .map_err(|e| PublishError::Io {
                path: podcast.mp3_path.clone(),
                reason: e.to_string(),
            })?;
        let file_name = podcast
            .mp3_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "episode.mp3".to_string());

        debug!(
            episode_id,
            bytes = bytes.len(),
            file = %file_name,
            "Uploading episode audio"
        );

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| PublishError::RequestFailed(format!("audio part: {e}")))?;
        let form = Form::new().part("audio", part);

        let response = self
            .client
            .post(self.episode_url(episode_id, "audio"))
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(map_publish_http_error)?;

        // Rejections here are about the file itself, so they carry the
        // platform's message verbatim.
        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    PublishError::AuthFailed(message)
                }
                _ => PublishError::UploadRejected {
                    status: status.as_u16(),
                    message,
                },
            });
        }
        Ok(())
    }

    async fn publish_draft(&self, episode_id: &str) -> Result<String, PublishError> {
        let response = self
            .client
            .post(self.episode_url(episode_id, "publish"))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(map_publish_http_error)?;
        let response = require_success(response, "publish episode").await?;

        let episode: EpisodeResponse = response
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(format!("publish episode: {e}")))?;
        episode.public_url.ok_or_else(|| {
            PublishError::InvalidResponse("published episode has no public URL".to_string())
        })
    }
}

#[async_trait]
impl PublishAdapter for HostingApiPublisher {
    async fn upload_episode(
        &self,
        podcast: &ConvertedPodcast,
        title: &str,
        description: &str,
    ) -> Result<UploadReceipt, PublishError> {
        if self.endpoint.is_empty() {
            return Err(PublishError::RequestFailed(
                "hosting endpoint is not configured".to_string(),
            ));
        }

        let episode_id = self.create_draft(title, description).await?;
        self.attach_audio(&episode_id, podcast).await?;
        let episode_url = self.publish_draft(&episode_id).await?;

        info!(episode_id, episode_url = %episode_url, "Episode published");
        Ok(UploadReceipt { episode_url })
    }
}

async fn require_success(response: Response, context: &str) -> Result<Response, PublishError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublishError::AuthFailed(text),
        _ => PublishError::RequestFailed(format!("{context} failed with status {status}: {text}")),
    })
}

fn map_publish_http_error(error: reqwest::Error) -> PublishError {
    if error.is_timeout() {
        PublishError::RequestFailed(format!("Request timeout: {error}"))
    } else if error.is_connect() {
        PublishError::RequestFailed(format!("Connection error: {error}"))
    } else {
        PublishError::RequestFailed(format!("HTTP error: {error}"))
    }
}
