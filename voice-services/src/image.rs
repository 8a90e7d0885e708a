use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};

const USER_AGENT: &str = concat!("voice-capture/", env!("CARGO_PKG_VERSION"));

const MAX_BACKOFF: Duration = Duration::from_secs(16);

/// Client for the remote image-generation service.
///
/// `POST {base}/v1/images/generations`, then downloads the returned URL
/// into the configured image directory as
/// `generated_image_<timestamp>.png`.
pub struct ImageClient {
    client: reqwest::Client,
    config: ServiceConfig,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    response_format: &'a str,
    n: u32,
}

#[derive(Deserialize)]
struct GenerationResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: String,
}

impl ImageClient {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Generate an image from a text prompt and save it locally.
    ///
    /// Returns the path of the downloaded PNG.
    pub async fn generate(&self, prompt: &str) -> Result<PathBuf> {
        let url = format!("{}/v1/images/generations", self.config.base_url);
        let mut attempt: u32 = 0;
        let image_url = loop {
            match self.request_generation(&url, prompt).await {
                Ok(image_url) => break image_url,
                Err(e) if !e.is_retryable() || attempt >= self.config.retry_count => {
                    return Err(e);
                }
                Err(e) => {
                    let backoff = Duration::from_secs(1u64 << attempt.min(4)).min(MAX_BACKOFF);
                    log::warn!(
                        "image generation attempt {}/{} failed ({}); retrying in {:?}",
                        attempt + 1,
                        self.config.retry_count + 1,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        };

        self.download(&image_url).await
    }

    async fn request_generation(&self, url: &str, prompt: &str) -> Result<String> {
        let body = GenerationRequest {
            model: &self.config.image_model,
            prompt,
            size: &self.config.image_size,
            quality: &self.config.image_quality,
            response_format: "url",
            n: 1,
        };

        let response = self
            .client
            .post(url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout
                } else {
                    ServiceError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ServiceError::AuthenticationFailure);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;

        body.data
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| ServiceError::InvalidResponse("no image in response".into()))
    }

    async fn download(&self, image_url: &str) -> Result<PathBuf> {
        let response = self
            .client
            .get(image_url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout
                } else {
                    ServiceError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: format!("image download failed: {}", image_url),
            });
        }

        let payload = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        tokio::fs::create_dir_all(&self.config.image_directory)
            .await
            .map_err(|e| {
                ServiceError::Io(format!(
                    "{}: {}",
                    self.config.image_directory.display(),
                    e
                ))
            })?;

        let file_name = format!("generated_image_{}.png", Local::now().format("%Y%m%d%H%M%S"));
        let path = self.config.image_directory.join(file_name);
        tokio::fs::write(&path, &payload)
            .await
            .map_err(|e| ServiceError::Io(format!("{}: {}", path.display(), e)))?;

        log::info!("image saved to {}", path.display());
        Ok(path)
    }
}
