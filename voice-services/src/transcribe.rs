use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, StatusCode};
use serde::Deserialize;

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};

const USER_AGENT: &str = concat!("voice-capture/", env!("CARGO_PKG_VERSION"));

/// Upper bound on one retry backoff step.
const MAX_BACKOFF: Duration = Duration::from_secs(16);

/// Client for the remote speech-to-text service.
///
/// `POST {base}/v1/audio/transcriptions` with a multipart WAV upload.
/// Transient failures (network, timeout, 5xx) are retried with capped
/// exponential backoff; a 401 is reported as
/// [`ServiceError::AuthenticationFailure`] immediately.
pub struct TranscriptionClient {
    client: reqwest::Client,
    config: ServiceConfig,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl TranscriptionClient {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Transcribe a saved recording, with a caller-provided language hint.
    pub async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<String> {
        let audio = tokio::fs::read(audio_path)
            .await
            .map_err(|e| ServiceError::Io(format!("{}: {}", audio_path.display(), e)))?;
        let audio = Bytes::from(audio);

        let url = format!("{}/v1/audio/transcriptions", self.config.base_url);
        let mut attempt: u32 = 0;
        loop {
            match self.send_request(&url, audio.clone(), language).await {
                Ok(text) => return Ok(text),
                Err(e) if !e.is_retryable() || attempt >= self.config.retry_count => {
                    return Err(e);
                }
                Err(e) => {
                    let backoff = Duration::from_secs(1u64 << attempt.min(4)).min(MAX_BACKOFF);
                    log::warn!(
                        "transcription attempt {}/{} failed ({}); retrying in {:?}",
                        attempt + 1,
                        self.config.retry_count + 1,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_request(&self, url: &str, audio: Bytes, language: &str) -> Result<String> {
        let file_part = reqwest::multipart::Part::stream(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.config.transcribe_model.clone())
            .text("language", language.to_string())
            .text("response_format", "json")
            .part("file", file_part);

        let response = self
            .client
            .post(url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .timeout(self.config.request_timeout)
            .multipart(form)
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

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;

        if body.text.trim().is_empty() {
            return Err(ServiceError::InvalidResponse(
                "empty transcription text".into(),
            ));
        }
        Ok(body.text)
    }
}
