use std::path::PathBuf;
use std::time::Duration;

/// Configuration handed explicitly to each service client.
///
/// Replaces the original design's module-global client singleton: every
/// collaborator call happens against a config the caller owns.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bearer token for the remote API.
    pub api_key: String,

    /// Base URL without a trailing slash.
    pub base_url: String,

    pub transcribe_model: String,

    pub image_model: String,
    pub image_size: String,
    pub image_quality: String,

    /// Directory where generated images are written (created if absent).
    pub image_directory: PathBuf,

    pub connect_timeout: Duration,
    pub request_timeout: Duration,

    /// Retries for transient failures (0 = single attempt).
    pub retry_count: u32,
}

impl ServiceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com".into(),
            transcribe_model: "gpt-4o-mini-transcribe".into(),
            image_model: "dall-e-3".into(),
            image_size: "1024x1024".into(),
            image_quality: "hd".into(),
            image_directory: PathBuf::from("img"),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
            retry_count: 2,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_image_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_directory = dir.into();
        self
    }
}
