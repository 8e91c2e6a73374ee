//! Voice API HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::error::{VoiceError, VoiceResult};
use crate::types::{
    extension_for_format, SpeechRequest, DEFAULT_MODEL_ID, DEFAULT_OUTPUT_FORMAT,
    DEFAULT_VOICE_ID,
};

/// Something that turns text into encoded audio bytes.
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    /// Synthesize `text`. Returns the encoded audio.
    async fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>>;

    /// File extension of the returned audio.
    fn output_extension(&self) -> &str {
        "mp3"
    }

    /// Whether the backend has credentials; unconfigured backends are never called.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Configuration for the voice client.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Base URL of the voice API
    pub base_url: String,
    /// API key (`xi-api-key` header)
    pub api_key: Option<String>,
    /// Voice to render with
    pub voice_id: String,
    /// Synthesis model
    pub model_id: String,
    /// Requested `output_format`
    pub output_format: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            api_key: None,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl VoiceConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("ELEVENLABS_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("ELEVENLABS_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            voice_id: std::env::var("ELEVENLABS_VOICE_ID").unwrap_or(defaults.voice_id),
            model_id: std::env::var("ELEVENLABS_MODEL_ID").unwrap_or(defaults.model_id),
            output_format: defaults.output_format,
            timeout: Duration::from_secs(
                std::env::var("ELEVENLABS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

/// ElevenLabs text-to-speech client.
pub struct ElevenLabsClient {
    http: Client,
    config: VoiceConfig,
}

impl ElevenLabsClient {
    /// Create a new client.
    pub fn new(config: VoiceConfig) -> VoiceResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(VoiceError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> VoiceResult<Self> {
        Self::new(VoiceConfig::from_env())
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.voice_id
        )
    }
}

#[async_trait]
impl SpeechSynthesis for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(VoiceError::NotConfigured)?;

        let url = self.endpoint();
        debug!("Requesting speech for {} characters from {}", text.len(), url);

        let response = self
            .http
            .post(&url)
            .query(&[("output_format", self.config.output_format.as_str())])
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", api_key)
            .json(&SpeechRequest::new(text, &self.config.model_id))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!("Voice API returned {}", status);
            return Err(VoiceError::from_status(status.as_u16(), body));
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        if bytes.is_empty() {
            return Err(VoiceError::EmptyAudio);
        }

        Ok(bytes.to_vec())
    }

    fn output_extension(&self) -> &str {
        extension_for_format(&self.config.output_format)
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}

impl ElevenLabsClient {
    fn classify(&self, err: reqwest::Error) -> VoiceError {
        if err.is_timeout() {
            VoiceError::Timeout(self.config.timeout.as_secs())
        } else {
            VoiceError::Network(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, key: Option<&str>) -> ElevenLabsClient {
        ElevenLabsClient::new(VoiceConfig {
            base_url: server.uri(),
            api_key: key.map(str::to_string),
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = VoiceConfig::default();
        assert_eq!(config.voice_id, "pNInz6obpgDQGcFmaJgB");
        assert_eq!(config.model_id, "eleven_turbo_v2_5");
        assert_eq!(config.output_format, "mp3_22050_32");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_synthesize_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/pNInz6obpgDQGcFmaJgB"))
            .and(query_param("output_format", "mp3_22050_32"))
            .and(header("xi-api-key", "secret"))
            .and(header("accept", "audio/mpeg"))
            .and(body_partial_json(serde_json::json!({
                "text": "Hello world",
                "model_id": "eleven_turbo_v2_5"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let audio = client.synthesize("Hello world").await.unwrap();
        assert_eq!(audio, b"ID3audio");
        assert_eq!(client.output_extension(), "mp3");
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("bad"))
            .synthesize("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::Unauthorized));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limit_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k")).synthesize("hi").await.unwrap_err();
        assert!(matches!(err, VoiceError::RateLimited));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k")).synthesize("hi").await.unwrap_err();
        assert!(matches!(err, VoiceError::EmptyAudio));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k")).synthesize("hi").await.unwrap_err();
        assert!(matches!(err, VoiceError::Timeout(2)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(!client.is_configured());
        let err = client.synthesize("hi").await.unwrap_err();
        assert!(matches!(err, VoiceError::NotConfigured));
    }
}
