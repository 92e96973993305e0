// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use setscribe_config::AcrCloudConfig;
use setscribe_domain::{ExternalIds, TrackGuess};
use sha1::Sha1;
use tracing::{debug, trace};
use url::Url;

use crate::error::{RecognitionError, Result};
use crate::provider::RecognitionProvider;

const USER_AGENT: &str = concat!("Setscribe/", env!("CARGO_PKG_VERSION"));

const IDENTIFY_URI: &str = "/v1/identify";
const DATA_TYPE: &str = "audio";
const SIGNATURE_VERSION: &str = "1";
/// ACRCloud's "no result" status; everything else nonzero is a real error.
const STATUS_NO_RESULT: i64 = 1001;

/// ACRCloud identification client.
///
/// Requests are authenticated with a time-scoped HMAC-SHA1 signature over
/// the method, URI, access key, data type, signature version and timestamp,
/// submitted as a multipart upload alongside the audio sample.
#[derive(Debug, Clone)]
pub struct AcrCloudClient {
    client: Client,
    base_url: String,
    access_key: String,
    access_secret: String,
    chunk_length: u64,
    request_interval: Duration,
}

impl AcrCloudClient {
    /// Create a client builder for custom configuration.
    pub fn builder(
        access_key: impl Into<String>,
        access_secret: impl Into<String>,
    ) -> AcrCloudClientBuilder {
        AcrCloudClientBuilder::new(access_key, access_secret)
    }

    /// Build a client from the loaded configuration section.
    ///
    /// # Errors
    /// Returns `MissingCredentials` when the access key or secret is unset.
    pub fn from_config(config: &AcrCloudConfig, timeout: Duration) -> Result<Self> {
        let access_key = config
            .access_key
            .clone()
            .ok_or(RecognitionError::MissingCredentials("acrcloud.access_key"))?;
        let access_secret = config
            .access_secret
            .clone()
            .ok_or(RecognitionError::MissingCredentials(
                "acrcloud.access_secret",
            ))?;

        Self::builder(access_key, access_secret)
            .base_url(config.host.clone())
            .timeout(timeout)
            .chunk_length(config.chunk_length)
            .request_interval(Duration::from_millis(config.request_interval_ms))
            .build()
    }

    /// Generate the base64 HMAC-SHA1 request signature.
    fn sign(&self, string_to_sign: &str) -> String {
        let mut mac = Hmac::<Sha1>::new_from_slice(self.access_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(string_to_sign.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    async fn submit(&self, audio: Vec<u8>) -> Result<AcrResponse> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs()
            .to_string();

        let string_to_sign = format!(
            "POST\n{}\n{}\n{}\n{}\n{}",
            IDENTIFY_URI, self.access_key, DATA_TYPE, SIGNATURE_VERSION, timestamp
        );
        let signature = self.sign(&string_to_sign);

        let sample_bytes = audio.len().to_string();
        let sample = Part::bytes(audio)
            .file_name("chunk.mp3")
            .mime_str("audio/mpeg")
            .map_err(RecognitionError::RequestFailed)?;

        let form = Form::new()
            .part("sample", sample)
            .text("access_key", self.access_key.clone())
            .text("sample_bytes", sample_bytes)
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("data_type", DATA_TYPE)
            .text("signature_version", SIGNATURE_VERSION);

        let url = format!("{}{}", self.base_url, IDENTIFY_URI);
        trace!(target: "recognition", "ACRCloud identify: {}", url);

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        debug!(target: "recognition", "ACRCloud response status: {}", status);

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RecognitionError::ApiError {
                code: status.as_u16() as i64,
                message,
            });
        }

        let body = response.text().await?;
        trace!(target: "recognition", "ACRCloud response: {}", body);

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RecognitionProvider for AcrCloudClient {
    async fn identify(&self, clip: &Path) -> Result<Option<TrackGuess>> {
        let audio = tokio::fs::read(clip).await?;
        let response = self.submit(audio).await?;

        match response.status.code {
            0 => {}
            STATUS_NO_RESULT => return Ok(None),
            code => {
                return Err(RecognitionError::ApiError {
                    code,
                    message: response.status.msg,
                })
            }
        }

        let music = response
            .metadata
            .and_then(|m| m.music.into_iter().next());

        Ok(music.map(AcrMusic::into_guess))
    }

    fn name(&self) -> &'static str {
        "acrcloud"
    }

    fn chunk_length(&self) -> u64 {
        self.chunk_length
    }

    fn request_interval(&self) -> Duration {
        self.request_interval
    }

    fn bypasses_confidence_gate(&self) -> bool {
        false
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct AcrResponse {
    status: AcrStatus,
    #[serde(default)]
    metadata: Option<AcrMetadata>,
}

#[derive(Debug, Deserialize)]
struct AcrStatus {
    code: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct AcrMetadata {
    #[serde(default)]
    music: Vec<AcrMusic>,
}

#[derive(Debug, Deserialize)]
struct AcrMusic {
    #[serde(default)]
    acrid: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artists: Vec<AcrNamed>,
    #[serde(default)]
    album: Option<AcrNamed>,
    #[serde(default)]
    label: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    play_offset_ms: u64,
    #[serde(default)]
    genres: Vec<AcrNamed>,
    #[serde(default)]
    external_metadata: Option<AcrExternalMetadata>,
}

#[derive(Debug, Deserialize)]
struct AcrNamed {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AcrExternalMetadata {
    #[serde(default)]
    spotify: Option<AcrExternalResource>,
    #[serde(default)]
    deezer: Option<AcrExternalResource>,
}

#[derive(Debug, Deserialize)]
struct AcrExternalResource {
    #[serde(default)]
    track: Option<AcrExternalTrack>,
}

#[derive(Debug, Deserialize)]
struct AcrExternalTrack {
    // Spotify ids are strings, Deezer ids are numbers.
    #[serde(default)]
    id: Option<serde_json::Value>,
}

fn external_id(resource: Option<AcrExternalResource>) -> Option<String> {
    match resource?.track?.id? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl AcrMusic {
    fn into_guess(self) -> TrackGuess {
        let (spotify, deezer) = match self.external_metadata {
            Some(ext) => (external_id(ext.spotify), external_id(ext.deezer)),
            None => (None, None),
        };

        TrackGuess {
            acrid: self.acrid,
            title: self.title,
            artists: self.artists.into_iter().map(|a| a.name).collect(),
            album: self.album.map(|a| a.name).unwrap_or_default(),
            label: self.label,
            release_date: self.release_date,
            score: self.score.round().clamp(0.0, 100.0) as u8,
            play_offset_ms: self.play_offset_ms,
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            external_ids: ExternalIds { spotify, deezer },
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug)]
pub struct AcrCloudClientBuilder {
    access_key: String,
    access_secret: String,
    base_url: String,
    timeout: Duration,
    chunk_length: u64,
    request_interval: Duration,
}

impl AcrCloudClientBuilder {
    pub fn new(access_key: impl Into<String>, access_secret: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            access_secret: access_secret.into(),
            base_url: "https://identify-us-west-2.acrcloud.com".to_string(),
            timeout: Duration::from_secs(30),
            chunk_length: 20,
            request_interval: Duration::from_millis(200),
        }
    }

    /// Set a custom base URL (useful for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn chunk_length(mut self, seconds: u64) -> Self {
        self.chunk_length = seconds;
        self
    }

    pub fn request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    pub fn build(self) -> Result<AcrCloudClient> {
        Url::parse(&self.base_url).map_err(|e| {
            RecognitionError::InvalidResponse(format!("invalid base URL: {}", e))
        })?;

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(AcrCloudClient {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            access_key: self.access_key,
            access_secret: self.access_secret,
            chunk_length: self.chunk_length,
            request_interval: self.request_interval,
        })
    }
}
