// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use setscribe_config::ShazamConfig;
use setscribe_domain::{ExternalIds, TrackGuess};
use tracing::{debug, trace};
use url::Url;

use crate::error::{RecognitionError, Result};
use crate::provider::RecognitionProvider;

const USER_AGENT: &str = concat!("Setscribe/", env!("CARGO_PKG_VERSION"));

const DETECT_URI: &str = "/songs/v3/detect";

/// Shazam (RapidAPI) identification client.
///
/// The endpoint takes the raw clip base64-encoded as a text body and answers
/// with a match list plus resource maps; assembling one track guess walks
/// shazam-song → album → artist → genre references. Shazam reports no
/// confidence score, so every hit carries a fixed score of 100 and the
/// fusion confidence gate is bypassed for this backend.
#[derive(Debug, Clone)]
pub struct ShazamClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_host: String,
    chunk_length: u64,
    request_interval: Duration,
}

impl ShazamClient {
    pub fn builder(api_key: impl Into<String>) -> ShazamClientBuilder {
        ShazamClientBuilder::new(api_key)
    }

    /// Build a client from the loaded configuration section.
    ///
    /// # Errors
    /// Returns `MissingCredentials` when the RapidAPI key is unset.
    pub fn from_config(config: &ShazamConfig, timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(RecognitionError::MissingCredentials("shazam.api_key"))?;

        Self::builder(api_key)
            .base_url(config.api_url.clone())
            .api_host(config.api_host.clone())
            .timeout(timeout)
            .chunk_length(config.chunk_length)
            .request_interval(Duration::from_millis(config.request_interval_ms))
            .build()
    }
}

#[async_trait]
impl RecognitionProvider for ShazamClient {
    async fn identify(&self, clip: &Path) -> Result<Option<TrackGuess>> {
        let audio = tokio::fs::read(clip).await?;
        let body = BASE64.encode(audio);

        let url = format!("{}{}", self.base_url, DETECT_URI);
        trace!(target: "recognition", "Shazam detect: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "text/plain")
            .header("x-rapidapi-host", &self.api_host)
            .header("x-rapidapi-key", &self.api_key)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        debug!(target: "recognition", "Shazam response status: {}", status);

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
        trace!(target: "recognition", "Shazam response: {}", body);

        let detect: DetectResponse = serde_json::from_str(&body)?;
        Ok(detect.into_guess())
    }

    fn name(&self) -> &'static str {
        "shazam"
    }

    fn chunk_length(&self) -> u64 {
        self.chunk_length
    }

    fn request_interval(&self) -> Duration {
        self.request_interval
    }

    fn bypasses_confidence_gate(&self) -> bool {
        true
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    matches: Vec<DetectMatch>,
    #[serde(default)]
    resources: Resources,
}

#[derive(Debug, Deserialize)]
struct DetectMatch {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Resources {
    #[serde(default, rename = "shazam-songs")]
    shazam_songs: HashMap<String, SongResource>,
    #[serde(default)]
    albums: HashMap<String, NamedResource>,
    #[serde(default)]
    artists: HashMap<String, NamedResource>,
}

#[derive(Debug, Deserialize)]
struct SongResource {
    #[serde(default)]
    attributes: SongAttributes,
    #[serde(default)]
    relationships: Relationships,
}

#[derive(Debug, Default, Deserialize)]
struct SongAttributes {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    genres: Genres,
}

#[derive(Debug, Default, Deserialize)]
struct Genres {
    #[serde(default)]
    primary: String,
}

#[derive(Debug, Default, Deserialize)]
struct Relationships {
    #[serde(default)]
    albums: RelatedIds,
    #[serde(default)]
    artists: RelatedIds,
}

#[derive(Debug, Default, Deserialize)]
struct RelatedIds {
    #[serde(default)]
    data: Vec<RelatedId>,
}

#[derive(Debug, Deserialize)]
struct RelatedId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    #[serde(default)]
    attributes: NamedAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct NamedAttributes {
    #[serde(default)]
    name: String,
}

impl DetectResponse {
    /// Resolve the first match through the resource maps: the match id keys
    /// a shazam-song, whose relationships key the album and artist maps.
    fn into_guess(self) -> Option<TrackGuess> {
        let best = self.matches.first()?;
        let song = self.resources.shazam_songs.get(&best.id)?;

        let album = song
            .relationships
            .albums
            .data
            .first()
            .and_then(|rel| self.resources.albums.get(&rel.id))
            .map(|a| a.attributes.name.clone())
            .unwrap_or_default();

        let mut artists: Vec<String> = song
            .relationships
            .artists
            .data
            .iter()
            .filter_map(|rel| self.resources.artists.get(&rel.id))
            .map(|a| a.attributes.name.clone())
            .filter(|name| !name.is_empty())
            .collect();
        // The flat subtitle is the fallback when the artist resources are
        // absent from the response.
        if artists.is_empty() && !song.attributes.artist.is_empty() {
            artists.push(song.attributes.artist.clone());
        }

        let genres = if song.attributes.genres.primary.is_empty() {
            Vec::new()
        } else {
            vec![song.attributes.genres.primary.clone()]
        };

        Some(TrackGuess {
            acrid: format!("shazam_{}", best.id),
            title: song.attributes.title.clone(),
            artists,
            album,
            label: song.attributes.label.clone(),
            release_date: String::new(),
            // A hit is binary; report the fixed high value.
            score: 100,
            play_offset_ms: 0,
            genres,
            external_ids: ExternalIds::default(),
        })
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug)]
pub struct ShazamClientBuilder {
    api_key: String,
    api_host: String,
    base_url: String,
    timeout: Duration,
    chunk_length: u64,
    request_interval: Duration,
}

impl ShazamClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_host: "shazam.p.rapidapi.com".to_string(),
            base_url: "https://shazam.p.rapidapi.com".to_string(),
            timeout: Duration::from_secs(30),
            chunk_length: 5,
            request_interval: Duration::from_millis(500),
        }
    }

    /// Set a custom base URL (useful for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = host.into();
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

    pub fn build(self) -> Result<ShazamClient> {
        Url::parse(&self.base_url).map_err(|e| {
            RecognitionError::InvalidResponse(format!("invalid base URL: {}", e))
        })?;

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(ShazamClient {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            api_key: self.api_key,
            api_host: self.api_host,
            chunk_length: self.chunk_length,
            request_interval: self.request_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_clip() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"fake mp3 bytes").unwrap();
        file
    }

    fn client_for(server: &MockServer) -> ShazamClient {
        ShazamClient::builder("rapidapi-key")
            .base_url(server.uri())
            .build()
            .unwrap()
    }

    fn hit_response() -> serde_json::Value {
        serde_json::json!({
            "matches": [{"id": "573015226", "offset": 1.2}],
            "resources": {
                "shazam-songs": {
                    "573015226": {
                        "id": "573015226",
                        "attributes": {
                            "title": "Pacific State",
                            "artist": "808 State",
                            "label": "ZTT",
                            "genres": {"primary": "Electronic"}
                        },
                        "relationships": {
                            "albums": {"data": [{"id": "1440833098"}]},
                            "artists": {"data": [{"id": "485991"}]}
                        }
                    }
                },
                "albums": {
                    "1440833098": {"attributes": {"name": "Ninety"}}
                },
                "artists": {
                    "485991": {"attributes": {"name": "808 State"}}
                }
            }
        })
    }

    #[tokio::test]
    async fn test_identify_resolves_resource_maps() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/songs/v3/detect"))
            .and(header("x-rapidapi-key", "rapidapi-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hit_response()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let clip = write_clip();
        let guess = client.identify(clip.path()).await.unwrap().unwrap();

        assert_eq!(guess.acrid, "shazam_573015226");
        assert_eq!(guess.title, "Pacific State");
        assert_eq!(guess.artists, vec!["808 State".to_string()]);
        assert_eq!(guess.album, "Ninety");
        assert_eq!(guess.genres, vec!["Electronic".to_string()]);
        assert_eq!(guess.score, 100);
    }

    #[tokio::test]
    async fn test_identify_no_matches_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/songs/v3/detect"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"matches": [], "retryms": 3000})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let clip = write_clip();
        assert!(client.identify(clip.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identify_falls_back_to_flat_artist() {
        // Artist resources missing: the song's own artist attribute is used.
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "matches": [{"id": "9"}],
            "resources": {
                "shazam-songs": {
                    "9": {
                        "id": "9",
                        "attributes": {"title": "Strings of Life", "artist": "Rhythim Is Rhythim"}
                    }
                }
            }
        });
        Mock::given(method("POST"))
            .and(path("/songs/v3/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let clip = write_clip();
        let guess = client.identify(clip.path()).await.unwrap().unwrap();
        assert_eq!(guess.artists, vec!["Rhythim Is Rhythim".to_string()]);
        assert_eq!(guess.album, "");
    }

    #[tokio::test]
    async fn test_identify_quota_exhausted_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/songs/v3/detect"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let clip = write_clip();
        assert!(matches!(
            client.identify(clip.path()).await.unwrap_err(),
            RecognitionError::ApiError { code: 429, .. }
        ));
    }
}
