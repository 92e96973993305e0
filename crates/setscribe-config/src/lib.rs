// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Which recognition backend a run uses. Exactly one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    AcrCloud,
    Shazam,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "acrcloud" | "acr" => Ok(ProviderKind::AcrCloud),
            "shazam" => Ok(ProviderKind::Shazam),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::AcrCloud => write!(f, "acrcloud"),
            ProviderKind::Shazam => write!(f, "shazam"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcrCloudConfig {
    pub host: String,
    pub access_key: Option<String>,
    pub access_secret: Option<String>,
    /// Seconds of audio per sampling window. ACRCloud scores degrade below
    /// ~10s of material, so the window is coarse.
    pub chunk_length: u64,
    pub request_interval_ms: u64,
}

impl Default for AcrCloudConfig {
    fn default() -> Self {
        Self {
            host: "https://identify-us-west-2.acrcloud.com".to_string(),
            access_key: None,
            access_secret: None,
            chunk_length: 20,
            request_interval_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShazamConfig {
    pub api_url: String,
    pub api_host: String,
    pub api_key: Option<String>,
    /// The RapidAPI endpoint caps the request body, so Shazam windows are
    /// short.
    pub chunk_length: u64,
    pub request_interval_ms: u64,
}

impl Default for ShazamConfig {
    fn default() -> Self {
        Self {
            api_url: "https://shazam.p.rapidapi.com".to_string(),
            api_host: "shazam.p.rapidapi.com".to_string(),
            api_key: None,
            chunk_length: 5,
            request_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    pub provider: ProviderKind,
    /// Seconds between chunk starts. May exceed or undercut the chunk
    /// length, permitting gaps or overlap.
    pub chunk_stride: u64,
    /// Minimum provider score (0-100) for a raw match to survive the
    /// confidence gate. Lowered for rare vinyl.
    pub min_confidence: u8,
    /// Consecutive matches required to confirm a track.
    pub min_consecutive: u32,
    pub request_timeout_secs: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Shazam,
            chunk_stride: 30,
            min_confidence: 30,
            min_consecutive: 2,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub recognition: RecognitionConfig,
    pub acrcloud: AcrCloudConfig,
    pub shazam: ShazamConfig,
    pub output: OutputConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: SETSCRIBE_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("SETSCRIBE_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}
