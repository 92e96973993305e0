// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use setscribe_config::{AppConfig, ProviderKind};
use setscribe_domain::TrackGuess;

use crate::acrcloud::AcrCloudClient;
use crate::error::Result;
use crate::shazam::ShazamClient;

/// Polymorphic recognition capability. Two interchangeable backends share
/// this contract; the fusion engine never sees past it.
#[async_trait]
pub trait RecognitionProvider: Send + Sync {
    /// Identify the clip at `clip`, returning the best-guess track or `None`
    /// when the provider reports no match.
    ///
    /// Errors carry the cause (network, auth, parse) for logging; the
    /// pipeline folds them into "no match for this chunk" and never retries
    /// within a run.
    async fn identify(&self, clip: &Path) -> Result<Option<TrackGuess>>;

    fn name(&self) -> &'static str;

    /// Seconds of audio this backend wants per sampling window.
    fn chunk_length(&self) -> u64;

    /// Mandatory delay between recognition requests.
    fn request_interval(&self) -> Duration;

    /// Whether the fusion confidence gate is meaningless for this backend.
    /// A binary hit/no-hit provider reports a fixed high score, so gating on
    /// it would be a no-op at best and a foot-gun at worst.
    fn bypasses_confidence_gate(&self) -> bool;
}

/// Build the configured provider. Exactly one backend is active per run.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn RecognitionProvider>> {
    let timeout = Duration::from_secs(config.recognition.request_timeout_secs);
    match config.recognition.provider {
        ProviderKind::AcrCloud => Ok(Arc::new(AcrCloudClient::from_config(
            &config.acrcloud,
            timeout,
        )?)),
        ProviderKind::Shazam => Ok(Arc::new(ShazamClient::from_config(
            &config.shazam,
            timeout,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setscribe_config::AppConfig;

    #[test]
    fn test_build_provider_requires_credentials() {
        // Default config carries no API keys.
        let config = AppConfig::default();
        assert!(build_provider(&config).is_err());
    }

    #[test]
    fn test_build_provider_shazam() {
        let mut config = AppConfig::default();
        config.shazam.api_key = Some("rapidapi-key".to_string());
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "shazam");
        assert_eq!(provider.chunk_length(), 5);
        assert!(provider.bypasses_confidence_gate());
    }

    #[test]
    fn test_build_provider_acrcloud() {
        let mut config = AppConfig::default();
        config.recognition.provider = ProviderKind::AcrCloud;
        config.acrcloud.access_key = Some("key".to_string());
        config.acrcloud.access_secret = Some("secret".to_string());
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "acrcloud");
        assert_eq!(provider.chunk_length(), 20);
        assert!(!provider.bypasses_confidence_gate());
    }
}
