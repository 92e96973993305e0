// SPDX-License-Identifier: GPL-3.0-or-later

//! External audio-recognition backends for the identification pipeline.
//!
//! This crate provides:
//! - The `RecognitionProvider` capability trait (one best guess per clip)
//! - The ACRCloud client (HMAC-signed multipart upload, native scoring)
//! - The Shazam client (base64 upload, binary hit/no-hit)
//! - A request rate limiter honouring per-provider quotas

pub mod acrcloud;
pub mod error;
pub mod provider;
pub mod rate_limiter;
pub mod shazam;

pub use acrcloud::AcrCloudClient;
pub use error::{RecognitionError, Result};
pub use provider::{build_provider, RecognitionProvider};
pub use rate_limiter::RateLimiter;
pub use shazam::ShazamClient;
