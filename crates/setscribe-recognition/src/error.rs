// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecognitionError>;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("failed to read audio clip: {0}")]
    ClipRead(#[from] std::io::Error),

    #[error("missing credentials for {0}")]
    MissingCredentials(&'static str),

    #[error("provider API error: {code} - {message}")]
    ApiError { code: i64, message: String },

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
