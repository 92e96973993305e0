// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Media(#[from] setscribe_media::MediaError),

    #[error(transparent)]
    Recognition(#[from] setscribe_recognition::RecognitionError),

    #[error(transparent)]
    Artifact(#[from] setscribe_artifact::ArtifactError),

    #[error("source duration {duration}s does not fit a single {chunk_length}s sampling window")]
    SourceTooShort { duration: u64, chunk_length: u64 },

    #[error("failed to create clip directory: {0}")]
    ClipDir(#[source] std::io::Error),

    #[error("run cancelled")]
    Cancelled,
}
