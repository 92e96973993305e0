// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to run {tool}: {source}")]
    ToolSpawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("ffprobe could not determine a duration for {path}: {detail}")]
    Probe { path: PathBuf, detail: String },

    #[error("source {path} has zero or unparseable duration")]
    EmptyDuration { path: PathBuf },

    #[error("ffmpeg failed to extract chunk at {start_time}s: {detail}")]
    Extraction { start_time: u64, detail: String },
}
