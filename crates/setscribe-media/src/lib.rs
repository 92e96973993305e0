// SPDX-License-Identifier: GPL-3.0-or-later

//! Media-file access for the recognition pipeline.
//!
//! This crate provides:
//! - Duration probing of the source file (ffprobe)
//! - Fixed-stride chunk scheduling over the probed duration
//! - Per-chunk audio clip extraction (ffmpeg)

pub mod chunk;
pub mod error;
pub mod extract;
pub mod source;

pub use chunk::{chunk_plan, Chunk};
pub use error::{MediaError, Result};
pub use extract::extract_chunk;
pub use source::MediaSource;
