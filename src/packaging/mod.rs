//! Packaging pipeline: one input file fanned out over the ladder and both
//! protocols, master manifests written only when every rendition succeeded.
//!
//! ```text
//!                  ┌─► 360p/hls  ─┐
//!                  ├─► 360p/dash ─┤
//! PackagingRequest ┼─► ...       ─┼─► barrier ─► errors? ─► Failed
//!                  ├─► 1080p/hls ─┤                 │
//!                  └─► 1080p/dash─┘                 └─► master.m3u8 + master.mpd
//! ```

use std::path::PathBuf;

use ffmpeg_pack::{EncodeError, ManifestWriteError};

pub mod access;
pub mod orchestrator;

#[derive(Clone, Debug)]
pub struct PackagingRequest {
    pub input_file: String,
    pub output_root: PathBuf,
}

/// Master manifest locations of a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasterManifests {
    pub hls: PathBuf,
    pub dash: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    /// Every unit failure in completion order; never empty.
    #[error("{} (encode failures: {})", .errors[0], .errors.len())]
    Encode { errors: Vec<EncodeError> },
    #[error(transparent)]
    Synthesis(#[from] ManifestWriteError),
}

pub type PackagingOutcome = Result<MasterManifests, PackagingError>;
