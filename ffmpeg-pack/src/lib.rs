//! ffmpeg driven HLS/DASH packaging primitives: the resolution ladder, one
//! ffmpeg invocation per (rendition, protocol) and the master manifests that
//! tie the renditions together.

use std::process::Stdio;

use tokio::process::Command;

pub mod encoder;
pub mod master;
pub mod rendition;

pub use encoder::{EncodeError, EncodeStage, FfmpegEncoder, RenditionEncoder, RenditionOutput};
pub use master::{ManifestWriteError, render_master, synthesize_master};
pub use rendition::{InvalidProtocol, Ladder, LadderError, Protocol, RenditionSpec};

/// Checks that the ffmpeg binary can be launched. Call once at startup so a
/// missing transcoder is reported before any task is accepted.
pub async fn init(binary: &str) -> anyhow::Result<()> {
    let status = Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| anyhow::anyhow!("failed to launch {}: {}", binary, e))?;
    if !status.success() {
        return Err(anyhow::anyhow!("{} -version exited with {}", binary, status));
    }
    log::debug!("ffmpeg binary {} is available", binary);
    Ok(())
}
