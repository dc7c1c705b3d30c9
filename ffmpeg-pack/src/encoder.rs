use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::process::Command;

use crate::rendition::{Protocol, RenditionSpec};

const DEFAULT_THREADS: u32 = 4;
const SEGMENT_SECONDS: u32 = 10;

/// Result of a successful rendition encode. The manifest path is derived
/// from the inputs, ffmpeg output is never parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenditionOutput {
    pub spec: RenditionSpec,
    pub protocol: Protocol,
    pub manifest_path: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeStage {
    DirectoryCreation,
    ProcessInvocation,
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("error creating {protocol} output directory {} for {rendition}: {source}", .path.display())]
    DirectoryCreation {
        rendition: String,
        protocol: Protocol,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error generating {protocol} manifest for {rendition}: {cause}")]
    ProcessInvocation {
        rendition: String,
        protocol: Protocol,
        cause: String,
    },
}

impl EncodeError {
    pub fn stage(&self) -> EncodeStage {
        match self {
            EncodeError::DirectoryCreation { .. } => EncodeStage::DirectoryCreation,
            EncodeError::ProcessInvocation { .. } => EncodeStage::ProcessInvocation,
        }
    }

    pub fn rendition(&self) -> &str {
        match self {
            EncodeError::DirectoryCreation { rendition, .. }
            | EncodeError::ProcessInvocation { rendition, .. } => rendition,
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            EncodeError::DirectoryCreation { protocol, .. }
            | EncodeError::ProcessInvocation { protocol, .. } => *protocol,
        }
    }
}

/// Produces one rendition of `input_file` for one protocol under
/// `output_root/<spec.name>/<protocol>/`.
#[async_trait]
pub trait RenditionEncoder: Send + Sync {
    async fn encode(
        &self,
        input_file: &str,
        spec: &RenditionSpec,
        protocol: Protocol,
        output_root: &Path,
    ) -> Result<RenditionOutput, EncodeError>;
}

/// Directory a rendition is written to.
pub fn rendition_dir(output_root: &Path, spec: &RenditionSpec, protocol: Protocol) -> PathBuf {
    output_root.join(&spec.name).join(protocol.token())
}

/// Runs the ffmpeg binary once per rendition.
#[derive(Clone, Debug)]
pub struct FfmpegEncoder {
    binary: String,
    threads: u32,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            threads: DEFAULT_THREADS,
        }
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    /// Fixed argument template: scale to the rendition size, AAC 128k audio
    /// at 48kHz, H.264 video capped at 1500k, 10 second segments.
    pub fn build_args(
        &self,
        input_file: &str,
        spec: &RenditionSpec,
        protocol: Protocol,
        manifest_path: &Path,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-threads".into(),
            self.threads.to_string(),
            "-i".into(),
            input_file.into(),
            "-vf".into(),
            format!("scale={}:{}", spec.width, spec.height),
            "-c:a".into(),
            "aac".into(),
            "-ar".into(),
            "48000".into(),
            "-b:a".into(),
            "128k".into(),
            "-c:v".into(),
            "h264".into(),
            "-b:v".into(),
            "1500k".into(),
            "-maxrate".into(),
            "1500k".into(),
            "-bufsize".into(),
            "3000k".into(),
        ];
        match protocol {
            Protocol::Hls => args.extend([
                "-hls_time".into(),
                SEGMENT_SECONDS.to_string(),
                "-hls_list_size".into(),
                "0".into(),
                "-f".into(),
                "hls".into(),
            ]),
            Protocol::Dash => args.extend([
                "-seg_duration".into(),
                SEGMENT_SECONDS.to_string(),
                "-adaptation_sets".into(),
                "id=0,streams=v id=1,streams=a".into(),
                "-f".into(),
                "dash".into(),
            ]),
        }
        args.push(manifest_path.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl RenditionEncoder for FfmpegEncoder {
    async fn encode(
        &self,
        input_file: &str,
        spec: &RenditionSpec,
        protocol: Protocol,
        output_root: &Path,
    ) -> Result<RenditionOutput, EncodeError> {
        let dir = rendition_dir(output_root, spec, protocol);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| EncodeError::DirectoryCreation {
                rendition: spec.name.clone(),
                protocol,
                path: dir.clone(),
                source,
            })?;

        let manifest_path = dir.join(protocol.manifest_file_name());
        let args = self.build_args(input_file, spec, protocol, &manifest_path);
        log::debug!("ffmpeg {} {}: {} {:?}", spec.name, protocol, self.binary, args);

        let status = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| EncodeError::ProcessInvocation {
                rendition: spec.name.clone(),
                protocol,
                cause: format!("failed to launch {}: {}", self.binary, e),
            })?;

        if !status.success() {
            return Err(EncodeError::ProcessInvocation {
                rendition: spec.name.clone(),
                protocol,
                cause: format!("{} exited with {}", self.binary, status),
            });
        }

        Ok(RenditionOutput {
            spec: spec.clone(),
            protocol,
            manifest_path,
        })
    }
}

#[cfg(test)]
#[path = "encoder_test.rs"]
mod encoder_test;
