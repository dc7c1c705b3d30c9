use std::{collections::HashMap, sync::Arc};

use ffmpeg_pack::{EncodeError, Ladder, Protocol, RenditionEncoder, synthesize_master};
use tokio::task::JoinSet;

use crate::packaging::{MasterManifests, PackagingError, PackagingOutcome, PackagingRequest};

/// Runs one packaging request over the whole ladder.
pub struct Packager {
    encoder: Arc<dyn RenditionEncoder>,
    ladder: Ladder,
}

impl Packager {
    pub fn new(encoder: Arc<dyn RenditionEncoder>, ladder: Ladder) -> Self {
        Self { encoder, ladder }
    }

    pub fn ladder(&self) -> &Ladder {
        &self.ladder
    }

    /// Encodes every (rendition, protocol) pair concurrently, waits for all of
    /// them, then writes both master manifests if none failed.
    pub async fn package(&self, request: &PackagingRequest) -> PackagingOutcome {
        let mut units = JoinSet::new();
        let mut unit_names = HashMap::new();

        for spec in self.ladder.iter() {
            for protocol in Protocol::ALL {
                let encoder = Arc::clone(&self.encoder);
                let spec = spec.clone();
                let input_file = request.input_file.clone();
                let output_root = request.output_root.clone();
                let name = spec.name.clone();
                let handle = units.spawn(async move {
                    encoder
                        .encode(&input_file, &spec, protocol, &output_root)
                        .await
                });
                unit_names.insert(handle.id(), (name, protocol));
            }
        }
        log::info!(
            "packaging {}: started {} encode units",
            request.input_file,
            units.len()
        );

        // a failed unit never aborts its siblings
        let mut errors = Vec::new();
        while let Some(joined) = units.join_next_with_id().await {
            match joined {
                Ok((_, Ok(output))) => {
                    log::debug!(
                        "packaging {}: {} {} done: {}",
                        request.input_file,
                        output.spec.name,
                        output.protocol,
                        output.manifest_path.display()
                    );
                }
                Ok((_, Err(e))) => {
                    log::warn!("packaging {}: {}", request.input_file, e);
                    errors.push(e);
                }
                Err(join_err) => {
                    let (rendition, protocol) = unit_names
                        .remove(&join_err.id())
                        .unwrap_or_else(|| ("unknown".to_string(), Protocol::Hls));
                    log::error!(
                        "packaging {}: {} {} unit aborted: {}",
                        request.input_file,
                        rendition,
                        protocol,
                        join_err
                    );
                    errors.push(EncodeError::ProcessInvocation {
                        rendition,
                        protocol,
                        cause: format!("encode unit aborted: {}", join_err),
                    });
                }
            }
        }

        if !errors.is_empty() {
            return Err(PackagingError::Encode { errors });
        }

        let hls = synthesize_master(&request.output_root, &self.ladder, Protocol::Hls);
        let dash = synthesize_master(&request.output_root, &self.ladder, Protocol::Dash);
        let (hls, dash) = futures::future::join(hls, dash).await;
        Ok(MasterManifests {
            hls: hls?,
            dash: dash?,
        })
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod orchestrator_test;
