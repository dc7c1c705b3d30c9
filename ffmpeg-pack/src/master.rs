use std::path::{Path, PathBuf};

use crate::rendition::{Ladder, Protocol, RenditionSpec};

/// Nominal bandwidth advertised for every rendition, matches the fixed
/// `-b:v 1500k` of the encoder template.
pub const NOMINAL_BANDWIDTH: u64 = 1_500_000;

#[derive(Debug, thiserror::Error)]
#[error("error writing master manifest {}: {source}", .path.display())]
pub struct ManifestWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Relative location of a rendition manifest from the output root.
/// Always `/` separated since it ends up in playlists and URLs.
pub fn rendition_manifest_ref(spec: &RenditionSpec, protocol: Protocol) -> String {
    format!(
        "{}/{}/{}",
        spec.name,
        protocol.token(),
        protocol.manifest_file_name()
    )
}

/// Renders the master manifest for `protocol`, listing the ladder in order.
pub fn render_master(ladder: &Ladder, protocol: Protocol) -> String {
    match protocol {
        Protocol::Hls => render_hls(ladder),
        Protocol::Dash => render_dash(ladder),
    }
}

fn render_hls(ladder: &Ladder) -> String {
    let mut out = String::from("#EXTM3U\n");
    for spec in ladder.iter() {
        out.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}\n",
            NOMINAL_BANDWIDTH, spec.width, spec.height
        ));
        out.push_str(&rendition_manifest_ref(spec, Protocol::Hls));
        out.push('\n');
    }
    out
}

const MPD_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" profiles="urn:mpeg:dash:profile:isoff-live:2011" type="static" mediaPresentationDuration="PT0H20M0.00S" minBufferTime="PT1.5S">
  <Period>
    <AdaptationSet mimeType="video/mp4" segmentAlignment="true" startWithSAP="1" bitstreamSwitching="true">
"#;

const MPD_TAIL: &str = r#"    </AdaptationSet>
  </Period>
</MPD>
"#;

fn render_dash(ladder: &Ladder) -> String {
    let mut out = String::from(MPD_HEAD);
    for spec in ladder.iter() {
        let base = format!("{}/{}", spec.name, Protocol::Dash.token());
        out.push_str(&format!(
            concat!(
                "      <Representation id=\"{id}\" width=\"{w}\" height=\"{h}\" bandwidth=\"{bw}\">\n",
                "        <BaseURL>{base}/</BaseURL>\n",
                "        <SegmentTemplate media=\"manifest$Number$.m4s\" initialization=\"manifest-init.mp4\" startNumber=\"1\" />\n",
                "      </Representation>\n",
            ),
            id = spec.name,
            w = spec.width,
            h = spec.height,
            bw = NOMINAL_BANDWIDTH,
            base = base,
        ));
    }
    out.push_str(MPD_TAIL);
    out
}

/// Writes `output_root/master.<ext>` and returns its path.
pub async fn synthesize_master(
    output_root: &Path,
    ladder: &Ladder,
    protocol: Protocol,
) -> Result<PathBuf, ManifestWriteError> {
    let path = output_root.join(protocol.master_file_name());
    let body = render_master(ladder, protocol);
    tokio::fs::write(&path, body.as_bytes())
        .await
        .map_err(|source| ManifestWriteError {
            path: path.clone(),
            source,
        })?;
    log::info!(
        "wrote {} master manifest with {} renditions: {}",
        protocol,
        ladder.renditions().len(),
        path.display()
    );
    Ok(path)
}
