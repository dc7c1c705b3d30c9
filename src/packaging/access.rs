use std::path::{Path, PathBuf};

use ffmpeg_pack::{InvalidProtocol, Protocol};

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error(transparent)]
    InvalidProtocol(#[from] InvalidProtocol),
    #[error("invalid resolution {0:?}")]
    InvalidResolution(String),
    #[error("manifest {} not found", .0.display())]
    NotFound(PathBuf),
    #[error("error opening manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A manifest on disk and the protocol it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestFile {
    pub path: PathBuf,
    pub protocol: Protocol,
}

impl ManifestFile {
    pub fn content_type(&self) -> &'static str {
        self.protocol.content_type()
    }
}

/// Maps (protocol, resolution) requests onto the packaging output tree.
#[derive(Clone, Debug)]
pub struct ManifestAccess {
    output_root: PathBuf,
}

impl ManifestAccess {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// `output_root/<resolution>/<protocol>/manifest.<ext>`. The protocol is
    /// checked first so a bad token is always reported as such.
    pub fn resolve(&self, protocol: &str, resolution: &str) -> Result<ManifestFile, AccessError> {
        let protocol: Protocol = protocol.parse()?;
        if !is_plain_segment(resolution) {
            return Err(AccessError::InvalidResolution(resolution.to_string()));
        }
        Ok(ManifestFile {
            path: self
                .output_root
                .join(resolution)
                .join(protocol.token())
                .join(protocol.manifest_file_name()),
            protocol,
        })
    }

    /// `output_root/master.<ext>`.
    pub fn resolve_master(&self, protocol: &str) -> Result<ManifestFile, AccessError> {
        let protocol: Protocol = protocol.parse()?;
        Ok(ManifestFile {
            path: self.output_root.join(protocol.master_file_name()),
            protocol,
        })
    }

    pub async fn open(&self, manifest: &ManifestFile) -> Result<tokio::fs::File, AccessError> {
        tokio::fs::File::open(&manifest.path)
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => AccessError::NotFound(manifest.path.clone()),
                _ => AccessError::Io {
                    path: manifest.path.clone(),
                    source,
                },
            })
    }
}

// a single path component, no traversal
fn is_plain_segment(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\']) && !s.contains('\0')
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[test]
    fn test_resolve_paths() {
        let access = ManifestAccess::new("/srv/out");

        let hls = access.resolve("hls", "720p").unwrap();
        assert_eq!(hls.path, Path::new("/srv/out/720p/hls/manifest.m3u8"));
        assert_eq!(hls.content_type(), "application/vnd.apple.mpegurl");

        let dash = access.resolve("dash", "720p").unwrap();
        assert_eq!(dash.path, Path::new("/srv/out/720p/dash/manifest.mpd"));
        assert_eq!(dash.content_type(), "application/dash+xml");

        let master = access.resolve_master("dash").unwrap();
        assert_eq!(master.path, Path::new("/srv/out/master.mpd"));
    }

    #[test]
    fn test_invalid_protocol_wins() {
        let access = ManifestAccess::new("/srv/out");
        for token in ["rtmp", "", "HLS", "hls2"] {
            assert!(matches!(
                access.resolve(token, "720p"),
                Err(AccessError::InvalidProtocol(_))
            ));
        }
        assert!(matches!(
            access.resolve("smooth", "../../etc"),
            Err(AccessError::InvalidProtocol(_))
        ));
        assert!(matches!(
            access.resolve_master("webrtc"),
            Err(AccessError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn test_rejects_traversal() {
        let access = ManifestAccess::new("/srv/out");
        for resolution in ["", ".", "..", "../720p", "720p/hls", "a\\b"] {
            assert!(matches!(
                access.resolve("hls", resolution),
                Err(AccessError::InvalidResolution(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_open_existing_and_missing() {
        let root = tempfile::tempdir().unwrap();
        let access = ManifestAccess::new(root.path());

        let manifest = access.resolve("hls", "360p").unwrap();
        assert!(matches!(
            access.open(&manifest).await,
            Err(AccessError::NotFound(_))
        ));

        std::fs::create_dir_all(root.path().join("360p/hls")).unwrap();
        std::fs::write(&manifest.path, "#EXTM3U\n").unwrap();
        let mut file = access.open(&manifest).await.unwrap();
        let mut body = String::new();
        file.read_to_string(&mut body).await.unwrap();
        assert_eq!(body, "#EXTM3U\n");
    }
}
