use std::{net::SocketAddr, path::PathBuf, sync::LazyLock};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_OUTPUT_ROOT: &str = "./manifests-final";
const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";
const DEFAULT_FFMPEG_THREADS: u32 = 4;

pub struct PackagerConfig {
    listen_addr: SocketAddr,
    output_root: PathBuf,
    ffmpeg_bin: String,
    ffmpeg_threads: u32,
    // (token, subject)
    api_tokens: Vec<(String, String)>,
}

impl PackagerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from a key lookup, `PACKAGER_*` keys with defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("PACKAGER_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("invalid PACKAGER_LISTEN_ADDR: {}", e))?;

        let output_root = lookup("PACKAGER_OUTPUT_ROOT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_ROOT.to_string());

        let ffmpeg_bin = lookup("PACKAGER_FFMPEG_BIN")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_FFMPEG_BIN.to_string());

        let ffmpeg_threads = match lookup("PACKAGER_FFMPEG_THREADS") {
            Some(v) => {
                let threads = v
                    .parse::<u32>()
                    .map_err(|e| anyhow::anyhow!("invalid PACKAGER_FFMPEG_THREADS: {}", e))?;
                if threads == 0 {
                    return Err(anyhow::anyhow!("PACKAGER_FFMPEG_THREADS must be > 0"));
                }
                threads
            }
            None => DEFAULT_FFMPEG_THREADS,
        };

        let api_tokens = parse_tokens(&lookup("PACKAGER_API_TOKENS").unwrap_or_default())?;

        Ok(Self {
            listen_addr,
            output_root: PathBuf::from(output_root),
            ffmpeg_bin,
            ffmpeg_threads,
            api_tokens,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn output_root(&self) -> &PathBuf {
        &self.output_root
    }

    pub fn ffmpeg_bin(&self) -> &str {
        &self.ffmpeg_bin
    }

    pub fn ffmpeg_threads(&self) -> u32 {
        self.ffmpeg_threads
    }

    pub fn api_tokens(&self) -> &[(String, String)] {
        &self.api_tokens
    }
}

/// `token:subject,token2:subject2`
fn parse_tokens(raw: &str) -> anyhow::Result<Vec<(String, String)>> {
    let mut tokens = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (token, subject) = entry
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("invalid PACKAGER_API_TOKENS entry, expected token:subject"))?;
        if token.is_empty() || subject.is_empty() {
            return Err(anyhow::anyhow!(
                "invalid PACKAGER_API_TOKENS entry, token and subject must not be empty"
            ));
        }
        tokens.push((token.to_string(), subject.to_string()));
    }
    Ok(tokens)
}

pub fn config() -> &'static PackagerConfig {
    static CONFIG: LazyLock<PackagerConfig> = LazyLock::new(|| {
        PackagerConfig::from_env().unwrap_or_else(|e| {
            eprintln!("Error loading config: {:#}", e);
            std::process::exit(1);
        })
    });
    &CONFIG
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PackagerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.output_root(), &PathBuf::from("./manifests-final"));
        assert_eq!(config.ffmpeg_bin(), "ffmpeg");
        assert_eq!(config.ffmpeg_threads(), 4);
        assert!(config.api_tokens().is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = PackagerConfig::from_lookup(lookup_from(&[
            ("PACKAGER_LISTEN_ADDR", "127.0.0.1:9000"),
            ("PACKAGER_OUTPUT_ROOT", "/srv/packages"),
            ("PACKAGER_FFMPEG_BIN", "/opt/ffmpeg/bin/ffmpeg"),
            ("PACKAGER_FFMPEG_THREADS", "8"),
            ("PACKAGER_API_TOKENS", "abc:alice, def:bob"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr().port(), 9000);
        assert_eq!(config.output_root(), &PathBuf::from("/srv/packages"));
        assert_eq!(config.ffmpeg_bin(), "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.ffmpeg_threads(), 8);
        assert_eq!(
            config.api_tokens(),
            [
                ("abc".to_string(), "alice".to_string()),
                ("def".to_string(), "bob".to_string())
            ]
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(
            PackagerConfig::from_lookup(lookup_from(&[("PACKAGER_LISTEN_ADDR", "nope")])).is_err()
        );
        assert!(
            PackagerConfig::from_lookup(lookup_from(&[("PACKAGER_FFMPEG_THREADS", "0")])).is_err()
        );
        assert!(
            PackagerConfig::from_lookup(lookup_from(&[("PACKAGER_API_TOKENS", "missing-colon")]))
                .is_err()
        );
    }
}
