use std::{
    collections::HashSet,
    fmt::{Display, Formatter},
    str::FromStr,
};

/// One rung of the resolution ladder.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenditionSpec {
    // "360p", "720p", ...
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl RenditionSpec {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LadderError {
    #[error("resolution ladder is empty")]
    Empty,
    #[error("duplicate rendition name {0:?} in ladder")]
    DuplicateName(String),
}

/// Ordered, non-empty set of renditions with unique names.
///
/// Order is preserved everywhere: master manifests list renditions in the
/// order the ladder was built with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ladder {
    renditions: Vec<RenditionSpec>,
}

impl Ladder {
    pub fn new(renditions: Vec<RenditionSpec>) -> Result<Self, LadderError> {
        if renditions.is_empty() {
            return Err(LadderError::Empty);
        }
        let mut seen = HashSet::new();
        for spec in &renditions {
            if !seen.insert(spec.name.as_str()) {
                return Err(LadderError::DuplicateName(spec.name.clone()));
            }
        }
        Ok(Self { renditions })
    }

    pub fn renditions(&self) -> &[RenditionSpec] {
        &self.renditions
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenditionSpec> {
        self.renditions.iter()
    }
}

impl Default for Ladder {
    fn default() -> Self {
        Self {
            renditions: vec![
                RenditionSpec::new("360p", 640, 360),
                RenditionSpec::new("480p", 854, 480),
                RenditionSpec::new("720p", 1280, 720),
                RenditionSpec::new("1080p", 1920, 1080),
            ],
        }
    }
}

/// Delivery protocol of a rendition or master manifest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Hls,
    Dash,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Hls, Protocol::Dash];

    /// Path segment and URL token.
    pub fn token(&self) -> &'static str {
        match self {
            Protocol::Hls => "hls",
            Protocol::Dash => "dash",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Protocol::Hls => "m3u8",
            Protocol::Dash => "mpd",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Protocol::Hls => "application/vnd.apple.mpegurl",
            Protocol::Dash => "application/dash+xml",
        }
    }

    pub fn manifest_file_name(&self) -> String {
        format!("manifest.{}", self.extension())
    }

    pub fn master_file_name(&self) -> String {
        format!("master.{}", self.extension())
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid protocol {0:?}, expected \"hls\" or \"dash\"")]
pub struct InvalidProtocol(pub String);

impl FromStr for Protocol {
    type Err = InvalidProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hls" => Ok(Protocol::Hls),
            "dash" => Ok(Protocol::Dash),
            other => Err(InvalidProtocol(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder_order() {
        let ladder = Ladder::default();
        let names: Vec<_> = ladder.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["360p", "480p", "720p", "1080p"]);
        assert_eq!(ladder.renditions()[1], RenditionSpec::new("480p", 854, 480));
    }

    #[test]
    fn test_ladder_rejects_empty() {
        assert_eq!(Ladder::new(vec![]), Err(LadderError::Empty));
    }

    #[test]
    fn test_ladder_rejects_duplicate_names() {
        let result = Ladder::new(vec![
            RenditionSpec::new("360p", 640, 360),
            RenditionSpec::new("360p", 480, 360),
        ]);
        assert_eq!(result, Err(LadderError::DuplicateName("360p".to_string())));
    }

    #[test]
    fn test_ladder_keeps_given_order() {
        let ladder = Ladder::new(vec![
            RenditionSpec::new("720p", 1280, 720),
            RenditionSpec::new("360p", 640, 360),
        ])
        .unwrap();
        assert_eq!(ladder.renditions()[0].name, "720p");
        assert_eq!(ladder.renditions()[1].name, "360p");
    }

    #[test]
    fn test_protocol_tokens() {
        assert_eq!("hls".parse::<Protocol>(), Ok(Protocol::Hls));
        assert_eq!("dash".parse::<Protocol>(), Ok(Protocol::Dash));
        assert_eq!(
            "HLS".parse::<Protocol>(),
            Err(InvalidProtocol("HLS".to_string()))
        );
        assert!("smooth".parse::<Protocol>().is_err());
        assert_eq!(Protocol::Dash.manifest_file_name(), "manifest.mpd");
        assert_eq!(Protocol::Hls.master_file_name(), "master.m3u8");
    }
}
