//! Release filename parsing
//!
//! Releases are named `[HorribleSubs] <Show> - <Episode> [<Resolution>p].<ext>`.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static RELEASE_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[HorribleSubs\] (?P<show>.*) - (?P<episode>[\d.]+) \[\d+p\]\.(?P<ext>\w+)$")
        .unwrap()
});

/// The filename does not follow the release naming pattern
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unable to parse filename: {0}")]
pub struct FilenameParseError(pub String);

/// Components of a release filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseName {
    /// Show name as used by the release group
    pub show: String,
    /// Raw episode token, usually a total episode number
    pub episode: String,
    /// File extension including the leading dot
    pub extension: String,
}

impl ReleaseName {
    /// Parses a base filename (no directory components)
    pub fn parse(filename: &str) -> Result<Self, FilenameParseError> {
        let caps = RELEASE_FILENAME
            .captures(filename)
            .ok_or_else(|| FilenameParseError(filename.to_string()))?;

        Ok(Self {
            show: caps["show"].to_string(),
            episode: caps["episode"].to_string(),
            extension: format!(".{}", &caps["ext"]),
        })
    }

    /// The episode token as a total episode number
    ///
    /// `None` for non-integer tokens such as `12.5`, which mark specials.
    /// An integer token too large to be an episode number is an error.
    pub fn episode_number(&self) -> Result<Option<u32>, FilenameParseError> {
        if self.episode.contains('.') {
            return Ok(None);
        }

        self.episode.parse().map(Some).map_err(|_| {
            FilenameParseError(format!(
                "episode number {} is out of range",
                self.episode
            ))
        })
    }
}
