//! Configured shows and episode number resolution

use crate::range_map::RangeMap;
use thiserror::Error;

/// No mapping exists for a total episode number and it cannot be extrapolated
#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{show}' has no declared mapping for episode {total_episode}")]
pub struct UnmappedEpisodeError {
    pub show: String,
    pub total_episode: u32,
}

/// A show as configured for organizing
#[derive(Debug, Clone, PartialEq)]
pub struct Show {
    /// Display name used for directories and filenames
    pub name: String,
    /// Identifier of the show in the remote metadata catalog
    pub catalog_id: Option<u64>,
    /// Declared range mapping, `None` when the show declares no ranges
    pub mapping: Option<RangeMap>,
}

/// Canonical identity of an episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeIdentity {
    pub season: u32,
    pub season_episode: u32,
    pub total_episode: u32,
    /// Episode title, empty until resolved from metadata
    pub title: String,
}

impl EpisodeIdentity {
    fn new(season: u32, season_episode: u32, total_episode: u32) -> Self {
        Self {
            season,
            season_episode,
            total_episode,
            title: String::new(),
        }
    }
}

impl Show {
    /// Resolves a total episode number to its season coordinates
    ///
    /// Shows without a mapping pass the number through as season 1. A
    /// continued show extrapolates past its highest mapped entry within
    /// that entry's season.
    pub fn resolve(&self, total_episode: u32) -> Result<EpisodeIdentity, UnmappedEpisodeError> {
        let Some(mapping) = &self.mapping else {
            return Ok(EpisodeIdentity::new(1, total_episode, total_episode));
        };

        if let Some(mapped) = mapping.get(total_episode) {
            return Ok(EpisodeIdentity::new(
                mapped.season,
                mapped.season_episode,
                total_episode,
            ));
        }

        if mapping.is_continued() {
            if let Some((last_total, last)) = mapping.last_entry() {
                // Numbers past u32::MAX within the season stay unmapped
                let extrapolated = total_episode
                    .checked_sub(last_total)
                    .filter(|offset| *offset > 0)
                    .and_then(|offset| last.season_episode.checked_add(offset));

                if let Some(season_episode) = extrapolated {
                    return Ok(EpisodeIdentity::new(
                        last.season,
                        season_episode,
                        total_episode,
                    ));
                }
            }
        }

        Err(UnmappedEpisodeError {
            show: self.name.clone(),
            total_episode,
        })
    }
}
