//! Data structures and traits for episode metadata retrieval.
//!
//! This module provides structures to represent catalog seasons and episodes,
//! the [`EpisodeCatalog`] trait remote catalogs implement, and the
//! [`MetadataStore`] that memoizes catalog data for the duration of a run.
mod store;
mod thetvdb;
mod thetvdb_types;

pub use store::{CatalogShow, MetadataStore};
pub use thetvdb::TheTvDbClient;

use crate::auth::AuthError;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Transport failure or non-success response from the catalog
    #[error("Request failed: {0}")]
    RemoteFetch(String),

    /// Failed to parse the catalog's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The season was retrieved but does not contain the episode
    #[error("Episode S{season:02}E{episode:03} of show {show_id} does not exist")]
    NotFound {
        show_id: u64,
        season: u32,
        episode: u32,
    },

    /// No bearer token could be obtained
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
}

/// Represents a single episode as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    /// The season number this episode aired in
    pub season_number: u32,
    /// The episode number within the season
    pub episode_number: u32,
    /// The episode title
    pub name: String,
    /// First air date as reported by the catalog, empty if unknown
    pub first_aired: String,
}

/// Represents a season of a catalog show, keyed by episode number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Season {
    pub episodes: HashMap<u32, Episode>,
}

impl Season {
    pub fn episode(&self, episode_number: u32) -> Option<&Episode> {
        self.episodes.get(&episode_number)
    }
}

/// One page of a season's episode listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodePage {
    pub episodes: Vec<Episode>,
    /// Number of the following page, `None` on the last page
    pub next_page: Option<u32>,
}

/// Trait for remote catalogs that list a show's episodes season by season.
///
/// Implementors handle transport and authentication; paging and caching
/// are driven by [`MetadataStore`].
pub trait EpisodeCatalog {
    /// Fetches a single page of the episodes that aired in `season`.
    ///
    /// Pages are numbered from 1.
    fn episodes_page(
        &mut self,
        show_id: u64,
        season: u32,
        page: u32,
    ) -> Result<EpisodePage, MetadataRetrievalError>;
}
