//! TheTVDB API response types for deserialization.
//!
//! These structures mirror the JSON format of TheTVDB v3 API.
use serde::{Deserialize, Serialize};

/// Body of the `/login` request.
#[derive(Debug, Serialize)]
pub(super) struct LoginRequest<'a> {
    pub apikey: &'a str,
}

/// Response of the `/login` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct LoginResponse {
    pub token: String,
}

/// Response of the `/series/{id}/episodes/query` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct EpisodesResponse {
    #[serde(default)]
    pub links: Links,
    #[serde(default)]
    pub data: Vec<TheTvDbEpisode>,
}

/// Pagination links; `next` is null (or 0) on the last page.
///
/// The API also sends `first`, `last` and `prev`, which paging does not need.
#[derive(Debug, Default, Deserialize)]
pub(super) struct Links {
    pub next: Option<u32>,
}

/// A single episode record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TheTvDbEpisode {
    pub aired_season: u32,
    pub aired_episode_number: u32,
    /// Episode title (null for episodes without a title)
    pub episode_name: Option<String>,
    /// First air date, `YYYY-MM-DD` (may be null or empty)
    pub first_aired: Option<String>,
}
