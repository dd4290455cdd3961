//! TheTVDB episode catalog implementation.
use super::thetvdb_types::{EpisodesResponse, LoginRequest, LoginResponse, TheTvDbEpisode};
use super::{Episode, EpisodeCatalog, EpisodePage, MetadataRetrievalError};
use crate::auth::{AuthError, AuthManager};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use std::time::Duration;

/// Media type selecting the API version in use
const API_ACCEPT: &str = "application/vnd.thetvdb.v3.0.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Episode catalog backed by the TheTVDB v3 API.
///
/// This catalog fetches episode listings from https://api.thetvdb.com using
/// bearer tokens obtained through its [`AuthManager`].
pub struct TheTvDbClient {
    client: Client,
    base_url: String,
    auth: AuthManager,
}

impl TheTvDbClient {
    /// Creates a new TheTVDB client authenticating through `auth`.
    pub fn new(auth: AuthManager) -> Result<Self, MetadataRetrievalError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MetadataRetrievalError::RemoteFetch(e.to_string()))?;

        Ok(Self {
            client,
            base_url: "https://api.thetvdb.com".to_string(),
            auth,
        })
    }

    /// Points the client at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Exchanges an API key for a bearer token.
    fn login(client: &Client, base_url: &str, api_key: &str) -> Result<String, AuthError> {
        tracing::info!("requesting a new API token");

        let response = client
            .post(format!("{base_url}/login"))
            .header(ACCEPT, API_ACCEPT)
            .json(&LoginRequest { apikey: api_key })
            .send()
            .map_err(|e| AuthError::LoginRequest(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AuthError::LoginRequest(e.to_string()))?;

        if !status.is_success() {
            return Err(AuthError::LoginRejected {
                status: status.as_u16(),
                body,
            });
        }

        let login: LoginResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::MalformedLoginResponse {
                reason: e.to_string(),
                body: body.clone(),
            })?;

        Ok(login.token)
    }

    /// Converts a TheTVDB episode to our internal Episode structure.
    fn convert_episode(episode: TheTvDbEpisode) -> Episode {
        Episode {
            season_number: episode.aired_season,
            episode_number: episode.aired_episode_number,
            name: episode.episode_name.unwrap_or_default(),
            first_aired: episode.first_aired.unwrap_or_default(),
        }
    }
}

impl EpisodeCatalog for TheTvDbClient {
    fn episodes_page(
        &mut self,
        show_id: u64,
        season: u32,
        page: u32,
    ) -> Result<EpisodePage, MetadataRetrievalError> {
        let client = &self.client;
        let base_url = self.base_url.as_str();
        let token = self
            .auth
            .bearer_token(|api_key| Self::login(client, base_url, api_key))?
            .to_string();

        let url = format!("{base_url}/series/{show_id}/episodes/query");

        let response = client
            .get(&url)
            .query(&[("airedSeason", season), ("page", page)])
            .header(ACCEPT, API_ACCEPT)
            .bearer_auth(token)
            .send()
            .map_err(|e| MetadataRetrievalError::RemoteFetch(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(MetadataRetrievalError::RemoteFetch(format!(
                "{url} failed with HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let listing: EpisodesResponse = response
            .json()
            .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))?;

        Ok(EpisodePage {
            episodes: listing
                .data
                .into_iter()
                .map(Self::convert_episode)
                .collect(),
            next_page: listing.links.next.filter(|next| *next != 0),
        })
    }
}
