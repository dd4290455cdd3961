//! Run-scoped metadata store
//!
//! Shows, seasons and episodes are fetched from an [`EpisodeCatalog`] on
//! first access and kept for the lifetime of the store.

use super::{Episode, EpisodeCatalog, MetadataRetrievalError, Season};
use crate::cache::MemoCache;

/// Cached catalog data for one show
#[derive(Debug)]
pub struct CatalogShow {
    pub id: u64,
    pub name: String,
    seasons: MemoCache<u32, Season>,
}

impl CatalogShow {
    fn new(id: u64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            seasons: MemoCache::new(),
        }
    }

    /// Whether the season has already been fetched
    pub fn has_season(&self, season: u32) -> bool {
        self.seasons.contains(&season)
    }
}

/// A memoizing front for an episode catalog
///
/// A season is fetched completely, following every page, the first time
/// any of its episodes is requested. A season that lists no episodes is
/// cached as empty. Failed fetches are not cached.
pub struct MetadataStore {
    catalog: Box<dyn EpisodeCatalog>,
    shows: MemoCache<u64, CatalogShow>,
}

impl MetadataStore {
    /// Creates an empty store backed by the given catalog
    pub fn new(catalog: impl EpisodeCatalog + 'static) -> Self {
        Self {
            catalog: Box::new(catalog),
            shows: MemoCache::new(),
        }
    }

    /// Returns the cached record for a show, creating an empty one if needed
    ///
    /// No remote request is made.
    pub fn load_show(&mut self, id: u64, name: &str) -> &mut CatalogShow {
        self.shows.get_or_insert_with(id, || CatalogShow::new(id, name))
    }

    /// Returns a season, fetching all of its pages on first access
    pub fn get_season(
        &mut self,
        show_id: u64,
        season: u32,
    ) -> Result<&Season, MetadataRetrievalError> {
        let catalog = &mut self.catalog;
        let show = self
            .shows
            .get_or_insert_with(show_id, || CatalogShow::new(show_id, ""));

        if show.has_season(season) {
            tracing::debug!(show_id, season, "season cache hit");
        }

        show.seasons
            .get_or_try_insert_with(season, || fetch_season(catalog.as_mut(), show_id, season))
    }

    /// Returns an episode, fetching its season on first access
    pub fn get_episode(
        &mut self,
        show_id: u64,
        season: u32,
        episode: u32,
    ) -> Result<&Episode, MetadataRetrievalError> {
        self.get_season(show_id, season)?
            .episode(episode)
            .ok_or(MetadataRetrievalError::NotFound {
                show_id,
                season,
                episode,
            })
    }
}

fn fetch_season(
    catalog: &mut dyn EpisodeCatalog,
    show_id: u64,
    season_number: u32,
) -> Result<Season, MetadataRetrievalError> {
    let mut season = Season::default();
    let mut page = 1;

    loop {
        tracing::debug!(show_id, season = season_number, page, "fetching episode page");
        let listing = catalog.episodes_page(show_id, season_number, page)?;

        for mut episode in listing.episodes {
            episode.name = episode.name.trim().to_string();
            season.episodes.insert(episode.episode_number, episode);
        }

        match listing.next_page {
            Some(next) if next > page => page = next,
            _ => break,
        }
    }

    tracing::info!(
        show_id,
        season = season_number,
        episodes = season.episodes.len(),
        "fetched season metadata"
    );

    Ok(season)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_retrieval::EpisodePage;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    type RequestLog = Rc<RefCell<Vec<(u64, u32, u32)>>>;

    /// Serves canned pages keyed by (show, season, page)
    struct FakeCatalog {
        pages: HashMap<(u64, u32, u32), EpisodePage>,
        requests: RequestLog,
        failing: bool,
    }

    impl FakeCatalog {
        fn new() -> (Self, RequestLog) {
            let requests = RequestLog::default();
            let catalog = Self {
                pages: HashMap::new(),
                requests: Rc::clone(&requests),
                failing: false,
            };
            (catalog, requests)
        }

        fn with_page(
            mut self,
            show_id: u64,
            season: u32,
            page: u32,
            episodes: &[(u32, &str)],
            next_page: Option<u32>,
        ) -> Self {
            let episodes = episodes
                .iter()
                .map(|(number, name)| Episode {
                    season_number: season,
                    episode_number: *number,
                    name: name.to_string(),
                    first_aired: String::new(),
                })
                .collect();
            self.pages.insert(
                (show_id, season, page),
                EpisodePage {
                    episodes,
                    next_page,
                },
            );
            self
        }
    }

    impl EpisodeCatalog for FakeCatalog {
        fn episodes_page(
            &mut self,
            show_id: u64,
            season: u32,
            page: u32,
        ) -> Result<EpisodePage, MetadataRetrievalError> {
            self.requests.borrow_mut().push((show_id, season, page));
            if self.failing {
                return Err(MetadataRetrievalError::RemoteFetch("HTTP 503".to_string()));
            }
            Ok(self
                .pages
                .get(&(show_id, season, page))
                .cloned()
                .unwrap_or_default())
        }
    }

    #[test]
    fn test_load_show_is_memoized_without_fetching() {
        let (catalog, requests) = FakeCatalog::new();
        let mut store = MetadataStore::new(catalog);

        store.load_show(7, "Example");
        let show = store.load_show(7, "Renamed");

        assert_eq!(show.name, "Example");
        assert_eq!(show.id, 7);
        assert!(requests.borrow().is_empty());
    }

    #[test]
    fn test_season_follows_pagination() {
        let (catalog, requests) = FakeCatalog::new();
        let catalog = catalog
            .with_page(7, 2, 1, &[(1, "First"), (2, "Second")], Some(2))
            .with_page(7, 2, 2, &[(3, "Third")], Some(0));
        let mut store = MetadataStore::new(catalog);

        let season = store.get_season(7, 2).unwrap();

        assert_eq!(season.episodes.len(), 3);
        assert_eq!(season.episode(3).unwrap().name, "Third");
        assert_eq!(*requests.borrow(), vec![(7, 2, 1), (7, 2, 2)]);
    }

    #[test]
    fn test_titles_are_trimmed() {
        let (catalog, _) = FakeCatalog::new();
        let catalog = catalog.with_page(7, 1, 1, &[(1, "  Padded Title \n")], None);
        let mut store = MetadataStore::new(catalog);

        assert_eq!(store.get_episode(7, 1, 1).unwrap().name, "Padded Title");
    }

    #[test]
    fn test_season_is_fetched_once() {
        let (catalog, requests) = FakeCatalog::new();
        let catalog = catalog.with_page(7, 1, 1, &[(1, "One"), (2, "Two")], None);
        let mut store = MetadataStore::new(catalog);

        assert_eq!(store.get_episode(7, 1, 1).unwrap().name, "One");
        assert_eq!(store.get_episode(7, 1, 2).unwrap().name, "Two");
        assert_eq!(requests.borrow().len(), 1);
    }

    #[test]
    fn test_missing_episode_is_not_found() {
        let (catalog, requests) = FakeCatalog::new();
        let catalog = catalog.with_page(7, 1, 1, &[(1, "One")], None);
        let mut store = MetadataStore::new(catalog);

        let err = store.get_episode(7, 1, 5).unwrap_err();
        assert!(matches!(
            err,
            MetadataRetrievalError::NotFound {
                show_id: 7,
                season: 1,
                episode: 5
            }
        ));

        // The season stays cached; the miss does not trigger a refetch
        assert!(store.get_episode(7, 1, 5).is_err());
        assert_eq!(requests.borrow().len(), 1);
    }

    #[test]
    fn test_empty_season_is_cached() {
        let (catalog, requests) = FakeCatalog::new();
        let mut store = MetadataStore::new(catalog);

        assert!(store.get_season(7, 9).unwrap().episodes.is_empty());
        assert!(store.get_season(7, 9).unwrap().episodes.is_empty());
        assert_eq!(requests.borrow().len(), 1);
    }

    #[test]
    fn test_failed_fetch_propagates_and_is_retried() {
        let (mut catalog, requests) = FakeCatalog::new();
        catalog.failing = true;
        let mut store = MetadataStore::new(catalog);

        assert!(matches!(
            store.get_episode(7, 1, 1),
            Err(MetadataRetrievalError::RemoteFetch(_))
        ));
        assert!(store.get_episode(7, 1, 1).is_err());
        assert_eq!(requests.borrow().len(), 2);
    }

    #[test]
    fn test_seasons_are_keyed_per_show() {
        let (catalog, _) = FakeCatalog::new();
        let catalog = catalog
            .with_page(1, 1, 1, &[(1, "Show One")], None)
            .with_page(2, 1, 1, &[(1, "Show Two")], None);
        let mut store = MetadataStore::new(catalog);

        assert_eq!(store.get_episode(1, 1, 1).unwrap().name, "Show One");
        assert_eq!(store.get_episode(2, 1, 1).unwrap().name, "Show Two");
    }
}
