//! HorribleOrganizer - Organize fansub releases for media centers
//!
//! This library maps release filenames such as
//! `[HorribleSubs] Example - 13 [1080p].mkv` to a media-center compatible
//! layout (`Example/Season 02/Example - S02E001 - No.013 - Title.mkv`),
//! translating the release's running episode counter into season numbering
//! and looking up episode titles from a remote catalog.

mod auth;
mod cache;
mod config;
mod file_operations;
mod metadata_retrieval;
mod range_map;
mod release_name;
mod show;

use file_operations::{PlannedOperation, episode_path, execute_move, special_path};
use std::path::{Path, PathBuf};
use thiserror::Error;

// Re-export error types
pub use auth::{AuthError, CredentialFileError};
pub use config::ConfigError;
pub use file_operations::FileOperationError;
pub use metadata_retrieval::MetadataRetrievalError;
pub use range_map::ValidationError;
pub use release_name::FilenameParseError;
pub use show::UnmappedEpisodeError;

// Re-export the building blocks
pub use auth::{AuthManager, AuthState, CredentialFile, Credentials, KeyPrompt, TerminalPrompt};
pub use config::Config;
pub use file_operations::sanitize_filename;
pub use metadata_retrieval::{
    CatalogShow, Episode, EpisodeCatalog, EpisodePage, MetadataStore, Season, TheTvDbClient,
};
pub use range_map::{MappedEpisode, RangeMap, RangeSpec};
pub use release_name::ReleaseName;
pub use show::{EpisodeIdentity, Show};

/// Whether organizing moves files or only reports the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeMode {
    /// Report destinations without touching the filesystem
    DryRun,
    /// Move files into the organized layout
    Move,
}

/// Progress event emitted while organizing a batch of files
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Organizing started
    Started { file_count: usize },

    /// A destination was determined for a file
    Planned { source: PathBuf, relative: PathBuf },

    /// A file was moved to its destination
    Moved {
        source: PathBuf,
        destination: PathBuf,
    },

    /// A file could not be organized; the batch continues
    Failed { source: PathBuf, error: String },

    /// Organizing finished
    Complete { organized: usize, failed: usize },
}

/// Outcome of organizing a batch of files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrganizeSummary {
    pub organized: usize,
    pub failed: usize,
}

/// Error organizing a single file
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The filename does not follow the release naming pattern
    #[error(transparent)]
    FilenameParse(#[from] FilenameParseError),

    /// The release's show has no configuration entry
    #[error("show '{0}' not configured")]
    ShowNotConfigured(String),

    /// The episode number has no mapping
    #[error(transparent)]
    Unmapped(#[from] UnmappedEpisodeError),

    /// Error during metadata retrieval
    #[error(transparent)]
    Metadata(#[from] MetadataRetrievalError),

    /// Error moving the file
    #[error(transparent)]
    FileOperation(#[from] FileOperationError),
}

impl OrganizeError {
    /// Whether the error makes every further file fail as well
    ///
    /// This is the case when no API token can be obtained.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Metadata(MetadataRetrievalError::Auth(_)))
    }
}

/// Context for organizing files within one run
///
/// Holds the show configuration and, unless titles are disabled, the
/// metadata store whose cache and credentials live as long as the organizer.
pub struct Organizer {
    config: Config,
    store: Option<MetadataStore>,
}

impl Organizer {
    /// Creates an organizer that looks up episode titles in `store`
    pub fn new(config: Config, store: MetadataStore) -> Self {
        Self {
            config,
            store: Some(store),
        }
    }

    /// Creates an organizer that never contacts the metadata catalog
    pub fn offline(config: Config) -> Self {
        Self {
            config,
            store: None,
        }
    }

    /// Computes the organized path of a release, relative to its directory
    ///
    /// # Examples
    ///
    /// ```
    /// use horrible_organizer::{Config, Organizer};
    /// use std::path::PathBuf;
    ///
    /// let config = Config::from_toml_str(
    ///     r#"
    ///     [shows."Example"]
    ///     mapping = ["E1-12:S1E1-12", "E13-:S2E1-"]
    ///     "#,
    /// )
    /// .unwrap();
    /// let mut organizer = Organizer::offline(config);
    ///
    /// let path = organizer
    ///     .organized_path("[HorribleSubs] Example - 13 [1080p].mkv")
    ///     .unwrap();
    /// assert_eq!(
    ///     path,
    ///     PathBuf::from("Example/Season 02/Example - S02E001 - No.013.mkv")
    /// );
    /// ```
    pub fn organized_path(&mut self, filename: &str) -> Result<PathBuf, OrganizeError> {
        let release = ReleaseName::parse(filename)?;
        let show = self
            .config
            .show(&release.show)
            .ok_or_else(|| OrganizeError::ShowNotConfigured(release.show.clone()))?;

        let Some(total_episode) = release.episode_number()? else {
            // Specials are numbered outside the running counter
            return Ok(special_path(show, &release.episode, &release.extension));
        };

        let mut episode = show.resolve(total_episode)?;

        if let (Some(store), Some(catalog_id)) = (self.store.as_mut(), show.catalog_id) {
            store.load_show(catalog_id, &show.name);
            episode.title = store
                .get_episode(catalog_id, episode.season, episode.season_episode)?
                .name
                .clone();
        }

        Ok(episode_path(show, &episode, &release.extension))
    }
}

/// Organizes a batch of release files, one at a time
///
/// Files that cannot be organized are reported through a
/// [`ProgressEvent::Failed`] event and counted; the batch continues with the
/// next file. Errors that would make every remaining file fail (see
/// [`OrganizeError::is_fatal`]) abort the batch immediately.
///
/// # Examples
///
/// ```no_run
/// use horrible_organizer::{organize_files, Config, OrganizeMode, Organizer, ProgressEvent};
/// use std::path::{Path, PathBuf};
///
/// let config = Config::load(Path::new("config.toml")).unwrap();
/// let mut organizer = Organizer::offline(config);
/// let files = vec![PathBuf::from("[HorribleSubs] Example - 13 [1080p].mkv")];
///
/// let summary = organize_files(&mut organizer, &files, OrganizeMode::DryRun, |event| {
///     if let ProgressEvent::Planned { source, relative } = event {
///         println!("{} => {}", source.display(), relative.display());
///     }
/// })
/// .unwrap();
/// ```
pub fn organize_files<F>(
    organizer: &mut Organizer,
    files: &[PathBuf],
    mode: OrganizeMode,
    mut progress_callback: F,
) -> Result<OrganizeSummary, OrganizeError>
where
    F: FnMut(ProgressEvent),
{
    progress_callback(ProgressEvent::Started {
        file_count: files.len(),
    });

    let mut summary = OrganizeSummary::default();

    for file in files {
        match organize_file(organizer, file, mode, &mut progress_callback) {
            Ok(()) => summary.organized += 1,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::debug!(file = %file.display(), error = %e, "failed to organize");
                summary.failed += 1;
                progress_callback(ProgressEvent::Failed {
                    source: file.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    progress_callback(ProgressEvent::Complete {
        organized: summary.organized,
        failed: summary.failed,
    });

    Ok(summary)
}

fn organize_file<F>(
    organizer: &mut Organizer,
    file: &Path,
    mode: OrganizeMode,
    progress_callback: &mut F,
) -> Result<(), OrganizeError>
where
    F: FnMut(ProgressEvent),
{
    if !file.exists() {
        return Err(FileOperationError::SourceMissing(file.to_path_buf()).into());
    }

    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| FileOperationError::InvalidFileName(file.to_path_buf()))?;

    let relative = organizer.organized_path(filename)?;
    progress_callback(ProgressEvent::Planned {
        source: file.to_path_buf(),
        relative: relative.clone(),
    });

    if mode == OrganizeMode::Move {
        let operation = PlannedOperation::new(file, &relative);
        execute_move(&operation)?;
        progress_callback(ProgressEvent::Moved {
            source: operation.source,
            destination: operation.destination,
        });
    }

    Ok(())
}
