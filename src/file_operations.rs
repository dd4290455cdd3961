use crate::show::{EpisodeIdentity, Show};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during file operations
#[derive(Debug, Error)]
pub enum FileOperationError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No such file: {0}")]
    SourceMissing(PathBuf),

    #[error("Not a valid file name: {0}")]
    InvalidFileName(PathBuf),

    #[error("'{0}' already exists")]
    DestinationExists(PathBuf),
}

/// Represents a planned move of a release file into the organized layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOperation {
    /// Source file path
    pub source: PathBuf,
    /// Destination file path, rooted at the source file's directory
    pub destination: PathBuf,
}

impl PlannedOperation {
    /// Plans moving `source` to `relative`, resolved against the source's directory
    pub fn new(source: &Path, relative: &Path) -> Self {
        let base = source.parent().unwrap_or_else(|| Path::new(""));
        Self {
            source: source.to_path_buf(),
            destination: base.join(relative),
        }
    }
}

/// Sanitizes an episode title for use in filenames
///
/// Characters that are illegal on exFAT/NTFS are replaced with their
/// full-width variants instead of being dropped:
/// - Control characters (U+0000..=U+001F and U+007F) are removed
/// - Whitespace of any kind becomes a plain space
/// - `" * / : < > ? \ |` map to U+FF02, U+FF0A, U+FF0F, U+FF1A, U+FF1C,
///   U+FF1E, U+FF1F, U+FF3C and U+FF5C
/// - Characters outside the Basic Multilingual Plane become U+FFFD, since
///   UCS-2 filesystems cannot store them
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|&c| !matches!(c, '\u{0}'..='\u{1f}' | '\u{7f}'))
        .map(|c| match c {
            c if c.is_whitespace() => ' ',
            '"' => '\u{FF02}',
            '*' => '\u{FF0A}',
            '/' => '\u{FF0F}',
            ':' => '\u{FF1A}',
            '<' => '\u{FF1C}',
            '>' => '\u{FF1E}',
            '?' => '\u{FF1F}',
            '\\' => '\u{FF3C}',
            '|' => '\u{FF5C}',
            c if u32::from(c) > 0xFFFF => '\u{FFFD}',
            c => c,
        })
        .collect()
}

/// Builds the organized path of an episode, relative to the release directory
///
/// Produces `Show/Season NN/Show - SNNEnnn[ - No.nnn][ - Title].ext`. The
/// total episode number is included for shows that declare a range mapping;
/// the title is included when it is non-empty after sanitization.
pub fn episode_path(show: &Show, episode: &EpisodeIdentity, extension: &str) -> PathBuf {
    let mut filename = format!(
        "{} - S{:02}E{:03}",
        show.name, episode.season, episode.season_episode
    );

    if show.mapping.is_some() {
        filename.push_str(&format!(" - No.{:03}", episode.total_episode));
    }

    let title = sanitize_filename(&episode.title);
    if !title.is_empty() {
        filename.push_str(" - ");
        filename.push_str(&title);
    }

    filename.push_str(extension);

    Path::new(&show.name)
        .join(format!("Season {:02}", episode.season))
        .join(filename)
}

/// Builds the path for an episode whose number could not be interpreted
///
/// Such releases (usually specials) are only moved into the show directory.
pub fn special_path(show: &Show, raw_episode: &str, extension: &str) -> PathBuf {
    Path::new(&show.name).join(format!("{} - E{}{}", show.name, raw_episode, extension))
}

/// Executes a planned move
///
/// Refuses to overwrite an existing destination and creates missing
/// parent directories.
pub fn execute_move(operation: &PlannedOperation) -> Result<(), FileOperationError> {
    if operation.destination.exists() {
        return Err(FileOperationError::DestinationExists(
            operation.destination.clone(),
        ));
    }

    if let Some(parent) = operation.destination.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::rename(&operation.source, &operation.destination)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range_map::RangeMap;

    fn example_show(mapping: Option<&[&str]>) -> Show {
        Show {
            name: "Example".to_string(),
            catalog_id: None,
            mapping: mapping.map(|specs| RangeMap::from_specs(specs).unwrap()),
        }
    }

    fn identity(season: u32, season_episode: u32, total_episode: u32, title: &str) -> EpisodeIdentity {
        EpisodeIdentity {
            season,
            season_episode,
            total_episode,
            title: title.to_string(),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Normal Title"), "Normal Title");
        assert_eq!(
            sanitize_filename("Part 1: \"A/B\"?"),
            "Part 1\u{FF1A} \u{FF02}A\u{FF0F}B\u{FF02}\u{FF1F}"
        );
        assert_eq!(
            sanitize_filename("a*b<c>d\\e|f"),
            "a\u{FF0A}b\u{FF1C}c\u{FF1E}d\u{FF3C}e\u{FF5C}f"
        );
    }

    #[test]
    fn test_sanitize_filename_whitespace_and_controls() {
        assert_eq!(sanitize_filename("Line\nBreak\tTab\u{7f}"), "LineBreakTab");
        assert_eq!(sanitize_filename("No\u{a0}Break\u{3000}Wide"), "No Break Wide");
        assert_eq!(sanitize_filename("  Kept  "), "  Kept  ");
    }

    #[test]
    fn test_sanitize_filename_non_bmp() {
        assert_eq!(sanitize_filename("Smile \u{1F600}!"), "Smile \u{FFFD}!");
        assert_eq!(sanitize_filename("日本語"), "日本語");
    }

    #[test]
    fn test_sanitize_filename_is_idempotent() {
        let samples = [
            "Part 1: \"A/B\"?",
            "tab\there\u{1F600}",
            "\u{85}next line\u{2028}",
            "<<>>||**",
            "",
        ];
        for sample in samples {
            let once = sanitize_filename(sample);
            assert_eq!(sanitize_filename(&once), once, "{sample:?}");
            assert!(!once.chars().any(|c| {
                c <= '\u{1f}' || c == '\u{7f}' || "\"*/:<>?\\|".contains(c) || u32::from(c) > 0xFFFF
            }));
        }
    }

    #[test]
    fn test_episode_path_with_mapping_and_no_title() {
        let show = example_show(Some(&["E1-12:S1E1-12", "E13-:S2E1-"]));
        assert_eq!(
            episode_path(&show, &identity(2, 1, 13, ""), ".mkv"),
            PathBuf::from("Example/Season 02/Example - S02E001 - No.013.mkv")
        );
    }

    #[test]
    fn test_episode_path_with_mapping_and_title() {
        let show = example_show(Some(&["E1-12:S1E1-12"]));
        assert_eq!(
            episode_path(&show, &identity(1, 5, 5, "What: Now?"), ".mkv"),
            PathBuf::from("Example/Season 01/Example - S01E005 - No.005 - What\u{FF1A} Now\u{FF1F}.mkv")
        );
    }

    #[test]
    fn test_episode_path_without_mapping() {
        let show = example_show(None);
        assert_eq!(
            episode_path(&show, &identity(1, 7, 7, "Title"), ".mp4"),
            PathBuf::from("Example/Season 01/Example - S01E007 - Title.mp4")
        );
        assert_eq!(
            episode_path(&show, &identity(1, 7, 7, "\n"), ".mp4"),
            PathBuf::from("Example/Season 01/Example - S01E007.mp4")
        );
    }

    #[test]
    fn test_special_path() {
        let show = example_show(Some(&["E1-12:S1E1-12"]));
        assert_eq!(
            special_path(&show, "12.5", ".mkv"),
            PathBuf::from("Example/Example - E12.5.mkv")
        );
    }

    #[test]
    fn test_planned_operation_is_relative_to_source_dir() {
        let op = PlannedOperation::new(
            Path::new("/downloads/[HorribleSubs] Example - 13 [1080p].mkv"),
            Path::new("Example/Season 02/Example - S02E001 - No.013.mkv"),
        );
        assert_eq!(
            op.destination,
            PathBuf::from("/downloads/Example/Season 02/Example - S02E001 - No.013.mkv")
        );
    }

    #[test]
    fn test_execute_move_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("release.mkv");
        fs::write(&source, "video").unwrap();

        let op = PlannedOperation::new(&source, Path::new("Show/Season 01/episode.mkv"));
        execute_move(&op).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&op.destination).unwrap(), "video");
    }

    #[test]
    fn test_execute_move_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("release.mkv");
        let existing = dir.path().join("taken.mkv");
        fs::write(&source, "new").unwrap();
        fs::write(&existing, "old").unwrap();

        let op = PlannedOperation::new(&source, Path::new("taken.mkv"));
        assert!(matches!(
            execute_move(&op),
            Err(FileOperationError::DestinationExists(_))
        ));
        assert!(source.exists());
        assert_eq!(fs::read_to_string(&existing).unwrap(), "old");
    }
}
