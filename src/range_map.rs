//! Episode range mapping module
//!
//! Release groups number episodes with a single running counter ("total
//! episode") while metadata catalogs number them per season. A show's
//! configuration declares an ordered list of range specifications such as
//! `E13-24:S2E1-12` which are validated and expanded into a [`RangeMap`].

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

static RANGE_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^E(?P<total_from>\d+)-(?P<total_to>\d+)?\s*:\s*S(?P<season>\d+)E(?P<season_from>\d+)-(?P<season_to>\d+)?$",
    )
    .unwrap()
});

/// Errors raised while validating a show's range specifications
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The specification does not match `E<from>-[<to>]:S<season>E<from>-[<to>]`
    #[error("malformed spec: {0}")]
    Malformed(String),

    /// A closed range ends before it starts
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Only one side is open, or the two closed spans differ in length
    #[error("range mismatch: {0}")]
    RangeMismatch(String),

    /// The range does not start after the previous range ended
    #[error("range out of order: '{spec}' after '{previous}'")]
    OutOfOrder { spec: String, previous: String },
}

/// A single validated range specification
///
/// `None` upper bounds mark an open-ended range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub total_from: u32,
    pub total_to: Option<u32>,
    pub season: u32,
    pub season_from: u32,
    pub season_to: Option<u32>,
}

impl RangeSpec {
    /// Parses a specification string and checks it in isolation
    ///
    /// Ordering against neighbouring specs is checked by [`RangeMap::from_specs`].
    pub fn parse(spec: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::Malformed(spec.to_string());
        let caps = RANGE_SPEC.captures(spec.trim()).ok_or_else(malformed)?;

        let number = |name: &str| -> Result<Option<u32>, ValidationError> {
            caps.name(name)
                .map(|m| m.as_str().parse::<u32>().map_err(|_| malformed()))
                .transpose()
        };

        let parsed = Self {
            total_from: number("total_from")?.ok_or_else(malformed)?,
            total_to: number("total_to")?,
            season: number("season")?.ok_or_else(malformed)?,
            season_from: number("season_from")?.ok_or_else(malformed)?,
            season_to: number("season_to")?,
        };

        let reversed = |from: u32, to: Option<u32>| to.is_some_and(|to| to < from);
        if reversed(parsed.total_from, parsed.total_to)
            || reversed(parsed.season_from, parsed.season_to)
        {
            return Err(ValidationError::InvalidRange(spec.to_string()));
        }

        match (parsed.total_to, parsed.season_to) {
            (None, None) => {}
            (Some(total_to), Some(season_to))
                if total_to - parsed.total_from == season_to - parsed.season_from => {}
            _ => return Err(ValidationError::RangeMismatch(spec.to_string())),
        }

        Ok(parsed)
    }

    /// Whether this range is open-ended
    pub fn is_open(&self) -> bool {
        self.total_to.is_none()
    }
}

/// Season coordinates a total episode number maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedEpisode {
    pub season: u32,
    pub season_episode: u32,
}

/// Mapping from total episode number to season coordinates
///
/// Closed ranges contribute one entry per total episode. An open range
/// contributes a single anchor entry at its start and marks the map as
/// continued, allowing extrapolation past the last entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeMap {
    entries: BTreeMap<u32, MappedEpisode>,
    continued: bool,
}

impl RangeMap {
    /// Validates an ordered list of specification strings and expands them
    ///
    /// Each range must start strictly after the previous range's upper
    /// bound. An open range has no upper bound, so nothing may follow it.
    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> Result<Self, ValidationError> {
        let mut map = Self::default();
        // (upper bound, spec text); an open range leaves no upper bound
        let mut previous: (Option<u32>, &str) = (Some(0), "");

        for spec in specs {
            let spec = spec.as_ref();
            let range = RangeSpec::parse(spec)?;

            let in_order = previous.0.is_some_and(|bound| range.total_from > bound);
            if !in_order {
                return Err(ValidationError::OutOfOrder {
                    spec: spec.to_string(),
                    previous: previous.1.to_string(),
                });
            }

            previous = (range.total_to, spec);
            map.insert_range(&range);
        }

        Ok(map)
    }

    fn insert_range(&mut self, range: &RangeSpec) {
        let total_to = match range.total_to {
            Some(to) => to,
            None => {
                self.continued = true;
                range.total_from
            }
        };

        for total in range.total_from..=total_to {
            self.entries.insert(
                total,
                MappedEpisode {
                    season: range.season,
                    season_episode: total - range.total_from + range.season_from,
                },
            );
        }
    }

    /// Looks up the direct entry for a total episode number
    pub fn get(&self, total_episode: u32) -> Option<MappedEpisode> {
        self.entries.get(&total_episode).copied()
    }

    /// The entry with the highest total episode number
    pub fn last_entry(&self) -> Option<(u32, MappedEpisode)> {
        self.entries.last_key_value().map(|(total, mapped)| (*total, *mapped))
    }

    /// Whether the last declared range was open-ended
    pub fn is_continued(&self) -> bool {
        self.continued
    }
}
