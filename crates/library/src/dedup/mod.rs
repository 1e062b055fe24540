//! Duplicate resolution.
//!
//! Copies of the same gallery are recognized by the id in their filenames.
//! Within each group the copy with the best-looking name is kept where it is
//! and the rest are moved to the trash. "Best-looking" is the [`score`]:
//! names carrying more bracketed tags are assumed to be the more curated
//! copy, with length as a tiebreaker.
//!
//! [`plan`] is pure and decides everything up front; [`dedup`] streams the
//! trash moves for a plan.

mod stream;

pub use self::stream::{DedupEvent, DedupSummary, Discarded, dedup};
use shelver_extract::{extract_id, matches_extension};
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsStr;
use std::path::PathBuf;
use tracing::instrument;

/// Weight of each `[` and `(` in a filename.
const TAG_WEIGHT: usize = 10;

/// `10 × (number of '[' and '(') + length in characters`.
pub fn score(filename: &str) -> usize {
    let tags = filename.chars().filter(|c| matches!(c, '[' | '(')).count();
    TAG_WEIGHT * tags + filename.chars().count()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub score: usize,
}

/// Every discovered copy of one gallery, best first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: u64,
    pub winner: Candidate,
    /// Worse copies, best first. Empty when the gallery has a single copy.
    pub losers: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// By ascending id.
    pub groups: Vec<Group>,
    /// Candidates with the right extension but no id in their name.
    pub unidentified: Vec<PathBuf>,
}
impl Plan {
    /// Total number of copies that will be trashed.
    pub fn duplicates(&self) -> usize {
        self.groups.iter().map(|g| g.losers.len()).sum()
    }
}

/// Group candidates by gallery id and pick a winner in each group.
///
/// Candidates with a different extension are ignored. A path given more than
/// once only counts once. Equal scores keep discovery order, so the first
/// discovered copy wins a tie and unchanged inputs always produce the same
/// plan.
#[instrument(level = "debug", skip(candidates))]
pub fn plan(candidates: impl IntoIterator<Item = PathBuf>, extension: &str) -> Plan {
    let mut seen = HashSet::new();
    let mut by_id: BTreeMap<u64, Vec<Candidate>> = BTreeMap::new();
    let mut unidentified = Vec::new();
    for path in candidates {
        let Some(name) = path.file_name().and_then(OsStr::to_str) else {
            continue;
        };
        if !matches_extension(name, extension) || !seen.insert(path.clone()) {
            continue;
        }
        let Some(id) = extract_id(name) else {
            tracing::warn!(path = %path.display(), "No gallery id in filename, skipping");
            unidentified.push(path);
            continue;
        };
        let score = score(name);
        by_id.entry(id).or_default().push(Candidate { path, score });
    }
    let groups = by_id
        .into_iter()
        .filter_map(|(id, mut members)| {
            // Stable: ties keep discovery order.
            members.sort_by(|a, b| b.score.cmp(&a.score));
            let mut members = members.into_iter();
            let winner = members.next()?;
            let losers: Vec<Candidate> = members.collect();
            if !losers.is_empty() {
                tracing::debug!(id, winner = %winner.path.display(), duplicates = losers.len(), "Duplicates found");
            }
            Some(Group { id, winner, losers })
        })
        .collect();
    Plan { groups, unidentified }
}
