//! Aggregator - merge candidate lists into one ranked list.
//!
//! ## Algorithm
//! 1. Walk every input list in order, keyed by anime id in an `IndexMap`
//!    (insertion order = first-seen order)
//! 2. The first occurrence keeps its payload; each further occurrence
//!    only bumps the appearance count and records its seed
//! 3. Stable sort by appearance count descending, so ties keep first-seen
//!    order

use catalog::{Anime, AnimeId, SeedId};
use indexmap::IndexMap;
use indexmap::map::Entry;
use sources::{Candidate, CandidateSource};

/// A deduplicated candidate with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub anime: Anime,
    /// Source of the first occurrence
    pub source: CandidateSource,
    /// Number of occurrences across all input lists (always >= 1)
    pub appearances: u32,
    /// Distinct seeds that led here, first-seen order
    pub seeds: Vec<SeedId>,
}

impl RankedCandidate {
    pub fn id(&self) -> AnimeId {
        self.anime.id
    }
}

/// Merge, dedupe by id, and rank by appearance count.
///
/// # Arguments
/// * `lists` - Candidate lists in priority order; not mutated
///
/// # Returns
/// One entry per distinct id, count descending, first-seen on ties
pub fn aggregate(lists: &[Vec<Candidate>]) -> Vec<RankedCandidate> {
    let mut merged: IndexMap<AnimeId, RankedCandidate> = IndexMap::new();

    for candidate in lists.iter().flatten() {
        match merged.entry(candidate.id()) {
            Entry::Occupied(mut entry) => {
                let ranked = entry.get_mut();
                ranked.appearances += 1;
                if let Some(seed) = candidate.seed {
                    if !ranked.seeds.contains(&seed) {
                        ranked.seeds.push(seed);
                    }
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(RankedCandidate {
                    anime: candidate.anime.clone(),
                    source: candidate.source,
                    appearances: 1,
                    seeds: candidate.seed.into_iter().collect(),
                });
            }
        }
    }

    let mut ranked: Vec<RankedCandidate> = merged.into_values().collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.appearances.cmp(&a.appearances));
    ranked
}
