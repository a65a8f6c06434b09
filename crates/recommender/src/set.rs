//! The ranked output handed to the card interface.
//!
//! Seeded providers produce two independent groups (recently finished,
//! top rated); suggestion providers produce one. Groups stay separate so
//! the caller decides how to interleave them; `flatten` gives the simple
//! single-stack view.

use catalog::{Anime, AnimeId, Provider};
use pipeline::RankedCandidate;
use serde::Serialize;
use sources::CandidateSource;
use std::collections::HashSet;
use std::fmt;

/// Named origin of a recommendation group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupKind {
    Recent,
    TopRated,
    Suggested,
}

impl GroupKind {
    pub fn label(&self) -> &'static str {
        match self {
            GroupKind::Recent => "Because you recently finished",
            GroupKind::TopRated => "Because you rated highly",
            GroupKind::Suggested => "Suggested for you",
        }
    }

    fn reason(&self, appearances: u32) -> String {
        match (self, appearances) {
            (GroupKind::Recent, 0 | 1) => "Similar to a title you finished recently".to_string(),
            (GroupKind::Recent, n) => format!("Recommended from {n} titles you finished recently"),
            (GroupKind::TopRated, 0 | 1) => "Similar to one of your top rated titles".to_string(),
            (GroupKind::TopRated, n) => format!("Recommended from {n} of your top rated titles"),
            (GroupKind::Suggested, _) => "Suggested from your list".to_string(),
        }
    }
}

impl From<CandidateSource> for GroupKind {
    fn from(source: CandidateSource) -> Self {
        match source {
            CandidateSource::Recent => GroupKind::Recent,
            CandidateSource::TopRated => GroupKind::TopRated,
            CandidateSource::Suggested => GroupKind::Suggested,
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One output card with its ranking provenance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub anime: Anime,
    /// How many seed lookups returned this title (1 for feeds)
    pub appearances: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationGroup {
    pub kind: GroupKind,
    pub items: Vec<Recommendation>,
}

impl RecommendationGroup {
    /// Build a group from ranked candidates, stamping each with a reason
    /// drawn from the signal that produced it
    pub fn from_ranked(kind: GroupKind, ranked: Vec<RankedCandidate>) -> Self {
        let items = ranked
            .into_iter()
            .map(|candidate| {
                let origin = GroupKind::from(candidate.source);
                let mut anime = candidate.anime;
                anime.recommendation_reason = Some(origin.reason(candidate.appearances));
                Recommendation {
                    anime,
                    appearances: candidate.appearances,
                }
            })
            .collect();
        Self { kind, items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Named ranked groups for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommendationSet {
    /// `None` when the provider tag was not recognized
    pub provider: Option<Provider>,
    pub groups: Vec<RecommendationGroup>,
}

impl RecommendationSet {
    /// The result for an unrecognized provider
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(provider: Provider) -> Self {
        Self {
            provider: Some(provider),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: RecommendationGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn group(&self, kind: GroupKind) -> Option<&RecommendationGroup> {
        self.groups.iter().find(|group| group.kind == kind)
    }

    /// True when no group holds an item
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(RecommendationGroup::is_empty)
    }

    /// Item count across groups, duplicates included
    pub fn len(&self) -> usize {
        self.groups.iter().map(RecommendationGroup::len).sum()
    }

    /// Single stack in group order, first occurrence of each id kept
    pub fn flatten(&self) -> Vec<Anime> {
        let mut seen: HashSet<AnimeId> = HashSet::new();
        self.groups
            .iter()
            .flat_map(|group| group.items.iter())
            .filter(|item| seen.insert(item.anime.id))
            .map(|item| item.anime.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(id: AnimeId, source: CandidateSource, appearances: u32) -> RankedCandidate {
        RankedCandidate {
            anime: Anime::new(id, format!("Title {id}")),
            source,
            appearances,
            seeds: vec![],
        }
    }

    fn sample_set() -> RecommendationSet {
        RecommendationSet::new(Provider::AniList)
            .with_group(RecommendationGroup::from_ranked(
                GroupKind::Recent,
                vec![
                    ranked(1, CandidateSource::Recent, 3),
                    ranked(2, CandidateSource::Recent, 1),
                ],
            ))
            .with_group(RecommendationGroup::from_ranked(
                GroupKind::TopRated,
                vec![
                    ranked(2, CandidateSource::TopRated, 2),
                    ranked(3, CandidateSource::TopRated, 1),
                ],
            ))
    }

    #[test]
    fn test_flatten_keeps_group_order_and_first_occurrence() {
        let set = sample_set();
        let flat = set.flatten();
        let ids: Vec<AnimeId> = flat.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        // Title 2 keeps the reason from the group it first appeared in
        assert_eq!(
            flat[1].recommendation_reason.as_deref(),
            Some("Similar to a title you finished recently")
        );
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_reasons_follow_appearances() {
        let set = sample_set();
        let recent = set.group(GroupKind::Recent).unwrap();
        assert_eq!(
            recent.items[0].anime.recommendation_reason.as_deref(),
            Some("Recommended from 3 titles you finished recently")
        );
        let top = set.group(GroupKind::TopRated).unwrap();
        assert_eq!(
            top.items[0].anime.recommendation_reason.as_deref(),
            Some("Recommended from 2 of your top rated titles")
        );
    }

    #[test]
    fn test_reason_follows_candidate_source() {
        let group = RecommendationGroup::from_ranked(
            GroupKind::TopRated,
            vec![ranked(5, CandidateSource::Suggested, 1)],
        );
        assert_eq!(group.kind, GroupKind::TopRated);
        assert_eq!(
            group.items[0].anime.recommendation_reason.as_deref(),
            Some("Suggested from your list")
        );
    }

    #[test]
    fn test_empty_set() {
        let set = RecommendationSet::empty();
        assert!(set.is_empty());
        assert!(set.provider.is_none());
        assert!(set.flatten().is_empty());

        let set = RecommendationSet::new(Provider::Mal)
            .with_group(RecommendationGroup::from_ranked(GroupKind::Suggested, vec![]));
        assert!(set.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let set = RecommendationSet::new(Provider::Mal).with_group(RecommendationGroup::from_ranked(
            GroupKind::Suggested,
            vec![ranked(9, CandidateSource::Suggested, 1)],
        ));
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["provider"], "mal");
        assert_eq!(value["groups"][0]["kind"], "suggested");
        let item = &value["groups"][0]["items"][0];
        assert_eq!(item["id"], 9);
        assert_eq!(item["appearances"], 1);
        assert_eq!(item["recommendationReason"], "Suggested from your list");
    }
}
