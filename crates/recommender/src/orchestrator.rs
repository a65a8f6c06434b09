//! # Recommendation Orchestrator
//!
//! This module sequences the recommendation pipeline for one user:
//! 1. Resolve the provider tag and credentials
//! 2. Resolve the viewer behind the token
//! 3. Seeded providers (AniList): fetch recent and top rated seeds, then
//!    expand both lists through the recommendation graph in parallel
//! 4. Suggestion providers (MyAnimeList): fetch the ranked suggestion feed
//! 5. Aggregate each signal independently (dedupe, rank by appearances)
//! 6. Drop titles already on the user's list
//! 7. Return the named groups
//!
//! Partial upstream failures degrade a stage to an empty result. Only bad
//! credentials or the loss of every signal become errors.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::{error, info, warn};

use catalog::{AnimeId, Credentials, Provider, Viewer};
use pipeline::watched::{filter_watched, watched_pipeline};
use pipeline::{FilterPipeline, RankedCandidate, aggregate};
use providers::{
    AniListClient, AnimeTracker, ClientOptions, MalClient, Pacer, SeededProvider,
    SuggestingProvider,
};
use sources::history::{build_user_context, fetch_seed_sets};
use sources::{BatchRecommendationFetcher, CandidateSource, SuggestionSource, UserContext};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::set::{GroupKind, RecommendationGroup, RecommendationSet};

/// Main orchestrator that coordinates the recommendation pipeline
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    config: PipelineConfig,
    anilist: Arc<dyn SeededProvider>,
    mal: Arc<dyn SuggestingProvider>,
    filter_pipeline: Arc<FilterPipeline>,
}

impl RecommendationOrchestrator {
    /// Create an orchestrator backed by the real AniList and MyAnimeList
    /// clients, each with its own pacer
    pub fn new(config: PipelineConfig) -> anyhow::Result<Self> {
        let anilist = AniListClient::new(ClientOptions::new(
            config.anilist_url.clone(),
            config.request_timeout(),
            Pacer::new(config.pacing()),
        ))
        .context("Failed to build AniList client")?;
        let mal = MalClient::new(ClientOptions::new(
            config.mal_url.clone(),
            config.request_timeout(),
            Pacer::new(config.pacing()),
        ))
        .context("Failed to build MyAnimeList client")?;

        Ok(Self::with_providers(Arc::new(anilist), Arc::new(mal), config))
    }

    /// Create an orchestrator over arbitrary provider implementations
    pub fn with_providers(
        anilist: Arc<dyn SeededProvider>,
        mal: Arc<dyn SuggestingProvider>,
        config: PipelineConfig,
    ) -> Self {
        let filter_pipeline = Arc::new(watched_pipeline(config.watched_policy));
        Self {
            config,
            anilist,
            mal,
            filter_pipeline,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Main entry point: ranked recommendation groups for one user
    ///
    /// # Arguments
    /// * `provider_tag` - "mal" or "anilist"; blank is an error, any other
    ///   unrecognized tag yields an empty set
    /// * `access_token` - Bearer token from the auth collaborator
    /// * `refresh_token` - Carried along, never used here
    ///
    /// # Returns
    /// Named groups, each ranked by appearance count
    pub async fn get_recommendations(
        &self,
        provider_tag: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<RecommendationSet> {
        let start_time = Instant::now();

        if provider_tag.trim().is_empty() {
            warn!("Missing provider tag");
            return Err(PipelineError::MissingProvider);
        }
        let Ok(provider) = provider_tag.parse::<Provider>() else {
            warn!(provider_tag, "Unknown provider tag, returning no recommendations");
            return Ok(RecommendationSet::empty());
        };
        let credentials = Credentials::new(provider, access_token, refresh_token.map(str::to_string))
            .map_err(|e| {
                warn!(%provider, error = %e, "Rejected credentials");
                PipelineError::from_catalog(provider, &e)
            })?;

        let set = match provider {
            Provider::AniList => self.seeded_recommendations(&self.anilist, credentials).await?,
            Provider::Mal => self.suggested_recommendations(&self.mal, credentials).await?,
        };

        info!(
            %provider,
            groups = set.groups.len(),
            items = set.len(),
            "Total time to get recommendations: {:.2?}",
            start_time.elapsed()
        );
        Ok(set)
    }

    /// The authenticated user's profile and list statistics
    pub async fn profile(&self, credentials: &Credentials) -> Result<Viewer> {
        let provider = credentials.provider;
        let viewer = match provider {
            Provider::AniList => self.anilist.viewer(credentials).await,
            Provider::Mal => self.mal.viewer(credentials).await,
        };
        viewer.map_err(|e| {
            error!(%provider, error = %e, "Failed to fetch profile");
            PipelineError::from_provider(provider, &e)
        })
    }

    /// Put a title on the user's plan-to-watch list
    pub async fn mark_planned(&self, credentials: &Credentials, anime_id: AnimeId) -> Result<()> {
        let provider = credentials.provider;
        let outcome = match provider {
            Provider::AniList => self.anilist.mark_planned(credentials, anime_id).await,
            Provider::Mal => self.mal.mark_planned(credentials, anime_id).await,
        };
        outcome.map_err(|e| {
            error!(%provider, anime_id, error = %e, "Failed to update list");
            PipelineError::from_provider(provider, &e)
        })?;
        info!(%provider, anime_id, "Added title to plan-to-watch");
        Ok(())
    }

    // =========================================================================
    // Provider paths
    // =========================================================================

    /// Seeds -> expansion -> per-group aggregation -> Watched-Filter
    async fn seeded_recommendations(
        &self,
        provider: &Arc<dyn SeededProvider>,
        credentials: Credentials,
    ) -> Result<RecommendationSet> {
        let tracker = provider.as_ref();
        let kind = tracker.provider();
        let mut context = self.resolve_user(tracker, credentials).await?;

        let stage = Instant::now();
        let seeds = fetch_seed_sets(tracker, &context, self.config.seed_limit).await;
        info!(
            recent = seeds.recent.len(),
            top_rated = seeds.top_rated.len(),
            "Fetched seeds in {:.2?}",
            stage.elapsed()
        );
        if seeds.is_empty() {
            warn!(provider = %kind, "No seed titles available");
            return Err(PipelineError::NoSignal { provider: kind });
        }

        let stage = Instant::now();
        let fetcher = BatchRecommendationFetcher::new(Arc::clone(provider))
            .with_batch_size(self.config.batch_size)
            .with_per_seed(self.config.recommendations_per_seed);
        let (recent, top_rated) = tokio::join!(
            fetcher.fetch_recommendations_for_seeds(
                &context.credentials,
                &seeds.recent,
                CandidateSource::Recent
            ),
            fetcher.fetch_recommendations_for_seeds(
                &context.credentials,
                &seeds.top_rated,
                CandidateSource::TopRated
            ),
        );
        info!(
            recent = recent.len(),
            top_rated = top_rated.len(),
            "Expanded seeds in {:.2?}",
            stage.elapsed()
        );
        if recent.is_empty() && top_rated.is_empty() {
            warn!(provider = %kind, "Seed expansion produced no candidates");
            return Err(PipelineError::NoSignal { provider: kind });
        }

        let recent = aggregate(&[recent]);
        let top_rated = aggregate(&[top_rated]);

        let recent = self.apply_filters(tracker, &mut context, recent).await?;
        let top_rated = self.apply_filters(tracker, &mut context, top_rated).await?;

        Ok(RecommendationSet::new(kind)
            .with_group(RecommendationGroup::from_ranked(GroupKind::Recent, recent))
            .with_group(RecommendationGroup::from_ranked(GroupKind::TopRated, top_rated)))
    }

    /// Suggestion feed -> aggregation -> Watched-Filter
    async fn suggested_recommendations(
        &self,
        provider: &Arc<dyn SuggestingProvider>,
        credentials: Credentials,
    ) -> Result<RecommendationSet> {
        let tracker = provider.as_ref();
        let kind = tracker.provider();
        let mut context = self.resolve_user(tracker, credentials).await?;

        let stage = Instant::now();
        let source = SuggestionSource::new(Arc::clone(provider)).with_limit(self.config.suggestion_limit);
        let candidates = match source.get_candidates(&context.credentials).await {
            Ok(candidates) if !candidates.is_empty() => candidates,
            Ok(_) => {
                warn!(provider = %kind, "Suggestion feed is empty");
                return Err(PipelineError::NoSignal { provider: kind });
            }
            Err(e) => {
                warn!(provider = %kind, error = %e, "Suggestion feed failed");
                return Err(PipelineError::NoSignal { provider: kind });
            }
        };
        info!(count = candidates.len(), "Fetched suggestions in {:.2?}", stage.elapsed());

        let ranked = aggregate(&[candidates]);
        let kept = self.apply_filters(tracker, &mut context, ranked).await?;

        Ok(RecommendationSet::new(kind)
            .with_group(RecommendationGroup::from_ranked(GroupKind::Suggested, kept)))
    }

    // =========================================================================
    // Stages
    // =========================================================================

    /// Resolve the viewer; a rejected token is a credentials error, any
    /// other failure leaves nothing to seed from
    async fn resolve_user<T>(&self, tracker: &T, credentials: Credentials) -> Result<UserContext>
    where
        T: AnimeTracker + ?Sized,
    {
        let provider = tracker.provider();
        build_user_context(tracker, credentials).await.map_err(|e| {
            if e.is_unauthorized() {
                warn!(%provider, "Access token rejected");
                PipelineError::InvalidCredentials { provider }
            } else {
                error!(%provider, error = %e, "Failed to resolve viewer");
                PipelineError::NoSignal { provider }
            }
        })
    }

    /// Watched-Filter; the user's list is fetched once per run
    async fn apply_filters<T>(
        &self,
        tracker: &T,
        context: &mut UserContext,
        candidates: Vec<RankedCandidate>,
    ) -> Result<Vec<RankedCandidate>>
    where
        T: AnimeTracker + ?Sized,
    {
        filter_watched(tracker, context, candidates, &self.filter_pipeline)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to apply filters");
                PipelineError::Internal
            })
    }
}
