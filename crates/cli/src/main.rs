use anyhow::{Context, Result};
use catalog::{AnimeId, Credentials, Provider, Viewer};
use clap::{Parser, Subcommand};
use colored::Colorize;
use recommender::{PipelineConfig, RecommendationGroup, RecommendationOrchestrator, RecommendationSet};
use std::time::Instant;
use tracing::debug;

/// anime-swipe - anime recommendations from your MyAnimeList or AniList history
#[derive(Parser)]
#[command(name = "anime-swipe")]
#[command(about = "Anime recommendations aggregated from your tracker history", long_about = None)]
struct Cli {
    /// Tracker to use: "mal" or "anilist"
    #[arg(short, long, env = "ANIME_SWIPE_PROVIDER", default_value = "anilist")]
    provider: String,

    /// OAuth access token for the tracker
    #[arg(long, env = "ANIME_SWIPE_ACCESS_TOKEN", hide_env_values = true)]
    token: String,

    /// OAuth refresh token, carried along with the access token
    #[arg(long, env = "ANIME_SWIPE_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    /// Minimum milliseconds between upstream calls (overrides ANIME_SWIPE_PACING_MS)
    #[arg(long)]
    pacing_ms: Option<u64>,

    /// Print JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get recommendations built from your watch history
    Recommend {
        /// Titles shown per group
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Merge the groups into one deduplicated stack
        #[arg(long)]
        flat: bool,

        /// Show synopsis, reason and trailer for each title
        #[arg(long)]
        explain: bool,
    },

    /// Show your profile and list statistics
    Profile,

    /// Add a title to your plan-to-watch list
    Plan {
        /// Provider-scoped anime id
        anime_id: AnimeId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env()?;
    if let Some(pacing_ms) = cli.pacing_ms {
        config.pacing_ms = pacing_ms;
    }
    debug!(?config, "Loaded pipeline config");
    let orchestrator = RecommendationOrchestrator::new(config)?;

    match cli.command {
        Commands::Recommend {
            limit,
            flat,
            explain,
        } => {
            handle_recommend(
                &orchestrator,
                &cli.provider,
                &cli.token,
                cli.refresh_token.as_deref(),
                RecommendOutput {
                    limit,
                    flat,
                    explain,
                    json: cli.json,
                },
            )
            .await?
        }
        Commands::Profile => {
            let credentials = credentials(&cli.provider, &cli.token, cli.refresh_token)?;
            handle_profile(&orchestrator, &credentials, cli.json).await?
        }
        Commands::Plan { anime_id } => {
            let credentials = credentials(&cli.provider, &cli.token, cli.refresh_token)?;
            handle_plan(&orchestrator, &credentials, anime_id).await?
        }
    }

    Ok(())
}

fn credentials(tag: &str, token: &str, refresh_token: Option<String>) -> Result<Credentials> {
    let provider: Provider = tag.parse().context("Unknown provider")?;
    Credentials::new(provider, token, refresh_token).context("Invalid credentials")
}

struct RecommendOutput {
    limit: usize,
    flat: bool,
    explain: bool,
    json: bool,
}

/// Handle the 'recommend' command
async fn handle_recommend(
    orchestrator: &RecommendationOrchestrator,
    provider: &str,
    token: &str,
    refresh_token: Option<&str>,
    output: RecommendOutput,
) -> Result<()> {
    let start = Instant::now();
    let set = orchestrator
        .get_recommendations(provider, token, refresh_token)
        .await
        .context("Failed to get recommendations")?;

    if output.json {
        let json = if output.flat {
            serde_json::to_string_pretty(&set.flatten())?
        } else {
            serde_json::to_string_pretty(&set)?
        };
        println!("{json}");
        return Ok(());
    }

    if set.provider.is_none() {
        println!("{} Unknown provider '{}', nothing to recommend", "!".yellow(), provider);
        return Ok(());
    }
    print_recommendations(&set, &output);
    println!(
        "{} {} titles in {:.2?}",
        "✓".green(),
        set.len(),
        start.elapsed()
    );
    Ok(())
}

/// Handle the 'profile' command
async fn handle_profile(
    orchestrator: &RecommendationOrchestrator,
    credentials: &Credentials,
    json: bool,
) -> Result<()> {
    let viewer = orchestrator
        .profile(credentials)
        .await
        .context("Failed to fetch profile")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&viewer)?);
    } else {
        print_profile(credentials.provider, &viewer);
    }
    Ok(())
}

/// Handle the 'plan' command
async fn handle_plan(
    orchestrator: &RecommendationOrchestrator,
    credentials: &Credentials,
    anime_id: AnimeId,
) -> Result<()> {
    orchestrator
        .mark_planned(credentials, anime_id)
        .await
        .with_context(|| format!("Failed to add {anime_id} to plan-to-watch"))?;
    println!(
        "{} Added {} to your {} plan-to-watch list",
        "✓".green(),
        anime_id,
        credentials.provider
    );
    Ok(())
}

fn print_recommendations(set: &RecommendationSet, output: &RecommendOutput) {
    if output.flat {
        println!("{}", "Recommendations:".bold().blue());
        for (rank, anime) in set.flatten().iter().take(output.limit).enumerate() {
            print_title(rank + 1, anime, None, output.explain);
        }
        return;
    }

    for group in &set.groups {
        print_group(group, output);
    }
}

fn print_group(group: &RecommendationGroup, output: &RecommendOutput) {
    println!("{}", format!("{}:", group.kind.label()).bold().blue());
    if group.is_empty() {
        println!("  {}", "(nothing new here)".dimmed());
    }
    for (rank, item) in group.items.iter().take(output.limit).enumerate() {
        print_title(rank + 1, &item.anime, Some(item.appearances), output.explain);
    }
    println!();
}

fn print_title(rank: usize, anime: &catalog::Anime, appearances: Option<u32>, explain: bool) {
    let score = anime
        .score
        .map(|s| format!("{s:.1}"))
        .unwrap_or_else(|| "-".to_string());
    let episodes = anime
        .episodes
        .map(|e| format!("{e} eps"))
        .unwrap_or_else(|| "? eps".to_string());
    let seen = appearances
        .filter(|n| *n > 1)
        .map(|n| format!(" x{n}").yellow().to_string())
        .unwrap_or_default();

    println!(
        "{}. {} [{}] {} - {} - Score: {}{}",
        rank.to_string().green(),
        anime.title.bold(),
        anime.id,
        anime.kind,
        episodes,
        score,
        seen
    );
    if !anime.genres.is_empty() {
        println!("   {}", anime.genres.join(", ").dimmed());
    }
    if explain {
        if let Some(reason) = &anime.recommendation_reason {
            println!("   {} {}", "Why:".cyan(), reason);
        }
        if let Some(synopsis) = &anime.synopsis {
            println!("   {}", truncate(synopsis, 240));
        }
        if let Some(trailer) = &anime.trailer {
            println!("   {} {}", "Trailer:".cyan(), trailer.embed_url());
        }
    }
}

fn print_profile(provider: Provider, viewer: &Viewer) {
    println!("{}", format!("{} ({})", viewer.name, provider).bold().blue());
    if let Some(avatar) = &viewer.avatar {
        println!("{}Avatar: {}", "• ".green(), avatar);
    }
    let Some(stats) = &viewer.statistics else {
        println!("{}No list statistics available", "• ".green());
        return;
    };
    println!("{}Watching: {}", "• ".green(), stats.watching);
    println!("{}Completed: {}", "• ".green(), stats.completed);
    println!("{}On hold: {}", "• ".green(), stats.on_hold);
    println!("{}Dropped: {}", "• ".green(), stats.dropped);
    println!("{}Plan to watch: {}", "• ".green(), stats.plan_to_watch);
    println!("{}Episodes watched: {}", "• ".cyan(), stats.episodes);
    println!("{}Days watched: {:.1}", "• ".cyan(), stats.days_watched);
    match stats.mean_score {
        Some(mean) => println!("{}Mean score: {:.1}", "• ".cyan(), mean),
        None => println!("{}Mean score: -", "• ".cyan()),
    }
}

/// Cut at a char boundary, appending an ellipsis when shortened
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
