use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use play_ranks::bgg::{
    classify_export, parse_games_played, parse_leaderboard, Endpoints, ExportStatus,
    GamesPlayedContent,
};
use play_ranks::config::AppConfig;
use play_ranks::fetch::Fetcher;
use play_ranks::parse_duration;
use play_ranks::pipeline::{
    absolute_rank, threshold_on_page, FailurePolicy, Pipeline, PipelineConfig, PipelineError,
    RunResult,
};
use play_ranks::storage::{ReportFormat, ReportWriter, StorageConfig};

#[derive(Parser)]
#[command(name = "play-ranks")]
#[command(about = "Where a BoardGameGeek user ranks on the all-time plays leaderboard of every game they play")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./play-ranks.toml")]
    config: String,

    /// Data directory path (page cache)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve leaderboard ranks for every game a user has played
    Ranks {
        /// BoardGameGeek username (prompted for when omitted)
        #[arg(long)]
        username: Option<String>,

        /// Report format: pipe or jsonl
        #[arg(long, default_value = "pipe")]
        format: String,

        /// Directory the report is written to
        #[arg(long)]
        output_dir: Option<String>,

        /// Wait between collection export polls (e.g., "5s")
        #[arg(long)]
        poll_interval: Option<String>,

        /// Give up on the collection export after this long (e.g., "10m")
        #[arg(long)]
        max_wait: Option<String>,

        /// Always fetch pages from the network
        #[arg(long)]
        no_cache: bool,

        /// Skip games whose leaderboard cannot be read instead of aborting
        #[arg(long)]
        keep_going: bool,
    },

    /// Debug utilities
    Debug {
        #[command(subcommand)]
        action: DebugAction,
    },
}

#[derive(Subcommand)]
enum DebugAction {
    /// Parse a saved leaderboard page
    ParseLeaderboard {
        /// Path to HTML file
        path: String,

        /// Look for this user's row
        #[arg(long)]
        username: Option<String>,

        /// Page number the file was saved from
        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Parse a saved games-played page
    ParseGamesPlayed {
        /// Path to HTML file
        path: String,
    },

    /// Classify a saved collection export response
    ParseExport {
        /// Path to XML file
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&PathBuf::from(&cli.config))
        .with_context(|| format!("Loading config from {}", cli.config))?;
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = PathBuf::from(data_dir);
    }
    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting play-ranks v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Ranks {
            username,
            format,
            output_dir,
            poll_interval,
            max_wait,
            no_cache,
            keep_going,
        } => {
            let format: ReportFormat = format.parse()?;

            if let Some(output_dir) = output_dir {
                config.output_dir = PathBuf::from(output_dir);
            }
            if no_cache {
                config.fetch.cache_ttl_seconds = 0;
            }

            let mut poll = config.poll.poll_config();
            if let Some(s) = poll_interval {
                poll.interval = parse_duration(&s)
                    .with_context(|| format!("Invalid --poll-interval: {}", s))?;
            }
            if let Some(s) = max_wait {
                poll.max_wait =
                    Some(parse_duration(&s).with_context(|| format!("Invalid --max-wait: {}", s))?);
            }

            let username = match username {
                Some(name) => name,
                None => prompt_username()?,
            };
            let username = username.trim().to_string();
            if username.is_empty() {
                bail!("Username must not be empty");
            }

            let storage = StorageConfig::new(config.data_dir.clone(), config.output_dir.clone());
            let fetcher = Fetcher::new(config.fetch.fetcher_config(storage.raw_dir()))?;
            let endpoints = Endpoints::new(&config.source.base_url, &config.source.export_base_url)?;

            let pipeline = Pipeline::new(
                PipelineConfig {
                    poll,
                    failure_policy: if keep_going {
                        FailurePolicy::Isolate
                    } else {
                        FailurePolicy::FailFast
                    },
                },
                Arc::new(fetcher),
                endpoints,
            );

            let cancel = pipeline.cancel_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, stopping after the current request");
                    cancel.cancel().await;
                }
            });

            let result = match pipeline.run(&username).await {
                Ok(result) => result,
                Err(PipelineError::UserNotFound(_)) => {
                    println!("no user by that name");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            let writer = ReportWriter::new(storage.reports_dir(), format);
            let path = writer.write(&result.canonical_username, &result.records)?;

            print_summary(&result, &path);
        }

        Commands::Debug { action } => match action {
            DebugAction::ParseLeaderboard {
                path,
                username,
                page,
            } => {
                let html = std::fs::read_to_string(&path)
                    .with_context(|| format!("Reading {}", path))?;
                let parsed = parse_leaderboard(&html);

                println!("Rows: {} (last page: {})", parsed.len(), parsed.is_last());
                for row in parsed.rows() {
                    println!(
                        "  #{:<5} plays {:>6}  {}",
                        absolute_rank(page, row.position),
                        row.play_count,
                        row.profile_names.join(", ")
                    );
                }

                match threshold_on_page(page, &parsed) {
                    Some(ghi) => println!("GHI: {}", ghi),
                    None => println!("GHI: not determined on this page"),
                }

                if let Some(username) = username {
                    match parsed.find_user(&username) {
                        Some(row) => println!(
                            "{}: rank {} with {} plays",
                            username,
                            absolute_rank(page, row.position),
                            row.user_plays
                        ),
                        None => println!("{}: not on this page", username),
                    }
                }
            }

            DebugAction::ParseGamesPlayed { path } => {
                let html = std::fs::read_to_string(&path)
                    .with_context(|| format!("Reading {}", path))?;
                let parsed = parse_games_played(&html)?;

                println!(
                    "Heading username: {}",
                    parsed.heading_username.as_deref().unwrap_or("(none)")
                );
                match parsed.content {
                    GamesPlayedContent::Exhausted => println!("No more games (end marker)"),
                    GamesPlayedContent::Games(games) => {
                        println!("Games: {}", games.len());
                        for game in games {
                            println!("  {:>8}  {}", game.id, game.name);
                        }
                    }
                }
            }

            DebugAction::ParseExport { path } => {
                let xml = std::fs::read_to_string(&path)
                    .with_context(|| format!("Reading {}", path))?;

                match classify_export(&xml) {
                    ExportStatus::Pending(message) => println!("Pending: {}", message),
                    ExportStatus::NotFound(message) => println!("Not found: {}", message),
                    ExportStatus::Ready(owned) => println!("Ready: {} owned items", owned.len()),
                }
            }
        },
    }

    Ok(())
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_summary(result: &RunResult, path: &std::path::Path) {
    let games = result.records.len();
    let ranked = result.ranked_count();

    println!("\n=== Play Ranks for {} ===", result.canonical_username);
    println!("Games:     {}", games);
    println!("Ranked:    {}", ranked);
    println!("Unranked:  {}", games - ranked);
    println!(
        "Owned:     {} of {} collection items played",
        result.owned_played_count(),
        result.owned_count
    );
    if !result.failures.is_empty() {
        println!("Skipped:   {}", result.failures.len());
        for failure in &result.failures {
            println!("  - {} ({}): {}", failure.game.name, failure.game.id, failure.error);
        }
    }
    println!("Took:      {:.1}s", result.duration.as_secs_f64());
    println!("Report:    {}", path.display());
}
