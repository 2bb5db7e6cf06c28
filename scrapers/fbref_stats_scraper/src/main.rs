use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::info;

use fbref_stats_scraper::{
    config::{IdentifierScheme, ScraperConfig, PLAYER_MATCH_LOG_TABLE},
    dataset::{ContextColumns, DatasetBuilder, PageRequest},
    fetch::Fetcher,
    player_logs::{crawl_player_logs, player_links},
    storage::{join_player_tables, reclean_dir},
    Source,
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape every statistics table of one page into CSV files
    Scrape {
        /// Page URL, or file://path for a saved page
        #[arg(short, long)]
        source: String,
        /// Output directory (defaults to FBREF_OUTPUT_DIR or "out")
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Numeric table id suffix used by season templates, e.g. 2025
        #[arg(long)]
        suffix: Option<String>,
        /// Explicit table ids, overriding the template's list
        #[arg(short, long = "table")]
        tables: Vec<String>,
        #[arg(long)]
        competition: Option<String>,
        #[arg(long)]
        season: Option<String>,
        /// Skip the combined player table
        #[arg(long)]
        no_combined: bool,
        /// Also extract the per-team tables of a competition page
        #[arg(long)]
        squads: bool,
    },
    /// Download each player's match log linked from the standard stats table
    PlayerLogs {
        /// Squad page URL
        #[arg(short, long)]
        source: String,
        #[arg(short, long, default_value = "out/players")]
        out: PathBuf,
        /// Optional limit on number of players to fetch
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Concatenate per-player CSVs into one file with a leading Player column
    JoinLogs {
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Re-run row cleaning and type coercion over saved CSVs in place
    Reclean {
        #[arg(short, long)]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = ScraperConfig::from_env();

    match cli.command {
        Commands::Scrape {
            source,
            out,
            suffix,
            tables,
            competition,
            season,
            no_combined,
            squads,
        } => {
            if let Some(out) = out {
                config.output.dir = out;
            }
            if let Some(suffix) = suffix {
                config.tables.scheme = IdentifierScheme::Suffixed(suffix);
            }

            let mut request = PageRequest::from_config(Source::parse(&source), &config);
            if !tables.is_empty() {
                request.table_ids = tables;
            }
            if no_combined {
                request.folds.clear();
            }
            if squads {
                request = request.with_squad_tables();
            }
            request.context = ContextColumns { competition, season };

            let builder = DatasetBuilder::from_config(&config)?;
            let manifest = builder.run(&request)?;
            info!(
                "Saved {} of {} tables to {:?}",
                manifest.present_count(),
                manifest.tables.len(),
                config.output.dir
            );
        }
        Commands::PlayerLogs { source, out, limit } => {
            let source = Source::parse(&source);
            let fetcher = Fetcher::from_config(&config.scraping).context("Failed to create HTTP client")?;
            let doc = fetcher
                .fetch(&source)
                .with_context(|| format!("Failed to retrieve {}", source))?;

            let standard_id = config.tables.scheme.stats_id("standard");
            let mut links = player_links(&doc.html, &standard_id, &source)
                .with_context(|| format!("Failed to read player links from '{}'", standard_id))?;
            if let Some(limit) = limit {
                links.truncate(limit);
            }
            info!("Found {} player match log links", links.len());

            let report = crawl_player_logs(
                &fetcher,
                &links,
                PLAYER_MATCH_LOG_TABLE,
                &out,
                config.scraping.entity_pause(),
            );
            info!(
                "Wrote {} match logs, {} players failed",
                report.written.len(),
                report.failed.len()
            );
        }
        Commands::JoinLogs { dir, output } => {
            let joined = join_player_tables(&dir, &output)
                .with_context(|| format!("Failed to join CSVs in {:?}", dir))?;
            info!("Joined table has {} rows, {} columns", joined.height(), joined.width());
        }
        Commands::Reclean { dir } => {
            let files = reclean_dir(&dir).with_context(|| format!("Failed to re-clean {:?}", dir))?;
            info!("Re-cleaned {} files", files.len());
        }
    }

    Ok(())
}
