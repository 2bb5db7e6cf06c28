use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, time::Duration};

/// Statistic categories published per page, in the order they are folded
/// into the combined player view.
pub const PLAYER_STAT_CATEGORIES: [&str; 6] =
    ["standard", "shooting", "passing", "defense", "possession", "misc"];

/// Per-team tables of a competition page, folded on the squad column.
pub const SQUAD_STAT_CATEGORIES: [&str; 4] = ["standard", "shooting", "passing", "defense"];

pub const MATCH_LOG_TABLE: &str = "matchlogs_for";
pub const PLAYER_MATCH_LOG_TABLE: &str = "matchlogs_all";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapingConfig {
    pub user_agent: String,
    pub extra_headers: Vec<(String, String)>,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_step_ms: u64,
    pub entity_pause_ms: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/126.0.6478.114 Safari/537.36"
                .to_string(),
            extra_headers: vec![
                ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
                ("Referer".to_string(), "https://google.com".to_string()),
                ("Connection".to_string(), "keep-alive".to_string()),
            ],
            request_timeout_secs: 30,
            max_attempts: 3,
            backoff_step_ms: 1500,
            entity_pause_ms: 2000,
        }
    }
}

impl ScrapingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }

    pub fn entity_pause(&self) -> Duration {
        Duration::from_millis(self.entity_pause_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("out"),
        }
    }
}

/// Naming convention of the site template being scraped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum IdentifierScheme {
    /// `stats_shooting_combined`
    #[default]
    Combined,
    /// `stats_shooting_9`, where the suffix is a season or competition number.
    Suffixed(String),
}

impl IdentifierScheme {
    pub fn stats_id(&self, category: &str) -> String {
        match self {
            IdentifierScheme::Combined => format!("stats_{}_combined", category),
            IdentifierScheme::Suffixed(suffix) => format!("stats_{}_{}", category, suffix),
        }
    }

    /// Match log first, then every player statistic table.
    pub fn table_ids(&self) -> Vec<String> {
        std::iter::once(MATCH_LOG_TABLE.to_string())
            .chain(PLAYER_STAT_CATEGORIES.iter().map(|c| self.stats_id(c)))
            .collect()
    }

    /// Identifiers folded into the combined player table.
    pub fn player_stat_ids(&self) -> Vec<String> {
        PLAYER_STAT_CATEGORIES.iter().map(|c| self.stats_id(c)).collect()
    }
}

/// `stats_squads_shooting_for`; competition pages use one template across seasons.
pub fn squad_stat_ids() -> Vec<String> {
    SQUAD_STAT_CATEGORIES
        .iter()
        .map(|c| format!("stats_squads_{}_for", c))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TableConfig {
    pub scheme: IdentifierScheme,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScraperConfig {
    pub scraping: ScrapingConfig,
    pub output: OutputConfig,
    pub tables: TableConfig,
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(user_agent) = env::var("SCRAPER_USER_AGENT") {
            config.scraping.user_agent = user_agent;
        }
        if let Some(timeout) = env_parsed::<u64>("SCRAPER_TIMEOUT_SECS") {
            config.scraping.request_timeout_secs = timeout;
        }
        if let Some(attempts) = env_parsed::<u32>("SCRAPER_MAX_ATTEMPTS") {
            config.scraping.max_attempts = attempts.max(1);
        }
        if let Some(backoff) = env_parsed::<u64>("SCRAPER_BACKOFF_MS") {
            config.scraping.backoff_step_ms = backoff;
        }
        if let Some(pause) = env_parsed::<u64>("SCRAPER_PAUSE_MS") {
            config.scraping.entity_pause_ms = pause;
        }
        if let Ok(dir) = env::var("FBREF_OUTPUT_DIR") {
            config.output.dir = PathBuf::from(dir);
        }
        if let Ok(suffix) = env::var("FBREF_TABLE_SUFFIX") {
            if !suffix.trim().is_empty() {
                config.tables.scheme = IdentifierScheme::Suffixed(suffix.trim().to_string());
            }
        }

        config
    }
}
