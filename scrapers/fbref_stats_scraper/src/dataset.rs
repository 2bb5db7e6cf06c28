//! Drives fetch, locate, flatten, clean and coerce over the tables of a page
//! and persists the results.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

use crate::{
    clean::clean,
    coerce::coerce,
    config::{squad_stat_ids, ScraperConfig},
    error,
    fetch::{Fetcher, ReqwestTransport, Transport},
    flatten::flatten,
    locate::locate,
    merge::{merge_all, MergeMode},
    storage::{write_table, write_table_set},
    types::{RawDocument, Source, Table, TableSet, TableSlot},
};

pub const COMBINED_PLAYERS_FILE: &str = "stats_combined.csv";
pub const COMBINED_SQUADS_FILE: &str = "squads_combined.csv";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Locates, flattens, cleans and coerces one table of a page.
pub fn extract_table(html: &str, id: &str) -> error::Result<Table> {
    let markup = locate(html, id)?;
    let raw = flatten(&markup)?;
    Ok(coerce(clean(raw)))
}

/// Extracts every identifier from one document. A table that cannot be found
/// or parsed is recorded as absent and the remaining identifiers still run.
pub fn build_table_set(doc: &RawDocument, ids: &[String]) -> TableSet {
    let mut set = TableSet::new();
    for id in ids {
        let slot = match extract_table(&doc.html, id) {
            Ok(table) => {
                info!("[ok] '{}' -> {} rows, {} columns", id, table.height(), table.width());
                TableSlot::Present(table)
            }
            Err(e) => {
                warn!("Failed to extract '{}' from {}: {}", id, doc.source, e);
                TableSlot::Absent { reason: e.to_string() }
            }
        };
        set.insert(id.as_str(), slot);
    }
    set
}

/// Constant columns naming where a table came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextColumns {
    pub competition: Option<String>,
    pub season: Option<String>,
}

impl ContextColumns {
    pub fn is_empty(&self) -> bool {
        self.competition.is_none() && self.season.is_none()
    }

    pub fn apply(&self, mut table: Table) -> Table {
        if let Some(competition) = &self.competition {
            table = table.with_constant_column("Competition", competition);
        }
        if let Some(season) = &self.season {
            table = table.with_constant_column("Season", season);
        }
        table
    }
}

pub fn add_context_columns(set: TableSet, context: &ContextColumns) -> TableSet {
    if context.is_empty() {
        return set;
    }
    set.map_tables(|_, table| context.apply(table))
}

/// Left-joins the per-player tables of `ids`, in order, on the player column.
pub fn combine_player_tables(set: &TableSet, ids: &[String]) -> Option<Table> {
    Fold::players(ids.to_vec()).apply(set)
}

/// Several tables of one page folded into a single combined file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub file: String,
    pub ids: Vec<String>,
    pub mode: MergeMode,
}

impl Fold {
    pub fn players(ids: Vec<String>) -> Self {
        Self {
            file: COMBINED_PLAYERS_FILE.to_string(),
            ids,
            mode: MergeMode::Entity,
        }
    }

    pub fn squads(ids: Vec<String>) -> Self {
        Self {
            file: COMBINED_SQUADS_FILE.to_string(),
            ids,
            mode: MergeMode::Group,
        }
    }

    pub fn apply(&self, set: &TableSet) -> Option<Table> {
        merge_all(self.ids.iter().map(|id| set.get(id).cloned()), self.mode)
    }
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub source: Source,
    pub table_ids: Vec<String>,
    pub folds: Vec<Fold>,
    pub context: ContextColumns,
}

impl PageRequest {
    pub fn from_config(source: Source, config: &ScraperConfig) -> Self {
        Self {
            source,
            table_ids: config.tables.scheme.table_ids(),
            folds: vec![Fold::players(config.tables.scheme.player_stat_ids())],
            context: ContextColumns::default(),
        }
    }

    /// Also extracts the per-team tables of a competition page and folds them on the squad column.
    pub fn with_squad_tables(mut self) -> Self {
        let ids = squad_stat_ids();
        for id in &ids {
            if !self.table_ids.contains(id) {
                self.table_ids.push(id.clone());
            }
        }
        self.folds.push(Fold::squads(ids));
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableReport {
    Saved { file: String, rows: usize, columns: usize },
    Absent { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub source: String,
    pub scraped_at: DateTime<Utc>,
    pub tables: Vec<(String, TableReport)>,
    pub combined: Vec<(String, TableReport)>,
}

impl RunManifest {
    pub fn present_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|(_, report)| matches!(report, TableReport::Saved { .. }))
            .count()
    }

    pub fn combined_report(&self, file: &str) -> Option<&TableReport> {
        self.combined.iter().find(|(f, _)| f == file).map(|(_, report)| report)
    }
}

fn saved(file: &str, table: &Table) -> TableReport {
    TableReport::Saved {
        file: file.to_string(),
        rows: table.height(),
        columns: table.width(),
    }
}

pub struct DatasetBuilder<T: Transport = ReqwestTransport> {
    fetcher: Fetcher<T>,
    out_dir: PathBuf,
}

impl DatasetBuilder<ReqwestTransport> {
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let fetcher = Fetcher::from_config(&config.scraping).context("Failed to create HTTP client")?;
        Ok(Self::new(fetcher, config.output.dir.clone()))
    }
}

impl<T: Transport> DatasetBuilder<T> {
    pub fn new(fetcher: Fetcher<T>, out_dir: PathBuf) -> Self {
        Self { fetcher, out_dir }
    }

    /// Fetches the page once and extracts every requested table from it. Only
    /// a failed fetch is an error.
    pub fn build(&self, request: &PageRequest) -> Result<TableSet> {
        let doc = self
            .fetcher
            .fetch(&request.source)
            .with_context(|| format!("Failed to retrieve {}", request.source))?;
        let set = build_table_set(&doc, &request.table_ids);
        Ok(add_context_columns(set, &request.context))
    }

    /// Builds the table set, writes one CSV per present table, the combined
    /// player table and a run manifest.
    pub fn run(&self, request: &PageRequest) -> Result<RunManifest> {
        let set = self.build(request)?;

        write_table_set(&set, &self.out_dir)
            .with_context(|| format!("Failed to write tables to {:?}", self.out_dir))?;

        let tables = set
            .iter()
            .map(|(id, slot)| {
                let report = match slot {
                    TableSlot::Present(table) => saved(&format!("{}.csv", id), table),
                    TableSlot::Absent { reason } => TableReport::Absent { reason: reason.clone() },
                };
                (id.to_string(), report)
            })
            .collect();

        let mut combined = Vec::new();
        for fold in &request.folds {
            let report = match fold.apply(&set) {
                Some(table) => {
                    let path = self.out_dir.join(&fold.file);
                    write_table(&table, &path)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    info!("Saved combined table ({} rows) to {:?}", table.height(), path);
                    saved(&fold.file, &table)
                }
                None => {
                    warn!("None of the tables for '{}' were found, skipping it", fold.file);
                    TableReport::Absent {
                        reason: "no source tables present".to_string(),
                    }
                }
            };
            combined.push((fold.file.clone(), report));
        }

        let manifest = RunManifest {
            source: request.source.to_string(),
            scraped_at: Utc::now(),
            tables,
            combined,
        };
        let manifest_path = self.out_dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
            .with_context(|| format!("Failed to write {:?}", manifest_path))?;

        info!(
            "Finished {}: {}/{} tables saved",
            manifest.source,
            manifest.present_count(),
            manifest.tables.len()
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    const PAGE: &str = r#"<html><body>
        <table id="stats_standard_combined"><thead><tr><th>Player</th><th>Gls</th></tr></thead>
        <tbody><tr><th>Pedro</th><td>18</td></tr><tr><th>Squad Total</th><td>52</td></tr></tbody></table>
        <!-- <table id="stats_misc_combined"><thead><tr><th>Player</th><th>CrdY</th></tr></thead>
        <tbody><tr><th>Pedro</th><td>3</td></tr></tbody></table> -->
        </body></html>"#;

    fn doc() -> RawDocument {
        RawDocument {
            source: Source::parse("file://page.html"),
            html: PAGE.to_string(),
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_table_is_recorded_as_absent() {
        let set = build_table_set(
            &doc(),
            &ids(&["stats_standard_combined", "stats_keeper_combined", "stats_misc_combined"]),
        );

        assert_eq!(set.len(), 3);
        assert_eq!(set.get("stats_standard_combined").map(Table::height), Some(1));
        assert!(matches!(
            set.slot("stats_keeper_combined"),
            Some(TableSlot::Absent { .. })
        ));
        assert_eq!(set.get("stats_misc_combined").map(|t| t.rows[0][1].clone()), Some(Cell::Int(3)));
    }

    #[test]
    fn test_combine_player_tables() {
        let set = build_table_set(&doc(), &ids(&["stats_standard_combined", "stats_misc_combined"]));
        let combined = combine_player_tables(
            &set,
            &ids(&["stats_standard_combined", "stats_shooting_combined", "stats_misc_combined"]),
        )
        .unwrap();
        assert_eq!(combined.headers, vec!["Player", "Gls", "CrdY"]);
    }

    #[test]
    fn test_context_columns() {
        let set = build_table_set(&doc(), &ids(&["stats_standard_combined"]));
        let context = ContextColumns {
            competition: Some("Série A".to_string()),
            season: Some("2025".to_string()),
        };
        let set = add_context_columns(set, &context);
        let table = set.get("stats_standard_combined").unwrap();
        assert_eq!(table.headers, vec!["Player", "Gls", "Competition", "Season"]);
        assert_eq!(table.rows[0][3], Cell::text("2025"));
    }
}
