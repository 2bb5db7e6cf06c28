use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{
    dataset::extract_table,
    error::{Result, ScrapeError},
    fetch::{Fetcher, Transport},
    locate::locate,
    storage::write_table,
    types::{Source, TableMarkup},
    utils::{element_text, file_stem_for, owned_rows, resolve_link, row_cells},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLink {
    pub name: String,
    pub url: String,
}

/// Player name from the row header cell and the link in the last data cell
/// of every body row.
pub fn player_links_from_markup(markup: &TableMarkup, base: &Source) -> Result<Vec<PlayerLink>> {
    let fragment = Html::parse_fragment(markup.as_str());
    let table_selector = Selector::parse("table").unwrap();
    let link_selector = Selector::parse("a[href]").unwrap();
    let table = fragment
        .select(&table_selector)
        .next()
        .ok_or_else(|| ScrapeError::Parse("markup contains no <table>".to_string()))?;

    let mut links: Vec<PlayerLink> = Vec::new();
    for row in owned_rows(table) {
        let cells = row_cells(&row);
        let name = match cells.iter().find(|c| c.value().name() == "th") {
            Some(th) => element_text(th),
            None => continue,
        };
        let last_td = match cells.iter().rev().find(|c| c.value().name() == "td") {
            Some(td) => td,
            None => continue,
        };
        let href = match last_td.select(&link_selector).next().and_then(|a| a.value().attr("href")) {
            Some(href) => href,
            None => continue,
        };

        match resolve_link(base, href) {
            Some(url) if !links.iter().any(|l| l.name == name) => links.push(PlayerLink { name, url }),
            Some(_) => debug!("Skipping repeated player '{}'", name),
            None => warn!("Cannot resolve link '{}' for '{}' relative to {}", href, name, base),
        }
    }

    Ok(links)
}

pub fn player_links(html: &str, table_id: &str, base: &Source) -> Result<Vec<PlayerLink>> {
    let markup = locate(html, table_id)?;
    player_links_from_markup(&markup, base)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(String, String)>,
}

/// Fetches each player's page in turn, pausing between requests, and writes
/// the cleaned match log as `<player>.csv`. Failures are logged and skipped.
pub fn crawl_player_logs<T: Transport>(
    fetcher: &Fetcher<T>,
    links: &[PlayerLink],
    log_table_id: &str,
    out_dir: &Path,
    pause: std::time::Duration,
) -> CrawlReport {
    let mut report = CrawlReport::default();

    for (i, link) in links.iter().enumerate() {
        if i > 0 {
            fetcher.pause(pause);
        }
        info!("Fetching match log for {} ({}/{})", link.name, i + 1, links.len());

        let outcome = fetcher
            .fetch(&Source::Remote(link.url.clone()))
            .and_then(|doc| extract_table(&doc.html, log_table_id))
            .and_then(|table| {
                let path = out_dir.join(format!("{}.csv", file_stem_for(&link.name)));
                write_table(&table, &path)?;
                Ok((path, table.height()))
            });

        match outcome {
            Ok((path, rows)) => {
                info!("Saved {} match log rows for {} to {:?}", rows, link.name, path);
                report.written.push(path);
            }
            Err(e) => {
                warn!("Skipping {}: {}", link.name, e);
                report.failed.push((link.name.clone(), e.to_string()));
            }
        }
    }

    report
}
