//! Finds a statistics table by id, whether it is live in the DOM or hidden
//! inside an HTML comment.
//!
//! The site ships most secondary tables commented out and un-comments them
//! client side, so both placements are treated the same. Comment captures are
//! sometimes cut short before `</table>`; the fragment is closed before it is
//! re-parsed.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::{
    error::{Result, ScrapeError},
    flatten::flatten_element,
    types::TableMarkup,
};

const CLOSING_TAG: &str = "</table>";

pub fn locate(html: &str, id: &str) -> Result<TableMarkup> {
    let document = Html::parse_document(html);

    let table_selector = Selector::parse("table[id]").unwrap();
    if let Some(table) = document
        .select(&table_selector)
        .find(|t| t.value().attr("id") == Some(id))
    {
        debug!("Found table '{}' in the live document", id);
        return Ok(TableMarkup(table.html()));
    }

    let pattern = Regex::new(&format!(
        r#"(?i)<table[^>]*id=["']{}["']"#,
        regex::escape(id)
    ))
    .map_err(|e| ScrapeError::Parse(e.to_string()))?;

    let fragment = document
        .tree
        .nodes()
        .filter_map(|node| node.value().as_comment())
        .map(|comment| &**comment)
        .find(|text| pattern.is_match(text))
        .map(repair_fragment)
        .ok_or_else(|| ScrapeError::not_found(id))?;

    debug!("Found table '{}' inside an HTML comment", id);
    largest_table(&fragment)
        .ok_or_else(|| ScrapeError::Parse(format!("no table could be parsed for '{}'", id)))
}

/// Drops comment delimiters and closes a truncated table.
pub fn repair_fragment(comment: &str) -> String {
    let mut fragment = comment.replace("<!--", "").replace("-->", "");
    if !fragment.trim_end().to_ascii_lowercase().ends_with(CLOSING_TAG) {
        fragment.push_str(CLOSING_TAG);
    }
    fragment
}

/// Data rows and columns of a table once its header rows are flattened away.
fn shape(table: ElementRef) -> (usize, usize) {
    flatten_element(table).map_or((0, 0), |t| (t.height(), t.width()))
}

/// Picks the table with the most data rows, then the most columns. Earlier
/// tables win exact ties. `None` when no table has any cells.
pub fn largest_table(fragment: &str) -> Option<TableMarkup> {
    let parsed = Html::parse_fragment(fragment);
    let table_selector = Selector::parse("table").unwrap();

    let mut best: Option<((usize, usize), ElementRef)> = None;
    for table in parsed.select(&table_selector) {
        let dims = shape(table);
        if best.as_ref().map_or(true, |(best_dims, _)| dims > *best_dims) {
            best = Some((dims, table));
        }
    }

    best.filter(|((_, columns), _)| *columns > 0)
        .map(|(_, table)| TableMarkup(table.html()))
}
