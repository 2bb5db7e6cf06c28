use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use crate::{
    error::{Result, ScrapeError},
    types::{Cell, Table, TableMarkup},
    utils::{colspan, element_text, in_thead, owned_rows, row_cells, rowspan},
};

const LEVEL_SEPARATOR: &str = " ";

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s/%\-\.]").unwrap())
}

/// Collapses whitespace, strips characters outside `[\w\s/%-.]` and trims.
pub fn sanitize_column_name(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    disallowed_chars().replace_all(&collapsed, "").trim().to_string()
}

/// A cell carried down into the rows below it by `rowspan`.
#[derive(Clone)]
struct PendingSpan {
    text: String,
    rows_left: usize,
}

/// Fills `out` from spans carried down into its next free slots.
fn take_pending(out: &mut Vec<String>, pending: &mut [Option<PendingSpan>]) {
    while let Some(slot) = pending.get_mut(out.len()) {
        let Some(span) = slot else { break };
        out.push(span.text.clone());
        span.rows_left -= 1;
        if span.rows_left == 0 {
            *slot = None;
        }
    }
}

/// Lays a run of rows out on a grid, repeating each cell across its colspan
/// and carrying it down across its rowspan.
fn expand_rows(rows: &[ElementRef]) -> Vec<Vec<String>> {
    let mut pending: Vec<Option<PendingSpan>> = Vec::new();
    let mut grid = Vec::with_capacity(rows.len());

    for row in rows {
        let mut out: Vec<String> = Vec::new();

        for cell in row_cells(row) {
            take_pending(&mut out, &mut pending);
            let text = element_text(&cell);
            let down = rowspan(&cell) - 1;
            for _ in 0..colspan(&cell) {
                if down > 0 {
                    if pending.len() <= out.len() {
                        pending.resize(out.len() + 1, None);
                    }
                    pending[out.len()] = Some(PendingSpan {
                        text: text.clone(),
                        rows_left: down,
                    });
                }
                out.push(text.clone());
            }
        }

        // Spans continuing past the row's last own cell, across any gaps.
        while out.len() < pending.len() {
            if pending[out.len()].is_some() {
                take_pending(&mut out, &mut pending);
            } else if pending[out.len()..].iter().any(Option::is_some) {
                out.push(String::new());
            } else {
                break;
            }
        }

        grid.push(out);
    }

    grid
}

/// Header rows are the rows under `thead`, or failing that the leading rows
/// made only of `th` cells.
pub(crate) fn split_header_rows(rows: &[ElementRef]) -> usize {
    let thead_rows = rows.iter().take_while(|row| in_thead(row)).count();
    if thead_rows > 0 {
        return thead_rows;
    }
    rows.iter()
        .take_while(|row| {
            let cells = row_cells(row);
            !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th")
        })
        .count()
}

/// Joins the header levels of each column. Empty group labels are dropped
/// rather than replaced by a placeholder.
fn flatten_headers(levels: &[Vec<String>], width: usize) -> Vec<String> {
    (0..width)
        .map(|col| {
            let mut parts: Vec<&str> = levels
                .iter()
                .filter_map(|level| level.get(col))
                .map(|label| label.trim())
                .filter(|label| !label.is_empty())
                .collect();
            // A header spanning both levels appears once.
            parts.dedup();
            let name = sanitize_column_name(&parts.join(LEVEL_SEPARATOR));
            if name.is_empty() {
                col.to_string()
            } else {
                name
            }
        })
        .collect()
}

/// Converts one `<table>` into a [`Table`] with a single flat header row.
///
/// Body rows keep every row the markup contains, including repeated header
/// rows and footer totals; removing those is the row cleaner's job.
pub fn flatten(markup: &TableMarkup) -> Result<Table> {
    let fragment = Html::parse_fragment(markup.as_str());
    let table_selector = Selector::parse("table").unwrap();
    let table = fragment
        .select(&table_selector)
        .next()
        .ok_or_else(|| ScrapeError::Parse("markup contains no <table>".to_string()))?;
    flatten_element(table)
}

/// [`flatten`] for a table element that is already parsed.
pub fn flatten_element(table: ElementRef) -> Result<Table> {
    let rows = owned_rows(table);
    let header_count = split_header_rows(&rows);

    let levels = expand_rows(&rows[..header_count]);
    let body: Vec<Vec<String>> = expand_rows(&rows[header_count..])
        .into_iter()
        .filter(|cells| !cells.is_empty())
        .collect();

    let width = levels
        .iter()
        .chain(body.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    if width == 0 {
        return Err(ScrapeError::Parse("table has no cells".to_string()));
    }

    let headers = flatten_headers(&levels, width);
    let rows = body
        .into_iter()
        .map(|cells| cells.into_iter().map(Cell::text).collect())
        .collect();

    Ok(Table::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn markup(html: &str) -> TableMarkup {
        TableMarkup(html.to_string())
    }

    #[test]
    fn test_two_level_header_is_flattened() {
        let table = flatten(&markup(
            r#"<table id="stats_standard_combined"><thead>
            <tr class="over_header"><th colspan="2"></th><th colspan="2">Playing  Time</th><th>Performance</th></tr>
            <tr><th>Player</th><th>Pos</th><th>MP</th><th>Min</th><th>G+A</th></tr>
            </thead><tbody>
            <tr><th>Pedro</th><td>FW</td><td>30</td><td>2410</td><td>25</td></tr>
            </tbody></table>"#,
        ))
        .unwrap();

        assert_eq!(
            table.headers,
            vec!["Player", "Pos", "Playing Time MP", "Playing Time Min", "Performance GA"]
        );
        assert_eq!(table.width(), 5);
        assert!(table.headers.iter().all(|h| !h.contains("  ")));
        assert_eq!(table.rows[0][0], Cell::text("Pedro"));
    }

    #[test]
    fn test_header_without_thead_uses_leading_th_rows() {
        let table = flatten(&markup(
            "<table><tr><th>Date</th><th>Opponent</th></tr>\
             <tr><td>2025-01-12</td><td>Palmeiras</td></tr></table>",
        ))
        .unwrap();
        assert_eq!(table.headers, vec!["Date", "Opponent"]);
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn test_colspan_value_is_repeated_across_columns() {
        let table = flatten(&markup(
            "<table><thead><tr><th>Date</th><th>Start</th><th>Min</th></tr></thead>\
             <tbody><tr><th>2025-02-02</th><td colspan='2'>On matchday squad, but did not play</td></tr></tbody></table>",
        ))
        .unwrap();
        assert_eq!(table.rows[0][1], table.rows[0][2]);
    }

    #[test]
    fn test_header_rowspan_keeps_leaf_columns_aligned() {
        let table = flatten(&markup(
            r#"<table><thead>
            <tr><th rowspan="2">Player</th><th colspan="2">Standard</th></tr>
            <tr><th>Sh</th><th>SoT</th></tr>
            </thead><tbody>
            <tr><th>Pedro</th><td>80</td><td>35</td></tr>
            </tbody></table>"#,
        ))
        .unwrap();

        assert_eq!(table.headers, vec!["Player", "Standard Sh", "Standard SoT"]);
        assert_eq!(
            table.rows[0],
            vec![Cell::text("Pedro"), Cell::text("80"), Cell::text("35")]
        );
    }

    #[test]
    fn test_body_rowspan_is_carried_into_following_rows() {
        let table = flatten(&markup(
            r#"<table><thead><tr><th>Date</th><th>Comp</th><th>GF</th></tr></thead>
            <tbody>
            <tr><th>2025-01-12</th><td rowspan="2">Serie A</td><td>2</td></tr>
            <tr><th>2025-01-19</th><td>1</td></tr>
            <tr><th>2025-01-26</th><td>Copa do Brasil</td><td>3</td></tr>
            </tbody></table>"#,
        ))
        .unwrap();

        assert_eq!(
            table.rows[1],
            vec![Cell::text("2025-01-19"), Cell::text("Serie A"), Cell::text("1")]
        );
        assert_eq!(
            table.rows[2],
            vec![Cell::text("2025-01-26"), Cell::text("Copa do Brasil"), Cell::text("3")]
        );
    }

    #[test]
    fn test_trailing_rowspan_fills_the_last_column() {
        let table = flatten(&markup(
            r#"<table><thead><tr><th>Date</th><th>GF</th><th>Notes</th></tr></thead>
            <tbody>
            <tr><th>2025-01-12</th><td>2</td><td rowspan="2">Neutral venue</td></tr>
            <tr><th>2025-01-19</th><td>1</td></tr>
            </tbody></table>"#,
        ))
        .unwrap();

        assert_eq!(table.rows[1][2], Cell::text("Neutral venue"));
    }

    #[test]
    fn test_empty_cells_become_null() {
        let table = flatten(&markup(
            "<table><thead><tr><th>Player</th><th>Gls</th></tr></thead>\
             <tbody><tr><th>Rossi</th><td> </td></tr></tbody></table>",
        ))
        .unwrap();
        assert_eq!(table.rows[0][1], Cell::Null);
    }

    #[test]
    fn test_sanitize_column_name() {
        assert_eq!(sanitize_column_name("  Expected\n  npxG+xAG "), "Expected npxGxAG");
        assert_eq!(sanitize_column_name("SoT%"), "SoT%");
        assert_eq!(sanitize_column_name("Cmp/90 (Long)"), "Cmp/90 Long");
    }

    #[test]
    fn test_no_table_is_parse_error() {
        assert!(matches!(flatten(&markup("<div></div>")), Err(ScrapeError::Parse(_))));
    }
}
