use scraper::{ElementRef, Selector};

use crate::types::Source;

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an element with whitespace collapsed.
pub fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Rows belonging to `table` itself, skipping rows of nested tables.
pub fn owned_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let row_selector = Selector::parse("tr").unwrap();
    table
        .select(&row_selector)
        .filter(|row| {
            row.ancestors()
                .find(|node| node.value().as_element().map_or(false, |el| el.name() == "table"))
                .map(|node| node.id())
                == Some(table.id())
        })
        .collect()
}

/// Direct `th`/`td` children of a row.
pub fn row_cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "th" | "td"))
        .collect()
}

/// Largest span browsers honour for each attribute.
const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

fn span(cell: &ElementRef, attr: &str, max: usize) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|span| *span > 0)
        .map_or(1, |span| span.min(max))
}

pub fn colspan(cell: &ElementRef) -> usize {
    span(cell, "colspan", MAX_COLSPAN)
}

/// Rows a cell covers, its own included. `rowspan="0"` counts as one.
pub fn rowspan(cell: &ElementRef) -> usize {
    span(cell, "rowspan", MAX_ROWSPAN)
}

/// True when the row sits directly under a `thead`.
pub fn in_thead(row: &ElementRef) -> bool {
    row.parent()
        .and_then(|p| p.value().as_element().map(|el| el.name() == "thead"))
        .unwrap_or(false)
}

/// File name stem for an entity name, keeping letters, digits, spaces, `-` and `_`.
pub fn file_stem_for(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_') { c } else { '_' })
        .collect();
    let stem = stem.trim().to_string();
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}

/// Absolute URL for a link found on `base`. Relative links on local files cannot be resolved.
pub fn resolve_link(base: &Source, href: &str) -> Option<String> {
    if let Ok(url) = reqwest::Url::parse(href) {
        return Some(url.to_string());
    }
    match base {
        Source::Remote(base_url) => reqwest::Url::parse(base_url)
            .and_then(|b| b.join(href))
            .ok()
            .map(|u| u.to_string()),
        Source::LocalFile(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_owned_rows_skip_nested_tables() {
        let html = Html::parse_fragment(
            "<table id='outer'><tr><td>a</td></tr>\
             <tr><td><table><tr><td>inner</td></tr></table></td></tr></table>",
        );
        let selector = Selector::parse("table#outer").unwrap();
        let outer = html.select(&selector).next().unwrap();
        assert_eq!(owned_rows(outer).len(), 2);
    }

    #[test]
    fn test_colspan_defaults_to_one() {
        let html = Html::parse_fragment(
            "<table><tr><th colspan='3'>A</th><th>B</th><th colspan='x'>C</th></tr></table>",
        );
        let selector = Selector::parse("tr").unwrap();
        let row = html.select(&selector).next().unwrap();
        let spans: Vec<usize> = row_cells(&row).iter().map(colspan).collect();
        assert_eq!(spans, vec![3, 1, 1]);
    }

    #[test]
    fn test_spans_are_clamped() {
        let html = Html::parse_fragment(
            "<table><tr><td colspan='100000000' rowspan='99999999'>x</td>\
             <td rowspan='0'>y</td></tr></table>",
        );
        let selector = Selector::parse("td").unwrap();
        let cells: Vec<_> = html.select(&selector).collect();
        assert_eq!(colspan(&cells[0]), 1000);
        assert_eq!(rowspan(&cells[0]), 65534);
        assert_eq!(rowspan(&cells[1]), 1);
    }

    #[test]
    fn test_file_stem_for() {
        assert_eq!(file_stem_for("Bruno Henrique"), "Bruno Henrique");
        assert_eq!(file_stem_for("Gonzalo Plata/Jr."), "Gonzalo Plata_Jr_");
        assert_eq!(file_stem_for("  "), "unnamed");
    }

    #[test]
    fn test_resolve_link() {
        let base = Source::parse("https://fbref.com/en/squads/639950ae/Flamengo-Stats");
        assert_eq!(
            resolve_link(&base, "/en/players/11111111/matchlogs/2025/summary/Pedro-Match-Logs"),
            Some("https://fbref.com/en/players/11111111/matchlogs/2025/summary/Pedro-Match-Logs".to_string())
        );
        assert_eq!(resolve_link(&Source::parse("file://page.html"), "/en/players/1"), None);
        assert_eq!(
            resolve_link(&Source::parse("file://page.html"), "https://fbref.com/en/players/1"),
            Some("https://fbref.com/en/players/1".to_string())
        );
    }
}
