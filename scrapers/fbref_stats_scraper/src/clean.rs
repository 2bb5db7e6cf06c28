use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::types::{Cell, Table};

/// Markers of repeated header rows and footer aggregates in the key column.
pub const STRUCTURAL_TOKENS: [&str; 3] = ["Player", "Total", "Date"];
pub const TOTAL_SENTINEL: &str = "Total";

fn placeholder_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Unnamed:?\s*[0-9]+_level_[0-9]+").unwrap())
}

/// How the key column is tested for repeated headers and totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructuralRowRule {
    /// Drop when the key contains any token anywhere. Entity names such as
    /// "Totaltek" are dropped too.
    #[default]
    Substring,
    /// Drop only when a whitespace-separated word of the key equals a token.
    WholeWord,
}

impl StructuralRowRule {
    fn is_structural(self, key: &str) -> bool {
        match self {
            StructuralRowRule::Substring => STRUCTURAL_TOKENS.iter().any(|t| key.contains(t)),
            StructuralRowRule::WholeWord => key
                .split_whitespace()
                .any(|word| STRUCTURAL_TOKENS.contains(&word)),
        }
    }
}

pub fn strip_placeholder_prefix(name: &str) -> String {
    placeholder_prefix().replace(name, "").trim().to_string()
}

pub fn clean(table: Table) -> Table {
    clean_with(table, StructuralRowRule::default())
}

/// Removes repeated headers, blank keys and totals, treating column 0 as the key.
pub fn clean_with(table: Table, rule: StructuralRowRule) -> Table {
    let headers: Vec<String> = table.headers.iter().map(|h| strip_placeholder_prefix(h)).collect();
    if headers.is_empty() {
        return Table::new(headers, Vec::new());
    }

    let before = table.height();
    let rows: Vec<Vec<Cell>> = table
        .rows
        .into_iter()
        .filter(|row| {
            let key = match &row[0] {
                Cell::Null => return false,
                cell => cell.render(),
            };
            let trimmed = key.trim();
            !rule.is_structural(&key) && !trimmed.is_empty() && trimmed != TOTAL_SENTINEL
        })
        .collect();

    debug!("Row cleaner kept {} of {} rows", rows.len(), before);
    Table::new(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(keys: &[&str]) -> Table {
        Table::new(
            vec!["Unnamed: 0_level_0 Player".to_string(), "Gls".to_string()],
            keys.iter().map(|k| vec![Cell::text(*k), Cell::text("1")]).collect(),
        )
    }

    #[test]
    fn test_structural_rows_are_dropped() {
        let cleaned = clean(table(&[
            "Pedro",
            "Player",
            "Gerson",
            "",
            "Squad Total",
            "Opponent Total",
            "Total",
        ]));
        let keys: Vec<String> = cleaned.column(0).map(Cell::render).collect();
        assert_eq!(keys, vec!["Pedro", "Gerson"]);
    }

    #[test]
    fn test_placeholder_prefix_is_stripped() {
        let cleaned = clean(table(&["Pedro"]));
        assert_eq!(cleaned.headers, vec!["Player", "Gls"]);
        assert_eq!(strip_placeholder_prefix("Unnamed 3_level_0 Matches"), "Matches");
    }

    #[test]
    fn test_row_count_never_grows() {
        let raw = table(&["Pedro", "Arrascaeta", "Gerson"]);
        let cleaned = clean(raw.clone());
        assert_eq!(cleaned.height(), raw.height());
    }

    #[test]
    fn test_substring_rule_drops_names_containing_tokens() {
        // Known limitation of the default rule.
        let cleaned = clean(table(&["Datello", "Pedro"]));
        assert_eq!(cleaned.height(), 1);

        let cleaned = clean_with(table(&["Datello", "Pedro", "Squad Total"]), StructuralRowRule::WholeWord);
        let keys: Vec<String> = cleaned.column(0).map(Cell::render).collect();
        assert_eq!(keys, vec!["Datello", "Pedro"]);
    }

    #[test]
    fn test_null_key_rows_are_dropped() {
        let raw = Table::new(
            vec!["Player".to_string()],
            vec![vec![Cell::Null], vec![Cell::text("Pedro")]],
        );
        assert_eq!(clean(raw).height(), 1);
    }
}
