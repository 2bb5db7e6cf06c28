use std::collections::HashMap;
use tracing::{debug, warn};

use crate::types::{Cell, Table};

/// A logical key column and the header names it is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyField {
    pub canonical: &'static str,
    pub synonyms: &'static [&'static str],
}

impl KeyField {
    /// Index of the first header matching one of the synonyms.
    pub fn resolve(&self, table: &Table) -> Option<usize> {
        self.synonyms
            .iter()
            .find_map(|synonym| table.column_index(synonym))
    }
}

pub const PLAYER_KEY: KeyField = KeyField {
    canonical: "Player",
    synonyms: &["Player"],
};

pub const SQUAD_KEY: KeyField = KeyField {
    canonical: "Squad",
    synonyms: &["Squad", "Team", "Club", "Equipe"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Per-player tables, joined on the player column.
    Entity,
    /// Per-team tables, whose key header varies by template.
    Group,
}

impl MergeMode {
    pub fn key(self) -> KeyField {
        match self {
            MergeMode::Entity => PLAYER_KEY,
            MergeMode::Group => SQUAD_KEY,
        }
    }
}

fn rename_key(mut table: Table, index: usize, canonical: &str) -> Table {
    if table.headers[index] != canonical {
        debug!("Renaming key column '{}' to '{}'", table.headers[index], canonical);
        table.headers[index] = canonical.to_string();
    }
    table
}

/// Left-joins `addition` onto `base`.
///
/// An absent side yields the other one. Columns of `addition` already present
/// in `base` are dropped so `base` wins. Every `base` row is kept exactly
/// once; when `addition` repeats a key its first row is used.
pub fn merge(base: Option<Table>, addition: Option<Table>, mode: MergeMode) -> Option<Table> {
    let (base, addition) = match (base, addition) {
        (None, other) => return other,
        (base, None) => return base,
        (Some(base), Some(addition)) => (base, addition),
    };

    let key = mode.key();
    let (base_idx, add_idx) = match (key.resolve(&base), key.resolve(&addition)) {
        (Some(b), Some(a)) => (b, a),
        _ => {
            warn!(
                "No '{}' key column on both sides, keeping the base table unmerged",
                key.canonical
            );
            return Some(base);
        }
    };

    let base = rename_key(base, base_idx, key.canonical);
    let addition = rename_key(addition, add_idx, key.canonical);

    let kept: Vec<usize> = (0..addition.width())
        .filter(|&i| i != add_idx && !base.headers.contains(&addition.headers[i]))
        .collect();

    let mut lookup: HashMap<String, usize> = HashMap::new();
    for (row_idx, row) in addition.rows.iter().enumerate() {
        if !row[add_idx].is_null() {
            lookup.entry(row[add_idx].render()).or_insert(row_idx);
        }
    }

    let mut headers = base.headers;
    headers.extend(kept.iter().map(|&i| addition.headers[i].clone()));

    let rows = base
        .rows
        .into_iter()
        .map(|mut row| {
            let matched = match &row[base_idx] {
                Cell::Null => None,
                cell => lookup.get(&cell.render()).map(|&i| &addition.rows[i]),
            };
            row.extend(kept.iter().map(|&i| matched.map_or(Cell::Null, |r| r[i].clone())));
            row
        })
        .collect();

    Some(Table::new(headers, rows))
}

/// Folds tables left to right with [`merge`].
pub fn merge_all<I>(tables: I, mode: MergeMode) -> Option<Table>
where
    I: IntoIterator<Item = Option<Table>>,
{
    tables
        .into_iter()
        .fold(None, |acc, next| merge(acc, next, mode))
}
