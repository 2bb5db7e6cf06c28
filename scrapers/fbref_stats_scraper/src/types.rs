use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

const FILE_SCHEME: &str = "file://";

/// Where a page comes from. The `file://` prefix selects a local read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote(String),
    LocalFile(PathBuf),
}

impl Source {
    pub fn parse(reference: &str) -> Self {
        match reference.strip_prefix(FILE_SCHEME) {
            Some(path) => Source::LocalFile(PathBuf::from(path)),
            None => Source::Remote(reference.to_string()),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Remote(url) => write!(f, "{}", url),
            Source::LocalFile(path) => write!(f, "{}{}", FILE_SCHEME, path.display()),
        }
    }
}

/// The unparsed HTML of one fetched page.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source: Source,
    pub html: String,
}

/// Markup of a single `<table>` element, as returned by the locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMarkup(pub String);

impl TableMarkup {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
}

impl Cell {
    /// Text cell, or `Null` when the value is blank.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Cell::Null
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Rendering used for CSV output and key comparison. Nulls render empty.
    pub fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(v) => v.to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// A rectangular table with one flat header row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Builds a table, padding or truncating every row to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Null);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |row| &row[index])
    }

    /// True when the column holds at least one value and every value is numeric or null.
    pub fn is_numeric_column(&self, index: usize) -> bool {
        let mut seen = false;
        for cell in self.column(index) {
            match cell {
                Cell::Null => {}
                Cell::Int(_) | Cell::Float(_) => seen = true,
                Cell::Text(_) => return false,
            }
        }
        seen
    }

    /// Appends a column holding the same value in every row.
    pub fn with_constant_column(mut self, name: &str, value: &str) -> Self {
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(Cell::text(value));
        }
        self
    }
}

/// Outcome of one table identifier within a page.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSlot {
    Present(Table),
    Absent { reason: String },
}

/// Tables of one page keyed by identifier, in the order they were requested.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    entries: Vec<(String, TableSlot)>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, slot: TableSlot) {
        let id = id.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = slot,
            None => self.entries.push((id, slot)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Table> {
        self.entries.iter().find(|(existing, _)| existing == id).and_then(|(_, slot)| match slot {
            TableSlot::Present(table) => Some(table),
            TableSlot::Absent { .. } => None,
        })
    }

    pub fn slot(&self, id: &str) -> Option<&TableSlot> {
        self.entries.iter().find(|(existing, _)| existing == id).map(|(_, slot)| slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableSlot)> {
        self.entries.iter().map(|(id, slot)| (id.as_str(), slot))
    }

    pub fn present(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.iter().filter_map(|(id, slot)| match slot {
            TableSlot::Present(table) => Some((id, table)),
            TableSlot::Absent { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies `f` to every present table, leaving absent entries untouched.
    pub fn map_tables<F>(self, mut f: F) -> Self
    where
        F: FnMut(&str, Table) -> Table,
    {
        let entries = self
            .entries
            .into_iter()
            .map(|(id, slot)| {
                let slot = match slot {
                    TableSlot::Present(table) => TableSlot::Present(f(&id, table)),
                    absent => absent,
                };
                (id, slot)
            })
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert_eq!(
            Source::parse("file://data/page.html"),
            Source::LocalFile(PathBuf::from("data/page.html"))
        );
        assert_eq!(
            Source::parse("https://fbref.com/en/squads/639950ae/Flamengo-Stats"),
            Source::Remote("https://fbref.com/en/squads/639950ae/Flamengo-Stats".to_string())
        );
        assert_eq!(Source::parse("file://data/page.html").to_string(), "file://data/page.html");
    }

    #[test]
    fn test_cell_text_blank_is_null() {
        assert_eq!(Cell::text("  "), Cell::Null);
        assert_eq!(Cell::text("Pedro"), Cell::Text("Pedro".to_string()));
        assert_eq!(Cell::Float(1.5).render(), "1.5");
        assert_eq!(Cell::Null.render(), "");
    }

    #[test]
    fn test_table_new_pads_short_rows() {
        let table = Table::new(
            vec!["Player".to_string(), "Gls".to_string()],
            vec![vec![Cell::text("Pedro")]],
        );
        assert_eq!(table.rows[0], vec![Cell::text("Pedro"), Cell::Null]);
    }

    #[test]
    fn test_table_set_keeps_order_and_absent_entries() {
        let mut set = TableSet::new();
        set.insert("stats_standard_combined", TableSlot::Present(Table::default()));
        set.insert(
            "stats_keeper_combined",
            TableSlot::Absent { reason: "missing".to_string() },
        );
        let ids: Vec<_> = set.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["stats_standard_combined", "stats_keeper_combined"]);
        assert!(set.get("stats_keeper_combined").is_none());
        assert_eq!(set.present().count(), 1);
    }
}
