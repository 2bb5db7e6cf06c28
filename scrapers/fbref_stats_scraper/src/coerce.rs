use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::types::{Cell, Table};

/// Null rendering that may survive a round trip through text.
const NULL_TOKEN: &str = "nan";
/// Unused-substitute note after the comma has been turned into a dot.
const DID_NOT_PLAY: &str = "On matchday squad. but did not play";

fn decimal_numeral() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$").unwrap())
}

/// Text normalisation applied to every value of a non-empty column.
pub fn normalize_text(value: &str) -> String {
    let value = value.replace(',', ".").replace('%', "");
    let value = if value.trim() == NULL_TOKEN { String::new() } else { value };
    value.replace(DID_NOT_PLAY, "").trim().to_string()
}

/// Parses a plain decimal numeral, as an integer when it has no fraction or exponent.
pub fn parse_number(text: &str) -> Option<Cell> {
    if !decimal_numeral().is_match(text) {
        return None;
    }
    if !text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Cell::Int(i));
        }
    }
    text.parse::<f64>().ok().map(Cell::Float)
}

fn coerce_column(values: Vec<Cell>) -> (Vec<Cell>, bool) {
    let normalized: Vec<Cell> = values
        .into_iter()
        .map(|cell| match cell {
            Cell::Text(text) => Cell::text(normalize_text(&text)),
            other => other,
        })
        .collect();

    let parsed: Option<Vec<Cell>> = normalized
        .iter()
        .map(|cell| match cell {
            Cell::Text(text) => parse_number(text),
            other => Some(other.clone()),
        })
        .collect();

    match parsed {
        Some(mut numbers) => {
            if numbers.iter().any(|c| matches!(c, Cell::Float(_))) {
                for cell in &mut numbers {
                    if let Cell::Int(i) = cell {
                        *cell = Cell::Float(*i as f64);
                    }
                }
            }
            (numbers, true)
        }
        None => (normalized, false),
    }
}

/// Turns every column whose values are all numerals into a numeric column.
///
/// Columns that are entirely null are left alone. Textual columns keep the
/// normalised text.
pub fn coerce(table: Table) -> Table {
    let Table { headers, rows } = table;
    let mut columns: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); headers.len()];
    for row in rows {
        for (column, cell) in columns.iter_mut().zip(row) {
            column.push(cell);
        }
    }

    let columns: Vec<Vec<Cell>> = columns
        .into_iter()
        .zip(&headers)
        .map(|(values, name)| {
            if values.iter().all(Cell::is_null) {
                return values;
            }
            let (values, numeric) = coerce_column(values);
            if !numeric {
                debug!("Column '{}' is not numeric, keeping it as text", name);
            }
            values
        })
        .collect();

    let height = columns.first().map_or(0, Vec::len);
    let mut rows: Vec<Vec<Cell>> = (0..height).map(|_| Vec::with_capacity(headers.len())).collect();
    for column in columns {
        for (row, cell) in rows.iter_mut().zip(column) {
            row.push(cell);
        }
    }

    Table::new(headers, rows)
}
