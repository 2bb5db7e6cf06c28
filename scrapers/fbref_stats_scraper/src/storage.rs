use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::{
    clean::clean,
    coerce::coerce,
    error::Result,
    merge::PLAYER_KEY,
    types::{Cell, Table, TableSet},
};

pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(Cell::render))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads a persisted table back as text. Empty fields become nulls.
pub fn read_table(path: &Path) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::text).collect());
    }
    Ok(Table::new(headers, rows))
}

/// Writes one `<id>.csv` per present table and returns the written paths.
pub fn write_table_set(set: &TableSet, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (id, table) in set.present() {
        let path = dir.join(format!("{}.csv", id));
        write_table(table, &path)?;
        info!("Saved table '{}' to {:?}", id, path);
        written.push(path);
    }
    Ok(written)
}

/// `*.csv` files directly inside `dir`, sorted by name.
pub fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "csv"))
        .collect();
    files.sort();
    Ok(files)
}

/// Concatenates per-player tables, prefixing each row with the player taken
/// from the file name. Columns are the union of all files in first-seen order.
pub fn concat_player_tables(dir: &Path) -> Result<Table> {
    let mut headers: Vec<String> = vec![PLAYER_KEY.canonical.to_string()];
    let mut parts: Vec<(String, Table)> = Vec::new();

    for path in csv_files(dir)? {
        let player = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let table = read_table(&path)?;
        for header in &table.headers {
            if !headers.contains(header) {
                headers.push(header.clone());
            }
        }
        info!("Read {} rows for '{}'", table.height(), player);
        parts.push((player, table));
    }

    let mut rows = Vec::new();
    for (player, table) in parts {
        let positions: Vec<Option<usize>> = headers.iter().map(|h| table.column_index(h)).collect();
        for row in table.rows {
            let mut out = Vec::with_capacity(headers.len());
            out.push(Cell::text(player.as_str()));
            for position in &positions[1..] {
                out.push(position.map_or(Cell::Null, |i| row[i].clone()));
            }
            rows.push(out);
        }
    }

    Ok(Table::new(headers, rows))
}

pub fn join_player_tables(dir: &Path, output: &Path) -> Result<Table> {
    if output.parent() == Some(dir) {
        warn!("Output {:?} is inside {:?} and will be read on the next run", output, dir);
    }
    let joined = concat_player_tables(dir)?;
    write_table(&joined, output)?;
    info!("Joined {} rows into {:?}", joined.height(), output);
    Ok(joined)
}

/// Runs the row cleaner and type coercer over every `*.csv` in `dir`, in place.
pub fn reclean_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let files = csv_files(dir)?;
    for path in &files {
        let table = read_table(path)?;
        let before = table.height();
        let cleaned = coerce(clean(table));
        write_table(&cleaned, path)?;
        info!("Re-cleaned {:?}: {} -> {} rows", path, before, cleaned.height());
    }
    Ok(files)
}
