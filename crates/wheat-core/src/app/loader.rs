//! Collection loader - import a Moxfield collection export into the store.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use crate::csv::parse_rows;
use crate::domain::{CollectionEntry, LoadError};
use crate::impls::SqliteStore;

const NAME: &str = "Name";
const SET_CODE: &str = "Set code";
const SET_NAME: &str = "Set name";
const COLLECTOR_NUMBER: &str = "Collector number";
const FOIL: &str = "Foil";
const RARITY: &str = "Rarity";
const QUANTITY: &str = "Quantity";

pub const REQUIRED_COLUMNS: [&str; 7] =
    [NAME, SET_CODE, SET_NAME, COLLECTOR_NUMBER, FOIL, RARITY, QUANTITY];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Data rows in the file.
    pub rows: usize,
    /// Rows dropped for an unreadable quantity.
    pub skipped: usize,
    /// Rows written to the store.
    pub inserted: usize,
}

/// Read `path` and import it. With `overwrite` the inventory is replaced,
/// otherwise new cards are added next to the existing ones.
pub fn load_collection(
    store: &mut SqliteStore,
    path: &Path,
    overwrite: bool,
) -> Result<LoadSummary, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io(e),
    })?;

    let (entries, skipped) = parse_collection(&text)?;
    let inserted = store.insert_collection(&entries, overwrite)?;

    let summary = LoadSummary {
        rows: entries.len() + skipped,
        skipped,
        inserted,
    };
    tracing::info!(
        file = %path.display(),
        rows = summary.rows,
        inserted,
        skipped,
        overwrite,
        "Collection loaded"
    );
    Ok(summary)
}

/// Parse export text into entries. Returns the entries and the number of
/// rows skipped.
pub fn parse_collection(text: &str) -> Result<(Vec<CollectionEntry>, usize), LoadError> {
    let mut rows = parse_rows(text).into_iter();
    let header = rows.next().ok_or(LoadError::MissingColumn(NAME))?;
    let columns = Columns::from_header(&header)?;

    let mut entries = Vec::new();
    let mut skipped = 0;
    for (index, row) in rows.enumerate() {
        // header is line 1
        let line = index + 2;
        match columns.entry(&row) {
            Some(entry) => entries.push(entry),
            None => {
                tracing::warn!(line, row = ?row, "Skipping row with invalid quantity");
                skipped += 1;
            }
        }
    }
    Ok((entries, skipped))
}

struct Columns(HashMap<&'static str, usize>);

impl Columns {
    fn from_header(header: &[String]) -> Result<Self, LoadError> {
        let mut positions = HashMap::new();
        for column in REQUIRED_COLUMNS {
            let index = header
                .iter()
                .position(|h| h.trim() == column)
                .ok_or(LoadError::MissingColumn(column))?;
            positions.insert(column, index);
        }
        Ok(Self(positions))
    }

    fn get<'a>(&self, row: &'a [String], column: &'static str) -> &'a str {
        self.0
            .get(column)
            .and_then(|&index| row.get(index))
            .map_or("", |value| value.trim())
    }

    /// `None` when the quantity is not an unsigned integer.
    fn entry(&self, row: &[String]) -> Option<CollectionEntry> {
        let quantity = self.get(row, QUANTITY).parse().ok()?;
        Some(CollectionEntry {
            name: self.get(row, NAME).to_string(),
            set_code: self.get(row, SET_CODE).to_string(),
            set_name: self.get(row, SET_NAME).to_string(),
            collector_number: self.get(row, COLLECTOR_NUMBER).to_string(),
            foil: parse_foil(self.get(row, FOIL)),
            rarity: self.get(row, RARITY).to_string(),
            quantity,
        })
    }
}

fn parse_foil(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "" | "false" | "0" | "no" | "normal"
    )
}
