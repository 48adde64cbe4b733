//! Chaff report - cheap cards that few decks play.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::csv::write_row;
use crate::domain::{Format, InventoryRecord, Price, ReportError};
use crate::impls::SqliteStore;

pub const DEFAULT_MAX_PRICE: Price = Price::from_cents(50);
pub const DEFAULT_MAX_DECKS: u64 = 50;

pub const REPORT_COLUMNS: [&str; 9] = [
    "name",
    "color_identity",
    "type_line",
    "set_code",
    "quantity",
    "price",
    "moxfield_deck_count",
    "edhrec_rank",
    "moxfield_decks_url",
];

/// Both bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChaffFilter {
    pub max_price: Price,
    pub max_decks: u64,
}

impl Default for ChaffFilter {
    fn default() -> Self {
        Self {
            max_price: DEFAULT_MAX_PRICE,
            max_decks: DEFAULT_MAX_DECKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChaffRow {
    pub name: String,
    pub color_identity: Vec<String>,
    pub type_line: String,
    pub set_code: String,
    pub quantity: u32,
    pub price: Price,
    pub moxfield_deck_count: u64,
    pub edhrec_rank: Option<i64>,
    pub moxfield_decks_url: Option<String>,
}

impl ChaffRow {
    pub fn from_record(record: &InventoryRecord, format: Format) -> Self {
        Self {
            name: record.entry.name.clone(),
            color_identity: record.color_identity.clone().unwrap_or_default(),
            type_line: record.type_line.clone().unwrap_or_default(),
            set_code: record.entry.set_code.clone(),
            quantity: record.entry.quantity,
            price: record.price.unwrap_or(Price::ZERO),
            moxfield_deck_count: record.deck_count.unwrap_or(0),
            edhrec_rank: record.edhrec_rank,
            moxfield_decks_url: record.decks_url(format),
        }
    }

    fn csv_fields(&self) -> [String; 9] {
        [
            self.name.clone(),
            self.color_identity.concat(),
            self.type_line.clone(),
            self.set_code.clone(),
            self.quantity.to_string(),
            self.price.to_string(),
            self.moxfield_deck_count.to_string(),
            self.edhrec_rank.map(|r| r.to_string()).unwrap_or_default(),
            self.moxfield_decks_url.clone().unwrap_or_default(),
        ]
    }
}

pub fn find_chaff(
    store: &SqliteStore,
    filter: &ChaffFilter,
    format: Format,
) -> Result<Vec<ChaffRow>, ReportError> {
    let records = store.find_chaff(filter.max_price, filter.max_decks)?;
    tracing::info!(
        max_price = %filter.max_price,
        max_decks = filter.max_decks,
        found = records.len(),
        "Chaff search finished"
    );
    Ok(records
        .iter()
        .map(|record| ChaffRow::from_record(record, format))
        .collect())
}

/// Write `rows` as CSV with a header line, creating parent directories.
pub fn write_report(path: &Path, rows: &[ChaffRow]) -> Result<(), ReportError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(File::create(path)?);
    write_row(&mut out, &REPORT_COLUMNS)?;
    for row in rows {
        write_row(&mut out, &row.csv_fields())?;
    }
    out.flush()?;

    tracing::info!(file = %path.display(), rows = rows.len(), "Chaff report written");
    Ok(())
}
