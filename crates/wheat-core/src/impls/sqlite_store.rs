//! SqliteStore - the inventory on disk.
//!
//! One `cards` table holds import fields and enrichment fields side by side.
//! JSON-valued fields (`color_identity`, `prices`) are stored as JSON text,
//! prices as integer cents.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params, params_from_iter};
use serde::de::DeserializeOwned;

use crate::domain::{
    CollectionEntry, EnrichmentStatus, InventoryRecord, Price, RecordId, StoreError,
};
use crate::ports::InventoryStore;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS cards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    set_code TEXT NOT NULL,
    set_name TEXT NOT NULL,
    collector_number TEXT NOT NULL,
    foil INTEGER NOT NULL,
    rarity TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    moxfield_id TEXT,
    color_identity TEXT,
    type_line TEXT,
    prices TEXT,
    price_cents INTEGER,
    moxfield_deck_count INTEGER,
    edhrec_rank INTEGER,
    enriched_at TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_cards_identity
    ON cards(name, set_code, collector_number, foil);
CREATE INDEX IF NOT EXISTS idx_cards_status ON cards(status);
CREATE INDEX IF NOT EXISTS idx_cards_price ON cards(price_cents);
CREATE INDEX IF NOT EXISTS idx_cards_deck_count ON cards(moxfield_deck_count);
";

const SELECT_COLUMNS: &str = "id, name, set_code, set_name, collector_number, foil, rarity, quantity,
    status, moxfield_id, color_identity, type_line, prices, price_cents,
    moxfield_deck_count, edhrec_rank, enriched_at";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the database file with its schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Self::with_connection(conn)
    }

    /// Throwaway database, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Import collection entries in one transaction.
    ///
    /// With `overwrite` the table is emptied first; otherwise entries that
    /// collide with an already-imported card are ignored. Returns the number
    /// of rows inserted.
    pub fn insert_collection(
        &mut self,
        entries: &[CollectionEntry],
        overwrite: bool,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        if overwrite {
            tx.execute("DELETE FROM cards", [])?;
        }
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO cards
                    (name, set_code, set_name, collector_number, foil, rarity, quantity, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for entry in entries {
                inserted += stmt.execute(params![
                    entry.name,
                    entry.set_code,
                    entry.set_name,
                    entry.collector_number,
                    entry.foil,
                    entry.rarity,
                    entry.quantity,
                    EnrichmentStatus::Pending.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn record(&self, id: RecordId) -> Result<Option<InventoryRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SELECT_COLUMNS} FROM cards WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id.0], row_to_record)?;
        Ok(rows.next().transpose()?)
    }

    /// Enriched cards that are cheap and rarely played.
    ///
    /// Unpriced (zero) cards and non-card types (stickers, planes,
    /// phenomena) never count as chaff. Ordered by deck count, least played
    /// first.
    pub fn find_chaff(
        &self,
        below_price: Price,
        below_decks: u64,
    ) -> Result<Vec<InventoryRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM cards
             WHERE price_cents != 0
               AND price_cents < ?1
               AND moxfield_deck_count < ?2
               AND type_line NOT IN ('Stickers', 'Phenomenon')
               AND type_line NOT LIKE 'Plane%'
             ORDER BY moxfield_deck_count, id"
        ))?;
        let below_decks = i64::try_from(below_decks).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![below_price.cents(), below_decks], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

impl InventoryStore for SqliteStore {
    fn select_for_enrichment(
        &self,
        statuses: &[EnrichmentStatus],
    ) -> Result<Vec<InventoryRecord>, StoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM cards WHERE status IN ({placeholders}) ORDER BY id"
        ))?;
        let records = stmt
            .query_map(params_from_iter(statuses.iter().map(|s| s.as_str())), row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn commit_enrichment(&mut self, records: &[InventoryRecord]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE cards SET
                    status = ?1,
                    moxfield_id = ?2,
                    color_identity = ?3,
                    type_line = ?4,
                    prices = ?5,
                    price_cents = ?6,
                    moxfield_deck_count = ?7,
                    edhrec_rank = ?8,
                    enriched_at = ?9
                 WHERE id = ?10",
            )?;
            for record in records {
                let color_identity = record
                    .color_identity
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                let prices = record
                    .prices
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                stmt.execute(params![
                    record.status.as_str(),
                    record.remote_id,
                    color_identity,
                    record.type_line,
                    prices,
                    record.price.map(|p| p.cents()),
                    record.deck_count.map(|n| i64::try_from(n).unwrap_or(i64::MAX)),
                    record.edhrec_rank,
                    record.enriched_at.map(|at| at.to_rfc3339()),
                    record.id.0,
                ])?;
            }
        }
        // Dropping an uncommitted transaction rolls it back, so an error above
        // leaves the whole batch unwritten.
        tx.commit()?;
        Ok(())
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<InventoryRecord> {
    let entry = CollectionEntry {
        name: row.get(1)?,
        set_code: row.get(2)?,
        set_name: row.get(3)?,
        collector_number: row.get(4)?,
        foil: row.get(5)?,
        rarity: row.get(6)?,
        quantity: row.get(7)?,
    };
    let status: String = row.get(8)?;
    let enriched_at: Option<String> = row.get(16)?;
    let enriched_at = enriched_at
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(16, Type::Text, Box::new(e)))
        })
        .transpose()?;

    Ok(InventoryRecord {
        id: RecordId(row.get(0)?),
        entry,
        status: EnrichmentStatus::from_db_str(&status),
        remote_id: row.get(9)?,
        color_identity: json_column(row, 10)?,
        type_line: row.get(11)?,
        prices: json_column(row, 12)?,
        price: row.get::<_, Option<i64>>(13)?.map(Price::from_cents),
        deck_count: row.get::<_, Option<i64>>(14)?.map(|n| n.max(0) as u64),
        edhrec_rank: row.get(15)?,
        enriched_at,
    })
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
