//! Inventory records: owned cards plus the data fetched for them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use url::Url;

use super::format::Format;
use super::price::{Price, select_price};
use super::remote::{DeckSearch, RemoteCard};
use super::status::EnrichmentStatus;

const DECKS_PAGE_URL: &str = "https://www.moxfield.com/decks/public/advanced";

/// Row id of an inventory record in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card-{}", self.0)
    }
}

/// Import fields of one collection line, as read from the collection export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    pub name: String,
    pub set_code: String,
    pub set_name: String,
    pub collector_number: String,
    pub foil: bool,
    pub rarity: String,
    pub quantity: u32,
}

/// One owned card with its enrichment state.
///
/// Design:
/// - Import fields are written once by the loader and never touched again.
/// - Enrichment fields stay `None` until the matching lookup succeeds.
/// - State transitions go through methods (`apply_card`, `apply_decks`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRecord {
    pub id: RecordId,
    pub entry: CollectionEntry,

    pub status: EnrichmentStatus,
    pub remote_id: Option<String>,
    pub color_identity: Option<Vec<String>>,
    pub type_line: Option<String>,
    /// Raw price map of the resolved card.
    pub prices: Option<BTreeMap<String, Value>>,
    pub price: Option<Price>,
    pub deck_count: Option<u64>,
    pub edhrec_rank: Option<i64>,
    pub enriched_at: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    /// A freshly imported record with nothing enriched yet.
    pub fn new(id: RecordId, entry: CollectionEntry) -> Self {
        Self {
            id,
            entry,
            status: EnrichmentStatus::Pending,
            remote_id: None,
            color_identity: None,
            type_line: None,
            prices: None,
            price: None,
            deck_count: None,
            edhrec_rank: None,
            enriched_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Copy the resolved card's data into this record.
    ///
    /// Returns the price source that was used, or `None` when no source had a
    /// usable price (the price is then set to zero).
    pub fn apply_card(&mut self, card: &RemoteCard, at: DateTime<Utc>) -> Option<&'static str> {
        self.color_identity = Some(card.color_identity.clone());
        self.type_line = Some(card.type_line.clone());
        self.remote_id = Some(card.id.clone());
        if card.edhrec_rank.is_some() {
            self.edhrec_rank = card.edhrec_rank;
        }
        self.prices = Some(card.prices.clone());

        let selected = select_price(&card.prices);
        self.price = Some(selected.map_or(Price::ZERO, |(_, price)| price));

        // Resolved but not complete until the deck count arrives.
        self.status = EnrichmentStatus::Failed;
        self.enriched_at = Some(at);
        selected.map(|(source, _)| source)
    }

    /// Record the deck count; the record is now fully enriched.
    pub fn apply_decks(&mut self, decks: &DeckSearch) {
        self.deck_count = Some(decks.total_results);
        self.status = EnrichmentStatus::Enriched;
    }

    /// Public deck search page for this card, if it has been resolved.
    pub fn decks_url(&self, format: Format) -> Option<String> {
        let remote_id = self.remote_id.as_deref()?;
        let url = Url::parse_with_params(
            DECKS_PAGE_URL,
            &[
                ("format", format.as_str()),
                ("sort", "updated"),
                ("cardId", remote_id),
                ("cardName", self.entry.name.as_str()),
                ("board", "mainboard"),
            ],
        )
        .ok()?;
        Some(url.into())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn entry(name: &str) -> CollectionEntry {
        CollectionEntry {
            name: name.to_string(),
            set_code: "neo".to_string(),
            set_name: "Kamigawa: Neon Dynasty".to_string(),
            collector_number: "1".to_string(),
            foil: false,
            rarity: "common".to_string(),
            quantity: 1,
        }
    }

    pub(crate) fn record(id: i64, name: &str) -> InventoryRecord {
        InventoryRecord::new(RecordId(id), entry(name))
    }

    pub(crate) fn remote(id: &str, type_line: &str, prices: Value) -> RemoteCard {
        RemoteCard {
            id: id.to_string(),
            type_line: type_line.to_string(),
            color_identity: vec!["G".to_string()],
            legalities: BTreeMap::new(),
            prices: serde_json::from_value(prices).unwrap(),
            edhrec_rank: None,
        }
    }
}
