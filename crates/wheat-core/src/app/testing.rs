//! Test doubles for the lookup port.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::{DeckSearch, RemoteCard};
use crate::ports::CardLookup;

/// Canned answers keyed by card name / remote id. Every call is logged as
/// `card:<name>` or `decks:<id>`.
#[derive(Default)]
pub(crate) struct FakeLookup {
    cards: HashMap<String, RemoteCard>,
    decks: HashMap<String, u64>,
    calls: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub(crate) fn with_card(mut self, name: &str, card: RemoteCard) -> Self {
        self.cards.insert(name.to_string(), card);
        self
    }

    pub(crate) fn with_decks(mut self, remote_id: &str, total: u64) -> Self {
        self.decks.insert(remote_id.to_string(), total);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CardLookup for FakeLookup {
    async fn resolve_card(&self, name: &str) -> Option<RemoteCard> {
        self.calls.lock().unwrap().push(format!("card:{name}"));
        self.cards.get(name).cloned()
    }

    async fn count_decks(&self, card_id: &str) -> Option<DeckSearch> {
        self.calls.lock().unwrap().push(format!("decks:{card_id}"));
        self.decks.get(card_id).map(|total| DeckSearch {
            total_results: *total,
            raw: json!({ "totalResults": total }),
        })
    }
}

/// A remote service that never answers.
pub(crate) struct HangingLookup;

#[async_trait]
impl CardLookup for HangingLookup {
    async fn resolve_card(&self, _name: &str) -> Option<RemoteCard> {
        std::future::pending().await
    }

    async fn count_decks(&self, _card_id: &str) -> Option<DeckSearch> {
        std::future::pending().await
    }
}
