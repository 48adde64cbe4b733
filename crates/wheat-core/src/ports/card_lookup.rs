//! CardLookup port - the remote card database.

use async_trait::async_trait;

use crate::domain::{DeckSearch, RemoteCard};

/// Read-only lookups against the remote card database.
///
/// # Contract
/// - Both operations are idempotent.
/// - Every failure (no match, bad status, transport error, unexpected body)
///   is logged by the implementation and reported as `None`; callers only
///   ever check for absence.
#[async_trait]
pub trait CardLookup: Send + Sync {
    /// Resolve a card name to its canonical remote record.
    async fn resolve_card(&self, name: &str) -> Option<RemoteCard>;

    /// Count public decks of the target format running `card_id` in the
    /// mainboard.
    async fn count_decks(&self, card_id: &str) -> Option<DeckSearch>;
}
