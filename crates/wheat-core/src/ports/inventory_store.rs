//! InventoryStore port - persistent inventory as seen by the enrichment job.

use crate::domain::{EnrichmentStatus, InventoryRecord, StoreError};

/// The slice of the inventory store the enrichment job depends on.
///
/// # Contract
/// - `select_for_enrichment` returns records in a stable order (row id).
/// - `commit_enrichment` is all-or-nothing: either every record of the batch
///   is written or none is. It writes enrichment fields only; import fields
///   are never modified.
pub trait InventoryStore {
    fn select_for_enrichment(
        &self,
        statuses: &[EnrichmentStatus],
    ) -> Result<Vec<InventoryRecord>, StoreError>;

    fn commit_enrichment(&mut self, records: &[InventoryRecord]) -> Result<(), StoreError>;
}
