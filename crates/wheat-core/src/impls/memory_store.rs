//! InMemoryStore - development store that remembers every commit.

use crate::domain::{CollectionEntry, EnrichmentStatus, InventoryRecord, RecordId, StoreError};
use crate::ports::InventoryStore;

/// In-memory inventory.
///
/// Records are kept in insertion order. Each successful commit is logged as
/// the list of record ids it wrote, so tests can check batch boundaries.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Vec<InventoryRecord>,
    commits: Vec<Vec<RecordId>>,
    next_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: CollectionEntry) -> RecordId {
        self.next_id += 1;
        let id = RecordId(self.next_id);
        self.records.push(InventoryRecord::new(id, entry));
        id
    }

    pub fn get(&self, id: RecordId) -> Option<&InventoryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> &[InventoryRecord] {
        &self.records
    }

    /// Record ids written by each commit, oldest first.
    pub fn commits(&self) -> &[Vec<RecordId>] {
        &self.commits
    }
}

impl InventoryStore for InMemoryStore {
    fn select_for_enrichment(
        &self,
        statuses: &[EnrichmentStatus],
    ) -> Result<Vec<InventoryRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|r| statuses.contains(&r.status))
            .cloned()
            .collect())
    }

    fn commit_enrichment(&mut self, records: &[InventoryRecord]) -> Result<(), StoreError> {
        // Build the new state first so the commit is all-or-nothing.
        let mut staged = self.records.clone();
        for update in records {
            if let Some(stored) = staged.iter_mut().find(|r| r.id == update.id) {
                let entry = stored.entry.clone();
                *stored = update.clone();
                stored.entry = entry;
            }
        }
        self.records = staged;
        self.commits.push(records.iter().map(|r| r.id).collect());
        Ok(())
    }
}
