//! EnrichJob - fetch remote data for pending records and save it in batches.
//!
//! # Flow
//! 1. Snapshot the selection (`InventoryStore::select_for_enrichment`)
//! 2. Per batch, per record: resolve card -> apply -> count decks -> apply
//! 3. Commit the touched records of the batch in one transaction
//!
//! Every remote call goes through the shared `Throttle`. Cancellation is
//! checked at each await; a cancelled batch is never committed.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use ulid::Ulid;

use crate::config::Settings;
use crate::domain::{EnrichError, EnrichmentStatus, InventoryRecord};
use crate::ports::{CardLookup, Clock, InventoryStore, SystemClock};
use crate::throttle::Throttle;

/// Counters for one finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    /// Records in the selection snapshot.
    pub selected: usize,
    /// Records with card data and a deck count.
    pub enriched: usize,
    /// Records whose card could not be resolved; left pending.
    pub unresolved: usize,
    /// Records resolved without a deck count; marked failed.
    pub missing_decks: usize,
    /// Resolved records with no usable price (stored as zero).
    pub unpriced: usize,
    pub batches_committed: usize,
}

enum RecordOutcome {
    Unresolved,
    Resolved { priced: bool, with_decks: bool },
}

pub struct EnrichJob<L, C = SystemClock> {
    lookup: L,
    clock: C,
    throttle: Throttle,
    batch_size: usize,
    statuses: Vec<EnrichmentStatus>,
}

impl<L: CardLookup> EnrichJob<L, SystemClock> {
    /// A job selecting pending records, throttled and batched per `settings`.
    pub fn new(lookup: L, settings: &Settings) -> Self {
        Self {
            lookup,
            clock: SystemClock,
            throttle: Throttle::new(settings.throttle_limit, settings.throttle_interval),
            batch_size: settings.batch_size.max(1),
            statuses: vec![EnrichmentStatus::Pending],
        }
    }
}

impl<L, C> EnrichJob<L, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> EnrichJob<L, C2> {
        EnrichJob {
            lookup: self.lookup,
            clock,
            throttle: self.throttle,
            batch_size: self.batch_size,
            statuses: self.statuses,
        }
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Also select records whose previous run resolved the card but not
    /// its deck count.
    pub fn retry_failed(mut self, retry: bool) -> Self {
        self.statuses = if retry {
            vec![EnrichmentStatus::Pending, EnrichmentStatus::Failed]
        } else {
            vec![EnrichmentStatus::Pending]
        };
        self
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn statuses(&self) -> &[EnrichmentStatus] {
        &self.statuses
    }
}

impl<L: CardLookup, C: Clock> EnrichJob<L, C> {
    /// Run over the whole selection.
    ///
    /// Returns `EnrichError::Cancelled` as soon as `cancel` fires; batches
    /// committed before that stay committed.
    pub async fn run<S: InventoryStore>(
        &self,
        store: &mut S,
        cancel: &CancellationToken,
    ) -> Result<EnrichSummary, EnrichError> {
        let span = tracing::info_span!("enrich", run = %Ulid::new());
        self.run_batches(store, cancel).instrument(span).await
    }

    async fn run_batches<S: InventoryStore>(
        &self,
        store: &mut S,
        cancel: &CancellationToken,
    ) -> Result<EnrichSummary, EnrichError> {
        let selected = store.select_for_enrichment(&self.statuses)?;
        let mut summary = EnrichSummary {
            selected: selected.len(),
            ..EnrichSummary::default()
        };
        tracing::info!(
            records = selected.len(),
            batch_size = self.batch_size,
            "Downloading card data from Moxfield"
        );

        for (index, batch) in selected.chunks(self.batch_size).enumerate() {
            let mut touched = Vec::with_capacity(batch.len());

            for record in batch {
                let mut record = record.clone();
                match self.enrich_record(&mut record, cancel).await? {
                    RecordOutcome::Unresolved => summary.unresolved += 1,
                    RecordOutcome::Resolved { priced, with_decks } => {
                        if !priced {
                            summary.unpriced += 1;
                        }
                        if with_decks {
                            summary.enriched += 1;
                        } else {
                            summary.missing_decks += 1;
                        }
                        touched.push(record);
                    }
                }
            }

            if touched.is_empty() {
                tracing::debug!(batch = index + 1, "Nothing to save in batch");
                continue;
            }
            tracing::info!(batch = index + 1, records = touched.len(), "Saving batch to database");
            store.commit_enrichment(&touched)?;
            summary.batches_committed += 1;
        }

        tracing::info!(
            enriched = summary.enriched,
            unresolved = summary.unresolved,
            missing_decks = summary.missing_decks,
            batches = summary.batches_committed,
            "Enrichment finished"
        );
        Ok(summary)
    }

    async fn enrich_record(
        &self,
        record: &mut InventoryRecord,
        cancel: &CancellationToken,
    ) -> Result<RecordOutcome, EnrichError> {
        let name = record.name().to_string();

        let card = cancellable(cancel, self.throttle.run(self.lookup.resolve_card(&name))).await?;
        let Some(card) = card else {
            tracing::warn!(card = %name, record = %record.id, "No Moxfield card found");
            return Ok(RecordOutcome::Unresolved);
        };

        let priced = match record.apply_card(&card, self.clock.now()) {
            Some(source) => {
                tracing::debug!(card = %name, source, "Price selected");
                true
            }
            None => {
                tracing::info!(card = %name, "No pricing data found");
                false
            }
        };

        let decks = cancellable(cancel, self.throttle.run(self.lookup.count_decks(&card.id))).await?;
        let Some(decks) = decks else {
            tracing::warn!(card = %name, remote_id = %card.id, "No Moxfield decks found");
            return Ok(RecordOutcome::Resolved {
                priced,
                with_decks: false,
            });
        };
        record.apply_decks(&decks);

        Ok(RecordOutcome::Resolved {
            priced,
            with_decks: true,
        })
    }
}

/// Await `fut` unless `cancel` fires first.
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, EnrichError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EnrichError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tokio::time::Instant;

    use crate::app::testing::FakeLookup;
    use crate::domain::card::fixtures::{entry, remote};
    use crate::domain::{Price, RecordId};
    use crate::impls::InMemoryStore;
    use crate::ports::FixedClock;

    fn job(lookup: FakeLookup) -> EnrichJob<FakeLookup, FixedClock> {
        EnrichJob::new(lookup, &Settings::default())
            .with_clock(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()))
    }

    fn store_with(names: &[&str]) -> (InMemoryStore, Vec<RecordId>) {
        let mut store = InMemoryStore::new();
        let ids = names.iter().map(|name| store.insert(entry(name))).collect();
        (store, ids)
    }

    #[tokio::test]
    async fn enriches_resolved_record_and_leaves_unresolved_pending() {
        let (mut store, ids) = store_with(&["A", "B"]);
        let untouched_b = store.get(ids[1]).unwrap().clone();
        let lookup = FakeLookup::default()
            .with_card("A", remote("abc", "Creature", json!({"usd": "1.23"})))
            .with_decks("abc", 5);

        let summary = job(lookup).run(&mut store, &CancellationToken::new()).await.unwrap();

        let a = store.get(ids[0]).unwrap();
        assert_eq!(a.status, EnrichmentStatus::Enriched);
        assert_eq!(a.price, Some(Price::from_cents(123)));
        assert_eq!(a.deck_count, Some(5));
        assert_eq!(a.type_line.as_deref(), Some("Creature"));
        assert_eq!(a.remote_id.as_deref(), Some("abc"));
        assert_eq!(store.get(ids[1]).unwrap(), &untouched_b);

        assert_eq!(store.commits(), &[vec![ids[0]]]);
        assert_eq!(
            summary,
            EnrichSummary {
                selected: 2,
                enriched: 1,
                unresolved: 1,
                missing_decks: 0,
                unpriced: 0,
                batches_committed: 1,
            }
        );
    }

    #[tokio::test]
    async fn price_falls_back_through_sources() {
        let (mut store, ids) = store_with(&["Foil Only", "No Price"]);
        let lookup = FakeLookup::default()
            .with_card("Foil Only", remote("f1", "Instant", json!({"usd": null, "ck_foil": 4.5})))
            .with_card("No Price", remote("n1", "Sorcery", json!({})))
            .with_decks("f1", 10)
            .with_decks("n1", 0);

        let summary = job(lookup).run(&mut store, &CancellationToken::new()).await.unwrap();

        assert_eq!(store.get(ids[0]).unwrap().price, Some(Price::from_cents(450)));
        assert_eq!(store.get(ids[1]).unwrap().price, Some(Price::ZERO));
        assert_eq!(summary.unpriced, 1);
        assert_eq!(summary.enriched, 2);
    }

    #[tokio::test]
    async fn missing_deck_count_marks_record_failed_but_keeps_card_data() {
        let (mut store, ids) = store_with(&["Lonely"]);
        let lookup = FakeLookup::default().with_card("Lonely", remote("l1", "Artifact", json!({"usd": "2.00"})));

        let summary = job(lookup).run(&mut store, &CancellationToken::new()).await.unwrap();

        let rec = store.get(ids[0]).unwrap();
        assert_eq!(rec.status, EnrichmentStatus::Failed);
        assert_eq!(rec.price, Some(Price::from_cents(200)));
        assert_eq!(rec.deck_count, None);
        assert_eq!(summary.missing_decks, 1);
        assert_eq!(store.commits().len(), 1);
    }

    #[tokio::test]
    async fn commits_once_per_batch_in_selection_order() {
        let names = ["c1", "c2", "c3", "c4", "c5"];
        let (mut store, ids) = store_with(&names);
        let mut lookup = FakeLookup::default();
        for name in names {
            lookup = lookup
                .with_card(name, remote(&format!("r-{name}"), "Creature", json!({"usd": 1})))
                .with_decks(&format!("r-{name}"), 1);
        }
        let job = job(lookup).with_batch_size(2);

        let summary = job.run(&mut store, &CancellationToken::new()).await.unwrap();

        assert_eq!(summary.batches_committed, 3);
        assert_eq!(
            store.commits(),
            &[vec![ids[0], ids[1]], vec![ids[2], ids[3]], vec![ids[4]]]
        );
        assert_eq!(
            job.lookup().calls()[..4],
            ["card:c1", "decks:r-c1", "card:c2", "decks:r-c2"]
        );
    }

    #[tokio::test]
    async fn batch_without_resolved_records_is_not_committed() {
        let (mut store, _) = store_with(&["x", "y"]);

        let summary = job(FakeLookup::default())
            .run(&mut store, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.unresolved, 2);
        assert_eq!(summary.batches_committed, 0);
        assert!(store.commits().is_empty());
    }

    #[tokio::test]
    async fn failed_records_are_only_selected_on_retry() {
        let (mut store, ids) = store_with(&["Lonely"]);
        let lookup = FakeLookup::default().with_card("Lonely", remote("l1", "Artifact", json!({})));
        job(lookup).run(&mut store, &CancellationToken::new()).await.unwrap();
        assert_eq!(store.get(ids[0]).unwrap().status, EnrichmentStatus::Failed);

        let lookup = FakeLookup::default()
            .with_card("Lonely", remote("l1", "Artifact", json!({})))
            .with_decks("l1", 3);
        let plain = job(lookup).run(&mut store, &CancellationToken::new()).await.unwrap();
        assert_eq!(plain.selected, 0);

        let lookup = FakeLookup::default()
            .with_card("Lonely", remote("l1", "Artifact", json!({})))
            .with_decks("l1", 3);
        let retried = job(lookup)
            .retry_failed(true)
            .run(&mut store, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(retried.enriched, 1);
        assert_eq!(store.get(ids[0]).unwrap().status, EnrichmentStatus::Enriched);
        assert_eq!(store.get(ids[0]).unwrap().deck_count, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_calls_are_throttled() {
        let (mut store, _) = store_with(&["a", "b"]);
        let lookup = FakeLookup::default()
            .with_card("a", remote("ra", "Land", json!({})))
            .with_card("b", remote("rb", "Land", json!({})))
            .with_decks("ra", 1)
            .with_decks("rb", 1);
        let job = job(lookup).with_throttle(Throttle::new(2, Duration::from_secs(1)));

        let start = Instant::now();
        job.run(&mut store, &CancellationToken::new()).await.unwrap();

        // four calls at two per second
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(job.lookup().calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_while_throttled_keeps_committed_batches() {
        let names = ["c1", "c2", "c3", "c4"];
        let (mut store, ids) = store_with(&names);
        let mut lookup = FakeLookup::default();
        for name in names {
            lookup = lookup
                .with_card(name, remote(&format!("r-{name}"), "Creature", json!({"usd": 1})))
                .with_decks(&format!("r-{name}"), 7);
        }
        // batch 1 uses four slots; batch 2 stalls on its sixth call
        let job = job(lookup)
            .with_batch_size(2)
            .with_throttle(Throttle::new(5, Duration::from_secs(60)));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let result = job.run(&mut store, &cancel).await;

        assert!(matches!(result, Err(EnrichError::Cancelled)));
        assert_eq!(store.commits(), &[vec![ids[0], ids[1]]]);
        assert_eq!(store.get(ids[0]).unwrap().status, EnrichmentStatus::Enriched);
        assert_eq!(store.get(ids[1]).unwrap().deck_count, Some(7));
        for id in &ids[2..] {
            let rec = store.get(*id).unwrap();
            assert_eq!(rec.status, EnrichmentStatus::Pending);
            assert_eq!(rec.remote_id, None);
        }
        assert_eq!(job.lookup().calls().len(), 5);
    }

    #[tokio::test]
    async fn cancelled_before_start_makes_no_calls() {
        let (mut store, _) = store_with(&["a"]);
        let lookup = FakeLookup::default().with_card("a", remote("ra", "Land", json!({})));
        let job = job(lookup);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = job.run(&mut store, &cancel).await;

        assert!(matches!(result, Err(EnrichError::Cancelled)));
        assert!(job.lookup().calls().is_empty());
        assert!(store.commits().is_empty());
    }
}
