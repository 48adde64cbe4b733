//! Sliding-window throttle.
//!
//! A `Throttle` allows at most `limit` operation starts within any trailing
//! `interval`. It keeps the instants at which consumed slots become free again;
//! a slot is consumed when an operation *finishes* (the permit is released), so
//! failed operations are throttled exactly like successful ones.
//!
//! # Usage
//! ```ignore
//! let throttle = Throttle::new(10, Duration::from_secs(1));
//!
//! // guard form
//! let permit = throttle.acquire().await;
//! let result = lookup.resolve_card(name).await;
//! drop(permit);
//!
//! // wrapper form
//! let result = throttle.run(lookup.resolve_card(name)).await;
//! ```
//!
//! # Concurrency
//! The slot list sits behind a mutex, so sharing a `Throttle` is memory-safe.
//! The window accounting however assumes one logical sequence of
//! acquire/release pairs: permits that are held concurrently are not counted
//! until they are released, so N simultaneous holders can all start at once.
//! One job invocation owns one throttle; sharing it across concurrent jobs is
//! not coordinated.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

/// Rate limiter keyed on operation start times.
#[derive(Debug)]
pub struct Throttle {
    limit: usize,
    interval: Duration,
    /// Release instants of consumed slots, earliest first.
    slots: Mutex<VecDeque<Instant>>,
}

impl Throttle {
    /// `limit` is clamped to at least 1.
    pub fn new(limit: usize, interval: Duration) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            interval,
            slots: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of slots currently reserved.
    pub fn reserved(&self) -> usize {
        self.slots().len()
    }

    /// Wait for a free slot and return a permit that releases it on drop.
    ///
    /// Cancel-safe: the earliest slot is only taken once its release instant
    /// has passed, so dropping the returned future while it sleeps leaves the
    /// window untouched.
    pub async fn acquire(&self) -> ThrottlePermit<'_> {
        loop {
            let release_at = {
                let mut slots = self.slots();
                if slots.len() < self.limit {
                    break;
                }
                match slots.front().copied() {
                    Some(front) if front > Instant::now() => front,
                    _ => {
                        slots.pop_front();
                        break;
                    }
                }
            };

            let wait = release_at.saturating_duration_since(Instant::now());
            tracing::trace!(
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "throttle: waiting for a free slot"
            );
            tokio::time::sleep_until(release_at).await;
        }

        ThrottlePermit { throttle: self }
    }

    /// Run `operation` inside an acquire/release pair.
    ///
    /// The slot is released on every exit path, including when the returned
    /// future is dropped before completion.
    pub async fn run<F: Future>(&self, operation: F) -> F::Output {
        let _permit = self.acquire().await;
        operation.await
    }

    /// Reserve a slot that frees up `interval` from now.
    fn release(&self) {
        let release_at = Instant::now() + self.interval;
        self.slots().push_back(release_at);
    }

    fn slots(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        // The critical sections never panic, but a poisoned lock still holds
        // consistent data.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Scoped throttle slot. Dropping it records the release.
#[must_use = "the slot is released as soon as the permit is dropped"]
#[derive(Debug)]
pub struct ThrottlePermit<'a> {
    throttle: &'a Throttle,
}

impl Drop for ThrottlePermit<'_> {
    fn drop(&mut self) {
        self.throttle.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SECOND: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn first_limit_acquisitions_do_not_wait() {
        let throttle = Throttle::new(5, SECOND);
        let start = Instant::now();

        for _ in 0..5 {
            throttle.run(async {}).await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(throttle.reserved(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn acquisition_past_limit_waits_for_first_release() {
        let throttle = Throttle::new(2, SECOND);
        let start = Instant::now();

        for _ in 0..3 {
            throttle.run(async {}).await;
        }

        let elapsed = start.elapsed();
        assert!(elapsed >= SECOND, "elapsed={elapsed:?}");
        assert!(elapsed < 2 * SECOND, "elapsed={elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn waits_once_per_exhausted_window() {
        let throttle = Throttle::new(1, SECOND);
        let start = Instant::now();

        for _ in 0..3 {
            throttle.run(async {}).await;
        }

        let elapsed = start.elapsed();
        assert!(elapsed >= 2 * SECOND, "elapsed={elapsed:?}");
        assert!(elapsed < 3 * SECOND, "elapsed={elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn ten_calls_at_five_per_second_span_one_window() {
        let throttle = Throttle::new(5, SECOND);
        let start = Instant::now();
        let mut calls = 0;

        for _ in 0..5 {
            throttle.run(async { calls += 1 }).await;
        }
        assert!(start.elapsed() < SECOND);

        for _ in 0..5 {
            throttle.run(async { calls += 1 }).await;
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= SECOND && elapsed < 2 * SECOND, "elapsed={elapsed:?}");
        assert_eq!(calls, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_operation_still_consumes_its_slot() {
        let throttle = Throttle::new(1, SECOND);
        let start = Instant::now();

        let failed: Result<(), &str> = throttle.run(async { Err("remote exploded") }).await;
        assert!(failed.is_err());
        assert_eq!(throttle.reserved(), 1);

        throttle.run(async {}).await;
        assert!(start.elapsed() >= SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn permit_released_on_early_return() {
        async fn bail_out(throttle: &Throttle) -> Option<u32> {
            let _permit = throttle.acquire().await;
            let missing: Option<u32> = None;
            let value = missing?;
            Some(value + 1)
        }

        let throttle = Throttle::new(3, SECOND);
        assert_eq!(bail_out(&throttle).await, None);
        assert_eq!(throttle.reserved(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn permit_released_when_wrapped_future_is_dropped() {
        let throttle = Throttle::new(3, SECOND);

        let pending = throttle.run(std::future::pending::<()>());
        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;

        assert!(timed_out.is_err());
        assert_eq!(throttle.reserved(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_wait_keeps_the_reserved_slot() {
        let throttle = Throttle::new(1, SECOND);
        let start = Instant::now();
        throttle.run(async {}).await;

        let abandoned = tokio::time::timeout(Duration::from_millis(10), throttle.acquire()).await;
        assert!(abandoned.is_err());
        assert_eq!(throttle.reserved(), 1);

        let _permit = throttle.acquire().await;
        assert!(start.elapsed() >= SECOND, "second start at {:?}", start.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn slots_expire_after_interval() {
        let throttle = Throttle::new(2, SECOND);
        throttle.run(async {}).await;
        throttle.run(async {}).await;

        tokio::time::advance(SECOND).await;
        let start = Instant::now();
        throttle.run(async {}).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    /// Never more than `limit` starts inside any trailing `interval`, whatever
    /// the spacing and duration of the guarded operations.
    #[rstest]
    #[case::tight(3, &[0, 0, 0, 0, 0, 0, 0], &[0, 0, 0, 0, 0, 0, 0])]
    #[case::slow_ops(2, &[0, 0, 0, 0, 0], &[300, 700, 100, 900, 50])]
    #[case::spread(4, &[100, 0, 250, 0, 600, 0, 0, 0, 0], &[10, 10, 10, 400, 10, 10, 10, 10, 10])]
    #[case::single(1, &[0, 500, 0, 200], &[100, 0, 100, 0])]
    #[tokio::test(start_paused = true)]
    async fn never_exceeds_limit_in_trailing_window(
        #[case] limit: usize,
        #[case] gaps_ms: &[u64],
        #[case] op_ms: &[u64],
    ) {
        let throttle = Throttle::new(limit, SECOND);
        let origin = Instant::now();
        let mut starts: Vec<Duration> = Vec::new();

        for (gap, op) in gaps_ms.iter().zip(op_ms) {
            tokio::time::sleep(Duration::from_millis(*gap)).await;
            let permit = throttle.acquire().await;
            starts.push(origin.elapsed());
            tokio::time::sleep(Duration::from_millis(*op)).await;
            drop(permit);
            assert!(throttle.reserved() <= limit);
        }

        for (i, first) in starts.iter().enumerate() {
            let in_window = starts[i..]
                .iter()
                .filter(|start| **start < *first + SECOND)
                .count();
            assert!(
                in_window <= limit,
                "{in_window} starts within 1s of {first:?}: {starts:?}"
            );
        }
    }
}
