//! Usage coordinator: the single owner of the usage ledger.
//!
//! `register_call` runs rollover-check-then-increment under one async mutex,
//! so concurrent callers never observe the same pre-increment count and a
//! closed cycle is logged and reset by exactly one of them. The call count is
//! also published to an atomic after every mutation so `current_interval`
//! never waits behind a rollover that is retrying its durable write.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, error, info, warn};
use tokio::sync::Mutex;

use super::clock::Clock;
use super::cycle::first_cycle_start_after;
use super::ledger::UsageState;
use crate::error_handling::DatabaseError;
use crate::storage::UsageStore;
use crate::throttle::{tier_for, ThrottleConfig, Tier};

pub struct UsageCoordinator {
    config: ThrottleConfig,
    store: Arc<dyn UsageStore>,
    clock: Arc<dyn Clock>,
    ledger: Mutex<UsageState>,
    published_calls: AtomicU64,
}

impl UsageCoordinator {
    pub fn new(
        config: ThrottleConfig,
        store: Arc<dyn UsageStore>,
        clock: Arc<dyn Clock>,
        mut initial: UsageState,
    ) -> Self {
        align_to_anchor(&config, &mut initial);
        let published_calls = AtomicU64::new(initial.calls_this_cycle);
        Self {
            config,
            store,
            clock,
            ledger: Mutex::new(initial),
            published_calls,
        }
    }

    /// Builds the coordinator from the last persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the snapshot cannot be read at all; a missing
    /// snapshot is not an error and yields a fresh cycle.
    pub async fn load(
        config: ThrottleConfig,
        store: Arc<dyn UsageStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DatabaseError> {
        let today = clock.now().date_naive();
        let state = store.load_snapshot(today).await?;
        info!(
            "Usage ledger loaded: {} calls in cycle {} to {}",
            state.calls_this_cycle, state.cycle_start, state.cycle_end
        );
        Ok(Self::new(config, store, clock, state))
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Calls registered in the current cycle as of the last completed mutation.
    pub fn calls_this_cycle(&self) -> u64 {
        self.published_calls.load(Ordering::SeqCst)
    }

    pub fn current_tier(&self) -> Tier {
        let tier = tier_for(self.calls_this_cycle(), &self.config);
        debug!("{} interval applied", tier);
        tier
    }

    /// Minimum refresh interval under the present consumption.
    pub fn current_interval(&self) -> Duration {
        self.config.interval(self.current_tier())
    }

    /// Copy of the ledger, taken under the ledger lock.
    pub async fn snapshot(&self) -> UsageState {
        self.ledger.lock().await.clone()
    }

    /// Records one credit consumption, rolling the cycle over first if it closed.
    ///
    /// Never fails: durable-write problems are logged and the in-memory ledger
    /// stays authoritative. Returns the ledger as left by this call.
    ///
    /// The future holds the ledger lock across store I/O; callers that may be
    /// cancelled should run it on a spawned task so the credit is not lost.
    pub async fn register_call(&self) -> UsageState {
        let mut ledger = self.ledger.lock().await;
        let today = self.clock.now().date_naive();

        if ledger.is_closed(today) {
            self.roll_over(&mut ledger, today).await;
        }

        ledger.calls_this_cycle += 1;
        self.published_calls
            .store(ledger.calls_this_cycle, Ordering::SeqCst);
        debug!(
            "API call registered. Total calls this cycle: {}",
            ledger.calls_this_cycle
        );

        if let Err(e) = self.store.save_snapshot(&ledger).await {
            warn!(
                "Failed to persist usage snapshot ({} calls this cycle): {}",
                ledger.calls_this_cycle, e
            );
        }

        ledger.clone()
    }

    /// Closes every cycle that ended before `today`, one at a time.
    ///
    /// Each closing state is appended to the cycle log before the ledger moves
    /// on; a failed append (after the store's retries) is logged and the reset
    /// proceeds anyway.
    async fn roll_over(&self, ledger: &mut UsageState, today: NaiveDate) {
        while ledger.is_closed(today) {
            let entry = ledger.closing_entry(self.clock.now());
            match self.store.append_cycle_log(&entry).await {
                Ok(()) => info!(
                    "Subscription cycle {} to {} closed with {} calls",
                    entry.cycle_start, entry.cycle_end, entry.calls_this_cycle
                ),
                Err(e) => error!(
                    "Failed to log closed cycle {} to {} ({} calls): {}",
                    entry.cycle_start, entry.cycle_end, entry.calls_this_cycle, e
                ),
            }
            ledger.advance();
            align_to_anchor(&self.config, ledger);
        }
        self.published_calls
            .store(ledger.calls_this_cycle, Ordering::SeqCst);
        info!(
            "New subscription cycle started at {} (ends {})",
            ledger.cycle_start, ledger.cycle_end
        );
    }
}

/// Ends the ledger's cycle the day before the next anchor day, if an anchor is
/// configured. A ledger started mid-period (first boot, or an anchor changed
/// since the snapshot) closes on the provider's boundary instead of a month
/// after its own start.
fn align_to_anchor(config: &ThrottleConfig, ledger: &mut UsageState) {
    let Some(anchor) = config.subscription_start else {
        return;
    };
    let boundary = first_cycle_start_after(anchor, ledger.cycle_start);
    let before = ledger.cycle_end;
    ledger.end_before(boundary);
    if ledger.cycle_end != before {
        debug!(
            "Cycle starting {} now ends {} (was {}) to meet anchor {}",
            ledger.cycle_start, ledger.cycle_end, before, anchor
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UsageLogEntry;
    use crate::throttle::test_config;
    use crate::usage::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicBool;

    /// In-memory store that records every write and can be told to fail.
    #[derive(Default)]
    struct RecordingStore {
        snapshot: std::sync::Mutex<Option<UsageState>>,
        saves: AtomicU64,
        log: std::sync::Mutex<Vec<UsageLogEntry>>,
        fail_appends: AtomicBool,
        fail_saves: AtomicBool,
    }

    impl RecordingStore {
        fn log_entries(&self) -> Vec<UsageLogEntry> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UsageStore for RecordingStore {
        async fn load_snapshot(&self, today: NaiveDate) -> Result<UsageState, DatabaseError> {
            Ok(self
                .snapshot
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| UsageState::fresh(today)))
        }

        async fn save_snapshot(&self, state: &UsageState) -> Result<(), DatabaseError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(DatabaseError::SqlError(sqlx::Error::PoolClosed));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.snapshot.lock().unwrap() = Some(state.clone());
            Ok(())
        }

        async fn append_cycle_log(&self, entry: &UsageLogEntry) -> Result<(), DatabaseError> {
            // Yield so concurrent callers get a chance to interleave
            tokio::task::yield_now().await;
            if self.fail_appends.load(Ordering::SeqCst) {
                return Err(DatabaseError::SqlError(sqlx::Error::PoolTimedOut));
            }
            self.log.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock_at(y: i32, m: u32, d: u32) -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap(),
        ))
    }

    fn february_cycle(calls: u64) -> UsageState {
        UsageState {
            calls_this_cycle: calls,
            cycle_start: date(2025, 2, 15),
            cycle_end: date(2025, 3, 14),
        }
    }

    fn coordinator(
        store: Arc<RecordingStore>,
        clock: Arc<ManualClock>,
        initial: UsageState,
    ) -> Arc<UsageCoordinator> {
        Arc::new(UsageCoordinator::new(test_config(), store, clock, initial))
    }

    #[tokio::test]
    async fn test_register_call_increments_and_persists() {
        let store = Arc::new(RecordingStore::default());
        let usage = coordinator(store.clone(), clock_at(2025, 2, 20), february_cycle(0));

        let state = usage.register_call().await;
        assert_eq!(state.calls_this_cycle, 1);
        assert_eq!(usage.calls_this_cycle(), 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.snapshot.lock().unwrap().as_ref().unwrap().calls_this_cycle,
            1
        );
        assert!(store.log_entries().is_empty());
    }

    #[tokio::test]
    async fn test_current_interval_tracks_consumption() {
        let store = Arc::new(RecordingStore::default());
        let usage = coordinator(store, clock_at(2025, 2, 20), february_cycle(599));
        assert_eq!(usage.current_interval(), Duration::from_secs(240));
        assert_eq!(usage.current_tier(), Tier::Tier2);

        let usage = coordinator(
            Arc::new(RecordingStore::default()),
            clock_at(2025, 2, 20),
            february_cycle(900),
        );
        assert_eq!(usage.current_interval(), Duration::from_secs(480));
    }

    #[tokio::test]
    async fn test_rollover_starts_day_after_previous_end() {
        let store = Arc::new(RecordingStore::default());
        let usage = coordinator(store.clone(), clock_at(2025, 3, 16), february_cycle(321));

        let state = usage.register_call().await;

        let log = store.log_entries();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].calls_this_cycle, 321);
        assert_eq!(log[0].cycle_start, date(2025, 2, 15));
        assert_eq!(log[0].cycle_end, date(2025, 3, 14));

        assert_eq!(state.cycle_start, date(2025, 3, 15));
        assert_eq!(state.cycle_end, date(2025, 4, 14));
        assert_eq!(state.calls_this_cycle, 1);
        assert_eq!(usage.current_tier(), Tier::Tier1);
    }

    #[tokio::test]
    async fn test_no_rollover_on_last_day_of_cycle() {
        let store = Arc::new(RecordingStore::default());
        let usage = coordinator(store.clone(), clock_at(2025, 3, 14), february_cycle(10));

        let state = usage.register_call().await;
        assert!(store.log_entries().is_empty());
        assert_eq!(state.calls_this_cycle, 11);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rollover_logs_exactly_once() {
        let store = Arc::new(RecordingStore::default());
        let usage = coordinator(store.clone(), clock_at(2025, 3, 15), february_cycle(77));

        let a = tokio::spawn({
            let usage = Arc::clone(&usage);
            async move { usage.register_call().await }
        });
        let b = tokio::spawn({
            let usage = Arc::clone(&usage);
            async move { usage.register_call().await }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_eq!(store.log_entries().len(), 1);
        let mut seen = [a.calls_this_cycle, b.calls_this_cycle];
        seen.sort();
        assert_eq!(seen, [1, 2]);

        let state = usage.snapshot().await;
        assert_eq!(state.calls_this_cycle, 2);
        assert_eq!(state.cycle_start, date(2025, 3, 15));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_never_share_a_count() {
        let store = Arc::new(RecordingStore::default());
        let usage = coordinator(store.clone(), clock_at(2025, 2, 20), february_cycle(0));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let usage = Arc::clone(&usage);
                tokio::spawn(async move { usage.register_call().await.calls_this_cycle })
            })
            .collect();
        let mut counts: Vec<u64> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        counts.sort();

        assert_eq!(counts, (1..=50).collect::<Vec<u64>>());
        assert_eq!(usage.calls_this_cycle(), 50);
        assert_eq!(store.saves.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn test_missed_cycles_are_caught_up_one_at_a_time() {
        let store = Arc::new(RecordingStore::default());
        let usage = coordinator(store.clone(), clock_at(2025, 6, 1), february_cycle(12));

        let state = usage.register_call().await;

        let log = store.log_entries();
        let bounds: Vec<(NaiveDate, NaiveDate, u64)> = log
            .iter()
            .map(|e| (e.cycle_start, e.cycle_end, e.calls_this_cycle))
            .collect();
        assert_eq!(
            bounds,
            vec![
                (date(2025, 2, 15), date(2025, 3, 14), 12),
                (date(2025, 3, 15), date(2025, 4, 14), 0),
                (date(2025, 4, 15), date(2025, 5, 14), 0),
            ]
        );
        assert_eq!(state.cycle_start, date(2025, 5, 15));
        assert_eq!(state.cycle_end, date(2025, 6, 14));
        assert_eq!(state.calls_this_cycle, 1);
    }

    #[tokio::test]
    async fn test_failed_cycle_log_does_not_block_reset() {
        let store = Arc::new(RecordingStore::default());
        store.fail_appends.store(true, Ordering::SeqCst);
        let usage = coordinator(store.clone(), clock_at(2025, 3, 20), february_cycle(900));

        let state = usage.register_call().await;
        assert!(store.log_entries().is_empty());
        assert_eq!(state.calls_this_cycle, 1);
        assert_eq!(state.cycle_start, date(2025, 3, 15));
        assert_eq!(usage.current_tier(), Tier::Tier1);
    }

    #[tokio::test]
    async fn test_failed_snapshot_save_keeps_counting() {
        let store = Arc::new(RecordingStore::default());
        store.fail_saves.store(true, Ordering::SeqCst);
        let usage = coordinator(store.clone(), clock_at(2025, 2, 20), february_cycle(5));

        usage.register_call().await;
        usage.register_call().await;
        assert_eq!(usage.calls_this_cycle(), 7);
        assert!(store.snapshot.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_uses_persisted_snapshot() {
        let store = Arc::new(RecordingStore::default());
        *store.snapshot.lock().unwrap() = Some(february_cycle(600));

        let usage = UsageCoordinator::load(test_config(), store, clock_at(2025, 2, 20))
            .await
            .unwrap();
        assert_eq!(usage.calls_this_cycle(), 600);
        assert_eq!(usage.current_interval(), Duration::from_secs(240));
    }

    #[tokio::test]
    async fn test_load_without_snapshot_starts_today_and_ends_before_anchor_day() {
        let store = Arc::new(RecordingStore::default());
        let usage = UsageCoordinator::load(test_config(), store, clock_at(2025, 2, 20))
            .await
            .unwrap();
        let state = usage.snapshot().await;
        assert_eq!(state.calls_this_cycle, 0);
        assert_eq!(state.cycle_start, date(2025, 2, 20));
        assert_eq!(state.cycle_end, date(2025, 3, 14));
    }

    #[tokio::test]
    async fn test_without_anchor_cycle_runs_a_month_from_first_day() {
        let store = Arc::new(RecordingStore::default());
        let config = ThrottleConfig {
            subscription_start: None,
            ..test_config()
        };
        let usage = UsageCoordinator::load(config, store, clock_at(2025, 2, 20))
            .await
            .unwrap();
        assert_eq!(usage.snapshot().await, UsageState::fresh(date(2025, 2, 20)));
    }

    #[tokio::test]
    async fn test_anchor_day_rolls_over_ledger_started_mid_cycle() {
        let store = Arc::new(RecordingStore::default());
        let clock = clock_at(2025, 1, 20);
        let usage = Arc::new(
            UsageCoordinator::load(test_config(), store.clone(), clock.clone())
                .await
                .unwrap(),
        );
        for _ in 0..10 {
            usage.register_call().await;
        }

        clock.set(Utc.with_ymd_and_hms(2025, 2, 16, 9, 30, 0).unwrap());
        let state = usage.register_call().await;

        let log = store.log_entries();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].cycle_start, date(2025, 1, 20));
        assert_eq!(log[0].cycle_end, date(2025, 2, 14));
        assert_eq!(log[0].calls_this_cycle, 10);
        assert_eq!(state.calls_this_cycle, 1);
        assert_eq!(state.cycle_start, date(2025, 2, 15));
        assert_eq!(state.cycle_end, date(2025, 3, 14));
    }

    #[tokio::test]
    async fn test_snapshot_from_other_anchor_is_realigned() {
        let store = Arc::new(RecordingStore::default());
        // Written while cycles ran from the 20th
        let initial = UsageState {
            calls_this_cycle: 30,
            cycle_start: date(2025, 1, 20),
            cycle_end: date(2025, 2, 19),
        };
        let usage = coordinator(store.clone(), clock_at(2025, 2, 15), initial);
        assert_eq!(usage.snapshot().await.cycle_end, date(2025, 2, 14));

        let state = usage.register_call().await;
        assert_eq!(store.log_entries().len(), 1);
        assert_eq!(state.cycle_start, date(2025, 2, 15));
        assert_eq!(state.calls_this_cycle, 1);
    }
}
