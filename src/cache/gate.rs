use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::error_handling::{OutcomeStats, OutcomeType};
use crate::upstream::{Direction, FlightInfo, FlightQuery, FlightSource, UpstreamOutcome};
use crate::usage::{Clock, UsageCoordinator};

/// Identity of a cache entry. The query window is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub location_code: String,
    pub direction: Direction,
}

impl From<&FlightQuery> for CacheKey {
    fn from(query: &FlightQuery) -> Self {
        Self {
            location_code: query.location_code.clone(),
            direction: query.direction,
        }
    }
}

struct CacheEntry {
    payload: Vec<FlightInfo>,
    last_refreshed_at: DateTime<Utc>,
}

/// Per-key state. `attempts` counts finished upstream attempts and is bumped
/// while `entry` is still locked, so a caller that saw a different value
/// before queueing knows a refresh completed while it waited.
#[derive(Default)]
struct Slot {
    attempts: AtomicU64,
    entry: tokio::sync::Mutex<Option<CacheEntry>>,
}

/// Serves flights from cache while they are fresh, refreshing on demand.
///
/// Each key has its own async lock held for the whole check-refresh-write
/// sequence, so concurrent requests for one key share a single upstream call
/// while other keys proceed independently. Callers queued behind a failed
/// refresh take its result instead of retrying one after another. Entries are
/// never evicted.
pub struct FreshnessGate {
    source: Arc<dyn FlightSource>,
    usage: Arc<UsageCoordinator>,
    clock: Arc<dyn Clock>,
    stats: Arc<OutcomeStats>,
    slots: Mutex<HashMap<CacheKey, Arc<Slot>>>,
}

impl FreshnessGate {
    pub fn new(
        source: Arc<dyn FlightSource>,
        usage: Arc<UsageCoordinator>,
        clock: Arc<dyn Clock>,
        stats: Arc<OutcomeStats>,
    ) -> Self {
        Self {
            source,
            usage,
            clock,
            stats,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn stats(&self) -> &OutcomeStats {
        &self.stats
    }

    pub fn usage(&self) -> &UsageCoordinator {
        &self.usage
    }

    /// Number of keys that have been refreshed at least once.
    pub fn cached_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// When the entry for `key` was last refreshed successfully.
    pub async fn last_refreshed_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()?;
        let entry = slot.entry.lock().await;
        entry.as_ref().map(|e| e.last_refreshed_at)
    }

    fn slot(&self, key: &CacheKey) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Flights for `query`, from cache when fresh and from upstream otherwise.
    ///
    /// Never fails. A failed refresh returns the previous payload (or nothing)
    /// and leaves the entry's refresh time alone, so the next request retries.
    /// Dropping the returned future before it completes cannot lose a credit
    /// for a refresh that already reached upstream.
    pub async fn get_flights(&self, query: &FlightQuery) -> Vec<FlightInfo> {
        let key = CacheKey::from(query);
        let slot = self.slot(&key);
        let attempts_seen = slot.attempts.load(Ordering::Acquire);
        let mut entry = slot.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            let interval = self.usage.current_interval();
            let fresh = match (self.clock.now() - cached.last_refreshed_at).to_std() {
                Ok(age) => age < interval,
                // Clock stepped backwards past the refresh time
                Err(_) => true,
            };
            if fresh {
                debug!("Cache hit for {}:{}", key.location_code, key.direction);
                self.stats.increment(OutcomeType::CacheHit);
                return cached.payload.clone();
            }
        }

        if slot.attempts.load(Ordering::Acquire) != attempts_seen {
            // A refresh finished while we queued; its result stands for us too
            debug!(
                "Joining failed refresh for {}:{}",
                key.location_code, key.direction
            );
            self.stats.increment(OutcomeType::SharedRefresh);
            return entry
                .as_ref()
                .map(|cached| cached.payload.clone())
                .unwrap_or_default();
        }

        debug!("Cache miss for {}:{}", key.location_code, key.direction);
        let outcome = self.source.fetch_flights(query).await;
        slot.attempts.fetch_add(1, Ordering::AcqRel);

        let kind = outcome_type(&outcome);
        self.stats.increment(kind);
        if !kind.consumes_credit() {
            return self.previous_payload(&key, entry.as_ref());
        }

        let payload = match outcome {
            UpstreamOutcome::Success(flights) => flights,
            _ => Vec::new(),
        };

        *entry = Some(CacheEntry {
            payload: payload.clone(),
            last_refreshed_at: self.clock.now(),
        });

        self.charge_credit(&key).await;
        payload
    }

    fn previous_payload(&self, key: &CacheKey, entry: Option<&CacheEntry>) -> Vec<FlightInfo> {
        match entry {
            Some(cached) => {
                warn!(
                    "Refresh failed for {}:{}, serving {} cached flights",
                    key.location_code,
                    key.direction,
                    cached.payload.len()
                );
                cached.payload.clone()
            }
            None => {
                warn!(
                    "Refresh failed for {}:{} with nothing cached",
                    key.location_code, key.direction
                );
                Vec::new()
            }
        }
    }

    /// Registers the upstream call on its own task so it completes even if
    /// this request is cancelled while waiting.
    async fn charge_credit(&self, key: &CacheKey) {
        let usage = Arc::clone(&self.usage);
        let handle = tokio::spawn(async move { usage.register_call().await });
        match handle.await {
            Ok(state) => info!(
                "API call registered for {} {} ({} this cycle)",
                key.location_code, key.direction, state.calls_this_cycle
            ),
            Err(e) => error!(
                "Usage registration task failed for {} {}: {e}",
                key.location_code, key.direction
            ),
        }
    }
}

fn outcome_type(outcome: &UpstreamOutcome) -> OutcomeType {
    match outcome {
        UpstreamOutcome::Success(_) => OutcomeType::UpstreamSuccess,
        UpstreamOutcome::Empty => OutcomeType::UpstreamEmpty,
        UpstreamOutcome::RateLimited(_) => OutcomeType::UpstreamRateLimited,
        UpstreamOutcome::MalformedResponse => OutcomeType::UpstreamMalformed,
        UpstreamOutcome::TransportFailure => OutcomeType::UpstreamTransportFailure,
    }
}
