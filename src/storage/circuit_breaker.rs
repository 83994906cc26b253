//! Circuit breaker for best-effort snapshot writes.
//!
//! Snapshot persistence is lossy-tolerant, so when the store keeps failing we
//! stop paying the statement timeout on every registered call. After
//! `failure_threshold` consecutive failures the circuit opens for
//! `cooldown`; the first write after the cooldown is let through as a probe.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct WriteCircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    consecutive_failures: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
}

impl WriteCircuitBreaker {
    /// Defaults: 5 consecutive failures, 60 second cooldown.
    pub fn new() -> Self {
        Self::with_threshold(5, Duration::from_secs(60))
    }

    pub fn with_threshold(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            consecutive_failures: AtomicU32::new(0),
            opened_at: Mutex::new(None),
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        let mut opened_at = self.opened_at.lock().unwrap_or_else(|e| e.into_inner());
        if opened_at.take().is_some() {
            log::info!("Snapshot write circuit closed after successful write");
        }
    }

    pub fn record_failure(&self) {
        let count = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if count < self.failure_threshold {
            return;
        }

        let mut opened_at = self.opened_at.lock().unwrap_or_else(|e| e.into_inner());
        if opened_at.is_none() {
            *opened_at = Some(Instant::now());
            log::error!(
                "Snapshot write circuit opened after {} consecutive failures (cooldown: {}s)",
                count,
                self.cooldown.as_secs()
            );
        }
    }

    /// Time left before writes are attempted again, or `None` when closed.
    ///
    /// An expired cooldown re-arms the breaker so a single probe goes through;
    /// another failure reopens it immediately.
    pub fn remaining_cooldown(&self) -> Option<Duration> {
        let mut opened_at = self.opened_at.lock().unwrap_or_else(|e| e.into_inner());
        let opened = (*opened_at)?;

        let elapsed = opened.elapsed();
        if elapsed >= self.cooldown {
            *opened_at = None;
            self.consecutive_failures
                .store(self.failure_threshold.saturating_sub(1), Ordering::SeqCst);
            log::info!("Snapshot write circuit cooldown expired, probing store");
            return None;
        }
        Some(self.cooldown - elapsed)
    }

    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }
}

impl Default for WriteCircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
