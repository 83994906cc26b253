//! Retried execution of durable-store operations.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{error, warn};
use tokio_retry::RetryIf;

use crate::error_handling::{get_retry_strategy, DatabaseError, RetryPolicy};

/// Runs `action` under `policy`, retrying only transient faults.
///
/// Permanent faults are returned after the first attempt. Each retry is logged
/// as a warning and exhaustion as an error, both naming `operation`.
pub async fn execute_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut action: F,
) -> Result<T, DatabaseError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DatabaseError>>,
{
    // Includes the initial attempt
    let attempts = AtomicUsize::new(0);
    let max_retries = policy.max_retries;

    let result = RetryIf::start(
        get_retry_strategy(policy),
        || {
            attempts.fetch_add(1, Ordering::SeqCst);
            action()
        },
        |e: &DatabaseError| {
            let attempt = attempts.load(Ordering::SeqCst);
            let retry = e.is_transient();
            if retry && attempt <= max_retries {
                warn!(
                    "Transient failure in {} (attempt {}/{}): {}. Retrying",
                    operation,
                    attempt,
                    max_retries + 1,
                    e
                );
            }
            retry
        },
    )
    .await;

    if let Err(e) = &result {
        let attempt = attempts.load(Ordering::SeqCst);
        if e.is_transient() {
            error!("{} failed after {} attempts: {}", operation, attempt, e);
        } else {
            error!("{} failed with a permanent error: {}", operation, e);
        }
    }

    result
}
