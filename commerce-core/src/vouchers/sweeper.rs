//! Abandoned Reservation Sweep
//!
//! Periodic task that reclaims capacity held by PENDING usage records
//! whose checkout never committed or rolled back. Registered with the
//! background task manager; exits when the shutdown token fires.

use crate::vouchers::ledger;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub async fn run(
    pool: SqlitePool,
    interval_secs: u64,
    max_age_minutes: i64,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // First tick fires immediately; skip it so a fresh start does not
    // sweep before any reservation can age.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("Reservation sweep stopping");
                return;
            }
            _ = interval.tick() => {
                match ledger::cleanup_abandoned(&pool, max_age_minutes).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(reclaimed = n, "Reservation sweep pass complete"),
                    Err(e) => tracing::error!(error = %e, "Reservation sweep pass failed"),
                }
            }
        }
    }
}
