//! Deferred tasks and periodic sweeps
//!
//! One-shot jobs (appointment reminders) sleep until their eta on a spawned
//! task; sweeps run on interval loops. Sweep handlers are duplicate-tolerant
//! (conditional updates, status re-checks) so an overlapping or restarted
//! run cannot double-fire.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::api::AppState;
use crate::domain;

/// Run `fut` at `run_at`. An eta already in the past fires immediately.
pub fn schedule_at<F>(run_at: DateTime<Utc>, fut: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let delay = (run_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        fut.await;
    })
}

/// Spawn the periodic sweeps: a fast loop for stale Temporary appointments
/// and expired OTP codes, and a configurable slower loop for voucher expiry
/// reminders.
pub fn spawn_sweeps(state: AppState) {
    let fast_state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        // First tick completes immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) =
                domain::appointments::cleanup_temporary(&fast_state.pool, &fast_state.config.rewards)
                    .await
            {
                error!("temporary appointment sweep failed: {}", e);
            }
            if let Err(e) =
                domain::profiles::purge_expired_otps(&fast_state.pool, &fast_state.config.rewards)
                    .await
            {
                error!("otp purge sweep failed: {}", e);
            }
        }
    });

    tokio::spawn(async move {
        let minutes = state.config.sweep_interval_minutes().max(1) as u64;
        let mut ticker = tokio::time::interval(Duration::from_secs(minutes * 60));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            debug!("running voucher expiry sweep");
            if let Err(e) = domain::vouchers::send_expiry_reminders(
                &state.pool,
                &state.bus,
                &state.email,
                &state.config.rewards,
            )
            .await
            {
                error!("voucher expiry sweep failed: {}", e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn past_eta_fires_immediately() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = schedule_at(Utc::now() - chrono::Duration::hours(1), async move {
            flag.store(true, Ordering::SeqCst);
        });
        handle.await.unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn future_eta_waits_for_the_clock() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = schedule_at(Utc::now() + chrono::Duration::seconds(30), async move {
            flag.store(true, Ordering::SeqCst);
        });
        // Paused clock: nothing fires until time advances.
        tokio::task::yield_now().await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::advance(Duration::from_secs(31)).await;
        handle.await.unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }
}
