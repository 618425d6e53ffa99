//! Expiration scheduler
//!
//! Recurring background task that promotes PENDING reservations whose start
//! has elapsed and retires ACTIVE reservations whose end has elapsed, then
//! releases the retired reservations' devices back to the registry. A failed
//! cycle is logged and the next tick proceeds; shutdown interrupts only the
//! wait between cycles.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tracing::{debug, error, info};

use crate::domain::{DeviceRegistry, DeviceStatus, DomainResult, ReservationRepository};
use crate::shared::shutdown::ShutdownSignal;

/// Configuration for the expiration loop
#[derive(Debug, Clone)]
pub struct ExpirationConfig {
    /// Seconds between cycles
    pub interval_secs: u64,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

pub struct ExpirationScheduler {
    store: Arc<dyn ReservationRepository>,
    registry: Arc<dyn DeviceRegistry>,
    config: ExpirationConfig,
}

impl ExpirationScheduler {
    pub fn new(
        store: Arc<dyn ReservationRepository>,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Self {
        Self {
            store,
            registry,
            config: ExpirationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExpirationConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn the background loop. Runs until `shutdown` triggers; an
    /// in-progress cycle finishes before the task exits. The returned
    /// handle resolves once the loop has drained.
    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal) -> tokio::task::JoinHandle<()> {
        // interval(0) panics
        let interval_secs = self.config.interval_secs.max(1);
        tokio::spawn(async move {
            info!(interval_secs, "Expiration scheduler started");

            let mut interval =
                tokio::time::interval(Duration::from_secs(interval_secs));
            // first tick fires immediately; run a sweep at startup
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.run_cycle().await {
                            error!(error = %e, "Expiration cycle failed");
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("Expiration scheduler shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// One cycle: a single transactional sweep in the store, then
    /// best-effort device releases outside the transaction.
    pub async fn run_cycle(&self) -> DomainResult<()> {
        let now = Utc::now();
        let sweep = self.store.run_expiration(now).await?;

        for reservation in &sweep.activated {
            info!(reservation_id = %reservation.id, "Auto-activated reservation");
        }
        for reservation in &sweep.completed {
            info!(reservation_id = %reservation.id, "Auto-completed reservation");
        }

        if !sweep.completed.is_empty() {
            counter!("reservations_expired_total").increment(sweep.completed.len() as u64);
        }

        // Batched per reservation; repeats across reservations are harmless
        for reservation in &sweep.completed {
            self.registry
                .push_status(&reservation.device_ids, DeviceStatus::Available)
                .await;
        }

        debug!(
            activated = sweep.activated.len(),
            completed = sweep.completed.len(),
            "Expiration cycle done"
        );
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FakeRegistry, InMemoryStore};
    use crate::domain::{Reservation, ReservationStatus, TimeWindow, TopologyType};
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    fn reservation(
        status: ReservationStatus,
        start_offset_h: i64,
        end_offset_h: i64,
    ) -> Reservation {
        let now = Utc::now();
        let mut r = Reservation::new(
            Uuid::new_v4(),
            vec![Uuid::new_v4(), Uuid::new_v4()],
            TopologyType::Physical,
            TimeWindow::new(
                now + ChronoDuration::hours(start_offset_h),
                now + ChronoDuration::hours(end_offset_h),
            )
            .unwrap(),
            None,
        )
        .unwrap();
        r.status = status;
        r
    }

    fn scheduler(
        rows: Vec<Reservation>,
    ) -> (Arc<InMemoryStore>, Arc<FakeRegistry>, ExpirationScheduler) {
        let store = Arc::new(InMemoryStore::with_rows(rows));
        let registry = Arc::new(FakeRegistry::default());
        let scheduler = ExpirationScheduler::new(store.clone(), registry.clone());
        (store, registry, scheduler)
    }

    #[tokio::test]
    async fn due_pending_becomes_active() {
        let pending = reservation(ReservationStatus::Pending, -1, 3);
        let id = pending.id;
        let (store, registry, scheduler) = scheduler(vec![pending]);

        scheduler.run_cycle().await.unwrap();

        let rows = store.snapshot();
        assert_eq!(rows.iter().find(|r| r.id == id).unwrap().status,
            ReservationStatus::Active);
        // activation releases nothing
        assert!(registry.pushed().is_empty());
    }

    #[tokio::test]
    async fn elapsed_active_completes_and_releases_devices() {
        let active = reservation(ReservationStatus::Active, -3, -1);
        let id = active.id;
        let devices = active.device_ids.clone();
        let (store, registry, scheduler) = scheduler(vec![active]);

        scheduler.run_cycle().await.unwrap();

        let rows = store.snapshot();
        assert_eq!(rows.iter().find(|r| r.id == id).unwrap().status,
            ReservationStatus::Completed);

        let pushes = registry.pushed();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, devices);
        assert_eq!(pushes[0].1, DeviceStatus::Available);
    }

    #[tokio::test]
    async fn future_reservations_are_untouched() {
        let pending = reservation(ReservationStatus::Pending, 1, 3);
        let active = reservation(ReservationStatus::Active, -1, 3);
        let (store, registry, scheduler) = scheduler(vec![pending, active]);

        scheduler.run_cycle().await.unwrap();

        let rows = store.snapshot();
        assert!(rows.iter().any(|r| r.status == ReservationStatus::Pending));
        assert!(rows.iter().any(|r| r.status == ReservationStatus::Active));
        assert!(registry.pushed().is_empty());
    }

    #[tokio::test]
    async fn terminal_reservations_are_untouched() {
        let cancelled = reservation(ReservationStatus::Cancelled, -3, -1);
        let completed = reservation(ReservationStatus::Completed, -3, -1);
        let (store, registry, scheduler) = scheduler(vec![cancelled, completed]);

        scheduler.run_cycle().await.unwrap();

        let rows = store.snapshot();
        assert!(rows.iter().any(|r| r.status == ReservationStatus::Cancelled));
        assert!(rows.iter().any(|r| r.status == ReservationStatus::Completed));
        assert!(registry.pushed().is_empty());
    }

    #[tokio::test]
    async fn completed_reservations_release_per_reservation_batches() {
        let first = reservation(ReservationStatus::Active, -3, -1);
        let second = reservation(ReservationStatus::Active, -4, -2);
        let (_, registry, scheduler) = scheduler(vec![first, second]);

        scheduler.run_cycle().await.unwrap();

        assert_eq!(registry.pushed().len(), 2);
    }

    #[tokio::test]
    async fn loop_stops_on_shutdown() {
        let (_, _, scheduler) = scheduler(vec![]);
        let scheduler = Arc::new(
            scheduler.with_config(ExpirationConfig { interval_secs: 3600 }),
        );
        let shutdown = ShutdownSignal::new();
        let handle = scheduler.start(shutdown.clone());

        // give the task a moment to enter its loop, then stop it
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn zero_interval_does_not_panic_the_loop() {
        let (_, _, scheduler) = scheduler(vec![]);
        let scheduler =
            Arc::new(scheduler.with_config(ExpirationConfig { interval_secs: 0 }));
        let shutdown = ShutdownSignal::new();
        let handle = scheduler.start(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();
        // a panicked task would surface here as a JoinError
        handle.await.unwrap();
    }
}
