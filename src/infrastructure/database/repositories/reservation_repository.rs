//! SeaORM implementation of ReservationRepository
//!
//! Admission runs inside one transaction: per-device advisory locks are
//! taken in sorted order (deadlock-free across callers), the overlap query
//! and conflict computation follow, and the insert commits before any lock
//! is released. Cancel/release and the expiration sweep are transactional
//! for the same reason: no writer may interleave between check and write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::application::conflicts::conflicting_devices;
use crate::domain::{
    DomainError, DomainResult, ExpirationSweep, Reservation, ReservationRepository,
    ReservationStatus, StatusChange, TimeWindow, TopologyType,
};
use crate::infrastructure::database::entities::reservation;

const NON_TERMINAL: [&str; 2] = ["PENDING", "ACTIVE"];

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    let device_ids: Vec<Uuid> = serde_json::from_value(m.device_ids)
        .map_err(|e| DomainError::Storage(format!("corrupt device_ids column: {e}")))?;
    Ok(Reservation {
        id: m.id,
        user_id: m.user_id,
        device_ids,
        topology_type: TopologyType::from_str(&m.topology_type),
        purpose: m.purpose,
        window: TimeWindow {
            start: m.start_time,
            end: m.end_time,
        },
        status: ReservationStatus::from_str(&m.status),
        created_at: m.created_at,
    })
}

fn domain_to_active_model(r: &Reservation) -> reservation::ActiveModel {
    let device_ids: Vec<String> = r.device_ids.iter().map(Uuid::to_string).collect();
    reservation::ActiveModel {
        id: Set(r.id),
        user_id: Set(r.user_id),
        device_ids: Set(serde_json::json!(device_ids)),
        topology_type: Set(r.topology_type.as_str().to_string()),
        purpose: Set(r.purpose.clone()),
        start_time: Set(r.window.start),
        end_time: Set(r.window.end),
        status: Set(r.status.as_str().to_string()),
        created_at: Set(r.created_at),
    }
}

// ── Per-device advisory locks ───────────────────────────────────

/// Derive a stable 64-bit advisory-lock key from a device id.
fn advisory_lock_key(device_id: &str) -> i64 {
    let digest = Sha256::digest(device_id.as_bytes());
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(buf)
}

/// Acquire `pg_advisory_xact_lock` per device, sorted and deduplicated so
/// two requests with overlapping device sets always lock in the same order.
/// Locks auto-release on commit/rollback.
///
/// On SQLite this is a no-op: the pool runs a single connection, so all
/// writes are globally serialized by the engine itself.
async fn acquire_device_locks(
    txn: &DatabaseTransaction,
    device_ids: &[Uuid],
) -> DomainResult<()> {
    if txn.get_database_backend() != DatabaseBackend::Postgres {
        return Ok(());
    }
    let mut keys: Vec<String> = device_ids.iter().map(Uuid::to_string).collect();
    keys.sort();
    keys.dedup();
    for key in keys {
        txn.execute(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "SELECT pg_advisory_xact_lock($1)",
            [advisory_lock_key(&key).into()],
        ))
        .await?;
    }
    Ok(())
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn admit(&self, candidate: Reservation) -> DomainResult<Reservation> {
        debug!(reservation_id = %candidate.id, "Admitting reservation");

        let txn = self.db.begin().await?;
        acquire_device_locks(&txn, &candidate.device_ids).await?;

        // SQL narrows to non-terminal rows overlapping the half-open window;
        // the pure detector decides per device.
        let overlapping = reservation::Entity::find()
            .filter(reservation::Column::Status.is_in(NON_TERMINAL))
            .filter(reservation::Column::StartTime.lt(candidate.window.end))
            .filter(reservation::Column::EndTime.gt(candidate.window.start))
            .all(&txn)
            .await?;
        let existing: Vec<Reservation> = overlapping
            .into_iter()
            .map(model_to_domain)
            .collect::<DomainResult<_>>()?;

        let contended =
            conflicting_devices(&candidate.device_ids, &candidate.window, &existing, None);
        if !contended.is_empty() {
            txn.rollback().await?;
            return Err(DomainError::Conflict {
                device_ids: contended.into_iter().collect(),
            });
        }

        domain_to_active_model(&candidate).insert(&txn).await?;
        txn.commit().await?;
        Ok(candidate)
    }

    async fn find_by_id_for_owner(
        &self,
        id: Uuid,
        owner: Uuid,
    ) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find_by_id(id)
            .filter(reservation::Column::UserId.eq(owner))
            .one(&self.db)
            .await?;
        model.map(model_to_domain).transpose()
    }

    async fn list_for_owner(&self, owner: Uuid) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(owner))
            .order_by_desc(reservation::Column::CreatedAt)
            .all(&self.db)
            .await?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn cancel(&self, id: Uuid, owner: Uuid) -> DomainResult<Option<StatusChange>> {
        self.transition(id, owner, Reservation::cancel).await
    }

    async fn release(&self, id: Uuid, owner: Uuid) -> DomainResult<Option<StatusChange>> {
        self.transition(id, owner, Reservation::release).await
    }

    async fn run_expiration(&self, now: DateTime<Utc>) -> DomainResult<ExpirationSweep> {
        let txn = self.db.begin().await?;
        let mut sweep = ExpirationSweep::default();

        let due = reservation::Entity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::Pending.as_str()))
            .filter(reservation::Column::StartTime.lte(now))
            .all(&txn)
            .await?;
        for model in due {
            let mut r = model_to_domain(model.clone())?;
            r.activate();
            update_status(&txn, model, r.status).await?;
            sweep.activated.push(r);
        }

        let elapsed = reservation::Entity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .filter(reservation::Column::EndTime.lte(now))
            .all(&txn)
            .await?;
        for model in elapsed {
            let mut r = model_to_domain(model.clone())?;
            r.complete();
            update_status(&txn, model, r.status).await?;
            sweep.completed.push(r);
        }

        txn.commit().await?;
        Ok(sweep)
    }
}

impl SeaOrmReservationRepository {
    /// Read-check-write in one transaction; the state machine decides
    /// whether a transition happens.
    async fn transition(
        &self,
        id: Uuid,
        owner: Uuid,
        apply: fn(&mut Reservation) -> bool,
    ) -> DomainResult<Option<StatusChange>> {
        let txn = self.db.begin().await?;
        let Some(model) = reservation::Entity::find_by_id(id)
            .filter(reservation::Column::UserId.eq(owner))
            .one(&txn)
            .await?
        else {
            txn.commit().await?;
            return Ok(None);
        };

        let mut reservation = model_to_domain(model.clone())?;
        let changed = apply(&mut reservation);
        if changed {
            update_status(&txn, model, reservation.status).await?;
        }
        txn.commit().await?;
        Ok(Some(StatusChange {
            reservation,
            changed,
        }))
    }
}

async fn update_status(
    txn: &DatabaseTransaction,
    model: reservation::Model,
    status: ReservationStatus,
) -> DomainResult<()> {
    let mut active: reservation::ActiveModel = model.into();
    active.status = Set(status.as_str().to_string());
    active.update(txn).await?;
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::migrator::Migrator;
    use chrono::Duration;
    use sea_orm::{ConnectOptions, Database};
    use sea_orm_migration::MigratorTrait;

    async fn test_repo() -> SeaOrmReservationRepository {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SeaOrmReservationRepository::new(db)
    }

    fn window(offset_h: i64, len_h: i64) -> TimeWindow {
        let start = Utc::now() + Duration::hours(offset_h);
        TimeWindow::new(start, start + Duration::hours(len_h)).unwrap()
    }

    fn reservation(owner: Uuid, devices: &[Uuid], window: TimeWindow) -> Reservation {
        Reservation::new(
            owner,
            devices.to_vec(),
            TopologyType::Physical,
            window,
            Some("persistence test".into()),
        )
        .unwrap()
    }

    #[test]
    fn lock_keys_are_stable() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(advisory_lock_key(&id), advisory_lock_key(&id));
        assert_ne!(
            advisory_lock_key(&id),
            advisory_lock_key(&Uuid::new_v4().to_string())
        );
    }

    #[tokio::test]
    async fn admit_persists_and_reads_back() {
        let repo = test_repo().await;
        let owner = Uuid::new_v4();
        let devices = [Uuid::new_v4(), Uuid::new_v4()];
        let r = reservation(owner, &devices, window(1, 2));
        let id = r.id;

        repo.admit(r).await.unwrap();

        let found = repo.find_by_id_for_owner(id, owner).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.device_ids, devices.to_vec());
        assert_eq!(found.status, ReservationStatus::Active);
        assert_eq!(found.topology_type, TopologyType::Physical);
    }

    #[tokio::test]
    async fn overlapping_admission_is_rejected() {
        let repo = test_repo().await;
        let device = Uuid::new_v4();
        repo.admit(reservation(Uuid::new_v4(), &[device], window(1, 2)))
            .await
            .unwrap();

        let err = repo
            .admit(reservation(Uuid::new_v4(), &[device], window(2, 2)))
            .await
            .unwrap_err();
        match err {
            DomainError::Conflict { device_ids } => assert_eq!(device_ids, vec![device]),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn back_to_back_admissions_both_persist() {
        let repo = test_repo().await;
        let device = Uuid::new_v4();
        let first = window(1, 2);
        let second = TimeWindow::new(first.end, first.end + Duration::hours(1)).unwrap();

        repo.admit(reservation(Uuid::new_v4(), &[device], first))
            .await
            .unwrap();
        repo.admit(reservation(Uuid::new_v4(), &[device], second))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_rows_do_not_block_admission() {
        let repo = test_repo().await;
        let owner = Uuid::new_v4();
        let device = Uuid::new_v4();
        let win = window(1, 2);
        let r = reservation(owner, &[device], win);
        let id = r.id;
        repo.admit(r).await.unwrap();

        let change = repo.cancel(id, owner).await.unwrap().unwrap();
        assert!(change.changed);

        repo.admit(reservation(Uuid::new_v4(), &[device], win))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_is_idempotent_in_storage() {
        let repo = test_repo().await;
        let owner = Uuid::new_v4();
        let r = reservation(owner, &[Uuid::new_v4()], window(1, 2));
        let id = r.id;
        repo.admit(r).await.unwrap();

        assert!(repo.cancel(id, owner).await.unwrap().unwrap().changed);
        let second = repo.cancel(id, owner).await.unwrap().unwrap();
        assert!(!second.changed);
        assert_eq!(second.reservation.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn ownership_scopes_reads_and_writes() {
        let repo = test_repo().await;
        let owner = Uuid::new_v4();
        let r = reservation(owner, &[Uuid::new_v4()], window(1, 2));
        let id = r.id;
        repo.admit(r).await.unwrap();

        let stranger = Uuid::new_v4();
        assert!(repo.find_by_id_for_owner(id, stranger).await.unwrap().is_none());
        assert!(repo.cancel(id, stranger).await.unwrap().is_none());
        assert!(repo.release(id, stranger).await.unwrap().is_none());
        assert!(repo.list_for_owner(stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expiration_sweep_promotes_and_retires() {
        let repo = test_repo().await;
        let now = Utc::now();

        let mut pending = reservation(
            Uuid::new_v4(),
            &[Uuid::new_v4()],
            TimeWindow::new(now - Duration::hours(1), now + Duration::hours(1)).unwrap(),
        );
        pending.status = ReservationStatus::Pending;
        let pending_id = pending.id;

        let elapsed = reservation(
            Uuid::new_v4(),
            &[Uuid::new_v4()],
            TimeWindow::new(now - Duration::hours(3), now - Duration::hours(1)).unwrap(),
        );
        let elapsed_id = elapsed.id;

        let future = reservation(Uuid::new_v4(), &[Uuid::new_v4()], window(1, 2));
        let future_id = future.id;

        // insert directly: admit() would reject nothing here, but the sweep
        // must see rows exactly as stored
        for r in [&pending, &elapsed, &future] {
            domain_to_active_model(r).insert(&repo.db).await.unwrap();
        }

        let sweep = repo.run_expiration(now).await.unwrap();
        assert_eq!(sweep.activated.len(), 1);
        assert_eq!(sweep.activated[0].id, pending_id);
        assert_eq!(sweep.completed.len(), 1);
        assert_eq!(sweep.completed[0].id, elapsed_id);

        let still_active = repo
            .find_by_id_for_owner(future_id, future.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(still_active.status, ReservationStatus::Active);
    }
}
