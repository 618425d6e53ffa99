//! Conflict detection
//!
//! Given a candidate device set and window, computes which of the requested
//! devices are already committed by a non-terminal reservation over an
//! overlapping half-open window. The store runs this inside the same
//! transaction as the subsequent insert, so check and write cannot be
//! interleaved by another admission for the same devices.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::domain::{Reservation, TimeWindow};

/// Requested devices contended by `existing` reservations over `window`.
///
/// Terminal reservations never conflict. Duplicate ids on either side are
/// tolerated (set semantics). `exclude` skips one reservation id, used for
/// re-checks.
pub fn conflicting_devices(
    requested: &[Uuid],
    window: &TimeWindow,
    existing: &[Reservation],
    exclude: Option<Uuid>,
) -> BTreeSet<Uuid> {
    let requested: BTreeSet<Uuid> = requested.iter().copied().collect();
    let mut contended = BTreeSet::new();

    for reservation in existing {
        if Some(reservation.id) == exclude {
            continue;
        }
        if !reservation.holds_devices() {
            continue;
        }
        if !reservation.window.overlaps(window) {
            continue;
        }
        for device_id in &reservation.device_ids {
            if requested.contains(device_id) {
                contended.insert(*device_id);
            }
        }
    }

    contended
}
