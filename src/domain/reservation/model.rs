//! Reservation domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::device::TopologyType;
use crate::domain::{DomainError, DomainResult};

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Admitted but not yet started
    Pending,
    /// Currently holding its devices
    Active,
    /// Window elapsed or released early (terminal)
    Completed,
    /// Cancelled by the owner (terminal)
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "PENDING" => Self::Pending,
            "ACTIVE" => Self::Active,
            "COMPLETED" => Self::Completed,
            _ => Self::Cancelled,
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Rejects equal or inverted bounds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if end <= start {
            return Err(DomainError::Validation(
                "end_time must be after start_time".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// `[s1,e1)` and `[s2,e2)` overlap iff `s1 < e2 && s2 < e1`.
    /// A window ending exactly when another starts does not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Exclusive booking of a device set over a time window
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    /// Unique reservation ID
    pub id: Uuid,
    /// Owning user (from the caller's verified credential)
    pub user_id: Uuid,
    /// Reserved devices; order carries no meaning
    pub device_ids: Vec<Uuid>,
    /// Homogeneous topology class, derived from device descriptors
    pub topology_type: TopologyType,
    pub purpose: Option<String>,
    pub window: TimeWindow,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Build a new ACTIVE reservation. The device set must be non-empty and
    /// the window valid; topology homogeneity is checked by the caller
    /// against fetched descriptors.
    pub fn new(
        user_id: Uuid,
        device_ids: Vec<Uuid>,
        topology_type: TopologyType,
        window: TimeWindow,
        purpose: Option<String>,
    ) -> DomainResult<Self> {
        if device_ids.is_empty() {
            return Err(DomainError::Validation(
                "At least one device must be specified".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            device_ids,
            topology_type,
            purpose,
            window,
            status: ReservationStatus::Active,
            created_at: Utc::now(),
        })
    }

    /// Cancel unless already terminal. Returns whether a transition happened.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ReservationStatus::Cancelled;
        true
    }

    /// Early release: only ACTIVE moves to COMPLETED.
    pub fn release(&mut self) -> bool {
        if self.status != ReservationStatus::Active {
            return false;
        }
        self.status = ReservationStatus::Completed;
        true
    }

    /// Scheduler promotion: PENDING moves to ACTIVE once its start elapsed.
    pub fn activate(&mut self) -> bool {
        if self.status != ReservationStatus::Pending {
            return false;
        }
        self.status = ReservationStatus::Active;
        true
    }

    /// Scheduler retirement: ACTIVE moves to COMPLETED once its end elapsed.
    pub fn complete(&mut self) -> bool {
        if self.status != ReservationStatus::Active {
            return false;
        }
        self.status = ReservationStatus::Completed;
        true
    }

    /// Still counts toward double-booking checks
    pub fn holds_devices(&self) -> bool {
        !self.status.is_terminal()
    }
}

// ── Tests ──────────────────────────────────────────────────────
