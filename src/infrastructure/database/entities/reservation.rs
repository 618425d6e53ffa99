//! Reservation entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    /// JSON array of device uuid strings, portable across SQLite and
    /// PostgreSQL
    pub device_ids: Json,

    /// Topology class: PHYSICAL or CLOUD
    pub topology_type: String,

    #[sea_orm(nullable)]
    pub purpose: Option<String>,

    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,

    /// Reservation status: PENDING, ACTIVE, COMPLETED, CANCELLED
    pub status: String,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
