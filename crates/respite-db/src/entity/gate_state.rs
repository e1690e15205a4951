//! gate state entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// gate state database model.
///
/// stores the access gate's persisted state: grant expiry, quota counter
/// and deadlines. there should only ever be one row in this table (id=1).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "gate_state")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// when the current grant ends; null when no grant is active
    pub expiry_time: Option<DateTime<Utc>>,

    /// original grant length in seconds, for ui progress display only
    pub grant_duration_secs: Option<i64>,

    /// free grants consumed in the current quota window
    pub free_grants_used: i64,

    /// when the free-grant counter returns to zero
    pub quota_reset_at: Option<DateTime<Utc>>,

    /// privileged-grant requests are rejected before this time
    pub cooldown_until: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
