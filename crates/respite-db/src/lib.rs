//! database layer for respite.
//!
//! this crate provides persistent storage for the access gate's state:
//! grant expiry, the free-grant quota counter and its reset deadline, and
//! the privileged-grant cooldown deadline. everything lives in a single
//! `gate_state` row that survives process restarts.

#![warn(missing_docs)]

mod entity;
mod error;
mod migration;

pub use error::Error;

use std::future::Future;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, Database as SeaOrmDatabase,
    DatabaseConnection, EntityTrait,
};
use sea_orm_migration::MigratorTrait;

use respite_types::DatabaseConfig;

/// the gate's persisted state.
///
/// one logical record, stored as the single row with id=1. the `active`
/// flag of the gate is never stored - it is derived from `expiry_time`
/// against the clock on every read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GateRecord {
    /// database id (always 1 for the singleton row).
    pub id: u64,
    /// when the current grant ends; `None` when no grant is active.
    pub expiry_time: Option<DateTime<Utc>>,
    /// original grant length in seconds, kept for ui progress display.
    pub grant_duration_secs: Option<i64>,
    /// free grants consumed in the current quota window.
    pub free_grants_used: u32,
    /// when the free-grant counter returns to zero.
    pub quota_reset_at: Option<DateTime<Utc>>,
    /// privileged-grant requests are rejected before this time.
    pub cooldown_until: Option<DateTime<Utc>>,
    /// when this record was created.
    pub created_at: DateTime<Utc>,
    /// when this record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl From<entity::gate_state::Model> for GateRecord {
    fn from(model: entity::gate_state::Model) -> Self {
        Self {
            id: model.id as u64,
            expiry_time: model.expiry_time,
            grant_duration_secs: model.grant_duration_secs,
            free_grants_used: model.free_grants_used.max(0) as u32,
            quota_reset_at: model.quota_reset_at,
            cooldown_until: model.cooldown_until,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&GateRecord> for entity::gate_state::ActiveModel {
    fn from(record: &GateRecord) -> Self {
        Self {
            id: if record.id == 0 {
                NotSet
            } else {
                Set(record.id as i64)
            },
            expiry_time: Set(record.expiry_time),
            grant_duration_secs: Set(record.grant_duration_secs),
            free_grants_used: Set(i64::from(record.free_grants_used)),
            quota_reset_at: Set(record.quota_reset_at),
            cooldown_until: Set(record.cooldown_until),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        }
    }
}

/// result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// storage trait for the gate's durable state.
///
/// this trait abstracts over database backends (sqlite, postgresql) and
/// lets tests substitute a failing store. the gate is the sole writer;
/// a write failure must surface so the transition can be aborted.
pub trait GateStore: Send + Sync {
    /// ping the database to verify connectivity.
    ///
    /// returns `Ok(())` if the database is reachable, `Err` otherwise.
    /// used for health checks with a recommended timeout of 1 second.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// get the current gate state, or `None` if not initialised.
    fn get_gate_state(&self) -> impl Future<Output = Result<Option<GateRecord>>> + Send;

    /// create or update the gate state. returns the stored record.
    fn upsert_gate_state(&self, record: &GateRecord)
    -> impl Future<Output = Result<GateRecord>> + Send;
}

/// database connection for persistent gate storage.
#[derive(Clone)]
pub struct RespiteDb {
    conn: DatabaseConnection,
}

impl RespiteDb {
    /// create a new database connection from config.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let url = Self::build_connection_url(config)?;
        let conn: DatabaseConnection = SeaOrmDatabase::connect(&url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };

        // enable WAL mode for sqlite if configured
        if config.db_type == "sqlite" && config.write_ahead_log {
            db.enable_wal_mode().await?;
        }

        db.migrate().await?;
        Ok(db)
    }

    /// create an in-memory sqlite database, for tests.
    pub async fn new_in_memory() -> Result<Self> {
        // a single pooled connection, so every clone of this handle sees
        // the same in-memory database
        let mut options = sea_orm::ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let conn: DatabaseConnection = SeaOrmDatabase::connect(options)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };
        db.migrate().await?;
        Ok(db)
    }

    /// run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        migration::Migrator::up(&self.conn, None)
            .await
            .map_err(Error::Database)
    }

    /// enable write-ahead logging mode for sqlite.
    ///
    /// WAL mode allows concurrent reads during writes. must be called
    /// before any writes.
    async fn enable_wal_mode(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;
        self.conn
            .execute_unprepared("PRAGMA journal_mode=WAL")
            .await
            .map_err(|e| Error::Connection(format!("failed to enable WAL mode: {}", e)))?;
        tracing::info!("sqlite WAL mode enabled");
        Ok(())
    }

    /// build a sea-orm connection url from database config.
    fn build_connection_url(config: &DatabaseConfig) -> Result<String> {
        match config.db_type.as_str() {
            "sqlite" => {
                // accept both bare paths and full sqlite:// urls
                if config.connection_string.starts_with("sqlite:") {
                    Ok(config.connection_string.clone())
                } else {
                    Ok(format!("sqlite://{}?mode=rwc", config.connection_string))
                }
            }
            "postgres" => Ok(config.connection_string.clone()),
            other => Err(Error::UnsupportedDatabase(other.to_string())),
        }
    }
}

impl GateStore for RespiteDb {
    async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get_gate_state(&self) -> Result<Option<GateRecord>> {
        let result = entity::gate_state::Entity::find_by_id(1i64)
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn upsert_gate_state(&self, record: &GateRecord) -> Result<GateRecord> {
        // check if state exists
        let existing = entity::gate_state::Entity::find_by_id(1i64)
            .one(&self.conn)
            .await?;

        let mut model: entity::gate_state::ActiveModel = record.into();
        model.id = Set(1); // always use id 1 for the singleton row
        model.updated_at = Set(Utc::now());

        let result = if existing.is_some() {
            model.update(&self.conn).await?
        } else {
            model.created_at = Set(Utc::now());
            model.insert(&self.conn).await?
        };

        Ok(result.into())
    }
}
