//! error types for respite-db.

use thiserror::Error;

/// errors that can occur in the database layer.
#[derive(Debug, Error)]
pub enum Error {
    /// failed to connect to or configure the database.
    #[error("database connection error: {0}")]
    Connection(String),

    /// an underlying sea-orm operation failed.
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// the configured database type is not supported.
    #[error("unsupported database type: {0}")]
    UnsupportedDatabase(String),
}
