//! # Store Error Types
//!
//! Error types for storage operations and the transactional engine.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds context and categorization            │
//! │       │                                                                 │
//! │       ├── Core(..)          domain rejection, show per-kind message    │
//! │       ├── StockConflict     lost a stock race - RETRY the finalize     │
//! │       └── everything else   infrastructure failure - surface it        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `StockConflict` is the only kind a caller may safely retry verbatim;
//! every other rejection needs new user input, and storage failures are
//! surfaced, never swallowed.

use thiserror::Error;

use ludo_core::CoreError;

/// Storage and engine operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A business rule rejection bubbled through a storage operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The conditional stock decrement matched zero rows for a product
    /// that still exists: another terminal consumed the stock between
    /// cart validation and commit.
    ///
    /// ## Recovery
    /// Retry the whole finalize - never adjust and resubmit a partial
    /// operation. The rebuilt cart will see the fresh stock level.
    #[error("Stock changed for {name} while finalizing: available {available}, requested {requested}")]
    StockConflict {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Entity not found in the database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Month consolidation aborted because the export step failed;
    /// nothing was purged.
    #[error("Export failed, consolidation aborted: {0}")]
    ExportAborted(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the failed operation may be retried verbatim.
    ///
    /// True only for [`StoreError::StockConflict`]: the caller lost a
    /// stock race and the same finalize, re-validated against fresh
    /// stock, is the correct recovery. Every other kind needs new input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::StockConflict { .. })
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → StoreError::NotFound
/// sqlx::Error::Database       → StoreError::QueryFailed (message kept)
/// sqlx::Error::PoolTimedOut   → StoreError::PoolExhausted
/// Other                       → StoreError::Internal
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => StoreError::QueryFailed(db_err.message().to_string()),

            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,

            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("Pool is closed".to_string()),

            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
