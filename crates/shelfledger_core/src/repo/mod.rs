//! Repository layer: SQLite persistence for catalog, inventory and log.
//!
//! # Responsibility
//! - Keep SQL details out of the ledger and catalog services.
//! - Translate constraint failures into semantic errors.
//!
//! # Invariants
//! - Inventory and operation-log writes happen only through the primitives in
//!   `inventory_repo` / `operation_repo`, and only inside a ledger transaction.
//! - Read paths reject undecodable persisted rows instead of masking them.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::catalog::CatalogValidationError;
use crate::model::id::{CategoryId, CellId, OperationId, ProductId, ZoneId};
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod catalog_repo;
pub mod inventory_repo;
pub mod operation_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Reference to a persisted entity, used in not-found and in-use errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Zone(ZoneId),
    Cell(CellId),
    Product(ProductId),
    Category(CategoryId),
    Record { cell: CellId, product: ProductId },
    Operation(OperationId),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zone(id) => write!(f, "zone {id}"),
            Self::Cell(id) => write!(f, "cell {id}"),
            Self::Product(id) => write!(f, "product {id}"),
            Self::Category(id) => write!(f, "category {id}"),
            Self::Record { cell, product } => {
                write!(f, "inventory record (cell {cell}, product {product})")
            }
            Self::Operation(id) => write!(f, "operation {id}"),
        }
    }
}

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Validation(CatalogValidationError),
    NotFound(EntityRef),
    /// A uniqueness constraint rejected the write.
    Conflict(String),
    /// The entity is still referenced by `by`.
    InUse { entity: EntityRef, by: &'static str },
    /// A cell update would set capacity below what the cell already holds.
    CapacityBelowFill {
        cell: CellId,
        capacity: i64,
        current_fill: i64,
    },
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::InUse { entity, by } => write!(f, "{entity} is still referenced by {by}"),
            Self::CapacityBelowFill {
                cell,
                capacity,
                current_fill,
            } => write!(
                f,
                "cell {cell} holds {current_fill} units; capacity {capacity} is too small"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "ledger requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<CatalogValidationError> for RepoError {
    fn from(value: CatalogValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Fails unless `conn` has been migrated by this binary.
pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

/// Maps a UNIQUE violation to `RepoError::Conflict`, passing other errors through.
pub(crate) fn unique_conflict(err: rusqlite::Error, message: impl FnOnce() -> String) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepoError::Conflict(message())
        }
        _ => err.into(),
    }
}
