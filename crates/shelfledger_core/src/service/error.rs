//! Service-level error taxonomy.
//!
//! # Responsibility
//! - Report ledger rejections with enough context for the caller to retry
//!   elsewhere (which cell, how much was available).
//! - Keep storage failures distinct from business rejections.
//!
//! # Invariants
//! - Any error returned by a ledger mutation means nothing was committed.

use crate::model::catalog::CatalogValidationError;
use crate::model::id::{CellId, ProductId};
use crate::repo::{EntityRef, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from ledger mutations and reads.
#[derive(Debug)]
pub enum LedgerError {
    /// Referenced cell, product or inventory record is absent.
    NotFound(EntityRef),
    /// Quantity is non-positive where positive is required, or negative.
    InvalidQuantity { quantity: i64 },
    /// Requested quantity exceeds what is available.
    ///
    /// `cell` is `None` for pooled withdrawals, where `available` is the
    /// product total across every cell.
    InsufficientStock {
        product: ProductId,
        cell: Option<CellId>,
        requested: i64,
        available: i64,
    },
    /// Destination cell cannot hold the transferred amount.
    CapacityExceeded {
        cell: CellId,
        capacity: i64,
        current_fill: i64,
        requested: i64,
    },
    /// Transfer source and destination are the same cell.
    SameCell(CellId),
    /// Storage-layer failure surfaced to the caller as-is.
    Storage(RepoError),
}

impl LedgerError {
    /// Whether this is a business rejection rather than a storage failure.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }

    /// Stable short code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidQuantity { .. } => "invalid_quantity",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::SameCell(_) => "same_cell",
            Self::Storage(_) => "storage",
        }
    }
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::InvalidQuantity { quantity } => write!(f, "invalid quantity: {quantity}"),
            Self::InsufficientStock {
                product,
                cell: Some(cell),
                requested,
                available,
            } => write!(
                f,
                "insufficient stock of product {product} in cell {cell}: requested {requested}, available {available}"
            ),
            Self::InsufficientStock {
                product,
                cell: None,
                requested,
                available,
            } => write!(
                f,
                "insufficient stock of product {product}: requested {requested}, available {available}"
            ),
            Self::CapacityExceeded {
                cell,
                capacity,
                current_fill,
                requested,
            } => write!(
                f,
                "cell {cell} cannot take {requested} more units: fill {current_fill} of {capacity}"
            ),
            Self::SameCell(cell) => write!(f, "cannot transfer cell {cell} onto itself"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LedgerError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(entity) => Self::NotFound(entity),
            other => Self::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.into())
    }
}

/// Errors from catalog administration.
#[derive(Debug)]
pub enum CatalogError {
    Validation(CatalogValidationError),
    NotFound(EntityRef),
    /// A uniqueness rule (SKU, category name, cell address) was violated.
    Conflict(String),
    /// Entity is still referenced and cannot be deleted.
    InUse { entity: EntityRef, by: &'static str },
    /// Capacity update would leave the cell over capacity.
    CapacityBelowFill {
        cell: CellId,
        capacity: i64,
        current_fill: i64,
    },
    Storage(RepoError),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
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
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CatalogValidationError> for CatalogError {
    fn from(value: CatalogValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CatalogError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(entity) => Self::NotFound(entity),
            RepoError::Conflict(message) => Self::Conflict(message),
            RepoError::InUse { entity, by } => Self::InUse { entity, by },
            RepoError::CapacityBelowFill {
                cell,
                capacity,
                current_fill,
            } => Self::CapacityBelowFill {
                cell,
                capacity,
                current_fill,
            },
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LedgerError;
    use crate::model::id::{CellId, ProductId};
    use crate::repo::{EntityRef, RepoError};

    #[test]
    fn repo_not_found_becomes_ledger_not_found() {
        let err: LedgerError = RepoError::NotFound(EntityRef::Cell(CellId::new(4))).into();
        assert!(matches!(err, LedgerError::NotFound(EntityRef::Cell(id)) if id.get() == 4));
        assert!(err.is_rejection());
    }

    #[test]
    fn storage_failures_are_not_rejections() {
        let err: LedgerError = RepoError::InvalidData("bad row".to_string()).into();
        assert!(!err.is_rejection());
        assert_eq!(err.code(), "storage");
    }

    #[test]
    fn pooled_shortfall_message_omits_cell() {
        let err = LedgerError::InsufficientStock {
            product: ProductId::new(2),
            cell: None,
            requested: 10,
            available: 8,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock of product 2: requested 10, available 8"
        );
    }
}
