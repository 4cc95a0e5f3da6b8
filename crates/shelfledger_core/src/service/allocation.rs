//! Allocation planning for withdrawals and transfers.
//!
//! # Responsibility
//! - Turn one logical request into per-cell deltas.
//! - Decide feasibility from a read snapshot, before any write happens.
//!
//! # Invariants
//! - Planning is pure: no storage access, no side effects.
//! - Pooled plans visit cells in ascending `CellId` order and take
//!   `min(cell quantity, remaining)` from each until the request is met.
//! - A successful plan sums exactly to the requested quantity and never
//!   takes more than a cell holds.

use crate::model::id::{CellId, ProductId};
use crate::model::inventory::{CellFill, InventoryRecord};
use crate::service::error::LedgerError;
use serde::{Deserialize, Serialize};

/// Quantity taken from one cell by a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub cell_id: CellId,
    pub quantity: i64,
}

/// Rejects quantities that are not strictly positive.
pub fn ensure_positive(quantity: i64) -> Result<(), LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::InvalidQuantity { quantity });
    }
    Ok(())
}

/// Plans a withdrawal from one named cell.
///
/// `record` is the current `(cell, product)` record, if any.
pub fn plan_explicit(
    product: ProductId,
    cell: CellId,
    requested: i64,
    record: Option<&InventoryRecord>,
) -> Result<Vec<Allocation>, LedgerError> {
    ensure_positive(requested)?;
    let available = record.map_or(0, |record| record.quantity);
    if available < requested {
        return Err(LedgerError::InsufficientStock {
            product,
            cell: Some(cell),
            requested,
            available,
        });
    }
    Ok(vec![Allocation {
        cell_id: cell,
        quantity: requested,
    }])
}

/// Plans a withdrawal pooled across every cell holding `product`.
///
/// Fails with the total available quantity when the request cannot be met.
pub fn plan_pooled(
    product: ProductId,
    requested: i64,
    records: &[InventoryRecord],
) -> Result<Vec<Allocation>, LedgerError> {
    ensure_positive(requested)?;

    let mut candidates: Vec<&InventoryRecord> = records
        .iter()
        .filter(|record| record.product_id == product && record.quantity > 0)
        .collect();
    candidates.sort_by_key(|record| record.cell_id);

    let mut plan = Vec::new();
    let mut remaining = requested;
    for record in &candidates {
        if remaining == 0 {
            break;
        }
        let take = record.quantity.min(remaining);
        plan.push(Allocation {
            cell_id: record.cell_id,
            quantity: take,
        });
        remaining -= take;
    }

    if remaining > 0 {
        let available = candidates
            .iter()
            .fold(0_i64, |total, record| total.saturating_add(record.quantity));
        return Err(LedgerError::InsufficientStock {
            product,
            cell: None,
            requested,
            available,
        });
    }
    Ok(plan)
}

/// Checks that `quantity` of `product` can move from `from` to `to`.
///
/// Order of checks: positive quantity, distinct cells, source stock, then
/// destination capacity.
pub fn check_transfer(
    product: ProductId,
    quantity: i64,
    from: CellId,
    source: Option<&InventoryRecord>,
    to: &CellFill,
) -> Result<(), LedgerError> {
    ensure_positive(quantity)?;
    if from == to.cell_id {
        return Err(LedgerError::SameCell(from));
    }

    let available = source.map_or(0, |record| record.quantity);
    if available < quantity {
        return Err(LedgerError::InsufficientStock {
            product,
            cell: Some(from),
            requested: quantity,
            available,
        });
    }

    if !to.can_accept(quantity) {
        return Err(LedgerError::CapacityExceeded {
            cell: to.cell_id,
            capacity: to.capacity,
            current_fill: to.current_fill,
            requested: quantity,
        });
    }
    Ok(())
}
