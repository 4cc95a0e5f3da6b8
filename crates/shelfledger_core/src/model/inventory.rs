//! Inventory state owned by the ledger.
//!
//! # Invariants
//! - At most one `InventoryRecord` per `(cell, product)`.
//! - A persisted record always has `quantity > 0`; draining to zero deletes it.

use crate::model::id::{CellId, ProductId};
use serde::{Deserialize, Serialize};

/// Quantity of one product held in one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub cell_id: CellId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Unix epoch milliseconds of the first receipt into this cell.
    pub placed_at: i64,
}

/// Occupancy classification of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStatus {
    Empty,
    Partial,
    Full,
}

/// Capacity snapshot of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFill {
    pub cell_id: CellId,
    pub capacity: i64,
    pub current_fill: i64,
}

impl CellFill {
    pub fn free_space(&self) -> i64 {
        (self.capacity - self.current_fill).max(0)
    }

    /// Whether `quantity` more units fit without exceeding capacity.
    pub fn can_accept(&self, quantity: i64) -> bool {
        self.current_fill
            .checked_add(quantity)
            .is_some_and(|after| after <= self.capacity)
    }

    pub fn status(&self) -> FillStatus {
        if self.current_fill == 0 {
            FillStatus::Empty
        } else if self.current_fill < self.capacity {
            FillStatus::Partial
        } else {
            FillStatus::Full
        }
    }
}

/// Total on-hand stock of one product across all cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStock {
    pub product_id: ProductId,
    pub total_quantity: i64,
    /// Number of cells holding the product.
    pub locations: i64,
}

/// A cell whose stored fill disagrees with the sum of its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillDrift {
    pub cell_id: CellId,
    pub stored_fill: i64,
    pub actual_fill: i64,
}
