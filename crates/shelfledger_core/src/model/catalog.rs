//! Catalog reference data: zones, cells, products and categories.
//!
//! # Responsibility
//! - Define the static data the ledger validates movements against.
//! - Validate admin input before it reaches persistence.
//!
//! # Invariants
//! - A cell address `(zone, row, number)` is unique; row and number start at 1.
//! - `capacity >= 0`; `current_fill` is maintained by the ledger only.
//! - SKUs are globally unique and match `SKU_PATTERN`.

use crate::model::id::{CategoryId, CellId, ProductId, ZoneId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Accepted SKU shape: one leading alphanumeric, then up to 63 of `[A-Za-z0-9._/-]`.
pub const SKU_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._/-]{0,63}$";

static SKU_RE: Lazy<Regex> = Lazy::new(|| Regex::new(SKU_PATTERN).expect("valid sku regex"));

/// Named grouping of cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub description: Option<String>,
}

/// Product grouping used by the catalog only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Addressable storage slot inside a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub zone_id: ZoneId,
    pub row_number: i64,
    pub cell_number: i64,
    /// Units the cell is planned to hold.
    pub capacity: i64,
    /// Sum of inventory quantities in this cell, recomputed on every mutation.
    pub current_fill: i64,
}

impl Cell {
    /// Remaining room before `capacity` is reached; zero when over capacity.
    pub fn free_space(&self) -> i64 {
        (self.capacity - self.current_fill).max(0)
    }
}

/// Catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    /// Unit of measure label (`pcs`, `box`, ...).
    pub unit: String,
    pub category_id: Option<CategoryId>,
}

/// Input for creating or relabelling a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDraft {
    pub name: String,
    pub description: Option<String>,
}

/// Input for creating or updating a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellDraft {
    pub zone_id: ZoneId,
    pub row_number: i64,
    pub cell_number: i64,
    pub capacity: i64,
}

/// Input for creating or updating a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub category_id: Option<CategoryId>,
}

/// Input for creating or updating a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
}

/// Catalog input rejected before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogValidationError {
    BlankName,
    BlankUnit,
    InvalidSku(String),
    NegativeCapacity(i64),
    InvalidCoordinate { row_number: i64, cell_number: i64 },
}

impl Display for CatalogValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name must not be blank"),
            Self::BlankUnit => write!(f, "unit must not be blank"),
            Self::InvalidSku(sku) => write!(f, "sku `{sku}` does not match {SKU_PATTERN}"),
            Self::NegativeCapacity(capacity) => {
                write!(f, "capacity must be >= 0, got {capacity}")
            }
            Self::InvalidCoordinate {
                row_number,
                cell_number,
            } => write!(
                f,
                "cell coordinates start at 1, got row {row_number} number {cell_number}"
            ),
        }
    }
}

impl Error for CatalogValidationError {}

impl ZoneDraft {
    /// Trims text fields and rejects a blank name.
    pub fn normalized(&self) -> Result<Self, CatalogValidationError> {
        Ok(Self {
            name: required_text(&self.name, CatalogValidationError::BlankName)?,
            description: optional_text(self.description.as_deref()),
        })
    }
}

impl CategoryDraft {
    /// Trims text fields and rejects a blank name.
    pub fn normalized(&self) -> Result<Self, CatalogValidationError> {
        Ok(Self {
            name: required_text(&self.name, CatalogValidationError::BlankName)?,
            description: optional_text(self.description.as_deref()),
        })
    }
}

impl CellDraft {
    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        if self.row_number < 1 || self.cell_number < 1 {
            return Err(CatalogValidationError::InvalidCoordinate {
                row_number: self.row_number,
                cell_number: self.cell_number,
            });
        }
        if self.capacity < 0 {
            return Err(CatalogValidationError::NegativeCapacity(self.capacity));
        }
        Ok(())
    }
}

impl ProductDraft {
    /// Trims text fields and checks name, unit and SKU shape.
    pub fn normalized(&self) -> Result<Self, CatalogValidationError> {
        let sku = self.sku.trim();
        if !is_valid_sku(sku) {
            return Err(CatalogValidationError::InvalidSku(sku.to_string()));
        }
        Ok(Self {
            name: required_text(&self.name, CatalogValidationError::BlankName)?,
            sku: sku.to_string(),
            unit: required_text(&self.unit, CatalogValidationError::BlankUnit)?,
            category_id: self.category_id,
        })
    }
}

/// Returns whether `sku` is acceptable as a product SKU.
pub fn is_valid_sku(sku: &str) -> bool {
    SKU_RE.is_match(sku)
}

fn required_text(value: &str, blank: CatalogValidationError) -> Result<String, CatalogValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(blank);
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
