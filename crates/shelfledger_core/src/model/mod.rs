//! Ledger domain model.
//!
//! # Responsibility
//! - Define the catalog reference data (zones, cells, products, categories).
//! - Define the authoritative inventory shape and the operation log entry.
//!
//! # Invariants
//! - Every persisted entity is identified by a typed row id.
//! - `Cell::current_fill` is derived state; nothing outside the ledger sets it.
//! - Operation log entries are immutable once written.

pub mod catalog;
pub mod id;
pub mod inventory;
pub mod operation;
