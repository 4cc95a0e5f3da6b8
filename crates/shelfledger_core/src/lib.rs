//! Core inventory ledger for shelfledger.
//! This crate is the single source of truth for stock and cell-fill invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::catalog::{
    Category, CategoryDraft, CatalogValidationError, Cell, CellDraft, Product, ProductDraft,
    Zone, ZoneDraft,
};
pub use model::id::{ActorId, BatchId, CategoryId, CellId, OperationId, ProductId, ZoneId};
pub use model::inventory::{CellFill, FillDrift, FillStatus, InventoryRecord, ProductStock};
pub use model::operation::{Operation, OperationQuery, OperationType, TransferLeg};
pub use repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use repo::{EntityRef, RepoError, RepoResult};
pub use service::allocation::Allocation;
pub use service::catalog_service::CatalogService;
pub use service::error::{CatalogError, LedgerError};
pub use service::ledger_service::{LedgerService, TransferOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
