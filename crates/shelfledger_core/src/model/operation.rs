//! Operation log entry model.
//!
//! # Responsibility
//! - Describe one committed stock movement against one cell.
//! - Describe history filters used by audit readers.
//!
//! # Invariants
//! - Entries are append-only; there is no update or delete path.
//! - Only `Transfer` entries carry a counterpart cell and a leg.
//! - `Adjust` records the resulting quantity; every other kind records the
//!   moved amount.

use crate::model::id::{ActorId, BatchId, CellId, OperationId, ProductId};
use serde::{Deserialize, Serialize};

/// Kind of committed stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Receive,
    Withdraw,
    Transfer,
    Adjust,
    Remove,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Receive => "RECEIVE",
            Self::Withdraw => "WITHDRAW",
            Self::Transfer => "TRANSFER",
            Self::Adjust => "ADJUST",
            Self::Remove => "REMOVE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "RECEIVE" => Some(Self::Receive),
            "WITHDRAW" => Some(Self::Withdraw),
            "TRANSFER" => Some(Self::Transfer),
            "ADJUST" => Some(Self::Adjust),
            "REMOVE" => Some(Self::Remove),
            _ => None,
        }
    }
}

/// Which side of a transfer an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferLeg {
    /// Stock left `cell_id` for `counterpart_cell_id`.
    Out,
    /// Stock arrived at `cell_id` from `counterpart_cell_id`.
    In,
}

impl TransferLeg {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Out => "out",
            Self::In => "in",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "out" => Some(Self::Out),
            "in" => Some(Self::In),
            _ => None,
        }
    }
}

/// One committed entry in the operation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    /// Shared by every entry written by the same ledger request.
    pub batch_id: BatchId,
    #[serde(rename = "type")]
    pub kind: OperationType,
    pub product_id: ProductId,
    pub cell_id: CellId,
    pub counterpart_cell_id: Option<CellId>,
    pub transfer_leg: Option<TransferLeg>,
    pub quantity: i64,
    pub actor_id: ActorId,
    /// Unix epoch milliseconds assigned by the store at append time.
    pub created_at: i64,
}

/// Entry waiting to be appended inside a ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingOperation {
    pub batch_id: BatchId,
    pub kind: OperationType,
    pub product_id: ProductId,
    pub cell_id: CellId,
    pub transfer: Option<(CellId, TransferLeg)>,
    pub quantity: i64,
    pub actor_id: ActorId,
}

/// History filter. Unset fields match everything; time bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationQuery {
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
    pub kind: Option<OperationType>,
    pub product_id: Option<ProductId>,
    /// Matches entries recorded against this cell; each transfer leg is its own entry.
    pub cell_id: Option<CellId>,
    pub newest_first: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

#[cfg(test)]
mod tests {
    use super::{OperationType, TransferLeg};

    #[test]
    fn operation_type_db_names_roundtrip() {
        for kind in [
            OperationType::Receive,
            OperationType::Withdraw,
            OperationType::Transfer,
            OperationType::Adjust,
            OperationType::Remove,
        ] {
            assert_eq!(OperationType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(OperationType::parse("PUT"), None);
    }

    #[test]
    fn operation_type_serializes_like_the_log_column() {
        let json = serde_json::to_string(&OperationType::Withdraw).unwrap();
        assert_eq!(json, "\"WITHDRAW\"");
        assert_eq!(TransferLeg::parse("in"), Some(TransferLeg::In));
    }
}
