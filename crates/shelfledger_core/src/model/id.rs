//! Strongly-typed row identifiers.
//!
//! Ids wrap SQLite integer row ids. Ordering follows the raw value, which is
//! the order pooled withdrawals visit cells in.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identity of the person or system performing a stock movement.
///
/// Issued by the external auth layer; the ledger stores it verbatim.
pub type ActorId = Uuid;

/// Groups every log entry written by one logical ledger request.
pub type BatchId = Uuid;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl rusqlite::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.0))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value.as_i64().map(Self)
            }
        }
    };
}

row_id!(
    /// Identifier of a storage zone.
    ZoneId
);
row_id!(
    /// Identifier of a storage cell. Pooled withdrawals visit cells in ascending order.
    CellId
);
row_id!(
    /// Identifier of a catalog product.
    ProductId
);
row_id!(
    /// Identifier of a product category.
    CategoryId
);
row_id!(
    /// Identifier of an operation log entry. Increases with insertion order.
    OperationId
);

#[cfg(test)]
mod tests {
    use super::{CellId, ProductId};

    #[test]
    fn cell_ids_order_by_raw_value() {
        let mut ids = vec![CellId::new(7), CellId::new(2), CellId::new(5)];
        ids.sort();
        assert_eq!(ids, vec![CellId::new(2), CellId::new(5), CellId::new(7)]);
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ProductId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
