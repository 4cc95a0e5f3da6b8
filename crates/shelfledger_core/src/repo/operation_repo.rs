//! Append-only operation log storage.
//!
//! # Responsibility
//! - Append log entries inside ledger transactions.
//! - Serve history reads filtered by time range, type, product and cell.
//!
//! # Invariants
//! - There is no update or delete path; the schema rejects both with triggers.
//! - History is ordered by insertion id; `created_at` only bounds range filters.

use crate::model::id::OperationId;
use crate::model::operation::{
    Operation, OperationQuery, OperationType, PendingOperation, TransferLeg,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const OPERATION_SELECT_SQL: &str = "SELECT
    id,
    batch_uuid,
    type,
    product_id,
    cell_id,
    counterpart_cell_id,
    transfer_leg,
    quantity,
    actor_uuid,
    created_at
FROM operations";

/// Appends one entry and returns its id.
pub(crate) fn append(conn: &Connection, entry: &PendingOperation) -> RepoResult<OperationId> {
    let (counterpart, leg) = match entry.transfer {
        Some((cell, leg)) => (Some(cell), Some(leg.as_str())),
        None => (None, None),
    };
    conn.execute(
        "INSERT INTO operations (
            batch_uuid,
            type,
            product_id,
            cell_id,
            counterpart_cell_id,
            transfer_leg,
            quantity,
            actor_uuid
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            entry.batch_id.to_string(),
            entry.kind.as_str(),
            entry.product_id,
            entry.cell_id,
            counterpart,
            leg,
            entry.quantity,
            entry.actor_id.to_string(),
        ],
    )?;
    Ok(OperationId::new(conn.last_insert_rowid()))
}

/// Loads one entry by id.
pub fn get(conn: &Connection, id: OperationId) -> RepoResult<Option<Operation>> {
    let mut stmt = conn.prepare(&format!("{OPERATION_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_operation_row(row)?));
    }
    Ok(None)
}

/// Lists entries matching `query`.
pub fn list(conn: &Connection, query: &OperationQuery) -> RepoResult<Vec<Operation>> {
    let mut sql = format!("{OPERATION_SELECT_SQL} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(from_ms) = query.from_ms {
        sql.push_str(" AND created_at >= ?");
        bind_values.push(Value::Integer(from_ms));
    }
    if let Some(to_ms) = query.to_ms {
        sql.push_str(" AND created_at <= ?");
        bind_values.push(Value::Integer(to_ms));
    }
    if let Some(kind) = query.kind {
        sql.push_str(" AND type = ?");
        bind_values.push(Value::Text(kind.as_str().to_string()));
    }
    if let Some(product) = query.product_id {
        sql.push_str(" AND product_id = ?");
        bind_values.push(Value::Integer(product.get()));
    }
    if let Some(cell) = query.cell_id {
        sql.push_str(" AND cell_id = ?");
        bind_values.push(Value::Integer(cell.get()));
    }

    if query.newest_first {
        sql.push_str(" ORDER BY id DESC");
    } else {
        sql.push_str(" ORDER BY id ASC");
    }

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }
    } else if query.offset > 0 {
        sql.push_str(" LIMIT -1 OFFSET ?");
        bind_values.push(Value::Integer(i64::from(query.offset)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut operations = Vec::new();
    while let Some(row) = rows.next()? {
        operations.push(parse_operation_row(row)?);
    }
    Ok(operations)
}

/// Number of log entries that reference `column = id`.
pub(crate) fn count_referencing(
    conn: &Connection,
    column: ReferenceColumn,
    id: i64,
) -> RepoResult<i64> {
    let sql = match column {
        ReferenceColumn::Product => "SELECT COUNT(*) FROM operations WHERE product_id = ?1;",
        ReferenceColumn::Cell => {
            "SELECT COUNT(*) FROM operations WHERE cell_id = ?1 OR counterpart_cell_id = ?1;"
        }
    };
    let count = conn.query_row(sql, [id], |row| row.get(0))?;
    Ok(count)
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ReferenceColumn {
    Product,
    Cell,
}

fn parse_operation_row(row: &Row<'_>) -> RepoResult<Operation> {
    let kind_text: String = row.get("type")?;
    let kind = OperationType::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid operation type `{kind_text}` in operations.type"))
    })?;

    let transfer_leg = match row.get::<_, Option<String>>("transfer_leg")? {
        Some(value) => Some(TransferLeg::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid transfer leg `{value}` in operations.transfer_leg"
            ))
        })?),
        None => None,
    };

    Ok(Operation {
        id: row.get("id")?,
        batch_id: parse_uuid(row.get("batch_uuid")?, "operations.batch_uuid")?,
        kind,
        product_id: row.get("product_id")?,
        cell_id: row.get("cell_id")?,
        counterpart_cell_id: row.get("counterpart_cell_id")?,
        transfer_leg,
        quantity: row.get("quantity")?,
        actor_id: parse_uuid(row.get("actor_uuid")?, "operations.actor_uuid")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_uuid(value: String, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(&value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}
