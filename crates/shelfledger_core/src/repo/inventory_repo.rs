//! Row-level inventory primitives.
//!
//! # Responsibility
//! - Read and mutate `inventory` rows and the derived `cells.current_fill`.
//!
//! # Invariants
//! - Mutating helpers are called with a connection that is inside a ledger
//!   transaction; they never open or commit transactions themselves.
//! - A record that reaches zero is deleted, never stored at zero.
//! - `recompute_fill` derives fill from scratch, never incrementally.

use crate::model::id::{CellId, ProductId};
use crate::model::inventory::{CellFill, FillDrift, InventoryRecord, ProductStock};
use crate::repo::{EntityRef, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const RECORD_SELECT_SQL: &str = "SELECT cell_id, product_id, quantity, placed_at FROM inventory";

/// Loads the record for `(cell, product)`, if any.
pub fn fetch_record(
    conn: &Connection,
    cell: CellId,
    product: ProductId,
) -> RepoResult<Option<InventoryRecord>> {
    let record = conn
        .query_row(
            &format!("{RECORD_SELECT_SQL} WHERE cell_id = ?1 AND product_id = ?2;"),
            params![cell, product],
            parse_record_row,
        )
        .optional()?;
    Ok(record)
}

/// Loads capacity and stored fill for `cell`, if the cell exists.
pub fn fetch_cell_fill(conn: &Connection, cell: CellId) -> RepoResult<Option<CellFill>> {
    let fill = conn
        .query_row(
            "SELECT id, capacity, current_fill FROM cells WHERE id = ?1;",
            [cell],
            |row| {
                Ok(CellFill {
                    cell_id: row.get(0)?,
                    capacity: row.get(1)?,
                    current_fill: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(fill)
}

pub fn product_exists(conn: &Connection, product: ProductId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM products WHERE id = ?1);",
        [product],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Records holding `product`, in ascending cell id order.
pub fn records_for_product(
    conn: &Connection,
    product: ProductId,
) -> RepoResult<Vec<InventoryRecord>> {
    let mut stmt = conn.prepare(&format!(
        "{RECORD_SELECT_SQL} WHERE product_id = ?1 ORDER BY cell_id ASC;"
    ))?;
    let records = stmt
        .query_map([product], parse_record_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Records stored in `cell`, in ascending product id order.
pub fn records_in_cell(conn: &Connection, cell: CellId) -> RepoResult<Vec<InventoryRecord>> {
    let mut stmt = conn.prepare(&format!(
        "{RECORD_SELECT_SQL} WHERE cell_id = ?1 ORDER BY product_id ASC;"
    ))?;
    let records = stmt
        .query_map([cell], parse_record_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Per-product totals for every product with stock on hand.
pub fn products_in_stock(conn: &Connection) -> RepoResult<Vec<ProductStock>> {
    let mut stmt = conn.prepare(
        "SELECT product_id, SUM(quantity), COUNT(cell_id)
         FROM inventory
         GROUP BY product_id
         ORDER BY product_id ASC;",
    )?;
    let stock = stmt
        .query_map([], |row| {
            Ok(ProductStock {
                product_id: row.get(0)?,
                total_quantity: row.get(1)?,
                locations: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(stock)
}

/// Adds `quantity` to `(cell, product)`, creating the record on first receipt.
pub(crate) fn add_quantity(
    conn: &Connection,
    cell: CellId,
    product: ProductId,
    quantity: i64,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO inventory (cell_id, product_id, quantity)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (cell_id, product_id)
         DO UPDATE SET quantity = quantity + excluded.quantity;",
        params![cell, product, quantity],
    )?;
    Ok(())
}

/// Removes `quantity` from `(cell, product)` and returns what is left.
///
/// Deletes the record when it drains to zero. Refuses to go negative even
/// though callers check availability first.
pub(crate) fn take_quantity(
    conn: &Connection,
    cell: CellId,
    product: ProductId,
    quantity: i64,
) -> RepoResult<i64> {
    let current = fetch_record(conn, cell, product)?
        .ok_or(RepoError::NotFound(EntityRef::Record { cell, product }))?
        .quantity;
    let remaining = current - quantity;
    if remaining < 0 {
        return Err(RepoError::InvalidData(format!(
            "taking {quantity} from cell {cell} product {product} would leave {remaining}"
        )));
    }

    if remaining == 0 {
        delete_record(conn, cell, product)?;
    } else {
        conn.execute(
            "UPDATE inventory SET quantity = ?3 WHERE cell_id = ?1 AND product_id = ?2;",
            params![cell, product, remaining],
        )?;
    }
    Ok(remaining)
}

/// Overwrites the quantity of an existing record. `quantity` must be positive.
pub(crate) fn set_quantity(
    conn: &Connection,
    cell: CellId,
    product: ProductId,
    quantity: i64,
) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE inventory SET quantity = ?3 WHERE cell_id = ?1 AND product_id = ?2;",
        params![cell, product, quantity],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound(EntityRef::Record { cell, product }));
    }
    Ok(())
}

/// Deletes the record and returns the quantity it held.
pub(crate) fn delete_record(
    conn: &Connection,
    cell: CellId,
    product: ProductId,
) -> RepoResult<i64> {
    let removed: Option<i64> = conn
        .query_row(
            "DELETE FROM inventory WHERE cell_id = ?1 AND product_id = ?2 RETURNING quantity;",
            params![cell, product],
            |row| row.get(0),
        )
        .optional()?;
    removed.ok_or(RepoError::NotFound(EntityRef::Record { cell, product }))
}

/// Sets `cells.current_fill` to the sum of the cell's records and returns it.
pub(crate) fn recompute_fill(conn: &Connection, cell: CellId) -> RepoResult<i64> {
    let fill: Option<i64> = conn
        .query_row(
            "UPDATE cells
             SET current_fill = (
                 SELECT COALESCE(SUM(quantity), 0) FROM inventory WHERE cell_id = ?1
             )
             WHERE id = ?1
             RETURNING current_fill;",
            [cell],
            |row| row.get(0),
        )
        .optional()?;
    fill.ok_or(RepoError::NotFound(EntityRef::Cell(cell)))
}

/// Cells whose stored fill differs from the sum of their records.
pub fn fill_drift(conn: &Connection) -> RepoResult<Vec<FillDrift>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.current_fill, COALESCE(SUM(i.quantity), 0) AS actual
         FROM cells c
         LEFT JOIN inventory i ON i.cell_id = c.id
         GROUP BY c.id, c.current_fill
         HAVING c.current_fill != actual
         ORDER BY c.id ASC;",
    )?;
    let drift = stmt
        .query_map([], |row| {
            Ok(FillDrift {
                cell_id: row.get(0)?,
                stored_fill: row.get(1)?,
                actual_fill: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(drift)
}

fn parse_record_row(row: &Row<'_>) -> rusqlite::Result<InventoryRecord> {
    Ok(InventoryRecord {
        cell_id: row.get("cell_id")?,
        product_id: row.get("product_id")?,
        quantity: row.get("quantity")?,
        placed_at: row.get("placed_at")?,
    })
}
