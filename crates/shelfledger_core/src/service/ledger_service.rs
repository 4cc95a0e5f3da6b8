//! Inventory ledger use-case service.
//!
//! # Responsibility
//! - Own every mutation of inventory records and cell fill.
//! - Run each logical request (receive, adjust, remove, withdraw, transfer)
//!   as one IMMEDIATE transaction: read, validate, plan, then write.
//! - Append one operation log entry per cell a committed request touched.
//!
//! # Invariants
//! - `cells.current_fill` is recomputed from scratch for every touched cell
//!   before commit.
//! - A rejected request returns before any write; an error after a write
//!   drops the transaction, which rolls everything back.
//! - Receive does not enforce capacity; transfer does.

use crate::model::id::{ActorId, BatchId, CellId, OperationId, ProductId};
use crate::model::inventory::{CellFill, FillDrift, InventoryRecord, ProductStock};
use crate::model::operation::{
    Operation, OperationQuery, OperationType, PendingOperation, TransferLeg,
};
use crate::repo::{ensure_schema_ready, inventory_repo, operation_repo, EntityRef};
use crate::service::allocation::{
    check_transfer, ensure_positive, plan_explicit, plan_pooled, Allocation,
};
use crate::service::error::LedgerError;
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    /// Shared by the outbound and inbound log entries.
    pub batch_id: BatchId,
    /// Quantity left at the source; zero means the record was deleted.
    pub source_remaining: i64,
    pub destination: InventoryRecord,
}

/// Transactional boundary over inventory state.
pub struct LedgerService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> LedgerService<'conn> {
    /// Creates the service from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> LedgerResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Adds `quantity` of `product` to `cell`, creating the record on first receipt.
    pub fn receive(
        &self,
        cell: CellId,
        product: ProductId,
        quantity: i64,
        actor: ActorId,
    ) -> LedgerResult<InventoryRecord> {
        let fields = format!("cell_id={cell} product_id={product} quantity={quantity}");
        self.run("ledger_receive", &fields, |conn, batch_id| {
            ensure_positive(quantity)?;
            let before = require_cell(conn, cell)?;
            require_product(conn, product)?;

            inventory_repo::add_quantity(conn, cell, product, quantity)?;
            let fill = inventory_repo::recompute_fill(conn, cell)?;
            if fill > before.capacity {
                warn!(
                    "event=receive_over_capacity module=ledger status=accepted batch_id={batch_id} cell_id={cell} capacity={} current_fill={fill}",
                    before.capacity
                );
            }

            operation_repo::append(
                conn,
                &PendingOperation {
                    batch_id,
                    kind: OperationType::Receive,
                    product_id: product,
                    cell_id: cell,
                    transfer: None,
                    quantity,
                    actor_id: actor,
                },
            )?;
            require_record(conn, cell, product)
        })
    }

    /// Sets the quantity of an existing record.
    ///
    /// Zero deletes the record and logs REMOVE with the prior quantity; the
    /// result is then `None`. Otherwise logs ADJUST with the new quantity.
    pub fn adjust_quantity(
        &self,
        cell: CellId,
        product: ProductId,
        new_quantity: i64,
        actor: ActorId,
    ) -> LedgerResult<Option<InventoryRecord>> {
        let fields = format!("cell_id={cell} product_id={product} quantity={new_quantity}");
        self.run("ledger_adjust", &fields, |conn, batch_id| {
            if new_quantity < 0 {
                return Err(LedgerError::InvalidQuantity {
                    quantity: new_quantity,
                });
            }
            require_cell(conn, cell)?;
            require_product(conn, product)?;
            require_record(conn, cell, product)?;

            let (kind, logged, record) = if new_quantity == 0 {
                let removed = inventory_repo::delete_record(conn, cell, product)?;
                (OperationType::Remove, removed, None)
            } else {
                inventory_repo::set_quantity(conn, cell, product, new_quantity)?;
                let record = require_record(conn, cell, product)?;
                (OperationType::Adjust, new_quantity, Some(record))
            };
            inventory_repo::recompute_fill(conn, cell)?;

            operation_repo::append(
                conn,
                &PendingOperation {
                    batch_id,
                    kind,
                    product_id: product,
                    cell_id: cell,
                    transfer: None,
                    quantity: logged,
                    actor_id: actor,
                },
            )?;
            Ok(record)
        })
    }

    /// Deletes the `(cell, product)` record and returns the quantity it held.
    pub fn remove(&self, cell: CellId, product: ProductId, actor: ActorId) -> LedgerResult<i64> {
        let fields = format!("cell_id={cell} product_id={product}");
        self.run("ledger_remove", &fields, |conn, batch_id| {
            require_cell(conn, cell)?;
            require_product(conn, product)?;
            require_record(conn, cell, product)?;

            let removed = inventory_repo::delete_record(conn, cell, product)?;
            inventory_repo::recompute_fill(conn, cell)?;
            operation_repo::append(
                conn,
                &PendingOperation {
                    batch_id,
                    kind: OperationType::Remove,
                    product_id: product,
                    cell_id: cell,
                    transfer: None,
                    quantity: removed,
                    actor_id: actor,
                },
            )?;
            Ok(removed)
        })
    }

    /// Withdraws `quantity` of `product`, from `cell` when given, otherwise
    /// pooled across cells in ascending id order.
    ///
    /// Returns what was taken from each cell. Either the whole quantity is
    /// taken or nothing is.
    pub fn withdraw(
        &self,
        product: ProductId,
        quantity: i64,
        actor: ActorId,
        cell: Option<CellId>,
    ) -> LedgerResult<Vec<Allocation>> {
        let fields = match cell {
            Some(cell) => format!("product_id={product} quantity={quantity} cell_id={cell}"),
            None => format!("product_id={product} quantity={quantity} pooled=true"),
        };
        self.run("ledger_withdraw", &fields, |conn, batch_id| {
            ensure_positive(quantity)?;
            require_product(conn, product)?;

            let plan = match cell {
                Some(cell) => {
                    require_cell(conn, cell)?;
                    let record = inventory_repo::fetch_record(conn, cell, product)?;
                    plan_explicit(product, cell, quantity, record.as_ref())?
                }
                None => {
                    let records = inventory_repo::records_for_product(conn, product)?;
                    plan_pooled(product, quantity, &records)?
                }
            };

            for allocation in &plan {
                inventory_repo::take_quantity(
                    conn,
                    allocation.cell_id,
                    product,
                    allocation.quantity,
                )?;
                inventory_repo::recompute_fill(conn, allocation.cell_id)?;
                operation_repo::append(
                    conn,
                    &PendingOperation {
                        batch_id,
                        kind: OperationType::Withdraw,
                        product_id: product,
                        cell_id: allocation.cell_id,
                        transfer: None,
                        quantity: allocation.quantity,
                        actor_id: actor,
                    },
                )?;
            }
            Ok(plan)
        })
    }

    /// Moves `quantity` of `product` from `from` to `to`.
    ///
    /// Enforces destination capacity. Logs an outbound entry on `from` and an
    /// inbound entry on `to`, sharing one batch id.
    pub fn transfer(
        &self,
        product: ProductId,
        quantity: i64,
        from: CellId,
        to: CellId,
        actor: ActorId,
    ) -> LedgerResult<TransferOutcome> {
        let fields = format!(
            "product_id={product} quantity={quantity} from_cell_id={from} to_cell_id={to}"
        );
        self.run("ledger_transfer", &fields, |conn, batch_id| {
            ensure_positive(quantity)?;
            require_product(conn, product)?;
            require_cell(conn, from)?;
            let destination = require_cell(conn, to)?;
            let source = inventory_repo::fetch_record(conn, from, product)?;
            check_transfer(product, quantity, from, source.as_ref(), &destination)?;

            let source_remaining = inventory_repo::take_quantity(conn, from, product, quantity)?;
            inventory_repo::add_quantity(conn, to, product, quantity)?;
            inventory_repo::recompute_fill(conn, from)?;
            inventory_repo::recompute_fill(conn, to)?;

            for (cell, counterpart, leg) in [
                (from, to, TransferLeg::Out),
                (to, from, TransferLeg::In),
            ] {
                operation_repo::append(
                    conn,
                    &PendingOperation {
                        batch_id,
                        kind: OperationType::Transfer,
                        product_id: product,
                        cell_id: cell,
                        transfer: Some((counterpart, leg)),
                        quantity,
                        actor_id: actor,
                    },
                )?;
            }

            Ok(TransferOutcome {
                batch_id,
                source_remaining,
                destination: require_record(conn, to, product)?,
            })
        })
    }

    /// Current record for `(cell, product)`, if any.
    pub fn record(
        &self,
        cell: CellId,
        product: ProductId,
    ) -> LedgerResult<Option<InventoryRecord>> {
        Ok(inventory_repo::fetch_record(self.conn, cell, product)?)
    }

    /// Quantity held at `(cell, product)`; zero when there is no record.
    pub fn quantity(&self, cell: CellId, product: ProductId) -> LedgerResult<i64> {
        Ok(self.record(cell, product)?.map_or(0, |record| record.quantity))
    }

    /// Capacity and stored fill of `cell`.
    pub fn cell_fill(&self, cell: CellId) -> LedgerResult<CellFill> {
        require_cell(self.conn, cell)
    }

    /// Records holding `product`, in the order pooled withdrawals visit them.
    pub fn records_for_product(&self, product: ProductId) -> LedgerResult<Vec<InventoryRecord>> {
        Ok(inventory_repo::records_for_product(self.conn, product)?)
    }

    pub fn records_in_cell(&self, cell: CellId) -> LedgerResult<Vec<InventoryRecord>> {
        Ok(inventory_repo::records_in_cell(self.conn, cell)?)
    }

    pub fn products_in_stock(&self) -> LedgerResult<Vec<ProductStock>> {
        Ok(inventory_repo::products_in_stock(self.conn)?)
    }

    /// Operation log entries matching `query`.
    pub fn history(&self, query: &OperationQuery) -> LedgerResult<Vec<Operation>> {
        Ok(operation_repo::list(self.conn, query)?)
    }

    pub fn operation(&self, id: OperationId) -> LedgerResult<Operation> {
        operation_repo::get(self.conn, id)?.ok_or(LedgerError::NotFound(EntityRef::Operation(id)))
    }

    /// Cells whose stored fill disagrees with their records. Read-only.
    ///
    /// # Side effects
    /// - Emits one `fill_drift` warning per drifting cell.
    pub fn audit_fill(&self) -> LedgerResult<Vec<FillDrift>> {
        let drift = inventory_repo::fill_drift(self.conn)?;
        for cell in &drift {
            warn!(
                "event=fill_drift module=ledger status=drift cell_id={} stored_fill={} actual_fill={}",
                cell.cell_id, cell.stored_fill, cell.actual_fill
            );
        }
        Ok(drift)
    }

    fn run<T>(
        &self,
        event: &'static str,
        fields: &str,
        body: impl FnOnce(&Connection, BatchId) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let started_at = Instant::now();
        let batch_id = Uuid::new_v4();

        let result = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(LedgerError::from)
            .and_then(|tx| {
                let value = body(&tx, batch_id)?;
                tx.commit()?;
                Ok(value)
            });

        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => info!(
                "event={event} module=ledger status=ok batch_id={batch_id} {fields} duration_ms={duration_ms}"
            ),
            Err(err) if err.is_rejection() => warn!(
                "event={event} module=ledger status=rejected batch_id={batch_id} {fields} duration_ms={duration_ms} error_code={} error={err}",
                err.code()
            ),
            Err(err) => error!(
                "event={event} module=ledger status=error batch_id={batch_id} {fields} duration_ms={duration_ms} error_code={} error={err}",
                err.code()
            ),
        }
        result
    }
}

fn require_cell(conn: &Connection, cell: CellId) -> LedgerResult<CellFill> {
    inventory_repo::fetch_cell_fill(conn, cell)?.ok_or(LedgerError::NotFound(EntityRef::Cell(cell)))
}

fn require_product(conn: &Connection, product: ProductId) -> LedgerResult<()> {
    if !inventory_repo::product_exists(conn, product)? {
        return Err(LedgerError::NotFound(EntityRef::Product(product)));
    }
    Ok(())
}

fn require_record(
    conn: &Connection,
    cell: CellId,
    product: ProductId,
) -> LedgerResult<InventoryRecord> {
    inventory_repo::fetch_record(conn, cell, product)?
        .ok_or(LedgerError::NotFound(EntityRef::Record { cell, product }))
}
