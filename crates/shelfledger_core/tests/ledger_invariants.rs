use rusqlite::Connection;
use shelfledger_core::db::{open_db, open_db_in_memory};
use shelfledger_core::{
    CatalogService, CellDraft, CellId, EntityRef, LedgerError, LedgerService, OperationId,
    OperationQuery, OperationType, ProductDraft, ProductId, SqliteCatalogRepository, ZoneDraft,
};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::time::Duration;
use uuid::Uuid;

fn seed(conn: &Connection, capacities: &[i64]) -> (ProductId, Vec<CellId>) {
    let catalog = CatalogService::new(SqliteCatalogRepository::try_new(conn).unwrap());
    let zone = catalog
        .create_zone(&ZoneDraft {
            name: "A".to_string(),
            description: None,
        })
        .unwrap();
    let product = catalog
        .create_product(&ProductDraft {
            name: "Bolt".to_string(),
            sku: "BLT-1".to_string(),
            unit: "pcs".to_string(),
            category_id: None,
        })
        .unwrap();
    let cells = capacities
        .iter()
        .enumerate()
        .map(|(index, capacity)| {
            catalog
                .create_cell(&CellDraft {
                    zone_id: zone.id,
                    row_number: 1,
                    cell_number: index as i64 + 1,
                    capacity: *capacity,
                })
                .unwrap()
                .id
        })
        .collect();
    (product.id, cells)
}

fn seed_file(path: &Path, stock: i64) -> (ProductId, CellId) {
    let conn = open_db(path).unwrap();
    let (product, cells) = seed(&conn, &[100]);
    LedgerService::try_new(&conn)
        .unwrap()
        .receive(cells[0], product, stock, Uuid::new_v4())
        .unwrap();
    (product, cells[0])
}

#[test]
fn fill_always_matches_sum_of_records() {
    let conn = open_db_in_memory().unwrap();
    let (product, cells) = seed(&conn, &[30, 30, 30]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    let actor = Uuid::new_v4();

    ledger.receive(cells[0], product, 12, actor).unwrap();
    ledger.receive(cells[1], product, 7, actor).unwrap();
    ledger.transfer(product, 5, cells[0], cells[2], actor).unwrap();
    ledger.withdraw(product, 9, actor, None).unwrap();
    ledger.adjust_quantity(cells[2], product, 2, actor).unwrap();
    let _ = ledger.withdraw(product, 100, actor, None);
    ledger.receive(cells[1], product, 1, actor).unwrap();

    assert!(ledger.audit_fill().unwrap().is_empty());
    for cell in &cells {
        let sum: i64 = ledger
            .records_in_cell(*cell)
            .unwrap()
            .iter()
            .map(|record| record.quantity)
            .sum();
        assert_eq!(ledger.cell_fill(*cell).unwrap().current_fill, sum);
    }
}

#[test]
fn audit_reports_drift_written_behind_the_ledger() {
    let conn = open_db_in_memory().unwrap();
    let (product, cells) = seed(&conn, &[30, 30]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    ledger.receive(cells[1], product, 4, Uuid::new_v4()).unwrap();

    conn.execute(
        "UPDATE cells SET current_fill = 9 WHERE id = ?1;",
        [cells[1].get()],
    )
    .unwrap();

    let drift = ledger.audit_fill().unwrap();
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].cell_id, cells[1]);
    assert_eq!(drift[0].stored_fill, 9);
    assert_eq!(drift[0].actual_fill, 4);
}

#[test]
fn receive_then_withdraw_restores_prior_state() {
    let conn = open_db_in_memory().unwrap();
    let (product, cells) = seed(&conn, &[30]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    let actor = Uuid::new_v4();
    ledger.receive(cells[0], product, 6, actor).unwrap();
    let before = ledger.record(cells[0], product).unwrap();
    let fill_before = ledger.cell_fill(cells[0]).unwrap();

    ledger.receive(cells[0], product, 4, actor).unwrap();
    ledger.withdraw(product, 4, actor, Some(cells[0])).unwrap();

    assert_eq!(ledger.record(cells[0], product).unwrap(), before);
    assert_eq!(ledger.cell_fill(cells[0]).unwrap(), fill_before);
}

#[test]
fn every_committed_mutation_logs_one_entry_per_touched_cell() {
    let conn = open_db_in_memory().unwrap();
    let (product, cells) = seed(&conn, &[30, 30, 30]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    let actor = Uuid::new_v4();

    ledger.receive(cells[0], product, 2, actor).unwrap();
    ledger.receive(cells[1], product, 2, actor).unwrap();
    ledger.receive(cells[2], product, 2, actor).unwrap();
    let taken = ledger.withdraw(product, 5, actor, None).unwrap();
    ledger.transfer(product, 1, cells[2], cells[0], actor).unwrap();
    ledger.adjust_quantity(cells[0], product, 3, actor).unwrap();
    ledger.remove(cells[0], product, actor).unwrap();

    let log = ledger.history(&OperationQuery::default()).unwrap();
    let count = |kind| log.iter().filter(|entry| entry.kind == kind).count();
    assert_eq!(count(OperationType::Receive), 3);
    assert_eq!(count(OperationType::Withdraw), taken.len());
    assert_eq!(count(OperationType::Transfer), 2);
    assert_eq!(count(OperationType::Adjust), 1);
    assert_eq!(count(OperationType::Remove), 1);
    assert_eq!(log.len(), 3 + taken.len() + 2 + 1 + 1);

    let ids: Vec<_> = log.iter().map(|entry| entry.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn operation_log_rejects_update_and_delete() {
    let conn = open_db_in_memory().unwrap();
    let (product, cells) = seed(&conn, &[30]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    ledger.receive(cells[0], product, 2, Uuid::new_v4()).unwrap();

    let update = conn
        .execute("UPDATE operations SET quantity = 99;", [])
        .unwrap_err();
    assert!(update.to_string().contains("append-only"));
    let delete = conn.execute("DELETE FROM operations;", []).unwrap_err();
    assert!(delete.to_string().contains("append-only"));

    let log = ledger.history(&OperationQuery::default()).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].quantity, 2);
}

#[test]
fn history_filters_and_pages() {
    let conn = open_db_in_memory().unwrap();
    let (product, cells) = seed(&conn, &[30, 30]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    let actor = Uuid::new_v4();
    for quantity in 1..=4 {
        ledger.receive(cells[0], product, quantity, actor).unwrap();
    }
    ledger.receive(cells[1], product, 9, actor).unwrap();

    let newest_two = ledger
        .history(&OperationQuery {
            newest_first: true,
            limit: Some(2),
            ..OperationQuery::default()
        })
        .unwrap();
    let quantities: Vec<_> = newest_two.iter().map(|entry| entry.quantity).collect();
    assert_eq!(quantities, vec![9, 4]);

    let skipped = ledger
        .history(&OperationQuery {
            cell_id: Some(cells[0]),
            offset: 3,
            ..OperationQuery::default()
        })
        .unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].quantity, 4);

    let all = ledger.history(&OperationQuery::default()).unwrap();
    let first_at = all[0].created_at;
    let last_at = all[all.len() - 1].created_at;
    let window = ledger
        .history(&OperationQuery {
            from_ms: Some(first_at),
            to_ms: Some(last_at),
            product_id: Some(product),
            ..OperationQuery::default()
        })
        .unwrap();
    assert_eq!(window.len(), all.len());

    let after = ledger
        .history(&OperationQuery {
            from_ms: Some(last_at + 1),
            ..OperationQuery::default()
        })
        .unwrap();
    assert!(after.is_empty());
}

#[test]
fn history_follows_insertion_order_when_clock_steps_back() {
    let conn = open_db_in_memory().unwrap();
    let (product, cells) = seed(&conn, &[30]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    ledger.receive(cells[0], product, 1, Uuid::new_v4()).unwrap();
    ledger.receive(cells[0], product, 2, Uuid::new_v4()).unwrap();

    conn.execute(
        "INSERT INTO operations (batch_uuid, type, product_id, cell_id, quantity, actor_uuid, created_at)
         VALUES (?1, 'RECEIVE', ?2, ?3, 3, ?4, 0);",
        rusqlite::params![
            Uuid::new_v4().to_string(),
            product,
            cells[0],
            Uuid::new_v4().to_string()
        ],
    )
    .unwrap();

    let oldest_first: Vec<_> = ledger
        .history(&OperationQuery::default())
        .unwrap()
        .iter()
        .map(|entry| entry.quantity)
        .collect();
    assert_eq!(oldest_first, vec![1, 2, 3]);

    let newest = ledger
        .history(&OperationQuery {
            newest_first: true,
            limit: Some(1),
            ..OperationQuery::default()
        })
        .unwrap();
    assert_eq!(newest[0].quantity, 3);
    assert_eq!(newest[0].created_at, 0);
}

#[test]
fn operation_lookup_by_id() {
    let conn = open_db_in_memory().unwrap();
    let (product, cells) = seed(&conn, &[30]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    ledger.receive(cells[0], product, 2, Uuid::new_v4()).unwrap();

    let log = ledger.history(&OperationQuery::default()).unwrap();
    assert_eq!(ledger.operation(log[0].id).unwrap(), log[0]);
    assert!(matches!(
        ledger.operation(OperationId::new(999)),
        Err(LedgerError::NotFound(EntityRef::Operation(_)))
    ));
}

#[test]
fn open_write_lock_blocks_ledger_until_released() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let (product, cell) = seed_file(&path, 10);

    let holder = open_db(&path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let contender = open_db(&path).unwrap();
    contender.busy_timeout(Duration::from_millis(50)).unwrap();
    let ledger = LedgerService::try_new(&contender).unwrap();

    let err = ledger
        .withdraw(product, 1, Uuid::new_v4(), Some(cell))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)));
    assert!(!err.is_rejection());

    holder.execute_batch("ROLLBACK;").unwrap();
    ledger
        .withdraw(product, 1, Uuid::new_v4(), Some(cell))
        .unwrap();
    assert_eq!(ledger.quantity(cell, product).unwrap(), 9);
}

#[test]
fn concurrent_withdrawals_never_overdraw() {
    let dir = tempfile::tempdir().unwrap();
    let path = Arc::new(dir.path().join("ledger.db"));
    let (product, cell) = seed_file(&path, 10);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let conn = open_db(path.as_path()).unwrap();
                let ledger = LedgerService::try_new(&conn).unwrap();
                barrier.wait();
                ledger
                    .withdraw(product, 6, Uuid::new_v4(), Some(cell))
                    .map(|plan| plan.len())
                    .map_err(|err| err.code())
            })
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results.contains(&Err("insufficient_stock")));

    let conn = open_db(path.as_path()).unwrap();
    let ledger = LedgerService::try_new(&conn).unwrap();
    assert_eq!(ledger.quantity(cell, product).unwrap(), 4);
    assert!(ledger.audit_fill().unwrap().is_empty());
}
