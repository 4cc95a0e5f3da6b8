use rusqlite::Connection;
use shelfledger_core::db::open_db_in_memory;
use shelfledger_core::{
    CatalogService, CellDraft, CellId, EntityRef, FillStatus, LedgerError, LedgerService,
    OperationQuery, OperationType, ProductDraft, ProductId, SqliteCatalogRepository, ZoneDraft,
};
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// One zone with a cell per capacity, plus one product.
fn seed(conn: &Connection, capacities: &[i64]) -> (ProductId, Vec<CellId>) {
    let catalog = CatalogService::new(SqliteCatalogRepository::try_new(conn).unwrap());
    let zone = catalog
        .create_zone(&ZoneDraft {
            name: "A".to_string(),
            description: None,
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
    let product = catalog
        .create_product(&ProductDraft {
            name: "Bolt".to_string(),
            sku: "BLT-1".to_string(),
            unit: "pcs".to_string(),
            category_id: None,
        })
        .unwrap();
    (product.id, cells)
}

#[test]
fn receive_creates_then_increments_record() {
    let conn = setup();
    let (product, cells) = seed(&conn, &[100]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    let actor = Uuid::new_v4();

    let first = ledger.receive(cells[0], product, 10, actor).unwrap();
    assert_eq!(first.quantity, 10);
    let second = ledger.receive(cells[0], product, 5, actor).unwrap();
    assert_eq!(second.quantity, 15);
    assert_eq!(second.placed_at, first.placed_at);

    let fill = ledger.cell_fill(cells[0]).unwrap();
    assert_eq!(fill.current_fill, 15);
    assert_eq!(fill.free_space(), 85);
    assert_eq!(fill.status(), FillStatus::Partial);

    let log = ledger.history(&OperationQuery::default()).unwrap();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|entry| entry.kind == OperationType::Receive));
    assert_eq!(log[0].quantity, 10);
    assert_eq!(log[1].quantity, 5);
    assert_eq!(log[0].actor_id, actor);
    assert_ne!(log[0].batch_id, log[1].batch_id);
}

#[test]
fn receive_does_not_enforce_capacity() {
    let conn = setup();
    let (product, cells) = seed(&conn, &[5]);
    let ledger = LedgerService::try_new(&conn).unwrap();

    ledger.receive(cells[0], product, 8, Uuid::new_v4()).unwrap();

    let fill = ledger.cell_fill(cells[0]).unwrap();
    assert_eq!(fill.current_fill, 8);
    assert_eq!(fill.free_space(), 0);
    assert_eq!(fill.status(), FillStatus::Full);
}

#[test]
fn receive_rejects_bad_input_without_logging() {
    let conn = setup();
    let (product, cells) = seed(&conn, &[10]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    let actor = Uuid::new_v4();

    assert!(matches!(
        ledger.receive(cells[0], product, 0, actor),
        Err(LedgerError::InvalidQuantity { quantity: 0 })
    ));
    assert!(matches!(
        ledger.receive(CellId::new(999), product, 1, actor),
        Err(LedgerError::NotFound(EntityRef::Cell(_)))
    ));
    assert!(matches!(
        ledger.receive(cells[0], ProductId::new(999), 1, actor),
        Err(LedgerError::NotFound(EntityRef::Product(_)))
    ));

    assert!(ledger.history(&OperationQuery::default()).unwrap().is_empty());
    assert_eq!(ledger.quantity(cells[0], product).unwrap(), 0);
}

#[test]
fn adjust_records_resulting_quantity() {
    let conn = setup();
    let (product, cells) = seed(&conn, &[100]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    let actor = Uuid::new_v4();
    ledger.receive(cells[0], product, 10, actor).unwrap();

    let record = ledger
        .adjust_quantity(cells[0], product, 7, actor)
        .unwrap()
        .unwrap();
    assert_eq!(record.quantity, 7);
    assert_eq!(ledger.cell_fill(cells[0]).unwrap().current_fill, 7);

    let adjusts = ledger
        .history(&OperationQuery {
            kind: Some(OperationType::Adjust),
            ..OperationQuery::default()
        })
        .unwrap();
    assert_eq!(adjusts.len(), 1);
    assert_eq!(adjusts[0].quantity, 7);
}

#[test]
fn adjust_to_zero_removes_record_and_logs_remove() {
    let conn = setup();
    let (product, cells) = seed(&conn, &[100]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    let actor = Uuid::new_v4();
    ledger.receive(cells[0], product, 10, actor).unwrap();

    let result = ledger.adjust_quantity(cells[0], product, 0, actor).unwrap();
    assert!(result.is_none());
    assert!(ledger.record(cells[0], product).unwrap().is_none());
    assert_eq!(ledger.cell_fill(cells[0]).unwrap().status(), FillStatus::Empty);

    let log = ledger
        .history(&OperationQuery {
            newest_first: true,
            limit: Some(1),
            ..OperationQuery::default()
        })
        .unwrap();
    assert_eq!(log[0].kind, OperationType::Remove);
    assert_eq!(log[0].quantity, 10);
}

#[test]
fn adjust_requires_existing_record_and_non_negative_quantity() {
    let conn = setup();
    let (product, cells) = seed(&conn, &[100]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    let actor = Uuid::new_v4();

    assert!(matches!(
        ledger.adjust_quantity(cells[0], product, 4, actor),
        Err(LedgerError::NotFound(EntityRef::Record { .. }))
    ));

    ledger.receive(cells[0], product, 3, actor).unwrap();
    assert!(matches!(
        ledger.adjust_quantity(cells[0], product, -1, actor),
        Err(LedgerError::InvalidQuantity { quantity: -1 })
    ));
    assert_eq!(ledger.quantity(cells[0], product).unwrap(), 3);
}

#[test]
fn remove_returns_prior_quantity() {
    let conn = setup();
    let (product, cells) = seed(&conn, &[100]);
    let ledger = LedgerService::try_new(&conn).unwrap();
    let actor = Uuid::new_v4();
    ledger.receive(cells[0], product, 12, actor).unwrap();

    assert_eq!(ledger.remove(cells[0], product, actor).unwrap(), 12);
    assert_eq!(ledger.cell_fill(cells[0]).unwrap().current_fill, 0);
    assert!(matches!(
        ledger.remove(cells[0], product, actor),
        Err(LedgerError::NotFound(EntityRef::Record { .. }))
    ));

    let removes = ledger
        .history(&OperationQuery {
            kind: Some(OperationType::Remove),
            ..OperationQuery::default()
        })
        .unwrap();
    assert_eq!(removes.len(), 1);
    assert_eq!(removes[0].quantity, 12);
}
