//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `shelfledger_core` linkage with a deterministic version line.
//! - Optionally open a ledger database and print a fill audit summary.
//!
//! Database path comes from the first argument, else `SHELFLEDGER_DB`.
//! When `SHELFLEDGER_LOG_DIR` is set, logs go there at the default level.

use log::info;
use shelfledger_core::{open_db, LedgerService};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("shelfledger_core ping={}", shelfledger_core::ping());
    println!("shelfledger_core version={}", shelfledger_core::core_version());

    if let Ok(log_dir) = std::env::var("SHELFLEDGER_LOG_DIR") {
        let level = shelfledger_core::default_log_level();
        if let Err(err) = shelfledger_core::init_logging(level, &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let db_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SHELFLEDGER_DB").ok());
    let Some(db_path) = db_path else {
        return ExitCode::SUCCESS;
    };

    match audit(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("audit failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn audit(db_path: &str) -> Result<(), Box<dyn Error>> {
    let conn = open_db(db_path)?;
    let ledger = LedgerService::try_new(&conn)?;

    let stock = ledger.products_in_stock()?;
    let units: i64 = stock.iter().map(|product| product.total_quantity).sum();
    println!("products_in_stock={} units={units}", stock.len());

    let drift = ledger.audit_fill()?;
    println!("fill_drift_cells={}", drift.len());
    for cell in &drift {
        println!(
            "  cell={} stored_fill={} actual_fill={}",
            cell.cell_id, cell.stored_fill, cell.actual_fill
        );
    }
    info!(
        "event=cli_audit module=cli status=ok products={} drift_cells={}",
        stock.len(),
        drift.len()
    );
    Ok(())
}
