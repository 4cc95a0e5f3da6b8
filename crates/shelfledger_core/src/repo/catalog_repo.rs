//! Catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over zones, categories, cells and products.
//! - Refuse to delete catalog rows that inventory or the operation log still
//!   reference.
//!
//! # Invariants
//! - Writes receive already-normalized drafts from `CatalogService`.
//! - Catalog writes never touch `cells.current_fill`; only the ledger does.
//! - Reference checks and deletes run in one IMMEDIATE transaction.

use crate::model::catalog::{
    Category, CategoryDraft, Cell, CellDraft, Product, ProductDraft, Zone, ZoneDraft,
};
use crate::model::id::{CategoryId, CellId, ProductId, ZoneId};
use crate::repo::operation_repo::{count_referencing, ReferenceColumn};
use crate::repo::{ensure_schema_ready, unique_conflict, EntityRef, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const CELL_SELECT_SQL: &str =
    "SELECT id, zone_id, row_number, cell_number, capacity, current_fill FROM cells";
const PRODUCT_SELECT_SQL: &str = "SELECT id, name, sku, unit, category_id FROM products";
const CATEGORY_SELECT_SQL: &str = "SELECT id, name, description, created_at FROM categories";

/// Repository interface for catalog reference data.
pub trait CatalogRepository {
    fn create_zone(&self, draft: &ZoneDraft) -> RepoResult<Zone>;
    fn get_zone(&self, id: ZoneId) -> RepoResult<Option<Zone>>;
    fn list_zones(&self) -> RepoResult<Vec<Zone>>;
    fn update_zone(&self, id: ZoneId, draft: &ZoneDraft) -> RepoResult<Zone>;
    fn delete_zone(&self, id: ZoneId) -> RepoResult<()>;

    fn create_category(&self, draft: &CategoryDraft) -> RepoResult<Category>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    fn list_categories(&self) -> RepoResult<Vec<Category>>;
    fn update_category(&self, id: CategoryId, draft: &CategoryDraft) -> RepoResult<Category>;
    fn delete_category(&self, id: CategoryId) -> RepoResult<()>;

    fn create_cell(&self, draft: &CellDraft) -> RepoResult<Cell>;
    fn get_cell(&self, id: CellId) -> RepoResult<Option<Cell>>;
    fn list_cells(&self) -> RepoResult<Vec<Cell>>;
    fn list_empty_cells(&self) -> RepoResult<Vec<Cell>>;
    fn update_cell(&self, id: CellId, draft: &CellDraft) -> RepoResult<Cell>;
    fn delete_cell(&self, id: CellId) -> RepoResult<()>;

    fn create_product(&self, draft: &ProductDraft) -> RepoResult<Product>;
    fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>>;
    fn get_product_by_sku(&self, sku: &str) -> RepoResult<Option<Product>>;
    fn list_products(&self) -> RepoResult<Vec<Product>>;
    fn update_product(&self, id: ProductId, draft: &ProductDraft) -> RepoResult<Product>;
    fn delete_product(&self, id: ProductId) -> RepoResult<()>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_zone(&self, draft: &ZoneDraft) -> RepoResult<Zone> {
        self.conn.execute(
            "INSERT INTO zones (name, description) VALUES (?1, ?2);",
            params![draft.name, draft.description],
        )?;
        let id = ZoneId::new(self.conn.last_insert_rowid());
        load_required(self.get_zone(id)?, EntityRef::Zone(id))
    }

    fn get_zone(&self, id: ZoneId) -> RepoResult<Option<Zone>> {
        let zone = self
            .conn
            .query_row(
                "SELECT id, name, description FROM zones WHERE id = ?1;",
                [id],
                parse_zone_row,
            )
            .optional()?;
        Ok(zone)
    }

    fn list_zones(&self) -> RepoResult<Vec<Zone>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM zones ORDER BY id ASC;")?;
        let zones = stmt
            .query_map([], parse_zone_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(zones)
    }

    fn update_zone(&self, id: ZoneId, draft: &ZoneDraft) -> RepoResult<Zone> {
        let changed = self.conn.execute(
            "UPDATE zones SET name = ?2, description = ?3 WHERE id = ?1;",
            params![id, draft.name, draft.description],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Zone(id)));
        }
        load_required(self.get_zone(id)?, EntityRef::Zone(id))
    }

    fn delete_zone(&self, id: ZoneId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let cells: i64 = tx.query_row(
            "SELECT COUNT(*) FROM cells WHERE zone_id = ?1;",
            [id],
            |row| row.get(0),
        )?;
        if cells > 0 {
            return Err(RepoError::InUse {
                entity: EntityRef::Zone(id),
                by: "cells",
            });
        }
        let changed = tx.execute("DELETE FROM zones WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Zone(id)));
        }
        tx.commit()?;
        Ok(())
    }

    fn create_category(&self, draft: &CategoryDraft) -> RepoResult<Category> {
        self.conn
            .execute(
                "INSERT INTO categories (name, description) VALUES (?1, ?2);",
                params![draft.name, draft.description],
            )
            .map_err(|err| {
                unique_conflict(err, || format!("category `{}` already exists", draft.name))
            })?;
        let id = CategoryId::new(self.conn.last_insert_rowid());
        load_required(self.get_category(id)?, EntityRef::Category(id))
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                &format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_category_row,
            )
            .optional()?;
        Ok(category)
    }

    fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                &format!("{CATEGORY_SELECT_SQL} WHERE name = ?1;"),
                [name],
                parse_category_row,
            )
            .optional()?;
        Ok(category)
    }

    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CATEGORY_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let categories = stmt
            .query_map([], parse_category_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn update_category(&self, id: CategoryId, draft: &CategoryDraft) -> RepoResult<Category> {
        let changed = self
            .conn
            .execute(
                "UPDATE categories SET name = ?2, description = ?3 WHERE id = ?1;",
                params![id, draft.name, draft.description],
            )
            .map_err(|err| {
                unique_conflict(err, || format!("category `{}` already exists", draft.name))
            })?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Category(id)));
        }
        load_required(self.get_category(id)?, EntityRef::Category(id))
    }

    fn delete_category(&self, id: CategoryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM categories WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Category(id)));
        }
        Ok(())
    }

    fn create_cell(&self, draft: &CellDraft) -> RepoResult<Cell> {
        draft.validate()?;
        self.conn
            .execute(
                "INSERT INTO cells (zone_id, row_number, cell_number, capacity, current_fill)
                 VALUES (?1, ?2, ?3, ?4, 0);",
                params![
                    draft.zone_id,
                    draft.row_number,
                    draft.cell_number,
                    draft.capacity
                ],
            )
            .map_err(|err| unique_conflict(err, || address_conflict(draft)))?;
        let id = CellId::new(self.conn.last_insert_rowid());
        load_required(self.get_cell(id)?, EntityRef::Cell(id))
    }

    fn get_cell(&self, id: CellId) -> RepoResult<Option<Cell>> {
        let cell = self
            .conn
            .query_row(
                &format!("{CELL_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_cell_row,
            )
            .optional()?;
        Ok(cell)
    }

    fn list_cells(&self) -> RepoResult<Vec<Cell>> {
        self.query_cells(&format!(
            "{CELL_SELECT_SQL} ORDER BY zone_id ASC, row_number ASC, cell_number ASC;"
        ))
    }

    fn list_empty_cells(&self) -> RepoResult<Vec<Cell>> {
        self.query_cells(&format!(
            "{CELL_SELECT_SQL}
             WHERE current_fill = 0
             ORDER BY zone_id ASC, row_number ASC, cell_number ASC;"
        ))
    }

    fn update_cell(&self, id: CellId, draft: &CellDraft) -> RepoResult<Cell> {
        draft.validate()?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current_fill: i64 = tx
            .query_row(
                "SELECT current_fill FROM cells WHERE id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RepoError::NotFound(EntityRef::Cell(id)))?;
        if draft.capacity < current_fill {
            return Err(RepoError::CapacityBelowFill {
                cell: id,
                capacity: draft.capacity,
                current_fill,
            });
        }
        tx.execute(
            "UPDATE cells
             SET zone_id = ?2, row_number = ?3, cell_number = ?4, capacity = ?5
             WHERE id = ?1;",
            params![
                id,
                draft.zone_id,
                draft.row_number,
                draft.cell_number,
                draft.capacity
            ],
        )
        .map_err(|err| unique_conflict(err, || address_conflict(draft)))?;
        tx.commit()?;
        load_required(self.get_cell(id)?, EntityRef::Cell(id))
    }

    fn delete_cell(&self, id: CellId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let records: i64 = tx.query_row(
            "SELECT COUNT(*) FROM inventory WHERE cell_id = ?1;",
            [id],
            |row| row.get(0),
        )?;
        if records > 0 {
            return Err(RepoError::InUse {
                entity: EntityRef::Cell(id),
                by: "inventory",
            });
        }
        if count_referencing(&tx, ReferenceColumn::Cell, id.get())? > 0 {
            return Err(RepoError::InUse {
                entity: EntityRef::Cell(id),
                by: "operation log",
            });
        }
        let changed = tx.execute("DELETE FROM cells WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Cell(id)));
        }
        tx.commit()?;
        Ok(())
    }

    fn create_product(&self, draft: &ProductDraft) -> RepoResult<Product> {
        self.conn
            .execute(
                "INSERT INTO products (name, sku, unit, category_id) VALUES (?1, ?2, ?3, ?4);",
                params![draft.name, draft.sku, draft.unit, draft.category_id],
            )
            .map_err(|err| unique_conflict(err, || format!("sku `{}` already exists", draft.sku)))?;
        let id = ProductId::new(self.conn.last_insert_rowid());
        load_required(self.get_product(id)?, EntityRef::Product(id))
    }

    fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let product = self
            .conn
            .query_row(
                &format!("{PRODUCT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_product_row,
            )
            .optional()?;
        Ok(product)
    }

    fn get_product_by_sku(&self, sku: &str) -> RepoResult<Option<Product>> {
        let product = self
            .conn
            .query_row(
                &format!("{PRODUCT_SELECT_SQL} WHERE sku = ?1;"),
                [sku.trim()],
                parse_product_row,
            )
            .optional()?;
        Ok(product)
    }

    fn list_products(&self) -> RepoResult<Vec<Product>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PRODUCT_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let products = stmt
            .query_map([], parse_product_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    fn update_product(&self, id: ProductId, draft: &ProductDraft) -> RepoResult<Product> {
        let changed = self
            .conn
            .execute(
                "UPDATE products SET name = ?2, sku = ?3, unit = ?4, category_id = ?5 WHERE id = ?1;",
                params![id, draft.name, draft.sku, draft.unit, draft.category_id],
            )
            .map_err(|err| unique_conflict(err, || format!("sku `{}` already exists", draft.sku)))?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Product(id)));
        }
        load_required(self.get_product(id)?, EntityRef::Product(id))
    }

    fn delete_product(&self, id: ProductId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let records: i64 = tx.query_row(
            "SELECT COUNT(*) FROM inventory WHERE product_id = ?1;",
            [id],
            |row| row.get(0),
        )?;
        if records > 0 {
            return Err(RepoError::InUse {
                entity: EntityRef::Product(id),
                by: "inventory",
            });
        }
        if count_referencing(&tx, ReferenceColumn::Product, id.get())? > 0 {
            return Err(RepoError::InUse {
                entity: EntityRef::Product(id),
                by: "operation log",
            });
        }
        let changed = tx.execute("DELETE FROM products WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Product(id)));
        }
        tx.commit()?;
        Ok(())
    }
}

impl SqliteCatalogRepository<'_> {
    fn query_cells(&self, sql: &str) -> RepoResult<Vec<Cell>> {
        let mut stmt = self.conn.prepare(sql)?;
        let cells = stmt
            .query_map([], parse_cell_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cells)
    }
}

fn load_required<T>(value: Option<T>, entity: EntityRef) -> RepoResult<T> {
    value.ok_or(RepoError::NotFound(entity))
}

fn address_conflict(draft: &CellDraft) -> String {
    format!(
        "zone {} already has a cell at row {} number {}",
        draft.zone_id, draft.row_number, draft.cell_number
    )
}

fn parse_zone_row(row: &Row<'_>) -> rusqlite::Result<Zone> {
    Ok(Zone {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
    })
}

fn parse_category_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_cell_row(row: &Row<'_>) -> rusqlite::Result<Cell> {
    Ok(Cell {
        id: row.get("id")?,
        zone_id: row.get("zone_id")?,
        row_number: row.get("row_number")?,
        cell_number: row.get("cell_number")?,
        capacity: row.get("capacity")?,
        current_fill: row.get("current_fill")?,
    })
}

fn parse_product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get("id")?,
        name: row.get("name")?,
        sku: row.get("sku")?,
        unit: row.get("unit")?,
        category_id: row.get("category_id")?,
    })
}
