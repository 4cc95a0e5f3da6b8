//! Catalog administration use-case service.
//!
//! # Responsibility
//! - Validate and normalize catalog input above the repository layer.
//! - Check references (zone of a cell, category of a product) before writes.
//!
//! # Invariants
//! - Drafts reach the repository only after `normalized()` / `validate()`.
//! - The service never writes inventory or cell fill.

use crate::model::catalog::{
    Category, CategoryDraft, Cell, CellDraft, Product, ProductDraft, Zone, ZoneDraft,
};
use crate::model::id::{CategoryId, CellId, ProductId, ZoneId};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::EntityRef;
use crate::service::error::CatalogError;
use log::info;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog service facade.
pub struct CatalogService<R: CatalogRepository> {
    repo: R,
}

impl<R: CatalogRepository> CatalogService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_zone(&self, draft: &ZoneDraft) -> CatalogResult<Zone> {
        let zone = self.repo.create_zone(&draft.normalized()?)?;
        log_write("create_zone", zone.id);
        Ok(zone)
    }

    pub fn get_zone(&self, id: ZoneId) -> CatalogResult<Zone> {
        self.repo
            .get_zone(id)?
            .ok_or(CatalogError::NotFound(EntityRef::Zone(id)))
    }

    pub fn list_zones(&self) -> CatalogResult<Vec<Zone>> {
        Ok(self.repo.list_zones()?)
    }

    /// Relabels a zone; its cells are untouched.
    pub fn update_zone(&self, id: ZoneId, draft: &ZoneDraft) -> CatalogResult<Zone> {
        let zone = self.repo.update_zone(id, &draft.normalized()?)?;
        log_write("update_zone", id);
        Ok(zone)
    }

    /// Deletes a zone that has no cells.
    pub fn delete_zone(&self, id: ZoneId) -> CatalogResult<()> {
        self.repo.delete_zone(id)?;
        log_write("delete_zone", id);
        Ok(())
    }

    pub fn create_category(&self, draft: &CategoryDraft) -> CatalogResult<Category> {
        let category = self.repo.create_category(&draft.normalized()?)?;
        log_write("create_category", category.id);
        Ok(category)
    }

    pub fn get_category(&self, id: CategoryId) -> CatalogResult<Category> {
        self.repo
            .get_category(id)?
            .ok_or(CatalogError::NotFound(EntityRef::Category(id)))
    }

    /// Categories ordered by name.
    pub fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        Ok(self.repo.list_categories()?)
    }

    pub fn update_category(&self, id: CategoryId, draft: &CategoryDraft) -> CatalogResult<Category> {
        let category = self.repo.update_category(id, &draft.normalized()?)?;
        log_write("update_category", id);
        Ok(category)
    }

    /// Deletes a category. Products keep existing with no category.
    pub fn delete_category(&self, id: CategoryId) -> CatalogResult<()> {
        self.repo.delete_category(id)?;
        log_write("delete_category", id);
        Ok(())
    }

    /// Returns the category named `name`, creating it when missing.
    pub fn find_or_create_category(&self, name: &str) -> CatalogResult<Category> {
        let draft = CategoryDraft {
            name: name.to_string(),
            description: None,
        }
        .normalized()?;
        if let Some(existing) = self.repo.find_category_by_name(&draft.name)? {
            return Ok(existing);
        }
        self.create_category(&draft)
    }

    /// Creates a cell in an existing zone. New cells start empty.
    pub fn create_cell(&self, draft: &CellDraft) -> CatalogResult<Cell> {
        draft.validate()?;
        self.get_zone(draft.zone_id)?;
        let cell = self.repo.create_cell(draft)?;
        log_write("create_cell", cell.id);
        Ok(cell)
    }

    pub fn get_cell(&self, id: CellId) -> CatalogResult<Cell> {
        self.repo
            .get_cell(id)?
            .ok_or(CatalogError::NotFound(EntityRef::Cell(id)))
    }

    /// Cells ordered by zone, row and number.
    pub fn list_cells(&self) -> CatalogResult<Vec<Cell>> {
        Ok(self.repo.list_cells()?)
    }

    /// Cells with no stock, in address order.
    pub fn list_empty_cells(&self) -> CatalogResult<Vec<Cell>> {
        Ok(self.repo.list_empty_cells()?)
    }

    /// Moves or resizes a cell. Capacity may not drop below current fill.
    pub fn update_cell(&self, id: CellId, draft: &CellDraft) -> CatalogResult<Cell> {
        draft.validate()?;
        self.get_zone(draft.zone_id)?;
        let cell = self.repo.update_cell(id, draft)?;
        log_write("update_cell", id);
        Ok(cell)
    }

    /// Deletes a cell with no inventory and no operation history.
    pub fn delete_cell(&self, id: CellId) -> CatalogResult<()> {
        self.repo.delete_cell(id)?;
        log_write("delete_cell", id);
        Ok(())
    }

    pub fn create_product(&self, draft: &ProductDraft) -> CatalogResult<Product> {
        let normalized = draft.normalized()?;
        self.ensure_category(normalized.category_id)?;
        let product = self.repo.create_product(&normalized)?;
        log_write("create_product", product.id);
        Ok(product)
    }

    /// Creates a product filed under the category named `category_name`,
    /// creating that category when missing. Overrides `draft.category_id`.
    pub fn create_product_in_category(
        &self,
        draft: &ProductDraft,
        category_name: &str,
    ) -> CatalogResult<Product> {
        let mut normalized = draft.normalized()?;
        normalized.category_id = Some(self.find_or_create_category(category_name)?.id);
        let product = self.repo.create_product(&normalized)?;
        log_write("create_product", product.id);
        Ok(product)
    }

    pub fn get_product(&self, id: ProductId) -> CatalogResult<Product> {
        self.repo
            .get_product(id)?
            .ok_or(CatalogError::NotFound(EntityRef::Product(id)))
    }

    pub fn get_product_by_sku(&self, sku: &str) -> CatalogResult<Option<Product>> {
        Ok(self.repo.get_product_by_sku(sku)?)
    }

    /// Products ordered by name.
    pub fn list_products(&self) -> CatalogResult<Vec<Product>> {
        Ok(self.repo.list_products()?)
    }

    pub fn update_product(&self, id: ProductId, draft: &ProductDraft) -> CatalogResult<Product> {
        let normalized = draft.normalized()?;
        self.ensure_category(normalized.category_id)?;
        let product = self.repo.update_product(id, &normalized)?;
        log_write("update_product", id);
        Ok(product)
    }

    /// Deletes a product with no inventory and no operation history.
    pub fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        self.repo.delete_product(id)?;
        log_write("delete_product", id);
        Ok(())
    }

    fn ensure_category(&self, category: Option<CategoryId>) -> CatalogResult<()> {
        if let Some(id) = category {
            self.get_category(id)?;
        }
        Ok(())
    }
}

fn log_write(action: &'static str, id: impl std::fmt::Display) {
    info!("event=catalog_write module=catalog status=ok action={action} id={id}");
}
