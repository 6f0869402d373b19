use std::collections::HashMap;

use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::ProductCatalog;
use crate::domain::view::ProductSummary;
use crate::schema::products;

use super::models::ProductRow;

impl From<ProductRow> for ProductSummary {
    fn from(row: ProductRow) -> Self {
        ProductSummary {
            id: row.id,
            name: row.name,
            image: row.image,
            price: row.price,
            stock: row.stock,
        }
    }
}

pub struct DieselProductCatalog {
    pool: DbPool,
}

impl DieselProductCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ProductCatalog for DieselProductCatalog {
    fn find_by_id(&self, id: Uuid) -> Result<Option<ProductSummary>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(ProductSummary::from))
    }

    fn find_many(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ProductSummary>, DomainError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.pool.get()?;

        let rows = products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load::<ProductRow>(&mut conn)?;
        Ok(rows
            .into_iter()
            .map(|row| (row.id, ProductSummary::from(row)))
            .collect())
    }
}
