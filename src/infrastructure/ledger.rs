use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::InventoryLedger;
use crate::domain::product::Product;
use crate::schema::products;

use super::models::ProductRow;

fn ledger_failure(e: impl std::fmt::Display) -> DomainError {
    DomainError::Ledger(e.to_string())
}

/// Stock counter on the `products` table.
///
/// Every adjustment is one `UPDATE products SET stock = stock + $delta`, so
/// concurrent orders touching the same product cannot lose each other's writes.
/// Under the strict policy a decrement additionally carries `stock >= -$delta`
/// in its `WHERE` clause.
pub struct DieselInventoryLedger {
    pool: DbPool,
    allow_negative: bool,
}

impl DieselInventoryLedger {
    pub fn new(pool: DbPool, allow_negative: bool) -> Self {
        Self {
            pool,
            allow_negative,
        }
    }
}

impl InventoryLedger for DieselInventoryLedger {
    fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = products::table
            .find(product_id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn adjust(&self, product_id: Uuid, delta: i32) -> Result<i32, DomainError> {
        let requested = -i64::from(delta);
        let mut conn = self.pool.get().map_err(ledger_failure)?;
        let target = products::table.filter(products::id.eq(product_id));

        let stock = if self.allow_negative || delta >= 0 {
            diesel::update(target)
                .set(products::stock.eq(products::stock + delta))
                .returning(products::stock)
                .get_result::<i32>(&mut conn)
                .optional()
        } else {
            // `delta = i32::MIN` has no i32 negation and no stock can cover it.
            match delta.checked_neg() {
                Some(needed) => diesel::update(target.filter(products::stock.ge(needed)))
                    .set(products::stock.eq(products::stock + delta))
                    .returning(products::stock)
                    .get_result::<i32>(&mut conn)
                    .optional(),
                None => Ok(None),
            }
        }
        .map_err(ledger_failure)?;

        match stock {
            Some(stock) => Ok(stock),
            None => {
                let exists: bool = diesel::select(diesel::dsl::exists(
                    products::table.filter(products::id.eq(product_id)),
                ))
                .get_result(&mut conn)
                .map_err(ledger_failure)?;
                if exists {
                    Err(DomainError::InsufficientStock {
                        product_id,
                        requested,
                    })
                } else {
                    Err(DomainError::ProductNotFound(product_id))
                }
            }
        }
    }

    fn allows_negative_stock(&self) -> bool {
        self.allow_negative
    }
}
