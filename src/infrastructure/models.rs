use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::OrderLineItem;
use crate::domain::product::Product;
use crate::schema::{order_lines, orders, products, reconciliation_journal};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub invoice_id: String,
    pub invoice_date: DateTime<Utc>,
    pub total: BigDecimal,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub payment_type: String,
    pub cash_given: Option<BigDecimal>,
    pub balance: Option<BigDecimal>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub invoice_id: String,
    pub invoice_date: DateTime<Utc>,
    pub total: BigDecimal,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub payment_type: String,
    pub cash_given: Option<BigDecimal>,
    pub balance: Option<BigDecimal>,
}

/// Scalar part of an order patch; `None` fields are left untouched.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderChangeset {
    pub total: Option<BigDecimal>,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub payment_type: Option<String>,
    pub cash_given: Option<BigDecimal>,
    pub balance: Option<BigDecimal>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub discount: BigDecimal,
    pub discount_type: String,
    pub free: bool,
}

impl TryFrom<OrderLineRow> for OrderLineItem {
    type Error = DomainError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let discount_type = row.discount_type.parse().map_err(|_| {
            DomainError::Persistence(format!(
                "order line {} has unknown discount type '{}'",
                row.id, row.discount_type
            ))
        })?;
        Ok(OrderLineItem {
            product_id: row.product_id,
            name: row.name,
            unit_price: row.unit_price,
            quantity: row.quantity,
            discount: row.discount,
            discount_type,
            free: row.free,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub discount: BigDecimal,
    pub discount_type: String,
    pub free: bool,
}

impl NewOrderLineRow {
    pub fn from_item(order_id: Uuid, position: usize, item: &OrderLineItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            position: position as i32,
            product_id: item.product_id,
            name: item.name.clone(),
            unit_price: item.unit_price.clone(),
            quantity: item.quantity,
            discount: item.discount.clone(),
            discount_type: item.discount_type.as_str().to_string(),
            free: item.free,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub vat: BigDecimal,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            vat: row.vat,
            stock: row.stock,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = reconciliation_journal)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JournalRow {
    pub id: Uuid,
    pub invoice_id: String,
    pub operation: String,
    pub remaining: Value,
    pub pending_action: Value,
    pub last_error: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reconciliation_journal)]
pub struct NewJournalRow {
    pub id: Uuid,
    pub invoice_id: String,
    pub operation: String,
    pub remaining: Value,
    pub pending_action: Value,
    pub last_error: String,
}
