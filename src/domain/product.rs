use bigdecimal::BigDecimal;
use uuid::Uuid;

/// Catalog record as seen by the order core. Only `stock` is ever written here.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub vat: BigDecimal,
    pub stock: i32,
}
