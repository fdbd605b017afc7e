use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::journal::StockAdjustment;
use super::pricing;
use super::product::Product;

/// Widest customer or line name the store accepts, in characters.
pub const MAX_NAME_LEN: usize = 255;
/// Widest phone number or payment type the store accepts, in characters.
pub const MAX_SHORT_TEXT_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Amount off per unit.
    #[default]
    Flat,
    /// Percentage of the line (or bill) base.
    Percentage,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Flat => "flat",
            DiscountType::Percentage => "percentage",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(DiscountType::Flat),
            "percentage" | "percent" => Ok(DiscountType::Percentage),
            other => Err(DomainError::InvalidRequest(format!(
                "unknown discount type '{}'",
                other
            ))),
        }
    }
}

/// Bill-level discount supplied at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub amount: BigDecimal,
    pub kind: DiscountType,
}

/// One product entry of an order. `name` and `unit_price` are the snapshot
/// taken when the line was confirmed and never follow later catalog edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub discount: BigDecimal,
    pub discount_type: DiscountType,
    pub free: bool,
}

impl OrderLineItem {
    pub fn payable(&self) -> BigDecimal {
        pricing::line_payable(self)
    }

    /// Ledger adjustment that confirming this line applies. Free lines never touch stock.
    pub fn deduction(&self) -> Option<StockAdjustment> {
        (!self.free).then(|| StockAdjustment {
            product_id: self.product_id,
            delta: -self.quantity,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub name: Option<String>,
    pub unit_price: Option<BigDecimal>,
    pub quantity: i32,
    pub discount: BigDecimal,
    pub discount_type: DiscountType,
    pub free: bool,
}

impl OrderLineInput {
    pub fn new(product_id: Uuid, quantity: i32) -> Self {
        Self {
            product_id,
            name: None,
            unit_price: None,
            quantity,
            discount: BigDecimal::zero(),
            discount_type: DiscountType::Flat,
            free: false,
        }
    }

    fn validate(&self, index: usize) -> Result<(), DomainError> {
        if self.quantity <= 0 {
            return Err(DomainError::InvalidRequest(format!(
                "items[{}]: quantity must be positive",
                index
            )));
        }
        if self.discount < BigDecimal::zero() {
            return Err(DomainError::InvalidRequest(format!(
                "items[{}]: discount must not be negative",
                index
            )));
        }
        if let Some(price) = &self.unit_price {
            if *price < BigDecimal::zero() {
                return Err(DomainError::InvalidRequest(format!(
                    "items[{}]: unit price must not be negative",
                    index
                )));
            }
        }
        check_len(
            &format!("items[{}].name", index),
            self.name.as_deref(),
            MAX_NAME_LEN,
        )
    }

    /// Whether the catalog must be consulted to complete the snapshot.
    pub fn needs_snapshot(&self) -> bool {
        self.name.is_none() || self.unit_price.is_none()
    }

    /// Freezes the line, filling any missing snapshot fields from `product`.
    pub fn into_line_item(self, product: Option<&Product>) -> Result<OrderLineItem, DomainError> {
        let name = match (self.name, product) {
            (Some(name), _) => name,
            (None, Some(p)) => p.name.clone(),
            (None, None) => return Err(DomainError::ProductNotFound(self.product_id)),
        };
        let unit_price = match (self.unit_price, product) {
            (Some(price), _) => price,
            (None, Some(p)) => p.price.clone(),
            (None, None) => return Err(DomainError::ProductNotFound(self.product_id)),
        };
        Ok(OrderLineItem {
            product_id: self.product_id,
            name,
            unit_price,
            quantity: self.quantity,
            discount: self.discount,
            discount_type: self.discount_type,
            free: self.free,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub invoice_id: String,
    pub invoice_date: DateTime<Utc>,
    pub items: Vec<OrderLineItem>,
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

impl Order {
    /// Sum of line payables, before any bill-level discount.
    pub fn computed_subtotal(&self) -> BigDecimal {
        pricing::subtotal(&self.items)
    }

    /// Adjustments that are outstanding while this order is active.
    pub fn deductions(&self) -> Vec<StockAdjustment> {
        deductions_for(&self.items)
    }

    /// Adjustments that undo [`Order::deductions`].
    pub fn restorations(&self) -> Vec<StockAdjustment> {
        self.deductions().into_iter().map(StockAdjustment::inverse).collect()
    }
}

pub fn deductions_for(items: &[OrderLineItem]) -> Vec<StockAdjustment> {
    items.iter().filter_map(OrderLineItem::deduction).collect()
}

/// Order document as handed to the store on creation.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub invoice_id: String,
    pub invoice_date: DateTime<Utc>,
    pub items: Vec<OrderLineItem>,
    pub total: BigDecimal,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub payment_type: String,
    pub cash_given: Option<BigDecimal>,
    pub balance: Option<BigDecimal>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateOrderInput {
    pub items: Vec<OrderLineInput>,
    pub total: Option<BigDecimal>,
    pub bill_discount: Option<Discount>,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub payment_type: Option<String>,
    pub cash_given: Option<BigDecimal>,
    pub balance: Option<BigDecimal>,
}

impl CreateOrderInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::InvalidRequest(
                "items must be a non-empty list".to_string(),
            ));
        }
        validate_lines(&self.items)?;
        if self.total.is_none() {
            return Err(DomainError::InvalidRequest("total is required".to_string()));
        }
        match self.payment_type.as_deref() {
            Some(p) if !p.trim().is_empty() => {}
            _ => {
                return Err(DomainError::InvalidRequest(
                    "paymentType is required".to_string(),
                ))
            }
        }
        check_contact_fields(
            self.customer_name.as_deref(),
            self.phone_number.as_deref(),
            self.payment_type.as_deref(),
        )?;
        validate_bill_discount(self.bill_discount.as_ref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOrderInput {
    pub items: Option<Vec<OrderLineInput>>,
    pub total: Option<BigDecimal>,
    pub bill_discount: Option<Discount>,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub payment_type: Option<String>,
    pub cash_given: Option<BigDecimal>,
    pub balance: Option<BigDecimal>,
    pub expected_version: Option<i32>,
}

impl UpdateOrderInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(items) = &self.items {
            if items.is_empty() {
                return Err(DomainError::InvalidRequest(
                    "items must be a non-empty list when supplied".to_string(),
                ));
            }
            validate_lines(items)?;
        }
        if let Some(payment_type) = &self.payment_type {
            if payment_type.trim().is_empty() {
                return Err(DomainError::InvalidRequest(
                    "paymentType must not be blank".to_string(),
                ));
            }
        }
        check_contact_fields(
            self.customer_name.as_deref(),
            self.phone_number.as_deref(),
            self.payment_type.as_deref(),
        )?;
        validate_bill_discount(self.bill_discount.as_ref())
    }
}

/// Field-by-field merge applied by the store. `items`, when present, replaces
/// the whole line list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub items: Option<Vec<OrderLineItem>>,
    pub total: Option<BigDecimal>,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub payment_type: Option<String>,
    pub cash_given: Option<BigDecimal>,
    pub balance: Option<BigDecimal>,
    pub expected_version: Option<i32>,
}

impl OrderPatch {
    /// Applies the patch to an in-memory copy; the store does the same in SQL.
    pub fn apply_to(&self, order: &mut Order) {
        if let Some(items) = &self.items {
            order.items = items.clone();
        }
        if let Some(total) = &self.total {
            order.total = total.clone();
        }
        if let Some(name) = &self.customer_name {
            order.customer_name = Some(name.clone());
        }
        if let Some(phone) = &self.phone_number {
            order.phone_number = Some(phone.clone());
        }
        if let Some(payment_type) = &self.payment_type {
            order.payment_type = payment_type.clone();
        }
        if let Some(cash) = &self.cash_given {
            order.cash_given = Some(cash.clone());
        }
        if let Some(balance) = &self.balance {
            order.balance = Some(balance.clone());
        }
        order.version += 1;
    }
}

fn validate_lines(items: &[OrderLineInput]) -> Result<(), DomainError> {
    items
        .iter()
        .enumerate()
        .try_for_each(|(i, line)| line.validate(i))
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<(), DomainError> {
    match value {
        Some(v) if v.chars().count() > max => Err(DomainError::InvalidRequest(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

fn check_contact_fields(
    customer_name: Option<&str>,
    phone_number: Option<&str>,
    payment_type: Option<&str>,
) -> Result<(), DomainError> {
    check_len("customerName", customer_name, MAX_NAME_LEN)?;
    check_len("phoneNumber", phone_number, MAX_SHORT_TEXT_LEN)?;
    check_len("paymentType", payment_type, MAX_SHORT_TEXT_LEN)
}

fn validate_bill_discount(discount: Option<&Discount>) -> Result<(), DomainError> {
    match discount {
        Some(d) if d.amount < BigDecimal::zero() => Err(DomainError::InvalidRequest(
            "bill discount must not be negative".to_string(),
        )),
        _ => Ok(()),
    }
}
