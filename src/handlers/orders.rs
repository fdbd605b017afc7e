use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::order::{
    CreateOrderInput, Discount, DiscountType, Order, OrderLineInput, OrderLineItem,
    UpdateOrderInput,
};
use crate::errors::AppError;
use crate::AppService;

// ── Request / response DTOs ──────────────────────────────────────────────────

/// Decimal accepted either as a JSON string ("9.99") or a JSON number (9.99).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalInput {
    fn parse(&self, field: &str) -> Result<BigDecimal, AppError> {
        let raw = match self {
            DecimalInput::Text(s) => s.trim().to_string(),
            DecimalInput::Number(n) => n.to_string(),
        };
        BigDecimal::from_str(&raw)
            .map_err(|_| AppError::BadRequest(format!("{} must be numeric, got '{}'", field, raw)))
    }
}

fn parse_optional(value: &Option<DecimalInput>, field: &str) -> Result<Option<BigDecimal>, AppError> {
    value.as_ref().map(|v| v.parse(field)).transpose()
}

fn parse_discount_type(value: Option<&str>) -> Result<DiscountType, AppError> {
    value
        .map(DiscountType::from_str)
        .transpose()
        .map(Option::unwrap_or_default)
        .map_err(AppError::from)
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    /// Snapshot name; taken from the catalog when omitted.
    pub name: Option<String>,
    /// Snapshot unit price; taken from the catalog when omitted.
    #[schema(value_type = Option<String>, example = "9.99")]
    pub unit_price: Option<DecimalInput>,
    pub quantity: i32,
    /// Per-unit amount for `flat`, percent of the line base for `percentage`.
    #[schema(value_type = Option<String>, example = "0")]
    pub discount: Option<DecimalInput>,
    /// `flat` (default) or `percentage`.
    pub discount_type: Option<String>,
    #[serde(default)]
    pub free: bool,
}

impl OrderLineRequest {
    fn into_input(self, index: usize) -> Result<OrderLineInput, AppError> {
        let field = |name: &str| format!("items[{}].{}", index, name);
        Ok(OrderLineInput {
            product_id: self.product_id,
            name: self.name,
            unit_price: parse_optional(&self.unit_price, &field("unitPrice"))?,
            quantity: self.quantity,
            discount: parse_optional(&self.discount, &field("discount"))?
                .unwrap_or_else(|| BigDecimal::from(0)),
            discount_type: parse_discount_type(self.discount_type.as_deref())?,
            free: self.free,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BillDiscountRequest {
    #[schema(value_type = String, example = "10")]
    pub amount: DecimalInput,
    /// `flat` (default) or `percentage`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl BillDiscountRequest {
    fn into_discount(self) -> Result<Discount, AppError> {
        Ok(Discount {
            amount: self.amount.parse("billDiscount.amount")?,
            kind: parse_discount_type(self.kind.as_deref())?,
        })
    }
}

fn convert_lines(lines: Vec<OrderLineRequest>) -> Result<Vec<OrderLineInput>, AppError> {
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| line.into_input(i))
        .collect()
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    /// Grand total confirmed at checkout; stored as given.
    #[schema(value_type = Option<String>, example = "270.00")]
    pub total: Option<DecimalInput>,
    pub bill_discount: Option<BillDiscountRequest>,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub payment_type: Option<String>,
    #[schema(value_type = Option<String>)]
    pub cash_given: Option<DecimalInput>,
    #[schema(value_type = Option<String>)]
    pub balance: Option<DecimalInput>,
}

impl CreateOrderRequest {
    fn into_input(self) -> Result<CreateOrderInput, AppError> {
        Ok(CreateOrderInput {
            total: parse_optional(&self.total, "total")?,
            cash_given: parse_optional(&self.cash_given, "cashGiven")?,
            balance: parse_optional(&self.balance, "balance")?,
            bill_discount: self
                .bill_discount
                .map(BillDiscountRequest::into_discount)
                .transpose()?,
            items: convert_lines(self.items)?,
            customer_name: self.customer_name,
            phone_number: self.phone_number,
            payment_type: self.payment_type,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    /// Replaces every line when present.
    pub items: Option<Vec<OrderLineRequest>>,
    #[schema(value_type = Option<String>)]
    pub total: Option<DecimalInput>,
    pub bill_discount: Option<BillDiscountRequest>,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub payment_type: Option<String>,
    #[schema(value_type = Option<String>)]
    pub cash_given: Option<DecimalInput>,
    #[schema(value_type = Option<String>)]
    pub balance: Option<DecimalInput>,
    /// Rejects the update with 409 unless the stored version matches.
    pub expected_version: Option<i32>,
}

impl UpdateOrderRequest {
    fn into_input(self) -> Result<UpdateOrderInput, AppError> {
        Ok(UpdateOrderInput {
            total: parse_optional(&self.total, "total")?,
            cash_given: parse_optional(&self.cash_given, "cashGiven")?,
            balance: parse_optional(&self.balance, "balance")?,
            bill_discount: self
                .bill_discount
                .map(BillDiscountRequest::into_discount)
                .transpose()?,
            items: self.items.map(convert_lines).transpose()?,
            customer_name: self.customer_name,
            phone_number: self.phone_number,
            payment_type: self.payment_type,
            expected_version: self.expected_version,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: String,
    pub quantity: i32,
    pub discount: String,
    pub discount_type: String,
    pub free: bool,
    pub payable: String,
}

impl From<&OrderLineItem> for OrderLineResponse {
    fn from(item: &OrderLineItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            unit_price: item.unit_price.to_string(),
            quantity: item.quantity,
            discount: item.discount.to_string(),
            discount_type: item.discount_type.to_string(),
            free: item.free,
            payable: item.payable().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub invoice_id: String,
    pub invoice_date: String,
    pub items: Vec<OrderLineResponse>,
    pub total: String,
    /// Sum of line payables, before any bill-level discount.
    pub computed_subtotal: String,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub payment_type: String,
    pub cash_given: Option<String>,
    pub balance: Option<String>,
    pub version: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            items: order.items.iter().map(OrderLineResponse::from).collect(),
            computed_subtotal: order.computed_subtotal().to_string(),
            invoice_id: order.invoice_id,
            invoice_date: order.invoice_date.to_rfc3339(),
            total: order.total.to_string(),
            customer_name: order.customer_name,
            phone_number: order.phone_number,
            payment_type: order.payment_type,
            cash_given: order.cash_given.map(|c| c.to_string()),
            balance: order.balance.map(|b| b.to_string()),
            version: order.version,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOrderResponse {
    pub message: String,
    pub invoice_id: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Records the order, then deducts stock for every non-free line.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Referenced product not found"),
        (status = 409, description = "Insufficient stock under the strict policy"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    service: web::Data<AppService>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let input = body.into_inner().into_input()?;

    let order = web::block(move || service.create_order(input)).await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Returns every order, newest first, with its lines.
#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "All orders", body = [OrderResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(service: web::Data<AppService>) -> Result<HttpResponse, AppError> {
    let orders = web::block(move || service.list_orders()).await??;

    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /orders/{invoice_id}
#[utoipa::path(
    get,
    path = "/orders/{invoice_id}",
    params(
        ("invoice_id" = String, Path, description = "Invoice id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    service: web::Data<AppService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();

    let order = web::block(move || service.get_order(&invoice_id)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PUT /orders/{invoice_id}
///
/// Restores the stock held by the current lines, deducts the new line set and
/// saves the merged order.
#[utoipa::path(
    put,
    path = "/orders/{invoice_id}",
    params(
        ("invoice_id" = String, Path, description = "Invoice id"),
    ),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Order or product not found"),
        (status = 409, description = "Version conflict, pending reconciliation or insufficient stock"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn update_order(
    service: web::Data<AppService>,
    path: web::Path<String>,
    body: web::Json<UpdateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();
    let input = body.into_inner().into_input()?;

    let order = web::block(move || service.update_order(&invoice_id, input)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// DELETE /orders/{invoice_id}
///
/// Restores stock for every non-free line, then removes the order.
#[utoipa::path(
    delete,
    path = "/orders/{invoice_id}",
    params(
        ("invoice_id" = String, Path, description = "Invoice id"),
    ),
    responses(
        (status = 200, description = "Order deleted", body = DeleteOrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Reconciliation pending for this order"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn delete_order(
    service: web::Data<AppService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();

    let order = web::block(move || service.delete_order(&invoice_id)).await??;

    Ok(HttpResponse::Ok().json(DeleteOrderResponse {
        message: "Order deleted".to_string(),
        invoice_id: order.invoice_id,
    }))
}
