use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::InventoryLedger;
use crate::errors::AppError;
use crate::AppService;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub price: String,
    pub vat: String,
    pub stock: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockAdjustmentRequest {
    /// Signed change: negative deducts, positive restocks.
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockResponse {
    pub product_id: Uuid,
    pub stock: i32,
}

/// Zero is a no-op and `i32::MIN` has no opposite adjustment.
fn check_delta(delta: i32) -> Result<(), AppError> {
    if delta == 0 {
        return Err(AppError::BadRequest("delta must not be zero".to_string()));
    }
    if delta == i32::MIN {
        return Err(AppError::BadRequest(format!(
            "delta must be at least {}",
            i32::MIN + 1
        )));
    }
    Ok(())
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn get_product(
    service: web::Data<AppService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    let product = web::block(move || service.ledger().find_product(product_id))
        .await??
        .ok_or(DomainError::ProductNotFound(product_id))?;

    Ok(HttpResponse::Ok().json(ProductResponse {
        id: product.id,
        name: product.name,
        price: product.price.to_string(),
        vat: product.vat.to_string(),
        stock: product.stock,
    }))
}

/// POST /products/{id}/stock
///
/// Atomic stock adjustment for restocking and manual corrections.
#[utoipa::path(
    post,
    path = "/products/{id}/stock",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    request_body = StockAdjustmentRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = StockResponse),
        (status = 400, description = "Zero or out-of-range delta"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Insufficient stock under the strict policy"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn adjust_stock(
    service: web::Data<AppService>,
    path: web::Path<Uuid>,
    body: web::Json<StockAdjustmentRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let delta = body.into_inner().delta;
    check_delta(delta)?;

    let stock = web::block(move || service.ledger().adjust(product_id, delta)).await??;
    log::info!(
        "Manual stock adjustment of {} by {} (now {})",
        product_id,
        delta,
        stock
    );

    Ok(HttpResponse::Ok().json(StockResponse { product_id, stock }))
}
