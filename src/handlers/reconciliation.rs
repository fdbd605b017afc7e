use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::journal::{JournalEntry, PendingAction};
use crate::errors::AppError;
use crate::AppService;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentResponse {
    pub product_id: Uuid,
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryResponse {
    pub id: Uuid,
    pub invoice_id: String,
    /// `create`, `update` or `delete`
    pub operation: String,
    /// Stock adjustments not yet applied, in order.
    pub remaining: Vec<AdjustmentResponse>,
    /// `nothing`, `apply_patch` or `remove_order`
    pub pending_action: String,
    pub last_error: String,
    pub resolved: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<JournalEntry> for JournalEntryResponse {
    fn from(entry: JournalEntry) -> Self {
        let pending_action = match entry.pending_action {
            PendingAction::Nothing => "nothing",
            PendingAction::ApplyPatch { .. } => "apply_patch",
            PendingAction::RemoveOrder => "remove_order",
        };
        Self {
            id: entry.id,
            invoice_id: entry.invoice_id,
            operation: entry.operation.to_string(),
            remaining: entry
                .remaining
                .iter()
                .map(|a| AdjustmentResponse {
                    product_id: a.product_id,
                    delta: a.delta,
                })
                .collect(),
            pending_action: pending_action.to_string(),
            last_error: entry.last_error,
            resolved: entry.resolved,
            created_at: entry.created_at.to_rfc3339(),
            updated_at: entry.updated_at.to_rfc3339(),
        }
    }
}

/// GET /reconciliation
///
/// Sagas that stopped part-way, oldest first.
#[utoipa::path(
    get,
    path = "/reconciliation",
    responses(
        (status = 200, description = "Unresolved entries", body = [JournalEntryResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "reconciliation"
)]
pub async fn list_pending(service: web::Data<AppService>) -> Result<HttpResponse, AppError> {
    let entries = web::block(move || service.pending_reconciliations()).await??;

    let body: Vec<JournalEntryResponse> =
        entries.into_iter().map(JournalEntryResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /reconciliation/{id}/replay
#[utoipa::path(
    post,
    path = "/reconciliation/{id}/replay",
    params(
        ("id" = Uuid, Path, description = "Journal entry UUID"),
    ),
    responses(
        (status = 200, description = "Entry replayed and resolved", body = JournalEntryResponse),
        (status = 404, description = "Entry, order or product not found"),
        (status = 409, description = "Another replay of this entry is running"),
        (status = 500, description = "Replay failed; progress is kept"),
    ),
    tag = "reconciliation"
)]
pub async fn replay(
    service: web::Data<AppService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let entry = web::block(move || service.replay_reconciliation(id)).await??;

    Ok(HttpResponse::Ok().json(JournalEntryResponse::from(entry)))
}

/// POST /reconciliation/{id}/resolve
///
/// Marks an entry resolved without touching stock.
#[utoipa::path(
    post,
    path = "/reconciliation/{id}/resolve",
    params(
        ("id" = Uuid, Path, description = "Journal entry UUID"),
    ),
    responses(
        (status = 200, description = "Entry resolved", body = JournalEntryResponse),
        (status = 404, description = "Entry not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "reconciliation"
)]
pub async fn resolve(
    service: web::Data<AppService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let entry = web::block(move || service.resolve_reconciliation(id)).await??;

    Ok(HttpResponse::Ok().json(JournalEntryResponse::from(entry)))
}
