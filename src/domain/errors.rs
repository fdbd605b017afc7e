use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Order not found")]
    OrderNotFound,
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),
    #[error("Reconciliation journal entry not found")]
    JournalEntryNotFound,
    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: Uuid, requested: i64 },
    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: i32, actual: i32 },
    #[error("Reconciliation entry {0} is being replayed")]
    ReplayInProgress(Uuid),
    #[error("Reconciliation pending for invoice {0}")]
    ReconciliationPending(String),
    #[error("Invoice id already exists: {0}")]
    DuplicateInvoiceId(String),
    #[error("Persistence failure: {0}")]
    Persistence(String),
    #[error("Ledger failure: {0}")]
    Ledger(String),
}

