use chrono::Duration;
use uuid::Uuid;

use super::errors::DomainError;
use super::journal::{JournalEntry, NewJournalEntry, StockAdjustment};
use super::order::{NewOrder, Order, OrderPatch};
use super::product::Product;

/// Order Record Store.
pub trait OrderRepository: Send + Sync + 'static {
    /// Fails with `DuplicateInvoiceId` when the invoice id is taken.
    fn create(&self, order: NewOrder) -> Result<Order, DomainError>;
    fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Order>, DomainError>;
    /// Merges `patch`; fails with `VersionConflict` when `patch.expected_version`
    /// no longer matches.
    fn update(&self, invoice_id: &str, patch: &OrderPatch) -> Result<Option<Order>, DomainError>;
    fn delete(&self, invoice_id: &str) -> Result<Option<Order>, DomainError>;
    /// All orders, newest first.
    fn list_all(&self) -> Result<Vec<Order>, DomainError>;
}

/// Inventory Ledger: sole mutation entry point for product stock.
pub trait InventoryLedger: Send + Sync + 'static {
    fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, DomainError>;
    /// Applies `delta` as one atomic increment and returns the resulting stock.
    fn adjust(&self, product_id: Uuid, delta: i32) -> Result<i32, DomainError>;
    /// Whether decrements may take stock below zero.
    fn allows_negative_stock(&self) -> bool;
}

/// Durable record of sagas that stopped part-way.
pub trait ReconciliationJournal: Send + Sync + 'static {
    fn record(&self, entry: NewJournalEntry) -> Result<JournalEntry, DomainError>;
    fn find(&self, id: Uuid) -> Result<Option<JournalEntry>, DomainError>;
    fn has_pending(&self, invoice_id: &str) -> Result<bool, DomainError>;
    /// Unresolved entries, oldest first.
    fn list_pending(&self) -> Result<Vec<JournalEntry>, DomainError>;
    fn update_progress(
        &self,
        id: Uuid,
        remaining: &[StockAdjustment],
        last_error: &str,
    ) -> Result<(), DomainError>;
    /// Takes the entry for one replay until `lease` runs out or it is released.
    /// False when the entry is resolved, unknown or already held.
    fn claim(&self, id: Uuid, lease: Duration) -> Result<bool, DomainError>;
    fn release(&self, id: Uuid) -> Result<(), DomainError>;
    fn mark_resolved(&self, id: Uuid) -> Result<Option<JournalEntry>, DomainError>;
}
