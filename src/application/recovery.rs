use chrono::Duration;
use log::{info, warn};
use uuid::Uuid;

use super::order_service::OrderService;
use crate::domain::errors::DomainError;
use crate::domain::journal::{JournalEntry, PendingAction};
use crate::domain::ports::{InventoryLedger, OrderRepository, ReconciliationJournal};

/// How long one replay may hold a journal entry before another may take it over.
pub const REPLAY_LEASE_SECS: i64 = 300;

impl<R, L, J> OrderService<R, L, J>
where
    R: OrderRepository,
    L: InventoryLedger,
    J: ReconciliationJournal,
{
    pub fn pending_reconciliations(&self) -> Result<Vec<JournalEntry>, DomainError> {
        self.journal.list_pending()
    }

    /// Drives a stopped saga forward: applies the outstanding adjustments in
    /// order, then the owed document write, then marks the entry resolved.
    ///
    /// The entry is claimed for the whole replay, so a concurrent replay of the
    /// same entry gets `ReplayInProgress` instead of applying stock again.
    /// Progress is stored after every adjustment; a later replay resumes from
    /// the first step that did not go through.
    pub fn replay_reconciliation(&self, id: Uuid) -> Result<JournalEntry, DomainError> {
        if !self.journal.claim(id, Duration::seconds(REPLAY_LEASE_SECS))? {
            let entry = self
                .journal
                .find(id)?
                .ok_or(DomainError::JournalEntryNotFound)?;
            if entry.resolved {
                return Ok(entry);
            }
            return Err(DomainError::ReplayInProgress(id));
        }

        // Read under the claim: an earlier replay may have moved the entry on.
        let result = self
            .journal
            .find(id)
            .and_then(|entry| entry.ok_or(DomainError::JournalEntryNotFound))
            .and_then(|entry| self.replay_claimed(entry));

        if result.is_err() {
            if let Err(err) = self.journal.release(id) {
                warn!("Could not release reconciliation entry {}: {}", id, err);
            }
        }
        result
    }

    fn replay_claimed(&self, entry: JournalEntry) -> Result<JournalEntry, DomainError> {
        let id = entry.id;
        if entry.resolved {
            return Ok(entry);
        }

        for (index, adjustment) in entry.remaining.iter().enumerate() {
            if let Err(err) = self.apply(adjustment) {
                warn!("Replay of reconciliation entry {} failed: {}", id, err);
                self.journal
                    .update_progress(id, &entry.remaining[index..], &err.to_string())?;
                return Err(err);
            }
            self.journal
                .update_progress(id, &entry.remaining[index + 1..], &entry.last_error)?;
        }

        if let Err(err) = self.complete_document_write(&entry) {
            warn!("Replay of reconciliation entry {} failed: {}", id, err);
            self.journal.update_progress(id, &[], &err.to_string())?;
            return Err(err);
        }

        info!(
            "Replayed {} of order {} (entry {})",
            entry.operation, entry.invoice_id, id
        );
        self.journal
            .mark_resolved(id)?
            .ok_or(DomainError::JournalEntryNotFound)
    }

    /// Closes an entry after an operator fixed the stock by hand.
    pub fn resolve_reconciliation(&self, id: Uuid) -> Result<JournalEntry, DomainError> {
        let entry = self
            .journal
            .mark_resolved(id)?
            .ok_or(DomainError::JournalEntryNotFound)?;
        info!(
            "Reconciliation entry {} for order {} resolved manually",
            id, entry.invoice_id
        );
        Ok(entry)
    }

    fn complete_document_write(&self, entry: &JournalEntry) -> Result<(), DomainError> {
        match &entry.pending_action {
            PendingAction::Nothing => Ok(()),
            PendingAction::ApplyPatch { patch } => {
                // The version was checked when the saga started.
                let mut patch = patch.clone();
                patch.expected_version = None;
                self.repo
                    .update(&entry.invoice_id, &patch)?
                    .map(|_| ())
                    .ok_or(DomainError::OrderNotFound)
            }
            PendingAction::RemoveOrder => {
                if self.repo.delete(&entry.invoice_id)?.is_none() {
                    warn!(
                        "Order {} was already gone when replaying entry {}",
                        entry.invoice_id, entry.id
                    );
                }
                Ok(())
            }
        }
    }
}
