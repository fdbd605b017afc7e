use chrono::{Duration, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::journal::{JournalEntry, NewJournalEntry, StockAdjustment};
use crate::domain::ports::ReconciliationJournal;
use crate::schema::reconciliation_journal;

use super::models::{JournalRow, NewJournalRow};

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, DomainError> {
    serde_json::to_value(value).map_err(|e| DomainError::Persistence(e.to_string()))
}

impl TryFrom<JournalRow> for JournalEntry {
    type Error = DomainError;

    fn try_from(row: JournalRow) -> Result<Self, Self::Error> {
        let corrupt = |e: serde_json::Error| {
            DomainError::Persistence(format!("journal entry {} is unreadable: {}", row.id, e))
        };
        Ok(JournalEntry {
            id: row.id,
            operation: row.operation.parse()?,
            remaining: serde_json::from_value(row.remaining.clone()).map_err(corrupt)?,
            pending_action: serde_json::from_value(row.pending_action.clone()).map_err(corrupt)?,
            invoice_id: row.invoice_id,
            last_error: row.last_error,
            resolved: row.resolved,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Reconciliation journal in the `reconciliation_journal` table.
pub struct DieselReconciliationJournal {
    pool: DbPool,
}

impl DieselReconciliationJournal {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ReconciliationJournal for DieselReconciliationJournal {
    fn record(&self, entry: NewJournalEntry) -> Result<JournalEntry, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(reconciliation_journal::table)
            .values(&NewJournalRow {
                id: Uuid::new_v4(),
                invoice_id: entry.invoice_id,
                operation: entry.operation.as_str().to_string(),
                remaining: to_json(&entry.remaining)?,
                pending_action: to_json(&entry.pending_action)?,
                last_error: entry.last_error,
            })
            .returning(JournalRow::as_returning())
            .get_result(&mut conn)?;
        JournalEntry::try_from(row)
    }

    fn find(&self, id: Uuid) -> Result<Option<JournalEntry>, DomainError> {
        let mut conn = self.pool.get()?;

        reconciliation_journal::table
            .find(id)
            .select(JournalRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(JournalEntry::try_from)
            .transpose()
    }

    fn has_pending(&self, invoice_id: &str) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let pending = diesel::select(diesel::dsl::exists(
            reconciliation_journal::table
                .filter(reconciliation_journal::invoice_id.eq(invoice_id))
                .filter(reconciliation_journal::resolved.eq(false)),
        ))
        .get_result(&mut conn)?;
        Ok(pending)
    }

    fn list_pending(&self) -> Result<Vec<JournalEntry>, DomainError> {
        let mut conn = self.pool.get()?;

        reconciliation_journal::table
            .filter(reconciliation_journal::resolved.eq(false))
            .order(reconciliation_journal::created_at.asc())
            .select(JournalRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(JournalEntry::try_from)
            .collect()
    }

    fn update_progress(
        &self,
        id: Uuid,
        remaining: &[StockAdjustment],
        last_error: &str,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(reconciliation_journal::table.find(id))
            .set((
                reconciliation_journal::remaining.eq(to_json(&remaining)?),
                reconciliation_journal::last_error.eq(last_error),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::JournalEntryNotFound);
        }
        Ok(())
    }

    fn claim(&self, id: Uuid, lease: Duration) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let now = Utc::now();

        // Check and take in one statement; a held or resolved entry matches no row.
        let claimed = diesel::update(
            reconciliation_journal::table
                .find(id)
                .filter(reconciliation_journal::resolved.eq(false))
                .filter(reconciliation_journal::claimed_until.le(now)),
        )
        .set(reconciliation_journal::claimed_until.eq(now + lease))
        .execute(&mut conn)?;
        Ok(claimed == 1)
    }

    fn release(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(reconciliation_journal::table.find(id))
            .set(reconciliation_journal::claimed_until.eq(Utc::now()))
            .execute(&mut conn)?;
        Ok(())
    }

    fn mark_resolved(&self, id: Uuid) -> Result<Option<JournalEntry>, DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(reconciliation_journal::table.find(id))
            .set(reconciliation_journal::resolved.eq(true))
            .returning(JournalRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(JournalEntry::try_from)
            .transpose()
    }
}
