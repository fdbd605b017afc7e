use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::OrderPatch;

/// Signed change to a product's stock counter (negative deducts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub delta: i32,
}

impl StockAdjustment {
    pub fn inverse(self) -> Self {
        Self {
            product_id: self.product_id,
            delta: -self.delta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaOperation {
    Create,
    Update,
    Delete,
}

impl SagaOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaOperation::Create => "create",
            SagaOperation::Update => "update",
            SagaOperation::Delete => "delete",
        }
    }
}

impl fmt::Display for SagaOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SagaOperation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(SagaOperation::Create),
            "update" => Ok(SagaOperation::Update),
            "delete" => Ok(SagaOperation::Delete),
            other => Err(DomainError::Persistence(format!(
                "unknown saga operation '{}'",
                other
            ))),
        }
    }
}

/// Order document write still owed once the remaining adjustments are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingAction {
    Nothing,
    ApplyPatch { patch: OrderPatch },
    RemoveOrder,
}

/// A saga that stopped after committing part of its work.
#[derive(Debug, Clone)]
pub struct NewJournalEntry {
    pub invoice_id: String,
    pub operation: SagaOperation,
    pub remaining: Vec<StockAdjustment>,
    pub pending_action: PendingAction,
    pub last_error: String,
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub id: Uuid,
    pub invoice_id: String,
    pub operation: SagaOperation,
    pub remaining: Vec<StockAdjustment>,
    pub pending_action: PendingAction,
    pub last_error: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
