use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Builds a human-readable invoice id such as `INV-20240501-134501-9F3A`.
///
/// The timestamp part is second-resolution UTC; the random suffix keeps
/// simultaneous checkouts apart. Uniqueness is still enforced by the store.
pub fn generate_invoice_id(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(4)
        .collect();
    format!("INV-{}-{}", now.format("%Y%m%d-%H%M%S"), suffix.to_uppercase())
}
