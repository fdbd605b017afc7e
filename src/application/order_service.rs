use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::invoice::generate_invoice_id;
use crate::domain::journal::{NewJournalEntry, PendingAction, SagaOperation, StockAdjustment};
use crate::domain::order::{
    deductions_for, CreateOrderInput, Discount, NewOrder, Order, OrderLineInput, OrderLineItem,
    OrderPatch, UpdateOrderInput,
};
use crate::domain::ports::{InventoryLedger, OrderRepository, ReconciliationJournal};
use crate::domain::pricing;
use crate::domain::product::Product;

/// Attempts at finding a free invoice id before giving up.
pub const MAX_INVOICE_ATTEMPTS: usize = 3;

/// Keeps product stock in line with the live orders.
///
/// Every operation is a short saga over the store and the ledger:
///
/// * create: persist the order, then deduct each non-free line;
/// * update: restore the current lines, deduct the new set, then persist;
/// * delete: restore the current lines, then remove the order.
///
/// Committed steps are never rolled back. When a later step fails the unapplied
/// remainder is written to the reconciliation journal and the error is returned.
pub struct OrderService<R, L, J> {
    pub(super) repo: R,
    pub(super) ledger: L,
    pub(super) journal: J,
}

impl<R, L, J> OrderService<R, L, J>
where
    R: OrderRepository,
    L: InventoryLedger,
    J: ReconciliationJournal,
{
    pub fn new(repo: R, ledger: L, journal: J) -> Self {
        Self {
            repo,
            ledger,
            journal,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn create_order(&self, input: CreateOrderInput) -> Result<Order, DomainError> {
        input.validate()?;
        let total = input
            .total
            .clone()
            .ok_or_else(|| DomainError::InvalidRequest("total is required".to_string()))?;
        let payment_type = input.payment_type.clone().unwrap_or_default();

        let (items, products) = self.freeze_lines(input.items)?;
        self.check_availability(&deductions_for(&items), &products)?;

        let order = self.persist_new(NewOrder {
            invoice_id: String::new(),
            invoice_date: Utc::now(),
            items,
            total,
            customer_name: input.customer_name,
            phone_number: input.phone_number,
            payment_type,
            cash_given: input.cash_given,
            balance: input.balance,
        })?;
        audit_total(
            &order.invoice_id,
            &order.items,
            input.bill_discount.as_ref(),
            &order.total,
        );

        self.apply_plan(
            &order.invoice_id,
            SagaOperation::Create,
            &order.deductions(),
            PendingAction::Nothing,
        )?;

        info!(
            "Created order {} with {} line(s), total {}",
            order.invoice_id,
            order.items.len(),
            order.total
        );
        Ok(order)
    }

    pub fn get_order(&self, invoice_id: &str) -> Result<Order, DomainError> {
        self.repo
            .find_by_invoice_id(invoice_id)?
            .ok_or(DomainError::OrderNotFound)
    }

    pub fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        self.repo.list_all()
    }

    pub fn update_order(
        &self,
        invoice_id: &str,
        input: UpdateOrderInput,
    ) -> Result<Order, DomainError> {
        input.validate()?;
        let existing = self.get_order(invoice_id)?;
        self.ensure_no_pending(invoice_id)?;
        if let Some(expected) = input.expected_version {
            if expected != existing.version {
                return Err(DomainError::VersionConflict {
                    expected,
                    actual: existing.version,
                });
            }
        }

        let (new_items, products) = match input.items {
            Some(lines) => {
                let (items, products) = self.freeze_lines(lines)?;
                (Some(items), products)
            }
            None => (None, HashMap::new()),
        };

        // Full reversal plus the deductions of whichever line set the order ends up with.
        let plan = update_plan(
            existing.restorations(),
            deductions_for(new_items.as_deref().unwrap_or(&existing.items)),
        );
        self.check_availability(&plan, &products)?;

        if let Some(total) = &input.total {
            audit_total(
                invoice_id,
                new_items.as_deref().unwrap_or(&existing.items),
                input.bill_discount.as_ref(),
                total,
            );
        }

        let patch = OrderPatch {
            items: new_items,
            total: input.total,
            customer_name: input.customer_name,
            phone_number: input.phone_number,
            payment_type: input.payment_type,
            cash_given: input.cash_given,
            balance: input.balance,
            expected_version: input.expected_version,
        };

        self.apply_plan(
            invoice_id,
            SagaOperation::Update,
            &plan,
            PendingAction::ApplyPatch {
                patch: patch.clone(),
            },
        )?;

        match self.repo.update(invoice_id, &patch) {
            Ok(Some(order)) => {
                info!("Updated order {} to version {}", invoice_id, order.version);
                Ok(order)
            }
            Ok(None) => {
                self.record_compensation(invoice_id, SagaOperation::Update, &plan, "order vanished");
                Err(DomainError::OrderNotFound)
            }
            Err(err @ DomainError::VersionConflict { .. }) => {
                self.record_compensation(invoice_id, SagaOperation::Update, &plan, &err.to_string());
                Err(err)
            }
            Err(err) => {
                error!(
                    "Stock for order {} already adjusted but the order write failed: {}",
                    invoice_id, err
                );
                self.record(NewJournalEntry {
                    invoice_id: invoice_id.to_string(),
                    operation: SagaOperation::Update,
                    remaining: Vec::new(),
                    pending_action: PendingAction::ApplyPatch { patch },
                    last_error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Restores stock for every non-free line and removes the order.
    pub fn delete_order(&self, invoice_id: &str) -> Result<Order, DomainError> {
        let existing = self.get_order(invoice_id)?;
        self.ensure_no_pending(invoice_id)?;

        let plan = existing.restorations();
        self.apply_plan(
            invoice_id,
            SagaOperation::Delete,
            &plan,
            PendingAction::RemoveOrder,
        )?;

        match self.repo.delete(invoice_id) {
            Ok(Some(order)) => {
                info!("Deleted order {}", invoice_id);
                Ok(order)
            }
            Ok(None) => {
                self.record_compensation(invoice_id, SagaOperation::Delete, &plan, "order vanished");
                Err(DomainError::OrderNotFound)
            }
            Err(err) => {
                error!(
                    "Stock for order {} already restored but the order delete failed: {}",
                    invoice_id, err
                );
                self.record(NewJournalEntry {
                    invoice_id: invoice_id.to_string(),
                    operation: SagaOperation::Delete,
                    remaining: Vec::new(),
                    pending_action: PendingAction::RemoveOrder,
                    last_error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Applies one adjustment through the ledger.
    pub(super) fn apply(&self, adjustment: &StockAdjustment) -> Result<(), DomainError> {
        let stock = self
            .ledger
            .adjust(adjustment.product_id, adjustment.delta)?;
        debug!(
            "Adjusted stock of {} by {} (now {})",
            adjustment.product_id, adjustment.delta, stock
        );
        if stock < 0 {
            warn!(
                "Stock of product {} is negative ({}) after adjustment",
                adjustment.product_id, stock
            );
        }
        Ok(())
    }

    fn apply_plan(
        &self,
        invoice_id: &str,
        operation: SagaOperation,
        plan: &[StockAdjustment],
        pending_action: PendingAction,
    ) -> Result<(), DomainError> {
        for (index, adjustment) in plan.iter().enumerate() {
            if let Err(err) = self.apply(adjustment) {
                error!(
                    "{} of order {} stopped at stock adjustment {} of {}: {}",
                    operation,
                    invoice_id,
                    index + 1,
                    plan.len(),
                    err
                );
                self.record(NewJournalEntry {
                    invoice_id: invoice_id.to_string(),
                    operation,
                    remaining: plan[index..].to_vec(),
                    pending_action,
                    last_error: err.to_string(),
                });
                return Err(err);
            }
        }
        Ok(())
    }

    /// Journals the inverse of an already-applied plan whose document write lost a race.
    fn record_compensation(
        &self,
        invoice_id: &str,
        operation: SagaOperation,
        applied: &[StockAdjustment],
        reason: &str,
    ) {
        error!(
            "{} of order {} adjusted stock but could not be persisted: {}",
            operation, invoice_id, reason
        );
        self.record(NewJournalEntry {
            invoice_id: invoice_id.to_string(),
            operation,
            remaining: applied.iter().rev().map(|a| a.inverse()).collect(),
            pending_action: PendingAction::Nothing,
            last_error: reason.to_string(),
        });
    }

    fn record(&self, entry: NewJournalEntry) {
        let invoice_id = entry.invoice_id.clone();
        match self.journal.record(entry) {
            Ok(recorded) => warn!(
                "Recorded reconciliation entry {} for order {} ({} adjustment(s) outstanding)",
                recorded.id,
                invoice_id,
                recorded.remaining.len()
            ),
            Err(err) => error!(
                "Could not journal partial failure of order {}: {}",
                invoice_id, err
            ),
        }
    }

    fn ensure_no_pending(&self, invoice_id: &str) -> Result<(), DomainError> {
        if self.journal.has_pending(invoice_id)? {
            return Err(DomainError::ReconciliationPending(invoice_id.to_string()));
        }
        Ok(())
    }

    fn persist_new(&self, mut new_order: NewOrder) -> Result<Order, DomainError> {
        let mut attempt = 1;
        loop {
            let now = Utc::now();
            new_order.invoice_id = generate_invoice_id(now);
            new_order.invoice_date = now;
            match self.repo.create(new_order.clone()) {
                Err(DomainError::DuplicateInvoiceId(id)) if attempt < MAX_INVOICE_ATTEMPTS => {
                    warn!("Invoice id {} already taken, regenerating", id);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Freezes line inputs into snapshots. Every non-free line must reference an
    /// existing product; lines missing a name or price are completed from the catalog.
    fn freeze_lines(
        &self,
        lines: Vec<OrderLineInput>,
    ) -> Result<(Vec<OrderLineItem>, HashMap<Uuid, Product>), DomainError> {
        let mut products: HashMap<Uuid, Product> = HashMap::new();
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            if !line.free || line.needs_snapshot() {
                if !products.contains_key(&line.product_id) {
                    let product = self
                        .ledger
                        .find_product(line.product_id)?
                        .ok_or(DomainError::ProductNotFound(line.product_id))?;
                    products.insert(line.product_id, product);
                }
            }
            let product = products.get(&line.product_id);
            items.push(line.into_line_item(product)?);
        }
        Ok((items, products))
    }

    /// Best-effort early rejection under the strict stock policy. The ledger's
    /// conditional decrement remains the authority under concurrency.
    fn check_availability(
        &self,
        plan: &[StockAdjustment],
        products: &HashMap<Uuid, Product>,
    ) -> Result<(), DomainError> {
        if self.ledger.allows_negative_stock() {
            return Ok(());
        }
        // Widened: a plan may sum line quantities past i32.
        let mut net: HashMap<Uuid, i64> = HashMap::new();
        for adjustment in plan {
            *net.entry(adjustment.product_id).or_insert(0) += i64::from(adjustment.delta);
        }
        for (product_id, delta) in net {
            if delta >= 0 {
                continue;
            }
            if let Some(product) = products.get(&product_id) {
                if i64::from(product.stock) + delta < 0 {
                    return Err(DomainError::InsufficientStock {
                        product_id,
                        requested: -delta,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Orders the update steps per product: every restoration of a product, then
/// that product's new deductions. Products the order did not hold before come
/// last. Restored stock is taken back immediately instead of staying free
/// while the rest of the order is reversed.
fn update_plan(
    restorations: Vec<StockAdjustment>,
    deductions: Vec<StockAdjustment>,
) -> Vec<StockAdjustment> {
    let mut plan = Vec::with_capacity(restorations.len() + deductions.len());
    let mut pending = deductions;
    for (i, restore) in restorations.iter().enumerate() {
        plan.push(*restore);
        let more_for_product = restorations[i + 1..]
            .iter()
            .any(|r| r.product_id == restore.product_id);
        if !more_for_product {
            let (same, rest): (Vec<StockAdjustment>, Vec<StockAdjustment>) = pending
                .into_iter()
                .partition(|d| d.product_id == restore.product_id);
            plan.extend(same);
            pending = rest;
        }
    }
    plan.extend(pending);
    plan
}

fn audit_total(
    invoice_id: &str,
    items: &[OrderLineItem],
    bill_discount: Option<&Discount>,
    total: &BigDecimal,
) {
    let computed = pricing::grand_total(items, bill_discount);
    if computed != *total {
        warn!(
            "Order {}: supplied total {} differs from computed total {}",
            invoice_id, total, computed
        );
    }
    if *total < BigDecimal::zero() {
        warn!("Order {} has a negative total {}", invoice_id, total);
    }
}
