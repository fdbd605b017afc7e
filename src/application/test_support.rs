//! In-memory port implementations for exercising the service without Postgres.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::order_service::OrderService;
use crate::domain::errors::DomainError;
use crate::domain::journal::{JournalEntry, NewJournalEntry, StockAdjustment};
use crate::domain::order::{CreateOrderInput, NewOrder, Order, OrderLineInput, OrderPatch};
use crate::domain::ports::{InventoryLedger, OrderRepository, ReconciliationJournal};
use crate::domain::product::Product;

pub type TestService = OrderService<MemoryOrderRepository, MemoryLedger, MemoryJournal>;

pub fn service() -> TestService {
    service_with_policy(true)
}

pub fn service_with_policy(allow_negative: bool) -> TestService {
    OrderService::new(
        MemoryOrderRepository::default(),
        MemoryLedger::new(allow_negative),
        MemoryJournal::default(),
    )
}

pub fn line(product_id: Uuid, quantity: i32) -> OrderLineInput {
    OrderLineInput::new(product_id, quantity)
}

pub fn cash_order(items: Vec<OrderLineInput>, total: i32) -> CreateOrderInput {
    CreateOrderInput {
        items,
        total: Some(BigDecimal::from(total)),
        payment_type: Some("Cash".to_string()),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct MemoryOrderRepository {
    orders: Mutex<Vec<Order>>,
    rejections: Mutex<usize>,
    failing_writes: Mutex<bool>,
}

impl MemoryOrderRepository {
    /// Makes the next `n` creates fail as if the invoice id were taken.
    pub fn reject_next_creates(&self, n: usize) {
        *self.rejections.lock().unwrap() = n;
    }

    /// Makes updates and deletes fail with a persistence error.
    pub fn set_failing_writes(&self, failing: bool) {
        *self.failing_writes.lock().unwrap() = failing;
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if *self.failing_writes.lock().unwrap() {
            return Err(DomainError::Persistence("simulated outage".to_string()));
        }
        Ok(())
    }
}

impl OrderRepository for MemoryOrderRepository {
    fn create(&self, order: NewOrder) -> Result<Order, DomainError> {
        {
            let mut rejections = self.rejections.lock().unwrap();
            if *rejections > 0 {
                *rejections -= 1;
                return Err(DomainError::DuplicateInvoiceId(order.invoice_id));
            }
        }
        let mut orders = self.orders.lock().unwrap();
        if orders.iter().any(|o| o.invoice_id == order.invoice_id) {
            return Err(DomainError::DuplicateInvoiceId(order.invoice_id));
        }
        let now = Utc::now();
        let stored = Order {
            invoice_id: order.invoice_id,
            invoice_date: order.invoice_date,
            items: order.items,
            total: order.total,
            customer_name: order.customer_name,
            phone_number: order.phone_number,
            payment_type: order.payment_type,
            cash_given: order.cash_given,
            balance: order.balance,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        orders.push(stored.clone());
        Ok(stored)
    }

    fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Order>, DomainError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.invoice_id == invoice_id)
            .cloned())
    }

    fn update(&self, invoice_id: &str, patch: &OrderPatch) -> Result<Option<Order>, DomainError> {
        self.check_writable()?;
        let mut orders = self.orders.lock().unwrap();
        let Some(order) = orders.iter_mut().find(|o| o.invoice_id == invoice_id) else {
            return Ok(None);
        };
        if let Some(expected) = patch.expected_version {
            if expected != order.version {
                return Err(DomainError::VersionConflict {
                    expected,
                    actual: order.version,
                });
            }
        }
        patch.apply_to(order);
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    fn delete(&self, invoice_id: &str) -> Result<Option<Order>, DomainError> {
        self.check_writable()?;
        let mut orders = self.orders.lock().unwrap();
        Ok(orders
            .iter()
            .position(|o| o.invoice_id == invoice_id)
            .map(|i| orders.remove(i)))
    }

    fn list_all(&self) -> Result<Vec<Order>, DomainError> {
        let mut orders = self.orders.lock().unwrap().clone();
        orders.sort_by(|a, b| b.invoice_date.cmp(&a.invoice_date));
        Ok(orders)
    }
}

pub struct MemoryLedger {
    products: Mutex<HashMap<Uuid, Product>>,
    failing: Mutex<HashSet<Uuid>>,
    calls: AtomicUsize,
    log: Mutex<Vec<StockAdjustment>>,
    allow_negative: bool,
}

impl MemoryLedger {
    pub fn new(allow_negative: bool) -> Self {
        Self {
            products: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
            allow_negative,
        }
    }

    pub fn add_product(&self, name: &str, price: i32, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.products.lock().unwrap().insert(
            id,
            Product {
                id,
                name: name.to_string(),
                price: BigDecimal::from(price),
                vat: BigDecimal::zero(),
                stock,
            },
        );
        id
    }

    pub fn stock(&self, id: Uuid) -> i32 {
        self.products.lock().unwrap()[&id].stock
    }

    pub fn fail_on(&self, id: Uuid) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn heal(&self, id: Uuid) {
        self.failing.lock().unwrap().remove(&id);
    }

    pub fn adjust_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Successful adjustments, in the order they were applied.
    pub fn applied(&self) -> Vec<StockAdjustment> {
        self.log.lock().unwrap().clone()
    }
}

impl InventoryLedger for MemoryLedger {
    fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.products.lock().unwrap().get(&product_id).cloned())
    }

    fn adjust(&self, product_id: Uuid, delta: i32) -> Result<i32, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&product_id) {
            return Err(DomainError::Ledger("simulated outage".to_string()));
        }
        let mut products = self.products.lock().unwrap();
        let product = products
            .get_mut(&product_id)
            .ok_or(DomainError::ProductNotFound(product_id))?;
        let next = i64::from(product.stock) + i64::from(delta);
        if !self.allow_negative && delta < 0 && next < 0 {
            return Err(DomainError::InsufficientStock {
                product_id,
                requested: -i64::from(delta),
            });
        }
        product.stock = i32::try_from(next)
            .map_err(|_| DomainError::Ledger("stock out of range".to_string()))?;
        self.log.lock().unwrap().push(StockAdjustment { product_id, delta });
        Ok(product.stock)
    }

    fn allows_negative_stock(&self) -> bool {
        self.allow_negative
    }
}

#[derive(Default)]
pub struct MemoryJournal {
    entries: Mutex<Vec<JournalEntry>>,
    claims: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl ReconciliationJournal for MemoryJournal {
    fn record(&self, entry: NewJournalEntry) -> Result<JournalEntry, DomainError> {
        let now = Utc::now();
        let stored = JournalEntry {
            id: Uuid::new_v4(),
            invoice_id: entry.invoice_id,
            operation: entry.operation,
            remaining: entry.remaining,
            pending_action: entry.pending_action,
            last_error: entry.last_error,
            resolved: false,
            created_at: now,
            updated_at: now,
        };
        self.entries.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    fn find(&self, id: Uuid) -> Result<Option<JournalEntry>, DomainError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    fn has_pending(&self, invoice_id: &str) -> Result<bool, DomainError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .any(|e| !e.resolved && e.invoice_id == invoice_id))
    }

    fn list_pending(&self) -> Result<Vec<JournalEntry>, DomainError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| !e.resolved)
            .cloned()
            .collect())
    }

    fn update_progress(
        &self,
        id: Uuid,
        remaining: &[StockAdjustment],
        last_error: &str,
    ) -> Result<(), DomainError> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(DomainError::JournalEntryNotFound)?;
        entry.remaining = remaining.to_vec();
        entry.last_error = last_error.to_string();
        entry.updated_at = Utc::now();
        Ok(())
    }

    fn claim(&self, id: Uuid, lease: Duration) -> Result<bool, DomainError> {
        let entries = self.entries.lock().unwrap();
        if !entries.iter().any(|e| e.id == id && !e.resolved) {
            return Ok(false);
        }
        let now = Utc::now();
        let mut claims = self.claims.lock().unwrap();
        if claims.get(&id).is_some_and(|until| *until > now) {
            return Ok(false);
        }
        claims.insert(id, now + lease);
        Ok(true)
    }

    fn release(&self, id: Uuid) -> Result<(), DomainError> {
        self.claims.lock().unwrap().remove(&id);
        Ok(())
    }

    fn mark_resolved(&self, id: Uuid) -> Result<Option<JournalEntry>, DomainError> {
        let mut entries = self.entries.lock().unwrap();
        Ok(entries.iter_mut().find(|e| e.id == id).map(|e| {
            e.resolved = true;
            e.updated_at = Utc::now();
            e.clone()
        }))
    }
}
