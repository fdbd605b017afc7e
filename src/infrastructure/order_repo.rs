use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, Order, OrderLineItem, OrderPatch};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_lines, orders};

use super::models::{NewOrderLineRow, NewOrderRow, OrderChangeset, OrderLineRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

/// Order documents: one `orders` row plus its `order_lines`, always written
/// together in one transaction.
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn assemble(row: OrderRow, lines: Vec<OrderLineRow>) -> Result<Order, DomainError> {
    let items = lines
        .into_iter()
        .map(OrderLineItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Order {
        invoice_id: row.invoice_id,
        invoice_date: row.invoice_date,
        items,
        total: row.total,
        customer_name: row.customer_name,
        phone_number: row.phone_number,
        payment_type: row.payment_type,
        cash_given: row.cash_given,
        balance: row.balance,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn load_lines(conn: &mut PgConnection, order_id: Uuid) -> QueryResult<Vec<OrderLineRow>> {
    order_lines::table
        .filter(order_lines::order_id.eq(order_id))
        .order(order_lines::position.asc())
        .select(OrderLineRow::as_select())
        .load(conn)
}

fn insert_lines(
    conn: &mut PgConnection,
    order_id: Uuid,
    items: &[OrderLineItem],
) -> QueryResult<usize> {
    let rows: Vec<NewOrderLineRow> = items
        .iter()
        .enumerate()
        .map(|(position, item)| NewOrderLineRow::from_item(order_id, position, item))
        .collect();
    diesel::insert_into(order_lines::table)
        .values(&rows)
        .execute(conn)
}

fn find_row(conn: &mut PgConnection, invoice_id: &str) -> QueryResult<Option<OrderRow>> {
    orders::table
        .filter(orders::invoice_id.eq(invoice_id))
        .select(OrderRow::as_select())
        .first(conn)
        .optional()
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;
        let invoice_id = order.invoice_id.clone();

        let result = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let row = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: Uuid::new_v4(),
                    invoice_id: order.invoice_id,
                    invoice_date: order.invoice_date,
                    total: order.total,
                    customer_name: order.customer_name,
                    phone_number: order.phone_number,
                    payment_type: order.payment_type,
                    cash_given: order.cash_given,
                    balance: order.balance,
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;
            insert_lines(conn, row.id, &order.items)?;
            let lines = load_lines(conn, row.id)?;
            Ok((row, lines))
        });

        match result {
            Ok((row, lines)) => assemble(row, lines),
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(DomainError::DuplicateInvoiceId(invoice_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let Some(row) = find_row(&mut conn, invoice_id)? else {
            return Ok(None);
        };
        let lines = load_lines(&mut conn, row.id)?;
        assemble(row, lines).map(Some)
    }

    fn update(&self, invoice_id: &str, patch: &OrderPatch) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let changes = (
                OrderChangeset {
                    total: patch.total.clone(),
                    customer_name: patch.customer_name.clone(),
                    phone_number: patch.phone_number.clone(),
                    payment_type: patch.payment_type.clone(),
                    cash_given: patch.cash_given.clone(),
                    balance: patch.balance.clone(),
                },
                orders::version.eq(orders::version + 1),
            );
            let target = orders::table.filter(orders::invoice_id.eq(invoice_id));

            // The version filter makes the check and the write a single statement.
            let updated = match patch.expected_version {
                Some(expected) => diesel::update(target.filter(orders::version.eq(expected)))
                    .set(changes)
                    .returning(OrderRow::as_returning())
                    .get_result(conn)
                    .optional()?,
                None => diesel::update(target)
                    .set(changes)
                    .returning(OrderRow::as_returning())
                    .get_result(conn)
                    .optional()?,
            };

            let Some(row) = updated else {
                return match (patch.expected_version, find_row(conn, invoice_id)?) {
                    (Some(expected), Some(current)) => Err(DomainError::VersionConflict {
                        expected,
                        actual: current.version,
                    }),
                    _ => Ok(None),
                };
            };

            if let Some(items) = &patch.items {
                diesel::delete(order_lines::table.filter(order_lines::order_id.eq(row.id)))
                    .execute(conn)?;
                insert_lines(conn, row.id, items)?;
            }
            let lines = load_lines(conn, row.id)?;
            assemble(row, lines).map(Some)
        })
    }

    fn delete(&self, invoice_id: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let Some(row) = find_row(conn, invoice_id)? else {
                return Ok(None);
            };
            let lines = load_lines(conn, row.id)?;
            // order_lines go with the order (ON DELETE CASCADE).
            diesel::delete(orders::table.filter(orders::id.eq(row.id))).execute(conn)?;
            assemble(row, lines).map(Some)
        })
    }

    fn list_all(&self) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let rows = orders::table
                .select(OrderRow::as_select())
                .order((orders::invoice_date.desc(), orders::created_at.desc()))
                .load(conn)?;

            let lines = OrderLineRow::belonging_to(&rows)
                .select(OrderLineRow::as_select())
                .order(order_lines::position.asc())
                .load(conn)?;

            lines
                .grouped_by(&rows)
                .into_iter()
                .zip(rows)
                .map(|(lines, row)| assemble(row, lines))
                .collect()
        })
    }
}
