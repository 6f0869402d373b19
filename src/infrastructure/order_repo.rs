use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::CartOwner;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    page_offset, CheckoutDetails, ListResult, Order, OrderLine, OrderStatus, ShippingAddress,
};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_lines, order_outbox, orders};

use super::cart_repo::{lock_cart, save_cart};
use super::models::{NewOrderLineRow, NewOrderRow, NewOutboxEventRow, OrderLineRow, OrderRow};

fn stored<T: std::str::FromStr<Err = DomainError>>(value: &str) -> Result<T, DomainError> {
    value
        .parse()
        .map_err(|e: DomainError| DomainError::Internal(format!("corrupt order row: {e}")))
}

fn to_domain(row: OrderRow, lines: Vec<OrderLineRow>) -> Result<Order, DomainError> {
    Ok(Order {
        id: row.id,
        order_number: row.order_number,
        user_id: row.user_id,
        lines: lines
            .into_iter()
            .map(|l| OrderLine {
                id: l.id,
                product_id: l.product_id,
                quantity: l.quantity,
                price: l.price,
                total: l.total,
            })
            .collect(),
        total_amount: row.total_amount,
        shipping_address: ShippingAddress {
            street: row.ship_street,
            city: row.ship_city,
            state: row.ship_state,
            zip_code: row.ship_zip_code,
            country: row.ship_country,
        },
        status: stored(&row.status)?,
        payment_method: stored(&row.payment_method)?,
        payment_status: stored(&row.payment_status)?,
        notes: row.notes,
        created_at: row.created_at,
        delivered_at: row.delivered_at,
    })
}

fn load_order(conn: &mut PgConnection, id: Uuid, lock: bool) -> Result<Option<Order>, DomainError> {
    let query = orders::table.find(id).select(OrderRow::as_select());
    let order = if lock {
        query.for_update().first(conn).optional()?
    } else {
        query.first(conn).optional()?
    };

    let Some(order) = order else {
        return Ok(None);
    };

    let lines = OrderLineRow::belonging_to(&order)
        .select(OrderLineRow::as_select())
        .order(order_lines::position.asc())
        .load::<OrderLineRow>(conn)?;

    to_domain(order, lines).map(Some)
}

fn insert_order(conn: &mut PgConnection, order: &Order) -> Result<(), DomainError> {
    // 1. Insert the order
    let address = &order.shipping_address;
    diesel::insert_into(orders::table)
        .values(&NewOrderRow {
            id: order.id,
            order_number: order.order_number.clone(),
            user_id: order.user_id,
            total_amount: order.total_amount.clone(),
            status: order.status.to_string(),
            payment_method: order.payment_method.to_string(),
            payment_status: order.payment_status.to_string(),
            notes: order.notes.clone(),
            ship_street: address.street.clone(),
            ship_city: address.city.clone(),
            ship_state: address.state.clone(),
            ship_zip_code: address.zip_code.clone(),
            ship_country: address.country.clone(),
            created_at: order.created_at,
        })
        .execute(conn)?;

    // 2. Insert order lines
    let new_lines: Vec<NewOrderLineRow> = order
        .lines
        .iter()
        .zip(0..)
        .map(|(l, position)| NewOrderLineRow {
            id: l.id,
            order_id: order.id,
            product_id: l.product_id,
            quantity: l.quantity,
            price: l.price.clone(),
            total: l.total.clone(),
            position,
        })
        .collect();
    diesel::insert_into(order_lines::table)
        .values(&new_lines)
        .execute(conn)?;

    // 3. Outbox event in the same transaction; `aggregate_type` routes it.
    let line_payloads: Vec<serde_json::Value> = order
        .lines
        .iter()
        .map(|l| {
            json!({
                "product_id": l.product_id,
                "quantity": l.quantity,
                "price": l.price.to_string(),
                "total": l.total.to_string()
            })
        })
        .collect();

    diesel::insert_into(order_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: "Order".to_string(),
            aggregate_id: order.id.to_string(),
            event_type: "OrderPlaced".to_string(),
            payload: json!({
                "order_id": order.id,
                "order_number": order.order_number,
                "user_id": order.user_id,
                "status": order.status.as_str(),
                "total_amount": order.total_amount.to_string(),
                "lines": line_payloads
            }),
        })
        .execute(conn)?;

    Ok(())
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn place_order(
        &self,
        owner: &CartOwner,
        user_id: Uuid,
        address: ShippingAddress,
        details: CheckoutDetails,
    ) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut cart = lock_cart(conn, owner)?;
            let order = Order::from_cart(user_id, &cart, address, details)?;
            insert_order(conn, &order)?;
            cart.clear();
            save_cart(conn, &cart)?;
            Ok(order)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        load_order(&mut conn, id, false)
    }

    fn list_for_user(
        &self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = page_offset(page, limit);
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table
                .filter(orders::user_id.eq(user_id))
                .count()
                .get_result(conn)?;

            let rows = orders::table
                .filter(orders::user_id.eq(user_id))
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load::<OrderRow>(conn)?;

            let lines = OrderLineRow::belonging_to(&rows)
                .select(OrderLineRow::as_select())
                .order(order_lines::position.asc())
                .load::<OrderLineRow>(conn)?
                .grouped_by(&rows);

            let items = rows
                .into_iter()
                .zip(lines)
                .map(|(row, lines)| to_domain(row, lines))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ListResult { items, total })
        })
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let Some(mut order) = load_order(conn, id, true)? else {
                return Ok(None);
            };
            order.update_status(status);
            diesel::update(orders::table.find(id))
                .set((
                    orders::status.eq(order.status.as_str()),
                    orders::delivered_at.eq(order.delivered_at),
                ))
                .execute(conn)?;
            Ok(Some(order))
        })
    }
}
