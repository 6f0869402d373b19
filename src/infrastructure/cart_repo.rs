use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{merge_into, Cart, CartOwner, LineItem};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartMutation, CartRepository};
use crate::schema::{cart_items, carts};

use super::models::{CartChangeset, CartItemRow, CartRow, NewCartItemRow, NewCartRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Row-level helpers shared with the order repository ───────────────────────

fn owner_of(row: &CartRow) -> Result<CartOwner, DomainError> {
    match (row.user_id, &row.session_id) {
        (Some(user_id), _) => Ok(CartOwner::User(user_id)),
        (None, Some(session_id)) => Ok(CartOwner::Guest(session_id.clone())),
        (None, None) => Err(DomainError::Internal(format!(
            "cart {} has no owner",
            row.id
        ))),
    }
}

fn select_for_update(
    conn: &mut PgConnection,
    owner: &CartOwner,
) -> QueryResult<Option<CartRow>> {
    match owner {
        CartOwner::User(user_id) => carts::table
            .filter(carts::user_id.eq(*user_id))
            .select(CartRow::as_select())
            .for_update()
            .first(conn)
            .optional(),
        CartOwner::Guest(session_id) => carts::table
            .filter(carts::session_id.eq(session_id.as_str()))
            .select(CartRow::as_select())
            .for_update()
            .first(conn)
            .optional(),
    }
}

fn hydrate(conn: &mut PgConnection, row: CartRow) -> Result<Cart, DomainError> {
    let items = CartItemRow::belonging_to(&row)
        .select(CartItemRow::as_select())
        .order(cart_items::position.asc())
        .load::<CartItemRow>(conn)?
        .into_iter()
        .map(|i| LineItem {
            id: i.id,
            product_id: i.product_id,
            price: i.price,
            quantity: i.quantity,
        })
        .collect();

    Ok(Cart::restore(
        row.id,
        owner_of(&row)?,
        items,
        row.discount_code,
        row.created_at,
        row.updated_at,
    ))
}

/// Lock the owner's cart row for the rest of the transaction, inserting an
/// empty cart first if the owner has none.
pub(super) fn lock_cart(conn: &mut PgConnection, owner: &CartOwner) -> Result<Cart, DomainError> {
    let (user_id, session_id) = match owner {
        CartOwner::User(id) => (Some(*id), None),
        CartOwner::Guest(session) => (None, Some(session.clone())),
    };
    diesel::insert_into(carts::table)
        .values(&NewCartRow {
            id: Uuid::new_v4(),
            user_id,
            session_id,
        })
        .on_conflict_do_nothing()
        .execute(conn)?;

    let row = select_for_update(conn, owner)?
        .ok_or_else(|| DomainError::Internal(format!("cart for {owner} vanished after insert")))?;
    hydrate(conn, row)
}

/// Lock an existing cart without creating one.
fn lock_existing(conn: &mut PgConnection, owner: &CartOwner) -> Result<Option<Cart>, DomainError> {
    select_for_update(conn, owner)?
        .map(|row| hydrate(conn, row))
        .transpose()
}

/// Write the cart's discount, totals and full item list back.
pub(super) fn save_cart(conn: &mut PgConnection, cart: &Cart) -> Result<(), DomainError> {
    diesel::update(carts::table.find(cart.id()))
        .set(&CartChangeset {
            discount_code: cart.discount_code().map(str::to_string),
            discount_percent: cart.discount_percent(),
            subtotal: cart.subtotal().clone(),
            total: cart.total().clone(),
            updated_at: cart.updated_at(),
        })
        .execute(conn)?;

    diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id()))).execute(conn)?;

    let rows: Vec<NewCartItemRow> = cart
        .items()
        .iter()
        .zip(0..)
        .map(|(item, position)| NewCartItemRow {
            id: item.id,
            cart_id: cart.id(),
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price.clone(),
            position,
        })
        .collect();
    if !rows.is_empty() {
        diesel::insert_into(cart_items::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(())
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CartRepository for DieselCartRepository {
    fn load(&self, owner: &CartOwner) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| lock_cart(conn, owner))
    }

    fn update(&self, owner: &CartOwner, mutate: CartMutation<'_>) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut cart = lock_cart(conn, owner)?;
            mutate(&mut cart)?;
            cart.calculate_totals();
            save_cart(conn, &cart)?;
            Ok(cart)
        })
    }

    fn merge_guest(&self, session_id: &str, user_id: Uuid) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut target = lock_cart(conn, &CartOwner::User(user_id))?;
            if let Some(guest) = lock_existing(conn, &CartOwner::Guest(session_id.to_string()))? {
                let guest_id = guest.id();
                merge_into(&mut target, guest);
                save_cart(conn, &target)?;
                // cart_items rows go with it (ON DELETE CASCADE)
                diesel::delete(carts::table.find(guest_id)).execute(conn)?;
            }
            Ok(target)
        })
    }
}
