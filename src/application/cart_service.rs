use bigdecimal::BigDecimal;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartOwner};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, ProductCatalog};
use crate::domain::view::CartView;

// ── Input sanitising (caller side of the engine) ─────────────────────────────

/// Loose numeric coercion for JSON request values: numbers as-is, numeric
/// strings parsed, `null`/`false` as 0, `true` as 1. Anything else is NaN.
fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => match s.trim() {
            "" => 0.0,
            t => t.parse().unwrap_or(f64::NAN),
        },
        Some(_) => f64::NAN,
    }
}

fn truncate_to_i32(q: f64) -> i32 {
    // `as` saturates at the i32 bounds
    q.floor() as i32
}

/// Quantity for an add: missing, non-finite or non-positive input becomes 1.
pub fn sanitize_add_quantity(raw: Option<&Value>) -> i32 {
    let q = match raw {
        None => 1.0,
        some => coerce_number(some),
    };
    if !q.is_finite() || q <= 0.0 {
        return 1;
    }
    truncate_to_i32(q).max(1)
}

/// Quantity for an absolute update. Non-finite or negative input is rejected;
/// anything below 1 after truncation removes the line.
pub fn parse_update_quantity(raw: Option<&Value>) -> Result<i32, DomainError> {
    let q = coerce_number(raw);
    if !q.is_finite() || q < 0.0 {
        return Err(DomainError::InvalidInput(
            "Quantity must be a non-negative number".to_string(),
        ));
    }
    Ok(truncate_to_i32(q))
}

/// Captured unit price: negative catalog prices are stored as 0.
pub fn sanitize_price(price: BigDecimal) -> BigDecimal {
    if price < BigDecimal::from(0) {
        BigDecimal::from(0)
    } else {
        price
    }
}

// ── Service ──────────────────────────────────────────────────────────────────

pub struct CartService<C, P> {
    carts: C,
    catalog: P,
}

impl<C: CartRepository, P: ProductCatalog> CartService<C, P> {
    pub fn new(carts: C, catalog: P) -> Self {
        Self { carts, catalog }
    }

    fn present(&self, cart: &Cart) -> Result<CartView, DomainError> {
        let ids: Vec<Uuid> = cart.items().iter().map(|i| i.product_id).collect();
        let products = self.catalog.find_many(&ids)?;
        Ok(cart.to_display_view(&products))
    }

    pub fn view(&self, owner: &CartOwner) -> Result<CartView, DomainError> {
        let cart = self.carts.load(owner)?;
        self.present(&cart)
    }

    pub fn add_item(
        &self,
        owner: &CartOwner,
        product_id: Uuid,
        raw_quantity: Option<&Value>,
    ) -> Result<CartView, DomainError> {
        let product = self
            .catalog
            .find_by_id(product_id)?
            .ok_or(DomainError::ProductNotFound)?;
        let quantity = sanitize_add_quantity(raw_quantity);
        let price = sanitize_price(product.price);

        let cart = self.carts.update(owner, &mut |cart: &mut Cart| {
            cart.add_item(product_id, quantity, price.clone());
            Ok(())
        })?;
        log::debug!("{owner}: added {quantity} x {product_id}");
        self.present(&cart)
    }

    pub fn update_quantity(
        &self,
        owner: &CartOwner,
        product_id: Uuid,
        raw_quantity: Option<&Value>,
    ) -> Result<CartView, DomainError> {
        let quantity = parse_update_quantity(raw_quantity)?;
        let cart = self.carts.update(owner, &mut |cart: &mut Cart| {
            cart.update_quantity(product_id, quantity);
            Ok(())
        })?;
        log::debug!("{owner}: set {product_id} to {quantity}");
        self.present(&cart)
    }

    pub fn remove_item(&self, owner: &CartOwner, product_id: Uuid) -> Result<CartView, DomainError> {
        let cart = self.carts.update(owner, &mut |cart: &mut Cart| {
            cart.remove_item(product_id);
            Ok(())
        })?;
        log::debug!("{owner}: removed {product_id}");
        self.present(&cart)
    }

    pub fn apply_discount(&self, owner: &CartOwner, code: &str) -> Result<CartView, DomainError> {
        let cart = self
            .carts
            .update(owner, &mut |cart: &mut Cart| cart.apply_discount(code))
            .inspect_err(|e| {
                if matches!(e, DomainError::InvalidDiscountCode) {
                    log::warn!("{owner}: rejected discount code '{code}'");
                }
            })?;
        self.present(&cart)
    }

    pub fn clear(&self, owner: &CartOwner) -> Result<CartView, DomainError> {
        let cart = self.carts.update(owner, &mut |cart: &mut Cart| {
            cart.clear();
            Ok(())
        })?;
        log::debug!("{owner}: cleared");
        self.present(&cart)
    }

    /// Login-time reconciliation of a guest cart into the user's cart.
    pub fn merge_guest(&self, session_id: &str, user_id: Uuid) -> Result<CartView, DomainError> {
        let cart = self.carts.merge_guest(session_id, user_id)?;
        log::info!("merged guest cart {session_id} into user {user_id}");
        self.present(&cart)
    }
}
