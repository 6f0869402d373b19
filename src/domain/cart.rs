use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::discount;
use super::errors::DomainError;

/// Who a cart belongs to. Resolved once per request by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartOwner {
    User(Uuid),
    Guest(String),
}

impl fmt::Display for CartOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartOwner::User(id) => write!(f, "user:{id}"),
            CartOwner::Guest(session) => write!(f, "guest:{session}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Price captured when the product was first added.
    pub price: BigDecimal,
    pub quantity: i32,
}

impl LineItem {
    pub fn line_total(&self) -> BigDecimal {
        self.price.clone() * BigDecimal::from(self.quantity)
    }
}

/// Cart aggregate.
///
/// `subtotal` and `total` are derived and only reachable through getters; every
/// mutating method ends by recomputing them.
#[derive(Debug, Clone)]
pub struct Cart {
    id: Uuid,
    owner: CartOwner,
    items: Vec<LineItem>,
    discount_code: Option<String>,
    discount_percent: i32,
    subtotal: BigDecimal,
    total: BigDecimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(owner: CartOwner) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner,
            items: Vec::new(),
            discount_code: None,
            discount_percent: 0,
            subtotal: BigDecimal::from(0),
            total: BigDecimal::from(0),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a cart from stored state. Totals are recomputed rather than
    /// trusted, and the percent is looked up from the stored code; a code no
    /// longer in the table is dropped.
    pub fn restore(
        id: Uuid,
        owner: CartOwner,
        items: Vec<LineItem>,
        discount_code: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let (discount_code, discount_percent) =
            match discount_code.and_then(|code| discount::percent_for(&code).map(|p| (code, p))) {
                Some((code, percent)) => (Some(code), percent),
                None => (None, 0),
            };
        let mut cart = Self {
            id,
            owner,
            items: items.into_iter().filter(|i| i.quantity >= 1).collect(),
            discount_code,
            discount_percent,
            subtotal: BigDecimal::from(0),
            total: BigDecimal::from(0),
            created_at,
            updated_at,
        };
        cart.calculate_totals();
        cart
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> &CartOwner {
        &self.owner
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn discount_code(&self) -> Option<&str> {
        self.discount_code.as_deref()
    }

    pub fn discount_percent(&self) -> i32 {
        self.discount_percent
    }

    pub fn subtotal(&self) -> &BigDecimal {
        &self.subtotal
    }

    pub fn total(&self) -> &BigDecimal {
        &self.total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `quantity` of a product. A repeat add combines quantities and keeps
    /// the price captured by the first add.
    ///
    /// Callers sanitise input first: `quantity >= 1`, `unit_price >= 0`.
    pub fn add_item(&mut self, product_id: Uuid, quantity: i32, unit_price: BigDecimal) {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(quantity);
            }
            None => self.items.push(LineItem {
                id: Uuid::new_v4(),
                product_id,
                price: unit_price,
                quantity,
            }),
        }
        self.touch();
    }

    pub fn remove_item(&mut self, product_id: Uuid) {
        self.items.retain(|i| i.product_id != product_id);
        self.touch();
    }

    /// Absolute set of a line's quantity. Zero or less removes the line; an
    /// unknown product is a no-op.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i32) {
        if quantity <= 0 {
            self.remove_item(product_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = quantity;
        }
        self.touch();
    }

    /// Apply a code from the fixed table. An unknown code leaves the cart,
    /// including any discount already applied, untouched.
    pub fn apply_discount(&mut self, code: &str) -> Result<(), DomainError> {
        let percent = discount::percent_for(code).ok_or(DomainError::InvalidDiscountCode)?;
        self.discount_code = Some(code.to_string());
        self.discount_percent = percent;
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.discount_code = None;
        self.discount_percent = 0;
        self.touch();
    }

    /// `subtotal = Σ price * quantity`, `total = subtotal - subtotal * percent / 100`.
    pub fn calculate_totals(&mut self) {
        self.subtotal = self
            .items
            .iter()
            .fold(BigDecimal::from(0), |acc, item| acc + item.line_total());
        let discount_amount = self.subtotal.clone() * BigDecimal::from(self.discount_percent)
            / BigDecimal::from(100);
        self.total = self.subtotal.clone() - discount_amount;
    }

    fn touch(&mut self) {
        self.calculate_totals();
        self.updated_at = Utc::now();
    }
}

/// Fold a guest cart into a user's cart at login.
///
/// Each source line goes through `add_item` with its captured price, so lines
/// for the same product combine. The source is consumed; its stored record has
/// to be deleted by the caller whether or not it had any items.
pub fn merge_into(target: &mut Cart, source: Cart) {
    for item in source.items {
        target.add_item(item.product_id, item.quantity, item.price);
    }
    target.touch();
}
