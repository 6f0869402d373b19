//! In-process adapters backed by a single mutex-guarded map.
//!
//! Every port implementation holds the lock for the whole read-modify-write,
//! which gives the same per-identity serialisation the Postgres adapters get
//! from row locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::cart::{merge_into, Cart, CartOwner};
use crate::domain::errors::DomainError;
use crate::domain::order::{
    page_offset, CheckoutDetails, ListResult, Order, OrderStatus, ShippingAddress,
};
use crate::domain::ports::{CartMutation, CartRepository, OrderRepository, ProductCatalog};
use crate::domain::view::ProductSummary;

#[derive(Debug, Default)]
struct State {
    carts: HashMap<CartOwner, Cart>,
    products: HashMap<Uuid, ProductSummary>,
    orders: Vec<Order>,
}

impl State {
    fn cart_mut(&mut self, owner: &CartOwner) -> &mut Cart {
        self.carts
            .entry(owner.clone())
            .or_insert_with(|| Cart::new(owner.clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Internal("store lock poisoned".to_string()))
    }

    /// Seed a product and return its generated id.
    pub fn insert_product(&self, name: &str, image: &str, price: BigDecimal, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        if let Ok(mut state) = self.lock() {
            state.products.insert(
                id,
                ProductSummary {
                    id,
                    name: name.to_string(),
                    image: image.to_string(),
                    price,
                    stock,
                },
            );
        }
        id
    }

    pub fn set_product_price(&self, id: Uuid, price: BigDecimal) {
        if let Ok(mut state) = self.lock() {
            if let Some(product) = state.products.get_mut(&id) {
                product.price = price;
            }
        }
    }

    pub fn has_cart(&self, owner: &CartOwner) -> bool {
        self.lock()
            .map(|state| state.carts.contains_key(owner))
            .unwrap_or(false)
    }
}

impl CartRepository for InMemoryStore {
    fn load(&self, owner: &CartOwner) -> Result<Cart, DomainError> {
        let mut state = self.lock()?;
        Ok(state.cart_mut(owner).clone())
    }

    fn update(&self, owner: &CartOwner, mutate: CartMutation<'_>) -> Result<Cart, DomainError> {
        let mut state = self.lock()?;
        let mut cart = state.cart_mut(owner).clone();
        mutate(&mut cart)?;
        cart.calculate_totals();
        state.carts.insert(owner.clone(), cart.clone());
        Ok(cart)
    }

    fn merge_guest(&self, session_id: &str, user_id: Uuid) -> Result<Cart, DomainError> {
        let mut state = self.lock()?;
        let guest = state.carts.remove(&CartOwner::Guest(session_id.to_string()));
        let target = state.cart_mut(&CartOwner::User(user_id));
        if let Some(guest) = guest {
            merge_into(target, guest);
        }
        Ok(target.clone())
    }
}

impl ProductCatalog for InMemoryStore {
    fn find_by_id(&self, id: Uuid) -> Result<Option<ProductSummary>, DomainError> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    fn find_many(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ProductSummary>, DomainError> {
        let state = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).map(|p| (*id, p.clone())))
            .collect())
    }
}

impl OrderRepository for InMemoryStore {
    fn place_order(
        &self,
        owner: &CartOwner,
        user_id: Uuid,
        address: ShippingAddress,
        details: CheckoutDetails,
    ) -> Result<Order, DomainError> {
        let mut state = self.lock()?;
        let cart = state.cart_mut(owner);
        let order = Order::from_cart(user_id, cart, address, details)?;
        cart.clear();
        state.orders.push(order.clone());
        Ok(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.lock()?.orders.iter().find(|o| o.id == id).cloned())
    }

    fn list_for_user(
        &self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let state = self.lock()?;
        let mut mine: Vec<&Order> = state.orders.iter().filter(|o| o.user_id == user_id).collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(ListResult {
            total: i64::try_from(mine.len()).unwrap_or(i64::MAX),
            items: mine.into_iter().skip(offset).take(limit).cloned().collect(),
        })
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>, DomainError> {
        let mut state = self.lock()?;
        Ok(state.orders.iter_mut().find(|o| o.id == id).map(|order| {
            order.update_status(status);
            order.clone()
        }))
    }
}
