use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::cart::{Cart, CartOwner};
use super::errors::DomainError;
use super::order::{CheckoutDetails, ListResult, Order, OrderStatus, ShippingAddress};
use super::view::ProductSummary;

/// Mutation applied to a freshly loaded cart inside a read-modify-write.
pub type CartMutation<'a> = &'a mut dyn FnMut(&mut Cart) -> Result<(), DomainError>;

/// Cart persistence.
///
/// Implementations serialise `update`, `merge_guest` and checkout per cart
/// identity so that concurrent requests for one cart never lose an update.
pub trait CartRepository: Send + Sync + 'static {
    /// Load the cart for `owner`, creating an empty one if none exists.
    fn load(&self, owner: &CartOwner) -> Result<Cart, DomainError>;

    /// Load (or create) the cart, apply `mutate` and persist the result. If
    /// `mutate` fails nothing is written.
    fn update(&self, owner: &CartOwner, mutate: CartMutation<'_>) -> Result<Cart, DomainError>;

    /// Fold the guest cart for `session_id` into the user's cart and delete the
    /// guest record. Returns the user's cart.
    fn merge_guest(&self, session_id: &str, user_id: Uuid) -> Result<Cart, DomainError>;
}

pub trait ProductCatalog: Send + Sync + 'static {
    fn find_by_id(&self, id: Uuid) -> Result<Option<ProductSummary>, DomainError>;
    fn find_many(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ProductSummary>, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Snapshot the owner's cart into an order, store it and clear the cart as
    /// one unit of work.
    fn place_order(
        &self,
        owner: &CartOwner,
        user_id: Uuid,
        address: ShippingAddress,
        details: CheckoutDetails,
    ) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list_for_user(&self, user_id: Uuid, page: i64, limit: i64)
        -> Result<ListResult, DomainError>;
    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>, DomainError>;
}

impl<T: CartRepository + ?Sized> CartRepository for Arc<T> {
    fn load(&self, owner: &CartOwner) -> Result<Cart, DomainError> {
        (**self).load(owner)
    }

    fn update(&self, owner: &CartOwner, mutate: CartMutation<'_>) -> Result<Cart, DomainError> {
        (**self).update(owner, mutate)
    }

    fn merge_guest(&self, session_id: &str, user_id: Uuid) -> Result<Cart, DomainError> {
        (**self).merge_guest(session_id, user_id)
    }
}

impl<T: ProductCatalog + ?Sized> ProductCatalog for Arc<T> {
    fn find_by_id(&self, id: Uuid) -> Result<Option<ProductSummary>, DomainError> {
        (**self).find_by_id(id)
    }

    fn find_many(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ProductSummary>, DomainError> {
        (**self).find_many(ids)
    }
}

impl<T: OrderRepository + ?Sized> OrderRepository for Arc<T> {
    fn place_order(
        &self,
        owner: &CartOwner,
        user_id: Uuid,
        address: ShippingAddress,
        details: CheckoutDetails,
    ) -> Result<Order, DomainError> {
        (**self).place_order(owner, user_id, address, details)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        (**self).find_by_id(id)
    }

    fn list_for_user(
        &self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        (**self).list_for_user(user_id, page, limit)
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>, DomainError> {
        (**self).update_status(id, status)
    }
}
