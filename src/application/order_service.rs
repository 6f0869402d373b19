use uuid::Uuid;

use crate::domain::cart::CartOwner;
use crate::domain::errors::DomainError;
use crate::domain::order::{CheckoutDetails, ListResult, Order, OrderStatus, ShippingAddress};
use crate::domain::ports::OrderRepository;

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Turn the owner's cart into a pending order and empty the cart.
    pub fn checkout(
        &self,
        owner: &CartOwner,
        user_id: Uuid,
        address: ShippingAddress,
        details: CheckoutDetails,
    ) -> Result<Order, DomainError> {
        let order = self.repo.place_order(owner, user_id, address, details)?;
        log::info!(
            "order {} placed by {user_id} for {}",
            order.order_number,
            order.total_amount
        );
        Ok(order)
    }

    /// Orders are only visible to the user who placed them.
    pub fn get_order(&self, id: Uuid, user_id: Uuid) -> Result<Order, DomainError> {
        self.repo
            .find_by_id(id)?
            .filter(|o| o.user_id == user_id)
            .ok_or(DomainError::OrderNotFound)
    }

    pub fn list_orders(&self, user_id: Uuid, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        self.repo.list_for_user(user_id, page, limit)
    }

    pub fn update_status(
        &self,
        id: Uuid,
        user_id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, DomainError> {
        self.get_order(id, user_id)?;
        self.repo
            .update_status(id, status)?
            .ok_or(DomainError::OrderNotFound)
    }
}
