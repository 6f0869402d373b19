use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid discount code")]
    InvalidDiscountCode,
    #[error("Cart is empty")]
    EmptyCartCheckout,
    #[error("Product not found")]
    ProductNotFound,
    #[error("Order not found")]
    OrderNotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
