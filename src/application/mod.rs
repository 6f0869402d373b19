pub mod cart_service;
pub mod order_service;

use std::sync::Arc;

use crate::domain::ports::{CartRepository, OrderRepository, ProductCatalog};

pub use cart_service::CartService;
pub use order_service::OrderService;

/// Services as stored in actix app data; the adapters behind them are chosen at startup.
pub type SharedCartService = CartService<Arc<dyn CartRepository>, Arc<dyn ProductCatalog>>;
pub type SharedOrderService = OrderService<Arc<dyn OrderRepository>>;
