pub mod cart_repo;
pub mod memory;
pub mod models;
pub mod order_repo;
pub mod product_repo;
