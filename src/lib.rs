pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod identity;
pub mod infrastructure;
pub mod openapi;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::{CartService, OrderService, SharedCartService, SharedOrderService};
use domain::errors::DomainError;
use domain::ports::{CartRepository, OrderRepository, ProductCatalog};
use errors::AppError;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::product_repo::DieselProductCatalog;
use openapi::ApiDoc;

pub use config::Config;
pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), DomainError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DomainError::Internal(format!("migrations failed: {e}")))?;
    Ok(())
}

/// Wrap the storage adapters into the services the handlers extract.
pub fn services(
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn ProductCatalog>,
    orders: Arc<dyn OrderRepository>,
) -> (web::Data<SharedCartService>, web::Data<SharedOrderService>) {
    (
        web::Data::new(CartService::new(carts, catalog)),
        web::Data::new(OrderService::new(orders)),
    )
}

/// Routes and extractor configuration. Malformed JSON bodies, paths and
/// query strings are answered with 400 and the usual `{"message"}` body.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/health", web::get().to(handlers::health::health))
    .service(
        web::scope("/api/cart/{session_id}")
            .route("", web::get().to(handlers::cart::get_cart))
            .route("", web::delete().to(handlers::cart::clear_cart))
            .route("/items", web::post().to(handlers::cart::add_item))
            .route("/items/{product_id}", web::put().to(handlers::cart::update_item))
            .route("/items/{product_id}", web::delete().to(handlers::cart::remove_item))
            .route("/discount", web::post().to(handlers::cart::apply_discount))
            .route("/checkout", web::post().to(handlers::cart::checkout))
            .route("/merge", web::post().to(handlers::cart::merge_cart)),
    )
    .service(
        web::scope("/api/orders")
            .route("", web::get().to(handlers::orders::list_orders))
            .route("/{id}", web::get().to(handlers::orders::get_order))
            .route("/{id}/status", web::put().to(handlers::orders::update_status)),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let (carts, orders) = services(
        Arc::new(DieselCartRepository::new(pool.clone())),
        Arc::new(DieselProductCatalog::new(pool.clone())),
        Arc::new(DieselOrderRepository::new(pool)),
    );

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(carts.clone())
            .app_data(orders.clone())
            .wrap(Logger::default())
            .configure(configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

/// App over one in-memory store, used by the handler tests.
#[cfg(test)]
macro_rules! test_app {
    ($store:expr) => {{
        let store: $crate::infrastructure::memory::InMemoryStore = $store.clone();
        let (carts, orders) = $crate::services(
            std::sync::Arc::new(store.clone()),
            std::sync::Arc::new(store.clone()),
            std::sync::Arc::new(store),
        );
        actix_web::App::new()
            .app_data(carts)
            .app_data(orders)
            .configure($crate::configure)
    }};
}

#[cfg(test)]
pub(crate) use test_app;
