pub mod cart;
pub mod health;
pub mod orders;

use actix_web::web;

use crate::domain::errors::DomainError;
use crate::errors::AppError;

/// Run a blocking service call on actix's thread pool.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}
