use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidDiscountCode | DomainError::EmptyCartCheckout => {
                AppError::BadRequest(e.to_string())
            }
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            DomainError::ProductNotFound | DomainError::OrderNotFound => {
                AppError::NotFound(e.to_string())
            }
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                log::error!("request failed: {detail}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    #[test]
    fn invalid_discount_code_returns_400() {
        let err: AppError = DomainError::InvalidDiscountCode.into();
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid discount code");
    }

    #[test]
    fn empty_cart_checkout_returns_400() {
        let err: AppError = DomainError::EmptyCartCheckout.into();
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Cart is empty");
    }

    #[test]
    fn not_found_variants_return_404() {
        let product: AppError = DomainError::ProductNotFound.into();
        let order: AppError = DomainError::OrderNotFound.into();
        assert_eq!(product.error_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(order.error_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(product.to_string(), "Product not found");
    }

    #[test]
    fn invalid_input_keeps_its_message() {
        let err: AppError = DomainError::InvalidInput("bad value".to_string()).into();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "bad value"));
    }

    #[test]
    fn unauthorized_returns_401() {
        assert_eq!(
            AppError::Unauthorized.error_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn internal_error_hides_detail() {
        let err: AppError = DomainError::Internal("connection refused".to_string()).into();
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(resp.into_body()).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["message"], "Internal server error");
    }
}
