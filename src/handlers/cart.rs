use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::SharedCartService;
use crate::application::SharedOrderService;
use crate::domain::order::{CheckoutDetails, PaymentMethod, ShippingAddress};
use crate::domain::view::CartView;
use crate::errors::AppError;
use crate::handlers::blocking;
use crate::handlers::orders::OrderResponse;
use crate::identity::RequestUser;

// ── Request DTOs ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Option<String>,
    /// Defaults to 1; non-numeric or non-positive values are treated as 1.
    #[schema(value_type = Option<f64>)]
    pub quantity: Option<serde_json::Value>,
}

impl AddItemRequest {
    fn product_id(&self) -> Result<Uuid, AppError> {
        let raw = self
            .product_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("Product ID is required".to_string()))?;
        Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid product ID".to_string()))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    /// Absolute quantity; 0 removes the line.
    #[schema(value_type = Option<f64>)]
    pub quantity: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DiscountRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/cart/{session_id}
///
/// Returns the caller's cart, creating an empty one on first access.
#[utoipa::path(
    get,
    path = "/api/cart/{session_id}",
    params(
        ("session_id" = String, Path, description = "Guest session id"),
        ("X-User-Id" = Option<Uuid>, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Cart", body = CartView),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn get_cart(
    service: web::Data<SharedCartService>,
    user: RequestUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let owner = user.cart_owner(path.into_inner());
    let view = blocking(move || service.view(&owner)).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/cart/{session_id}/items
///
/// Adds a product at its current catalog price. Adding a product already in
/// the cart increases its quantity and keeps the originally captured price.
#[utoipa::path(
    post,
    path = "/api/cart/{session_id}/items",
    params(
        ("session_id" = String, Path, description = "Guest session id"),
        ("X-User-Id" = Option<Uuid>, Header, description = "Authenticated user id"),
    ),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 400, description = "Missing or malformed product id"),
        (status = 404, description = "Product not found"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    service: web::Data<SharedCartService>,
    user: RequestUser,
    path: web::Path<String>,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let owner = user.cart_owner(path.into_inner());
    let body = body.into_inner();
    let product_id = body.product_id()?;
    let view =
        blocking(move || service.add_item(&owner, product_id, body.quantity.as_ref())).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// PUT /api/cart/{session_id}/items/{product_id}
#[utoipa::path(
    put,
    path = "/api/cart/{session_id}/items/{product_id}",
    params(
        ("session_id" = String, Path, description = "Guest session id"),
        ("product_id" = Uuid, Path, description = "Product UUID"),
        ("X-User-Id" = Option<Uuid>, Header, description = "Authenticated user id"),
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 400, description = "Quantity must be a non-negative number"),
    ),
    tag = "cart"
)]
pub async fn update_item(
    service: web::Data<SharedCartService>,
    user: RequestUser,
    path: web::Path<(String, Uuid)>,
    body: web::Json<UpdateQuantityRequest>,
) -> Result<HttpResponse, AppError> {
    let (session_id, product_id) = path.into_inner();
    let owner = user.cart_owner(session_id);
    let body = body.into_inner();
    let view = blocking(move || {
        service.update_quantity(&owner, product_id, body.quantity.as_ref())
    })
    .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// DELETE /api/cart/{session_id}/items/{product_id}
#[utoipa::path(
    delete,
    path = "/api/cart/{session_id}/items/{product_id}",
    params(
        ("session_id" = String, Path, description = "Guest session id"),
        ("product_id" = Uuid, Path, description = "Product UUID"),
        ("X-User-Id" = Option<Uuid>, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Updated cart", body = CartView),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    service: web::Data<SharedCartService>,
    user: RequestUser,
    path: web::Path<(String, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (session_id, product_id) = path.into_inner();
    let owner = user.cart_owner(session_id);
    let view = blocking(move || service.remove_item(&owner, product_id)).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/cart/{session_id}/discount
#[utoipa::path(
    post,
    path = "/api/cart/{session_id}/discount",
    params(
        ("session_id" = String, Path, description = "Guest session id"),
        ("X-User-Id" = Option<Uuid>, Header, description = "Authenticated user id"),
    ),
    request_body = DiscountRequest,
    responses(
        (status = 200, description = "Discount applied", body = CartView),
        (status = 400, description = "Invalid discount code"),
    ),
    tag = "cart"
)]
pub async fn apply_discount(
    service: web::Data<SharedCartService>,
    user: RequestUser,
    path: web::Path<String>,
    body: web::Json<DiscountRequest>,
) -> Result<HttpResponse, AppError> {
    let owner = user.cart_owner(path.into_inner());
    let code = body.into_inner().code;
    let view = blocking(move || service.apply_discount(&owner, &code)).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// DELETE /api/cart/{session_id}
#[utoipa::path(
    delete,
    path = "/api/cart/{session_id}",
    params(
        ("session_id" = String, Path, description = "Guest session id"),
        ("X-User-Id" = Option<Uuid>, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Emptied cart", body = CartView),
    ),
    tag = "cart"
)]
pub async fn clear_cart(
    service: web::Data<SharedCartService>,
    user: RequestUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let owner = user.cart_owner(path.into_inner());
    let view = blocking(move || service.clear(&owner)).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/cart/{session_id}/checkout
///
/// Places an order from the authenticated user's cart. The order insert, its
/// outbox event and the cart reset happen in one transaction.
#[utoipa::path(
    post,
    path = "/api/cart/{session_id}/checkout",
    params(
        ("session_id" = String, Path, description = "Guest session id"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated user id"),
    ),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed"),
        (status = 400, description = "Cart is empty or address incomplete"),
        (status = 401, description = "Authentication required"),
    ),
    tag = "cart"
)]
pub async fn checkout(
    orders: web::Data<SharedOrderService>,
    user: RequestUser,
    path: web::Path<String>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = user.require()?;
    let owner = user.cart_owner(path.into_inner());
    let body = body.into_inner();
    let details = CheckoutDetails {
        payment_method: body.payment_method,
        notes: body.notes,
    };

    let order = blocking(move || {
        orders.checkout(&owner, user_id, body.shipping_address, details)
    })
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Checkout successful",
        "orderId": order.id,
        "order": OrderResponse::from(order),
    })))
}

/// POST /api/cart/{session_id}/merge
///
/// Called once after login: folds the guest cart for `session_id` into the
/// user's cart and deletes the guest cart.
#[utoipa::path(
    post,
    path = "/api/cart/{session_id}/merge",
    params(
        ("session_id" = String, Path, description = "Guest session id to merge from"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Merged user cart", body = CartView),
        (status = 401, description = "Authentication required"),
    ),
    tag = "cart"
)]
pub async fn merge_cart(
    service: web::Data<SharedCartService>,
    user: RequestUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = user.require()?;
    let session_id = path.into_inner();
    let view = blocking(move || service.merge_guest(&session_id, user_id)).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use actix_web::http::StatusCode;
    use actix_web::test;
    use bigdecimal::BigDecimal;
    use serde_json::{json, Value};
    use uuid::Uuid;

    use crate::identity::USER_ID_HEADER;
    use crate::infrastructure::memory::InMemoryStore;
    use crate::test_app;

    fn seed(store: &InMemoryStore, name: &str, price: &str) -> Uuid {
        store.insert_product(name, "", BigDecimal::from_str(price).expect("decimal"), 5)
    }

    #[actix_web::test]
    async fn get_creates_empty_cart() {
        let store = InMemoryStore::default();
        let app = test::init_service(test_app!(store)).await;

        let req = test::TestRequest::get().uri("/api/cart/sess-1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["items"], json!([]));
        assert_eq!(body["discount"], json!(0.0));
        assert_eq!(body["subtotal"], json!(0.0));
        assert_eq!(body["total"], json!(0.0));
    }

    #[actix_web::test]
    async fn add_discount_and_totals_flow() {
        let store = InMemoryStore::default();
        let a = seed(&store, "A", "100");
        let b = seed(&store, "B", "50");
        let app = test::init_service(test_app!(store)).await;

        for (product, qty) in [(a, json!(2)), (b, json!("1"))] {
            let req = test::TestRequest::post()
                .uri("/api/cart/sess-1/items")
                .set_json(json!({ "productId": product, "quantity": qty }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let req = test::TestRequest::post()
            .uri("/api/cart/sess-1/discount")
            .set_json(json!({ "code": "SAVE20" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["subtotal"], json!(250.0));
        assert_eq!(body["discount"], json!(20.0));
        assert_eq!(body["total"], json!(200.0));
        assert_eq!(body["items"][0]["name"], "A");
        assert_eq!(body["items"][0]["productId"], json!(a));
    }

    #[actix_web::test]
    async fn invalid_discount_is_400() {
        let store = InMemoryStore::default();
        let app = test::init_service(test_app!(store)).await;

        let req = test::TestRequest::post()
            .uri("/api/cart/sess-1/discount")
            .set_json(json!({ "code": "BOGUS" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid discount code");
    }

    #[actix_web::test]
    async fn add_requires_known_product() {
        let store = InMemoryStore::default();
        let app = test::init_service(test_app!(store)).await;

        let missing = test::TestRequest::post()
            .uri("/api/cart/sess-1/items")
            .set_json(json!({ "quantity": 1 }))
            .to_request();
        assert_eq!(
            test::call_service(&app, missing).await.status(),
            StatusCode::BAD_REQUEST
        );

        let unknown = test::TestRequest::post()
            .uri("/api/cart/sess-1/items")
            .set_json(json!({ "productId": Uuid::new_v4() }))
            .to_request();
        assert_eq!(
            test::call_service(&app, unknown).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn update_rejects_negative_and_zero_removes() {
        let store = InMemoryStore::default();
        let a = seed(&store, "A", "3");
        let app = test::init_service(test_app!(store)).await;

        let add = test::TestRequest::post()
            .uri("/api/cart/sess-1/items")
            .set_json(json!({ "productId": a }))
            .to_request();
        test::call_service(&app, add).await;

        let negative = test::TestRequest::put()
            .uri(&format!("/api/cart/sess-1/items/{a}"))
            .set_json(json!({ "quantity": -1 }))
            .to_request();
        assert_eq!(
            test::call_service(&app, negative).await.status(),
            StatusCode::BAD_REQUEST
        );

        let zero = test::TestRequest::put()
            .uri(&format!("/api/cart/sess-1/items/{a}"))
            .set_json(json!({ "quantity": 0 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, zero).await;
        assert_eq!(body["items"], json!([]));
    }

    #[actix_web::test]
    async fn item_routes_reject_malformed_ids_and_ignore_absent_products() {
        let store = InMemoryStore::default();
        let app = test::init_service(test_app!(store)).await;

        let malformed = test::TestRequest::put()
            .uri("/api/cart/sess-1/items/not-a-uuid")
            .set_json(json!({ "quantity": 2 }))
            .to_request();
        assert_eq!(
            test::call_service(&app, malformed).await.status(),
            StatusCode::BAD_REQUEST
        );

        let absent = test::TestRequest::delete()
            .uri(&format!("/api/cart/sess-1/items/{}", Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, absent).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["items"], json!([]));
    }

    #[actix_web::test]
    async fn remove_and_clear() {
        let store = InMemoryStore::default();
        let a = seed(&store, "A", "3");
        let b = seed(&store, "B", "4");
        let app = test::init_service(test_app!(store)).await;
        for p in [a, b] {
            let req = test::TestRequest::post()
                .uri("/api/cart/sess-1/items")
                .set_json(json!({ "productId": p }))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::delete()
            .uri(&format!("/api/cart/sess-1/items/{a}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["total"], json!(4.0));

        let req = test::TestRequest::delete().uri("/api/cart/sess-1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["items"], json!([]));
        assert_eq!(body["total"], json!(0.0));
    }

    #[actix_web::test]
    async fn checkout_and_merge_require_user() {
        let store = InMemoryStore::default();
        let app = test::init_service(test_app!(store)).await;

        let merge = test::TestRequest::post()
            .uri("/api/cart/sess-1/merge")
            .to_request();
        assert_eq!(
            test::call_service(&app, merge).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let checkout = test::TestRequest::post()
            .uri("/api/cart/sess-1/checkout")
            .set_json(json!({
                "shippingAddress": {
                    "street": "1 A St", "city": "Pune", "state": "MH", "zipCode": "411001"
                }
            }))
            .to_request();
        assert_eq!(
            test::call_service(&app, checkout).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn login_merge_then_checkout() {
        let store = InMemoryStore::default();
        let p1 = seed(&store, "P1", "10");
        let p2 = seed(&store, "P2", "5");
        let app = test::init_service(test_app!(store)).await;
        let user_id = Uuid::new_v4();

        let req = test::TestRequest::post()
            .uri("/api/cart/sess-9/items")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .set_json(json!({ "productId": p1, "quantity": 1 }))
            .to_request();
        test::call_service(&app, req).await;
        for (p, q) in [(p1, 2), (p2, 1)] {
            let req = test::TestRequest::post()
                .uri("/api/cart/sess-9/items")
                .set_json(json!({ "productId": p, "quantity": q }))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::post()
            .uri("/api/cart/sess-9/merge")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_request();
        let merged: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(merged["items"][0]["quantity"], 3);
        assert_eq!(merged["items"][1]["quantity"], 1);
        assert_eq!(merged["total"], json!(35.0));

        // the guest cart is gone: reading it again yields a fresh empty cart
        let req = test::TestRequest::get().uri("/api/cart/sess-9").to_request();
        let guest: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(guest["items"], json!([]));

        let req = test::TestRequest::post()
            .uri("/api/cart/sess-9/checkout")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .set_json(json!({
                "shippingAddress": {
                    "street": "1 A St", "city": "Pune", "state": "MH", "zipCode": "411001"
                },
                "paymentMethod": "card"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Checkout successful");
        assert_eq!(body["order"]["totalAmount"], json!(35.0));
        assert_eq!(body["order"]["status"], "Pending");
        assert_eq!(body["order"]["paymentMethod"], "card");
        assert_eq!(body["order"]["shippingAddress"]["country"], "India");
        assert_eq!(body["orderId"], body["order"]["id"]);

        let req = test::TestRequest::get()
            .uri("/api/cart/sess-9")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_request();
        let after: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(after["items"], json!([]));
    }

    #[actix_web::test]
    async fn checkout_of_empty_cart_is_400() {
        let store = InMemoryStore::default();
        let app = test::init_service(test_app!(store)).await;

        let req = test::TestRequest::post()
            .uri("/api/cart/sess-1/checkout")
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .set_json(json!({
                "shippingAddress": {
                    "street": "1 A St", "city": "Pune", "state": "MH", "zipCode": "411001"
                }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Cart is empty");
    }
}
