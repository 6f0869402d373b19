use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::SharedOrderService;
use crate::domain::order::{
    Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
use crate::domain::view::as_number;
use crate::errors::AppError;
use crate::handlers::blocking;
use crate::identity::RequestUser;

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: f64,
    pub total: f64,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            id: line.id,
            product_id: line.product_id,
            quantity: line.quantity,
            price: as_number(&line.price),
            total: as_number(&line.total),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub items: Vec<OrderLineResponse>,
    pub total_amount: f64,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            items: order.lines.into_iter().map(OrderLineResponse::from).collect(),
            total_amount: as_number(&order.total_amount),
            shipping_address: order.shipping_address,
            status: order.status,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            notes: order.notes,
            created_at: order.created_at,
            delivered_at: order.delivered_at,
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/orders
///
/// The calling user's orders, newest first.
#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 401, description = "Authentication required"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    orders: web::Data<SharedOrderService>,
    user: RequestUser,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let user_id = user.require()?;
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = blocking(move || orders.list_orders(user_id, page, limit)).await?;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    orders: web::Data<SharedOrderService>,
    user: RequestUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = user.require()?;
    let order_id = path.into_inner();
    let order = blocking(move || orders.get_order(order_id, user_id)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PUT /api/orders/{id}/status
///
/// Moving an order to `Delivered` stamps its delivery time.
#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated user id"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_status(
    orders: web::Data<SharedOrderService>,
    user: RequestUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = user.require()?;
    let order_id = path.into_inner();
    let status = body.into_inner().status;
    let order = blocking(move || orders.update_status(order_id, user_id, status)).await?;
    log::info!("order {} moved to {}", order.order_number, order.status);
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
