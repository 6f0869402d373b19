use utoipa::OpenApi;

use crate::domain::order::{OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress};
use crate::domain::view::{CartItemView, CartView};
use crate::handlers::cart::{
    AddItemRequest, CheckoutRequest, DiscountRequest, UpdateQuantityRequest,
};
use crate::handlers::orders::{
    ListOrdersParams, ListOrdersResponse, OrderLineResponse, OrderResponse, UpdateStatusRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::cart::get_cart,
        crate::handlers::cart::add_item,
        crate::handlers::cart::update_item,
        crate::handlers::cart::remove_item,
        crate::handlers::cart::apply_discount,
        crate::handlers::cart::clear_cart,
        crate::handlers::cart::checkout,
        crate::handlers::cart::merge_cart,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_status,
        crate::handlers::health::health,
    ),
    components(schemas(
        CartView,
        CartItemView,
        AddItemRequest,
        UpdateQuantityRequest,
        DiscountRequest,
        CheckoutRequest,
        ShippingAddress,
        PaymentMethod,
        PaymentStatus,
        OrderStatus,
        OrderResponse,
        OrderLineResponse,
        ListOrdersParams,
        ListOrdersResponse,
        UpdateStatusRequest,
    )),
    tags(
        (name = "cart", description = "Shopping cart for guests and signed-in users"),
        (name = "orders", description = "Orders placed through checkout"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/cart/{session_id}",
            "/api/cart/{session_id}/items",
            "/api/cart/{session_id}/items/{product_id}",
            "/api/cart/{session_id}/discount",
            "/api/cart/{session_id}/checkout",
            "/api/cart/{session_id}/merge",
            "/api/orders",
            "/api/orders/{id}",
            "/api/orders/{id}/status",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
