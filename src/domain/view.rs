use std::collections::HashMap;

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::cart::Cart;

const FALLBACK_NAME: &str = "Product";
const FALLBACK_IMAGE: &str = "📚";

/// Product fields denormalised into the cart view.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub price: BigDecimal,
    pub stock: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub name: String,
    pub price: f64,
    pub image: String,
    pub stock: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: Uuid,
    pub items: Vec<CartItemView>,
    /// Percentage off the subtotal.
    pub discount: f64,
    pub discount_code: Option<String>,
    pub subtotal: f64,
    pub total: f64,
}

/// JSON-safe number for a decimal; anything not representable becomes 0.
pub(crate) fn as_number(value: &BigDecimal) -> f64 {
    value.to_f64().filter(|v| v.is_finite()).unwrap_or(0.0)
}

impl Cart {
    /// Read-only projection for clients. Lines whose product is missing from
    /// `products` fall back to placeholder name/image and zero stock.
    pub fn to_display_view(&self, products: &HashMap<Uuid, ProductSummary>) -> CartView {
        let items = self
            .items()
            .iter()
            .map(|item| {
                let product = products.get(&item.product_id);
                CartItemView {
                    id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity.max(0),
                    name: product.map_or_else(|| FALLBACK_NAME.to_string(), |p| p.name.clone()),
                    price: as_number(&item.price),
                    image: product
                        .map(|p| p.image.clone())
                        .filter(|img| !img.is_empty())
                        .unwrap_or_else(|| FALLBACK_IMAGE.to_string()),
                    stock: product.map_or(0, |p| p.stock.max(0)),
                }
            })
            .collect();

        CartView {
            id: self.id(),
            items,
            discount: f64::from(self.discount_percent()),
            discount_code: self.discount_code().map(str::to_string),
            subtotal: as_number(self.subtotal()),
            total: as_number(self.total()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::cart::CartOwner;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    #[test]
    fn view_denormalises_known_products() {
        let p = Uuid::new_v4();
        let mut cart = Cart::new(CartOwner::Guest("s".to_string()));
        cart.add_item(p, 2, dec("12.5"));
        cart.apply_discount("SAVE20").expect("valid code");

        let products = HashMap::from([(
            p,
            ProductSummary {
                id: p,
                name: "Dune".to_string(),
                image: "dune.jpg".to_string(),
                price: dec("14"),
                stock: 3,
            },
        )]);
        let view = cart.to_display_view(&products);

        assert_eq!(view.id, cart.id());
        assert_eq!(view.items.len(), 1);
        let line = &view.items[0];
        assert_eq!(line.product_id, p);
        assert_eq!(line.name, "Dune");
        assert_eq!(line.image, "dune.jpg");
        assert_eq!(line.stock, 3);
        // captured price, not the current catalog price
        assert_eq!(line.price, 12.5);
        assert_eq!(view.discount, 20.0);
        assert_eq!(view.discount_code.as_deref(), Some("SAVE20"));
        assert_eq!(view.subtotal, 25.0);
        assert_eq!(view.total, 20.0);
    }

    #[test]
    fn view_falls_back_for_missing_products() {
        let mut cart = Cart::new(CartOwner::Guest("s".to_string()));
        cart.add_item(Uuid::new_v4(), 1, dec("3"));

        let view = cart.to_display_view(&HashMap::new());
        let line = &view.items[0];
        assert_eq!(line.name, "Product");
        assert_eq!(line.image, "📚");
        assert_eq!(line.stock, 0);
    }

    #[test]
    fn view_serialises_with_external_field_names() {
        let cart = Cart::new(CartOwner::Guest("s".to_string()));
        let json = serde_json::to_value(cart.to_display_view(&HashMap::new()))
            .expect("serialise view");

        assert_eq!(json["discount"], serde_json::json!(0.0));
        assert_eq!(json["subtotal"], serde_json::json!(0.0));
        assert_eq!(json["total"], serde_json::json!(0.0));
        assert!(json["items"].as_array().is_some_and(|a| a.is_empty()));
        assert!(json.get("discountPercent").is_none());
    }
}
