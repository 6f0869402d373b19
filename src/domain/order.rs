use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::cart::Cart;
use super::errors::DomainError;

pub const DEFAULT_COUNTRY: &str = "India";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cod,
    Online,
    Card,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(DomainError::InvalidInput(format!(
                        "unknown {} '{}'",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

str_enum!(OrderStatus {
    Pending => "Pending",
    Shipped => "Shipped",
    Delivered => "Delivered",
    Cancelled => "Cancelled",
});

str_enum!(PaymentMethod {
    Cod => "cod",
    Online => "online",
    Card => "card",
});

str_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
}

impl ShippingAddress {
    /// Trim every field, default the country and reject blank required fields.
    pub fn normalized(self) -> Result<Self, DomainError> {
        fn required(field: &str, value: String) -> Result<String, DomainError> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(DomainError::InvalidInput(format!(
                    "shippingAddress.{field} is required"
                )));
            }
            Ok(trimmed.to_string())
        }

        let country = match self.country.trim() {
            "" => DEFAULT_COUNTRY.to_string(),
            c => c.to_string(),
        };
        Ok(Self {
            street: required("street", self.street)?,
            city: required("city", self.city)?,
            state: required("state", self.state)?,
            zip_code: required("zipCode", self.zip_code)?,
            country,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: BigDecimal,
    pub total: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub total_amount: BigDecimal,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Checkout options supplied alongside the shipping address.
#[derive(Debug, Clone, Default)]
pub struct CheckoutDetails {
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl Order {
    /// Snapshot `cart` into a pending order. The cart is not modified; the
    /// caller clears it in the same unit of work that stores the order.
    pub fn from_cart(
        user_id: Uuid,
        cart: &Cart,
        address: ShippingAddress,
        details: CheckoutDetails,
    ) -> Result<Self, DomainError> {
        if cart.is_empty() {
            return Err(DomainError::EmptyCartCheckout);
        }
        let shipping_address = address.normalized()?;

        let lines = cart
            .items()
            .iter()
            .map(|item| OrderLine {
                id: Uuid::new_v4(),
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price.clone(),
                total: item.line_total(),
            })
            .collect();

        let created_at = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            order_number: generate_order_number(created_at),
            user_id,
            lines,
            total_amount: cart.total().clone(),
            shipping_address,
            status: OrderStatus::Pending,
            payment_method: details.payment_method,
            payment_status: PaymentStatus::Pending,
            notes: details
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            created_at,
            delivered_at: None,
        })
    }

    pub fn update_status(&mut self, status: OrderStatus) {
        self.status = status;
        if status == OrderStatus::Delivered {
            self.delivered_at = Some(Utc::now());
        }
    }
}

/// `ORD-<unix millis>-<5 uppercase alphanumerics>`.
fn generate_order_number(at: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{}", at.timestamp_millis(), suffix)
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

/// Rows to skip for a 1-based `page`. Saturates, so an absurd page yields an
/// empty page instead of overflowing.
pub fn page_offset(page: i64, limit: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(limit.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::CartOwner;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: " 12 MG Road ".to_string(),
            city: "Pune".to_string(),
            state: "MH".to_string(),
            zip_code: "411001".to_string(),
            country: String::new(),
        }
    }

    #[test]
    fn empty_cart_cannot_be_checked_out() {
        let cart = Cart::new(CartOwner::User(Uuid::new_v4()));
        let err = Order::from_cart(Uuid::new_v4(), &cart, address(), CheckoutDetails::default())
            .unwrap_err();
        assert!(matches!(err, DomainError::EmptyCartCheckout));
    }

    #[test]
    fn order_snapshots_lines_and_cart_total() {
        let user = Uuid::new_v4();
        let mut cart = Cart::new(CartOwner::User(user));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        cart.add_item(a, 2, dec("100"));
        cart.add_item(b, 1, dec("50"));
        cart.apply_discount("SAVE20").expect("valid code");

        let order =
            Order::from_cart(user, &cart, address(), CheckoutDetails::default()).expect("order");

        assert_eq!(order.user_id, user);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_method, PaymentMethod::Cod);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.total_amount, dec("200"));
        assert_eq!(&order.total_amount, cart.total());
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].product_id, a);
        assert_eq!(order.lines[0].total, dec("200"));
        assert_eq!(order.lines[1].total, dec("50"));
        // the cart is left for the caller to clear
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn address_is_trimmed_and_country_defaults() {
        let normalized = address().normalized().expect("valid address");
        assert_eq!(normalized.street, "12 MG Road");
        assert_eq!(normalized.country, DEFAULT_COUNTRY);
    }

    #[test]
    fn blank_required_address_field_is_rejected() {
        let mut addr = address();
        addr.city = "   ".to_string();
        let err = addr.normalized().unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(msg) if msg.contains("city")));
    }

    #[test]
    fn order_number_has_expected_shape() {
        let at = Utc::now();
        let number = generate_order_number(at);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], at.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 5);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn blank_notes_are_dropped() {
        let user = Uuid::new_v4();
        let mut cart = Cart::new(CartOwner::User(user));
        cart.add_item(Uuid::new_v4(), 1, dec("1"));
        let details = CheckoutDetails {
            payment_method: PaymentMethod::Card,
            notes: Some("  ".to_string()),
        };
        let order = Order::from_cart(user, &cart, address(), details).expect("order");
        assert!(order.notes.is_none());
        assert_eq!(order.payment_method, PaymentMethod::Card);
    }

    #[test]
    fn delivered_status_stamps_delivery_time() {
        let user = Uuid::new_v4();
        let mut cart = Cart::new(CartOwner::User(user));
        cart.add_item(Uuid::new_v4(), 1, dec("1"));
        let mut order =
            Order::from_cart(user, &cart, address(), CheckoutDetails::default()).expect("order");

        order.update_status(OrderStatus::Shipped);
        assert!(order.delivered_at.is_none());
        order.update_status(OrderStatus::Delivered);
        assert!(order.delivered_at.is_some());
    }

    #[test]
    fn page_offset_saturates_for_huge_pages() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(i64::MAX, 100), i64::MAX);
    }

    #[test]
    fn status_strings_round_trip_through_from_str() {
        assert_eq!(OrderStatus::from_str("Shipped").ok(), Some(OrderStatus::Shipped));
        assert_eq!(PaymentMethod::from_str("online").ok(), Some(PaymentMethod::Online));
        assert!(OrderStatus::from_str("shipped").is_err());
        assert_eq!(PaymentStatus::Refunded.as_str(), "refunded");
    }
}
