use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::cart::Cart;
use crate::checkout::shipping::normalize_postal_code;
use crate::domain::cart::CartItem;
use crate::domain::customer::CustomerId;
use crate::domain::order::{
    IdempotencyKey, Order, OrderId, OrderStatus, PaymentMethod, ShippingAddress, ShippingMethod,
};
use crate::errors::{ApplicationError, DomainError};
use crate::pricing::PricingResult;

pub const DEFAULT_SHIPPING_METHOD: &str = "Entrega padrão";

/// Card details as submitted. Only the masked form is ever stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(rename = "type", default = "default_card_type")]
    pub card_type: String,
    pub card_number: String,
    pub card_holder: String,
    #[serde(default)]
    pub expiry_month: Option<String>,
    #[serde(default)]
    pub expiry_year: Option<String>,
    #[serde(default)]
    pub cvv: Option<String>,
}

impl fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentDetails")
            .field("card_type", &self.card_type)
            .field("card_number", &mask_card_number(&self.card_number))
            .field("card_holder", &self.card_holder)
            .field("cvv", &self.cvv.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

fn default_card_type() -> String {
    "credit_card".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentDetails,
    #[serde(default)]
    pub shipping_method: Option<String>,
}

impl CheckoutRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(field) = self.shipping_address.missing_field() {
            return Err(DomainError::Validation(format!("shippingAddress.{field} is required")));
        }
        if self.payment_method.card_holder.trim().is_empty() {
            return Err(DomainError::Validation("paymentMethod.cardHolder is required".to_string()));
        }

        normalize_postal_code(&self.shipping_address.zip_code)?;
        validate_card_number("paymentMethod.cardNumber", &self.payment_method.card_number)
    }
}

pub(crate) fn validate_card_number(field: &str, card_number: &str) -> Result<(), DomainError> {
    let digits = card_digits(card_number);
    if !(12..=19).contains(&digits.len()) {
        return Err(DomainError::Validation(format!(
            "{field} must contain between 12 and 19 digits"
        )));
    }
    Ok(())
}

fn card_digits(card_number: &str) -> String {
    card_number.chars().filter(char::is_ascii_digit).collect()
}

/// Renders a card number as `**** **** **** NNNN`.
pub fn mask_card_number(card_number: &str) -> String {
    let digits = card_digits(card_number);
    let last_four = &digits[digits.len().saturating_sub(4)..];
    format!("**** **** **** {last_four}")
}

/// Stable digest of a checkout request body, used to tell a retry of the same
/// submission apart from a different submission reusing its key.
pub fn request_fingerprint(request: &CheckoutRequest) -> String {
    let canonical = serde_json::to_string(request)
        .unwrap_or_else(|error| format!("serialization_error:{error}"));
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

pub fn order_number(prefix: &str, id: Uuid) -> String {
    format!("{prefix}-{:06}", id.as_u128() % 1_000_000)
}

/// Everything an order needs from the cart and the request, priced once
/// through the shared arithmetic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderDraft {
    pub items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub coupon_code: Option<String>,
    pub pricing: PricingResult,
}

/// Identity and bookkeeping assigned when a draft is accepted.
#[derive(Clone, Debug)]
pub struct OrderStamp {
    pub id: Uuid,
    pub customer_id: CustomerId,
    pub idempotency_key: IdempotencyKey,
    pub request_fingerprint: String,
    pub order_number_prefix: String,
    pub created_at: DateTime<Utc>,
}

impl OrderDraft {
    pub fn from_cart(
        cart: &Cart,
        request: &CheckoutRequest,
        currency: &str,
    ) -> Result<Self, ApplicationError> {
        if cart.is_empty() {
            return Err(DomainError::Validation("cannot submit an order for an empty cart".to_string())
                .into());
        }
        if !cart.shipping().is_calculated() {
            return Err(DomainError::Validation(
                "shipping must be calculated before submitting an order".to_string(),
            )
            .into());
        }
        request.validate()?;

        let pricing = cart.price(currency);
        let mut shipping_address = request.shipping_address.clone();
        shipping_address.zip_code = normalize_postal_code(&shipping_address.zip_code)?;

        Ok(Self {
            items: cart.items().to_vec(),
            shipping_address,
            payment_method: PaymentMethod {
                card_number: mask_card_number(&request.payment_method.card_number),
                card_holder: request.payment_method.card_holder.trim().to_string(),
                card_type: request.payment_method.card_type.clone(),
            },
            shipping_method: ShippingMethod {
                name: request
                    .shipping_method
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(DEFAULT_SHIPPING_METHOD)
                    .to_string(),
                price: pricing.shipping_total,
            },
            coupon_code: cart.coupon().map(|coupon| coupon.code().to_string()),
            pricing,
        })
    }

    pub fn into_order(self, stamp: OrderStamp) -> Order {
        Order {
            id: OrderId(stamp.id.to_string()),
            order_number: order_number(&stamp.order_number_prefix, stamp.id),
            customer_id: stamp.customer_id,
            idempotency_key: stamp.idempotency_key,
            request_fingerprint: stamp.request_fingerprint,
            status: OrderStatus::Pending,
            items: self.items,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            shipping_method: self.shipping_method,
            coupon_code: self.coupon_code,
            subtotal: self.pricing.subtotal,
            shipping: self.pricing.shipping_total,
            discount: self.pricing.discount_total,
            total: self.pricing.total,
            pricing_trace: self.pricing.trace,
            created_at: stamp.created_at,
            updated_at: stamp.created_at,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{CheckoutRequest, PaymentDetails};
    use crate::domain::order::ShippingAddress;

    pub fn checkout_request() -> CheckoutRequest {
        CheckoutRequest {
            shipping_address: ShippingAddress {
                street: "Rua das Flores".to_string(),
                number: "123".to_string(),
                complement: Some("Apto 45".to_string()),
                neighborhood: Some("Jardim Primavera".to_string()),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                zip_code: "01234-567".to_string(),
            },
            payment_method: PaymentDetails {
                card_type: "credit_card".to_string(),
                card_number: "4111 1111 1111 1234".to_string(),
                card_holder: "JOAO SILVA".to_string(),
                expiry_month: Some("12".to_string()),
                expiry_year: Some("2028".to_string()),
                cvv: Some("123".to_string()),
            },
            shipping_method: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::{
        fixtures::checkout_request, mask_card_number, order_number, request_fingerprint,
        OrderDraft, OrderStamp,
    };
    use crate::cart::{Cart, ShippingCharge};
    use crate::domain::cart::Coupon;
    use crate::domain::customer::CustomerId;
    use crate::domain::order::{IdempotencyKey, OrderStatus};
    use crate::domain::product::fixtures::product;
    use crate::errors::{ApplicationError, DomainError};

    fn priced_cart() -> Cart {
        let mut cart = Cart::new();
        let mut phone = product("1", Decimal::new(4_999_99, 2));
        phone.discount_price = Some(Decimal::new(4_499_99, 2));
        cart.add_item(&phone, NonZeroU32::new(1).expect("non-zero"));
        cart.add_item(&product("9", Decimal::new(89_99, 2)), NonZeroU32::new(3).expect("non-zero"));
        cart.set_shipping(ShippingCharge::new(Decimal::new(27, 0)).expect("valid shipping"));
        cart.apply_coupon(Coupon::percentage("BEMVINDO10", Decimal::new(10, 0)));
        cart
    }

    fn stamp(id: Uuid) -> OrderStamp {
        OrderStamp {
            id,
            customer_id: CustomerId(1),
            idempotency_key: IdempotencyKey("key-1".to_string()),
            request_fingerprint: request_fingerprint(&checkout_request()),
            order_number_prefix: "LS".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn order_totals_agree_with_cart_totals() {
        let cart = priced_cart();
        let totals = cart.totals();

        let order = OrderDraft::from_cart(&cart, &checkout_request(), "BRL")
            .expect("valid draft")
            .into_order(stamp(Uuid::new_v4()));

        assert_eq!(order.subtotal, totals.subtotal);
        assert_eq!(order.shipping, totals.shipping);
        assert_eq!(order.discount, totals.discount);
        assert_eq!(order.total, totals.total);
        assert_eq!(order.items, cart.items().to_vec());
        assert_eq!(order.coupon_code.as_deref(), Some("BEMVINDO10"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.shipping_method.price, Decimal::new(27, 0));

        let stages: Vec<&str> =
            order.pricing_trace.steps.iter().map(|step| step.stage.as_str()).collect();
        assert_eq!(stages, vec!["subtotal", "discount", "shipping", "total"]);
        assert_eq!(order.pricing_trace.steps[3].amount, order.total);
        assert_eq!(order.pricing_trace.currency, "BRL");
    }

    #[test]
    fn card_number_is_masked_on_the_order() {
        let order = OrderDraft::from_cart(&priced_cart(), &checkout_request(), "BRL")
            .expect("valid draft")
            .into_order(stamp(Uuid::new_v4()));

        assert_eq!(order.payment_method.card_number, "**** **** **** 1234");
        assert_eq!(order.shipping_address.zip_code, "01234567");
        assert_eq!(mask_card_number("12"), "**** **** **** 12");
    }

    #[test]
    fn empty_cart_or_missing_shipping_cannot_be_drafted() {
        let empty = OrderDraft::from_cart(&Cart::new(), &checkout_request(), "BRL");
        assert!(matches!(empty, Err(ApplicationError::Domain(DomainError::Validation(_)))));

        let mut unquoted = priced_cart();
        unquoted.set_shipping(ShippingCharge::NOT_CALCULATED);
        let error = OrderDraft::from_cart(&unquoted, &checkout_request(), "BRL")
            .expect_err("shipping required");
        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(ref message)) if message.contains("shipping")));
    }

    #[test]
    fn incomplete_requests_are_rejected() {
        let mut missing_street = checkout_request();
        missing_street.shipping_address.street = "  ".to_string();
        assert!(OrderDraft::from_cart(&priced_cart(), &missing_street, "BRL").is_err());

        let mut short_card = checkout_request();
        short_card.payment_method.card_number = "1234".to_string();
        assert!(OrderDraft::from_cart(&priced_cart(), &short_card, "BRL").is_err());

        let mut bad_zip = checkout_request();
        bad_zip.shipping_address.zip_code = "123".to_string();
        assert!(OrderDraft::from_cart(&priced_cart(), &bad_zip, "BRL").is_err());
    }

    #[test]
    fn fingerprint_tracks_request_content() {
        let original = checkout_request();
        let mut changed = checkout_request();
        changed.shipping_address.number = "124".to_string();

        assert_eq!(request_fingerprint(&original), request_fingerprint(&checkout_request()));
        assert_ne!(request_fingerprint(&original), request_fingerprint(&changed));
        assert!(request_fingerprint(&original).starts_with("sha256:"));
    }

    #[test]
    fn order_number_has_prefix_and_six_digits() {
        let number = order_number("LS", Uuid::from_u128(12_345_678_901));
        assert_eq!(number, "LS-678901");

        let padded = order_number("LS", Uuid::from_u128(42));
        assert_eq!(padded, "LS-000042");
    }

    #[test]
    fn debug_output_hides_card_secrets() {
        let debug = format!("{:?}", checkout_request().payment_method);
        assert!(!debug.contains("4111"));
        assert!(!debug.contains("\"123\""));
    }
}
