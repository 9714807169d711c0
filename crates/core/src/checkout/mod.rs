//! Collaborators around the cart: coupon validation, shipping quotes and
//! turning a priced cart into an order record.

pub mod coupon;
pub mod order;
pub mod shipping;

pub use coupon::{CouponBook, CouponRule, StaticCouponBook};
pub use order::{
    mask_card_number, order_number, request_fingerprint, CheckoutRequest, OrderDraft, OrderStamp,
    PaymentDetails,
};
pub use shipping::{normalize_postal_code, PostalCodeShippingQuoter, ShippingQuote, ShippingQuoter};
