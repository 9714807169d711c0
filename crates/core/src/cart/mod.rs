//! Session-scoped cart ledger.
//!
//! The ledger owns line items, at most one coupon and a shipping charge. Totals
//! are derived through [`crate::pricing`] on every read and never stored.
//!
//! Operations that reference a product not in the cart are silent no-ops; they
//! report whether anything changed instead of failing. Quantity preconditions
//! are carried by `NonZeroU32`, and stock is not enforced here.

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cart::{CartItem, Coupon};
use crate::domain::product::{Product, ProductId};
use crate::errors::DomainError;
use crate::pricing::{self, PricingResult};

/// Non-negative shipping charge. Zero means "not calculated yet".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct ShippingCharge(Decimal);

impl ShippingCharge {
    pub const NOT_CALCULATED: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::Validation(format!(
                "shipping charge must not be negative (got {amount})"
            )));
        }
        Ok(Self(amount))
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    pub fn is_calculated(self) -> bool {
        !self.0.is_zero()
    }
}

impl TryFrom<Decimal> for ShippingCharge {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShippingCharge> for Decimal {
    fn from(value: ShippingCharge) -> Self {
        value.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub total_items: u64,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    coupon: Option<Coupon>,
    shipping: ShippingCharge,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == product_id)
    }

    pub fn coupon(&self) -> Option<&Coupon> {
        self.coupon.as_ref()
    }

    pub fn shipping(&self) -> ShippingCharge {
        self.shipping
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds `quantity` units of `product`. A product already in the cart has its
    /// quantity incremented; its captured price is left untouched.
    pub fn add_item(&mut self, product: &Product, quantity: NonZeroU32) {
        match self.items.iter_mut().find(|item| item.id == product.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(quantity.get());
            }
            None => self.items.push(CartItem::from_product(product, quantity.get())),
        }
    }

    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.id != product_id);
        self.items.len() != before
    }

    /// Sets the quantity directly. Bounds against stock belong to the caller.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: NonZeroU32) -> bool {
        match self.items.iter_mut().find(|item| &item.id == product_id) {
            Some(item) => {
                item.quantity = quantity.get();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon = None;
        self.shipping = ShippingCharge::NOT_CALCULATED;
    }

    /// Replaces any active coupon and returns the one it displaced.
    pub fn apply_coupon(&mut self, coupon: Coupon) -> Option<Coupon> {
        self.coupon.replace(coupon)
    }

    pub fn remove_coupon(&mut self) -> Option<Coupon> {
        self.coupon.take()
    }

    pub fn set_shipping(&mut self, amount: ShippingCharge) {
        self.shipping = amount;
    }

    pub fn total_items(&self) -> u64 {
        pricing::total_items(&self.items)
    }

    pub fn subtotal(&self) -> Decimal {
        pricing::subtotal(&self.items)
    }

    pub fn discount(&self) -> Decimal {
        pricing::discount(self.coupon.as_ref(), self.subtotal())
    }

    pub fn total(&self) -> Decimal {
        self.subtotal() + self.shipping.amount() - self.discount()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals {
            total_items: self.total_items(),
            subtotal: self.subtotal(),
            discount: self.discount(),
            shipping: self.shipping.amount(),
            total: self.total(),
        }
    }

    pub fn price(&self, currency: &str) -> PricingResult {
        pricing::price_lines(&self.items, self.shipping.amount(), self.coupon.as_ref(), currency)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use rust_decimal::Decimal;

    use super::{Cart, ShippingCharge};
    use crate::domain::{
        cart::Coupon,
        product::{fixtures::product, ProductId},
    };
    use crate::errors::DomainError;

    fn qty(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).expect("non-zero quantity")
    }

    fn shipping(value: i64) -> ShippingCharge {
        ShippingCharge::new(Decimal::new(value, 0)).expect("valid shipping")
    }

    #[test]
    fn adding_same_product_twice_merges_quantities() {
        let mut cart = Cart::new();
        let item = product("1", Decimal::new(100, 0));

        cart.add_item(&item, qty(2));
        cart.add_item(&item, qty(3));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.total_items(), 5);
    }

    #[test]
    fn items_keep_insertion_order() {
        let mut cart = Cart::new();
        cart.add_item(&product("b", Decimal::new(5, 0)), qty(1));
        cart.add_item(&product("a", Decimal::new(50, 0)), qty(1));
        cart.add_item(&product("b", Decimal::new(5, 0)), qty(1));

        let ids: Vec<&str> = cart.items().iter().map(|item| item.id.0.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn captured_price_survives_later_discount_changes() {
        let mut cart = Cart::new();
        let mut item = product("1", Decimal::new(100, 0));
        item.discount_price = Some(Decimal::new(80, 0));
        cart.add_item(&item, qty(1));

        item.discount_price = None;
        cart.add_item(&item, qty(1));

        assert_eq!(cart.items()[0].price, Decimal::new(80, 0));
        assert_eq!(cart.subtotal(), Decimal::new(160, 0));
    }

    #[test]
    fn discount_price_drives_cart_line_price() {
        let mut with_discount = product("1", Decimal::new(100, 0));
        with_discount.discount_price = Some(Decimal::new(75, 0));
        let without_discount = product("1", Decimal::new(100, 0));

        let mut first = Cart::new();
        first.add_item(&with_discount, qty(1));
        let mut second = Cart::new();
        second.add_item(&without_discount, qty(1));

        assert_eq!(first.subtotal(), Decimal::new(75, 0));
        assert_eq!(second.subtotal(), Decimal::new(100, 0));
    }

    #[test]
    fn remove_and_update_on_missing_item_are_no_ops() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", Decimal::new(10, 0)), qty(1));
        let before = cart.clone();

        assert!(!cart.remove_item(&ProductId("missing".into())));
        assert!(!cart.update_quantity(&ProductId("missing".into()), qty(4)));
        assert_eq!(cart, before);
    }

    #[test]
    fn update_quantity_sets_rather_than_increments() {
        let mut cart = Cart::new();
        let id = ProductId("1".into());
        cart.add_item(&product("1", Decimal::new(10, 0)), qty(3));

        assert!(cart.update_quantity(&id, qty(1)));
        assert_eq!(cart.item(&id).map(|item| item.quantity), Some(1));

        assert!(cart.remove_item(&id));
        assert!(cart.is_empty());
    }

    #[test]
    fn applying_a_coupon_replaces_the_previous_one() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", Decimal::new(100, 0)), qty(1));
        cart.set_shipping(shipping(20));

        let first = Coupon::percentage("BEMVINDO10", Decimal::new(10, 0));
        let second = Coupon::fixed_amount("FRETE", Decimal::new(20, 0));
        assert_eq!(cart.apply_coupon(first.clone()), None);
        assert_eq!(cart.apply_coupon(second.clone()), Some(first));

        assert_eq!(cart.coupon(), Some(&second));
        assert_eq!(cart.discount(), Decimal::new(20, 0));
        assert_eq!(cart.remove_coupon(), Some(second));
        assert_eq!(cart.discount(), Decimal::ZERO);
    }

    #[test]
    fn total_is_subtotal_plus_shipping_minus_discount() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", Decimal::new(100, 0)), qty(2));
        cart.set_shipping(shipping(20));
        cart.apply_coupon(Coupon::percentage("BEMVINDO10", Decimal::new(10, 0)));

        let totals = cart.totals();
        assert_eq!(totals.subtotal, Decimal::new(200, 0));
        assert_eq!(totals.discount, Decimal::new(20, 0));
        assert_eq!(totals.shipping, Decimal::new(20, 0));
        assert_eq!(totals.total, Decimal::new(200, 0));
        assert_eq!(totals.total, totals.subtotal + totals.shipping - totals.discount);
        assert_eq!(cart.price("BRL").total, totals.total);
    }

    #[test]
    fn total_is_not_clamped_at_zero() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", Decimal::new(10, 0)), qty(1));
        cart.apply_coupon(Coupon::fixed_amount("FRETE", Decimal::new(40, 0)));

        assert_eq!(cart.total(), Decimal::new(-30, 0));
    }

    #[test]
    fn clear_resets_items_coupon_and_shipping() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", Decimal::new(10, 0)), qty(1));
        cart.apply_coupon(Coupon::percentage("BEMVINDO10", Decimal::new(10, 0)));
        cart.set_shipping(shipping(15));

        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.coupon(), None);
        assert!(!cart.shipping().is_calculated());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn negative_shipping_is_rejected() {
        let error = ShippingCharge::new(Decimal::new(-1, 0)).expect_err("negative shipping");
        assert!(matches!(error, DomainError::Validation(ref message) if message.contains("shipping")));
    }
}
