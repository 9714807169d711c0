//! Cart arithmetic shared by the cart ledger and order submission.
//!
//! All amounts are exact `Decimal` values. The only rounding step is the
//! percentage discount, which is rounded to [`CURRENCY_SCALE`] places with
//! midpoint-away-from-zero. Neither the discount nor the total is clamped.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::cart::{CartItem, Coupon};

pub const CURRENCY_SCALE: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub currency: String,
    pub steps: Vec<PricingTraceStep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub shipping_total: Decimal,
    pub total: Decimal,
    pub trace: PricingTrace,
}

pub fn total_items(lines: &[CartItem]) -> u64 {
    lines.iter().map(|line| u64::from(line.quantity)).sum()
}

pub fn subtotal(lines: &[CartItem]) -> Decimal {
    lines.iter().map(CartItem::line_total).sum()
}

pub fn discount(coupon: Option<&Coupon>, subtotal: Decimal) -> Decimal {
    match coupon {
        None => Decimal::ZERO,
        Some(Coupon::Percentage { discount_percentage, .. }) => (subtotal * discount_percentage
            / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero),
        Some(Coupon::FixedAmount { discount_amount, .. }) => *discount_amount,
    }
}

pub fn price_lines(
    lines: &[CartItem],
    shipping: Decimal,
    coupon: Option<&Coupon>,
    currency: &str,
) -> PricingResult {
    let subtotal = subtotal(lines);
    let discount_total = discount(coupon, subtotal);
    let total = subtotal + shipping - discount_total;

    let discount_detail = match coupon {
        None => "no coupon applied".to_string(),
        Some(Coupon::Percentage { code, discount_percentage }) => {
            format!("{code}: {discount_percentage}% of subtotal")
        }
        Some(Coupon::FixedAmount { code, discount_amount }) => {
            format!("{code}: fixed {discount_amount}")
        }
    };

    PricingResult {
        subtotal,
        discount_total,
        shipping_total: shipping,
        total,
        trace: PricingTrace {
            currency: currency.to_string(),
            steps: vec![
                PricingTraceStep {
                    stage: "subtotal".to_string(),
                    detail: "sum(price * quantity)".to_string(),
                    amount: subtotal,
                },
                PricingTraceStep {
                    stage: "discount".to_string(),
                    detail: discount_detail,
                    amount: discount_total,
                },
                PricingTraceStep {
                    stage: "shipping".to_string(),
                    detail: "stored shipping charge".to_string(),
                    amount: shipping,
                },
                PricingTraceStep {
                    stage: "total".to_string(),
                    detail: "subtotal + shipping - discount".to_string(),
                    amount: total,
                },
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{discount, price_lines, total_items};
    use crate::domain::{
        cart::{CartItem, Coupon},
        product::ProductId,
    };

    fn line(id: &str, price: Decimal, quantity: u32) -> CartItem {
        CartItem {
            id: ProductId(id.to_string()),
            name: format!("Item {id}"),
            price,
            image: None,
            quantity,
            stock: 99,
        }
    }

    #[test]
    fn percentage_coupon_total_matches_formula() {
        let lines = vec![line("1", Decimal::new(100, 0), 2)];
        let coupon = Coupon::percentage("BEMVINDO10", Decimal::new(10, 0));

        let result = price_lines(&lines, Decimal::new(20, 0), Some(&coupon), "BRL");

        assert_eq!(result.subtotal, Decimal::new(200, 0));
        assert_eq!(result.discount_total, Decimal::new(20, 0));
        assert_eq!(result.shipping_total, Decimal::new(20, 0));
        assert_eq!(result.total, Decimal::new(200, 0));
        assert_eq!(result.trace.steps.len(), 4);
        assert_eq!(result.trace.currency, "BRL");
    }

    #[test]
    fn fixed_amount_discount_is_not_capped_at_subtotal() {
        let lines = vec![line("1", Decimal::new(5, 0), 1)];
        let coupon = Coupon::fixed_amount("FRETE", Decimal::new(30, 0));

        let result = price_lines(&lines, Decimal::ZERO, Some(&coupon), "BRL");

        assert_eq!(result.discount_total, Decimal::new(30, 0));
        assert_eq!(result.total, Decimal::new(-25, 0));
    }

    #[test]
    fn percentage_discount_rounds_to_cents() {
        let coupon = Coupon::percentage("BEMVINDO10", Decimal::new(10, 0));

        // 10% of 44.45 = 4.445 -> 4.45
        assert_eq!(discount(Some(&coupon), Decimal::new(4_445, 2)), Decimal::new(445, 2));
        assert_eq!(discount(None, Decimal::new(4_445, 2)), Decimal::ZERO);
    }

    #[test]
    fn empty_lines_price_to_shipping_only() {
        let result = price_lines(&[], Decimal::new(15, 0), None, "BRL");

        assert_eq!(result.subtotal, Decimal::ZERO);
        assert_eq!(result.total, Decimal::new(15, 0));
    }

    #[test]
    fn total_items_sums_quantities() {
        let lines = vec![line("1", Decimal::ONE, 2), line("2", Decimal::ONE, 5)];
        assert_eq!(total_items(&lines), 7);
    }
}
