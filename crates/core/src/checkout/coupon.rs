use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::cart::ShippingCharge;
use crate::domain::cart::Coupon;
use crate::errors::{ApplicationError, DomainError};

/// Resolves a customer-entered code into a [`Coupon`] the cart can hold.
#[async_trait]
pub trait CouponBook: Send + Sync {
    /// `shipping` is the charge currently on the cart; shipping-based coupons
    /// are valued from it at redemption time.
    async fn redeem(&self, code: &str, shipping: ShippingCharge)
        -> Result<Coupon, ApplicationError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CouponRule {
    Percentage(Decimal),
    FreeShipping,
}

#[derive(Clone, Debug)]
pub struct StaticCouponBook {
    rules: Vec<(String, CouponRule)>,
}

impl Default for StaticCouponBook {
    fn default() -> Self {
        Self::empty()
            .with_rule("BEMVINDO10", CouponRule::Percentage(Decimal::new(10, 0)))
            .with_rule("FRETE", CouponRule::FreeShipping)
    }
}

impl StaticCouponBook {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, code: &str, rule: CouponRule) -> Self {
        let code = normalize_code(code);
        self.rules.retain(|(existing, _)| existing != &code);
        self.rules.push((code, rule));
        self
    }

    fn lookup(&self, code: &str) -> Option<&CouponRule> {
        self.rules.iter().find(|(existing, _)| existing == code).map(|(_, rule)| rule)
    }
}

#[async_trait]
impl CouponBook for StaticCouponBook {
    async fn redeem(
        &self,
        code: &str,
        shipping: ShippingCharge,
    ) -> Result<Coupon, ApplicationError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(DomainError::Validation("coupon code must not be empty".to_string()).into());
        }

        match self.lookup(&code) {
            Some(CouponRule::Percentage(percentage)) => Ok(Coupon::percentage(code, *percentage)),
            Some(CouponRule::FreeShipping) => Ok(Coupon::fixed_amount(code, shipping.amount())),
            None => Err(ApplicationError::Integration(format!(
                "coupon `{code}` is invalid or expired"
            ))),
        }
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
