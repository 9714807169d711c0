use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::ShippingCharge;
use crate::config::CheckoutConfig;
use crate::errors::{ApplicationError, DomainError};

pub const POSTAL_CODE_DIGITS: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub postal_code: String,
    pub amount: ShippingCharge,
}

#[async_trait]
pub trait ShippingQuoter: Send + Sync {
    async fn quote(&self, postal_code: &str) -> Result<ShippingQuote, ApplicationError>;
}

/// Quotes a whole-currency amount inside a configured band. The same postal
/// code always yields the same amount.
#[derive(Clone, Debug)]
pub struct PostalCodeShippingQuoter {
    min: Decimal,
    max: Decimal,
}

impl Default for PostalCodeShippingQuoter {
    fn default() -> Self {
        Self { min: Decimal::new(10, 0), max: Decimal::new(40, 0) }
    }
}

impl PostalCodeShippingQuoter {
    pub fn new(min: Decimal, max: Decimal) -> Result<Self, DomainError> {
        if min.is_sign_negative() && !min.is_zero() {
            return Err(DomainError::Validation(format!("minimum shipping {min} is negative")));
        }
        if min > max {
            return Err(DomainError::Validation(format!(
                "minimum shipping {min} is greater than maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn from_config(config: &CheckoutConfig) -> Result<Self, DomainError> {
        Self::new(config.shipping_min, config.shipping_max)
    }

    fn amount_for(&self, digits: &str) -> Decimal {
        let low = self.min.ceil();
        let high = self.max.floor();
        if high < low {
            return self.min;
        }

        let seed = digits
            .bytes()
            .fold(0u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(u64::from(byte - b'0')));
        low + Decimal::from(seed) % (high - low + Decimal::ONE)
    }
}

pub fn normalize_postal_code(raw: &str) -> Result<String, DomainError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != POSTAL_CODE_DIGITS {
        return Err(DomainError::Validation(format!(
            "postal code must contain exactly {POSTAL_CODE_DIGITS} digits (got `{raw}`)"
        )));
    }
    Ok(digits)
}

#[async_trait]
impl ShippingQuoter for PostalCodeShippingQuoter {
    async fn quote(&self, postal_code: &str) -> Result<ShippingQuote, ApplicationError> {
        let postal_code = normalize_postal_code(postal_code)?;
        let amount = ShippingCharge::new(self.amount_for(&postal_code))?;
        Ok(ShippingQuote { postal_code, amount })
    }
}
