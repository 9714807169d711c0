use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId};

/// A cart line. `price` and `stock` are snapshots taken when the product was
/// first added and are never re-derived from the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub quantity: u32,
    pub stock: u32,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.effective_price(),
            image: product.primary_image().map(str::to_string),
            quantity,
            stock: product.stock,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Coupon {
    Percentage {
        code: String,
        #[serde(rename = "discountPercentage")]
        discount_percentage: Decimal,
    },
    FixedAmount {
        code: String,
        #[serde(rename = "discountAmount")]
        discount_amount: Decimal,
    },
}

impl Coupon {
    pub fn percentage(code: impl Into<String>, discount_percentage: Decimal) -> Self {
        Self::Percentage { code: code.into(), discount_percentage }
    }

    pub fn fixed_amount(code: impl Into<String>, discount_amount: Decimal) -> Self {
        Self::FixedAmount { code: code.into(), discount_amount }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Percentage { code, .. } | Self::FixedAmount { code, .. } => code,
        }
    }
}
