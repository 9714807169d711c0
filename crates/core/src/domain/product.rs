use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub rating: Decimal,
    pub stock: u32,
    pub sales_count: u32,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Price used for every filter, sort and cart line.
    ///
    /// A zero discount price counts as absent, so only a non-zero `discount_price`
    /// replaces `price`.
    pub fn effective_price(&self) -> Decimal {
        match self.discount_price {
            Some(discount) if !discount.is_zero() => discount,
            _ => self.price,
        }
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn category_slug(&self) -> String {
        slugify(&self.category)
    }
}

pub fn slugify(value: &str) -> String {
    value.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join("-")
}
