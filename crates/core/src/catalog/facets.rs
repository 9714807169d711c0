//! Filter-sidebar facets. Both are computed over the unfiltered candidate set
//! so narrowing a query never shrinks the choices offered.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::Product;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub min: Decimal,
    pub max: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFacets {
    pub price_bounds: Option<PriceBounds>,
    pub brands: Vec<String>,
    pub categories: Vec<String>,
}

impl CatalogFacets {
    pub fn from_products(products: &[Product]) -> Self {
        Self {
            price_bounds: price_bounds(products),
            brands: distinct_brands(products),
            categories: distinct_categories(products),
        }
    }
}

pub fn price_bounds(products: &[Product]) -> Option<PriceBounds> {
    let mut prices = products.iter().map(Product::effective_price);
    let first = prices.next()?;
    Some(prices.fold(PriceBounds { min: first, max: first }, |bounds, price| PriceBounds {
        min: bounds.min.min(price),
        max: bounds.max.max(price),
    }))
}

pub fn distinct_brands(products: &[Product]) -> Vec<String> {
    first_seen(products.iter().map(|product| product.brand.as_str()))
}

pub fn distinct_categories(products: &[Product]) -> Vec<String> {
    first_seen(products.iter().map(|product| product.category.as_str()))
}

fn first_seen<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    for value in values {
        if !seen.iter().any(|existing| existing == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
