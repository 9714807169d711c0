use std::num::NonZeroU32;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::query::{FilterSpec, PriceRange, SearchScope, SortBy};
use crate::errors::DomainError;

/// Query-string shaped catalog input. Every field arrives as text and is
/// validated when converted into a [`FilterSpec`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "minPrice")]
    pub min_price: Option<String>,
    #[serde(default, alias = "maxPrice")]
    pub max_price: Option<String>,
    /// Comma separated brand names.
    #[serde(default, alias = "brand")]
    pub brands: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

impl SearchParams {
    pub fn to_filter_spec(&self, scope: SearchScope) -> Result<FilterSpec, DomainError> {
        let min_price = parse_decimal("min_price", self.min_price.as_deref())?;
        let max_price = parse_decimal("max_price", self.max_price.as_deref())?;
        for (name, bound) in [("min_price", min_price), ("max_price", max_price)] {
            if bound.is_some_and(|value| value.is_sign_negative() && !value.is_zero()) {
                return Err(DomainError::Validation(format!("{name} must not be negative")));
            }
        }

        let sort_by = match non_blank(self.sort.as_deref()) {
            Some(sort) => SortBy::from_str(sort)?,
            None => SortBy::default(),
        };

        let brands = self
            .brands
            .as_deref()
            .map(|csv| csv.split(',').map(str::trim).filter(|brand| !brand.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default();

        Ok(FilterSpec::new()
            .with_scope(scope)
            .with_query(self.q.as_deref())
            .with_category(non_blank(self.category.as_deref()))
            .with_price_range(PriceRange::new(min_price, max_price)?)
            .with_brands(brands)
            .with_min_rating(parse_decimal("rating", self.rating.as_deref())?)
            .with_sort_by(sort_by))
    }

    /// 1-based page number; absent means the first page.
    pub fn page(&self) -> Result<NonZeroU32, DomainError> {
        match non_blank(self.page.as_deref()) {
            None => Ok(NonZeroU32::MIN),
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .and_then(NonZeroU32::new)
                .ok_or_else(|| DomainError::Validation(format!("page must be a positive integer (got `{raw}`)"))),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_decimal(name: &str, value: Option<&str>) -> Result<Option<Decimal>, DomainError> {
    non_blank(value)
        .map(|raw| {
            Decimal::from_str(raw)
                .map_err(|_| DomainError::Validation(format!("{name} must be a decimal number (got `{raw}`)")))
        })
        .transpose()
}
