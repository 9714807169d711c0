use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::Product;
use crate::errors::DomainError;

pub const DEFAULT_PAGE_SIZE: u32 = 12;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Newest,
    Rating,
    Popularity,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Newest => "newest",
            Self::Rating => "rating",
            Self::Popularity => "popularity",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "relevance" => Some(Self::Relevance),
            "price_asc" => Some(Self::PriceAsc),
            "price_desc" => Some(Self::PriceDesc),
            "newest" => Some(Self::Newest),
            "rating" => Some(Self::Rating),
            "popularity" => Some(Self::Popularity),
            _ => None,
        }
    }
}

impl FromStr for SortBy {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| {
            DomainError::Validation(format!(
                "unsupported sort `{value}` (expected relevance|price_asc|price_desc|newest|rating|popularity)"
            ))
        })
    }
}

/// Which text fields a free-text query is matched against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// name, description, brand
    Search,
    /// name, description, category
    #[default]
    Listing,
}

/// Inclusive bounds on effective price. Either side may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    min: Option<Decimal>,
    max: Option<Decimal>,
}

impl PriceRange {
    pub const UNBOUNDED: Self = Self { min: None, max: None };

    pub fn new(min: Option<Decimal>, max: Option<Decimal>) -> Result<Self, DomainError> {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(DomainError::Validation(format!(
                    "price range minimum {min} is greater than maximum {max}"
                )));
            }
        }
        Ok(Self { min, max })
    }

    pub fn between(min: Decimal, max: Decimal) -> Result<Self, DomainError> {
        Self::new(Some(min), Some(max))
    }

    pub fn min(&self) -> Option<Decimal> {
        self.min
    }

    pub fn max(&self) -> Option<Decimal> {
        self.max
    }

    pub fn contains(&self, price: Decimal) -> bool {
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }
}

/// Immutable description of one catalog query. Every change goes through a
/// `with_*` constructor that returns a new value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    sort_by: SortBy,
    price_range: PriceRange,
    brands: BTreeSet<String>,
    min_rating: Option<Decimal>,
    query: Option<String>,
    category: Option<String>,
    scope: SearchScope,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub fn price_range(&self) -> PriceRange {
        self.price_range
    }

    pub fn brands(&self) -> &BTreeSet<String> {
        &self.brands
    }

    pub fn min_rating(&self) -> Option<Decimal> {
        self.min_rating
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn scope(&self) -> SearchScope {
        self.scope
    }

    pub fn with_sort_by(&self, sort_by: SortBy) -> Self {
        Self { sort_by, ..self.clone() }
    }

    pub fn with_price_range(&self, price_range: PriceRange) -> Self {
        Self { price_range, ..self.clone() }
    }

    pub fn with_brands<I, S>(&self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let brands = brands
            .into_iter()
            .map(Into::into)
            .filter(|brand: &String| !brand.trim().is_empty())
            .collect();
        Self { brands, ..self.clone() }
    }

    /// Selecting a rating replaces any previous selection.
    pub fn with_min_rating(&self, min_rating: Option<Decimal>) -> Self {
        Self { min_rating, ..self.clone() }
    }

    pub fn with_query(&self, query: Option<&str>) -> Self {
        let query = query.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string);
        Self { query, ..self.clone() }
    }

    pub fn with_category(&self, category: Option<&str>) -> Self {
        let category = category.filter(|value| !value.is_empty()).map(str::to_string);
        Self { category, ..self.clone() }
    }

    pub fn with_scope(&self, scope: SearchScope) -> Self {
        Self { scope, ..self.clone() }
    }

    pub fn matches(&self, product: &Product) -> bool {
        FilterStage::ALL.iter().all(|stage| stage.admits(self, product))
    }
}

/// The independent filter stages. Their order does not change the result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterStage {
    Text,
    Category,
    Price,
    Brand,
    Rating,
}

impl FilterStage {
    pub const ALL: [Self; 5] = [Self::Text, Self::Category, Self::Price, Self::Brand, Self::Rating];

    pub fn admits(&self, spec: &FilterSpec, product: &Product) -> bool {
        match self {
            Self::Text => match spec.query() {
                None => true,
                Some(query) => text_matches(product, query, spec.scope()),
            },
            Self::Category => spec.category().map_or(true, |category| product.category == category),
            Self::Price => spec.price_range().contains(product.effective_price()),
            Self::Brand => spec.brands().is_empty() || spec.brands().contains(&product.brand),
            Self::Rating => spec.min_rating().map_or(true, |threshold| product.rating >= threshold),
        }
    }
}

fn text_matches(product: &Product, query: &str, scope: SearchScope) -> bool {
    let needle = query.to_lowercase();
    let contains = |field: &str| field.to_lowercase().contains(&needle);

    contains(&product.name)
        || contains(&product.description)
        || match scope {
            SearchScope::Search => contains(&product.brand),
            SearchScope::Listing => contains(&product.category),
        }
}

/// Stable sort; equal keys keep their input order and `Relevance` keeps it all.
pub fn sort_products(products: &mut [&Product], sort_by: SortBy) {
    match sort_by {
        SortBy::Relevance => {}
        SortBy::PriceAsc => products.sort_by_key(|product| product.effective_price()),
        SortBy::PriceDesc => {
            products.sort_by(|a, b| b.effective_price().cmp(&a.effective_price()))
        }
        SortBy::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortBy::Rating => products.sort_by(|a, b| b.rating.cmp(&a.rating)),
        SortBy::Popularity => products.sort_by(|a, b| b.sales_count.cmp(&a.sales_count)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: usize,
    pub total_pages: u32,
}

/// Offset pagination over an already ordered result. Pages past the end are empty.
pub fn paginate<T: Clone>(items: &[T], page: NonZeroU32, page_size: NonZeroU32) -> Page<T> {
    let size = page_size.get() as usize;
    let total_pages = items.len().div_ceil(size);
    let start = (page.get() as usize - 1).saturating_mul(size);
    let slice = items.get(start..).map_or(&[][..], |rest| &rest[..rest.len().min(size)]);

    Page {
        items: slice.to_vec(),
        page: page.get(),
        page_size: page_size.get(),
        total_items: items.len(),
        total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
    }
}

/// Pure filter, sort, paginate pipeline over whatever products it is handed.
#[derive(Clone, Copy, Debug)]
pub struct CatalogQueryEngine {
    page_size: NonZeroU32,
}

impl Default for CatalogQueryEngine {
    fn default() -> Self {
        Self { page_size: NonZeroU32::MIN.saturating_add(DEFAULT_PAGE_SIZE - 1) }
    }
}

impl CatalogQueryEngine {
    pub fn new(page_size: NonZeroU32) -> Self {
        Self { page_size }
    }

    pub fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    pub fn filter<'a>(&self, products: &'a [Product], spec: &FilterSpec) -> Vec<&'a Product> {
        products.iter().filter(|product| spec.matches(product)).collect()
    }

    pub fn run<'a>(&self, products: &'a [Product], spec: &FilterSpec) -> Vec<&'a Product> {
        let mut matched = self.filter(products, spec);
        sort_products(&mut matched, spec.sort_by());
        matched
    }

    pub fn query(&self, products: &[Product], spec: &FilterSpec) -> Vec<Product> {
        self.run(products, spec).into_iter().cloned().collect()
    }

    pub fn query_page(
        &self,
        products: &[Product],
        spec: &FilterSpec,
        page: NonZeroU32,
    ) -> Page<Product> {
        let ordered = self.run(products, spec);
        let page = paginate(&ordered, page, self.page_size);
        Page {
            items: page.items.into_iter().cloned().collect(),
            page: page.page,
            page_size: page.page_size,
            total_items: page.total_items,
            total_pages: page.total_pages,
        }
    }
}
