//! Catalog Query Engine: filter, stable sort and paginate a product slice.
//!
//! The engine performs no I/O and keeps no state between calls; callers fetch
//! candidates from a product source and hand them in.

pub mod facets;
pub mod params;
pub mod query;

pub use facets::{distinct_brands, price_bounds, CatalogFacets, PriceBounds};
pub use params::SearchParams;
pub use query::{
    paginate, sort_products, CatalogQueryEngine, FilterSpec, FilterStage, Page, PriceRange,
    SearchScope, SortBy, DEFAULT_PAGE_SIZE,
};
