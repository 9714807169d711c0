//! Read-only catalog endpoints.
//!
//! - `GET /api/products`                    paginated listing (text matches name, description, category)
//! - `GET /api/products/search`             unpaginated search (text matches name, description, brand)
//! - `GET /api/products/facets`             price bounds, brands and categories of the candidate set
//! - `GET /api/products/{id}`               single product
//! - `GET /api/categories/{slug}/products`  paginated listing scoped to one category

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use storefront_core::catalog::{CatalogFacets, Page, SearchParams, SearchScope, SortBy};
use storefront_core::domain::product::{Product, ProductId};
use storefront_core::errors::ApplicationError;
use tracing::debug;

use crate::error::{ApiError, CorrelationId, ResultExt};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub query: Option<String>,
    pub sort: SortBy,
    pub total: usize,
    pub items: Vec<Product>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FacetQuery {
    #[serde(default)]
    pub category: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/search", get(search_products))
        .route("/api/products/facets", get(product_facets))
        .route("/api/products/{id}", get(get_product))
        .route("/api/categories/{slug}/products", get(category_products))
}

async fn list_products(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<Product>>, ApiError> {
    let products = state.products.list_all().await.or_api(&correlation_id)?;
    listing_page(&state, &products, &params, &correlation_id).map(Json)
}

async fn search_products(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, ApiError> {
    let spec = params.to_filter_spec(SearchScope::Search).or_api(&correlation_id)?;
    let products = state.products.list_all().await.or_api(&correlation_id)?;
    let items = state.engine.query(&products, &spec);

    debug!(
        event_name = "catalog.search.executed",
        correlation_id = %correlation_id.as_str(),
        query = spec.query().unwrap_or_default(),
        sort = spec.sort_by().as_str(),
        matches = items.len(),
        "catalog search executed"
    );

    Ok(Json(SearchResults {
        query: spec.query().map(str::to_string),
        sort: spec.sort_by(),
        total: items.len(),
        items,
    }))
}

async fn product_facets(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Query(query): Query<FacetQuery>,
) -> Result<Json<CatalogFacets>, ApiError> {
    let mut products = state.products.list_all().await.or_api(&correlation_id)?;
    if let Some(category) = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        products.retain(|product| product.category == category);
    }
    Ok(Json(CatalogFacets::from_products(&products)))
}

async fn get_product(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .products
        .find_by_id(&ProductId(id.clone()))
        .await
        .or_api(&correlation_id)?
        .ok_or_else(|| ApplicationError::NotFound(format!("product `{id}`")))
        .or_api(&correlation_id)?;
    Ok(Json(product))
}

async fn category_products(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Path(slug): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<Product>>, ApiError> {
    let products = state.products.list_by_category_slug(&slug).await.or_api(&correlation_id)?;
    let params = SearchParams { category: None, ..params };
    listing_page(&state, &products, &params, &correlation_id).map(Json)
}

fn listing_page(
    state: &AppState,
    products: &[Product],
    params: &SearchParams,
    correlation_id: &CorrelationId,
) -> Result<Page<Product>, ApiError> {
    let spec = params.to_filter_spec(SearchScope::Listing).or_api(correlation_id)?;
    let page = params.page().or_api(correlation_id)?;
    Ok(state.engine.query_page(products, &spec, page))
}
