//! Session cart endpoints. All routes require a bearer session.
//!
//! The ledger itself never looks at stock; this layer rejects any change that
//! would push a line above the stock snapshot taken when it was first added.

use std::num::NonZeroU32;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_core::cart::{Cart, CartTotals};
use storefront_core::checkout::ShippingQuote;
use storefront_core::domain::cart::{CartItem, Coupon};
use storefront_core::domain::product::ProductId;
use storefront_core::errors::{ApplicationError, DomainError};
use tracing::info;

use crate::error::{ApiError, CorrelationId, ResultExt};
use crate::sessions::Session;
use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub coupon: Option<Coupon>,
    pub shipping_calculated: bool,
    pub totals: CartTotals,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            coupon: cart.coupon().cloned(),
            shipping_calculated: cart.shipping().is_calculated(),
            totals: cart.totals(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRequest {
    pub postal_code: String,
}

#[derive(Debug, Serialize)]
pub struct ShippingUpdate {
    pub quote: ShippingQuote,
    pub cart: CartView,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(get_cart).delete(clear_cart))
        .route("/api/cart/items", post(add_item))
        .route("/api/cart/items/{id}", put(update_item).delete(remove_item))
        .route("/api/cart/coupon", post(apply_coupon).delete(remove_coupon))
        .route("/api/cart/shipping", post(quote_shipping))
}

async fn get_cart(session: Session) -> Json<CartView> {
    let cart = session.cart.lock().await;
    Json(CartView::from(&*cart))
}

async fn clear_cart(correlation_id: CorrelationId, session: Session) -> Json<CartView> {
    let mut cart = session.cart.lock().await;
    cart.clear();
    info!(
        event_name = "cart.cleared",
        correlation_id = %correlation_id.as_str(),
        customer_id = %session.customer_id,
        "cart cleared"
    );
    Json(CartView::from(&*cart))
}

async fn add_item(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let quantity = positive_quantity(request.quantity).or_api(&correlation_id)?;
    let product_id = ProductId(request.product_id.trim().to_string());
    let product = state
        .products
        .find_by_id(&product_id)
        .await
        .or_api(&correlation_id)?
        .ok_or_else(|| ApplicationError::NotFound(format!("product `{product_id}`")))
        .or_api(&correlation_id)?;

    let mut cart = session.cart.lock().await;
    let (in_cart, stock) = match cart.item(&product_id) {
        Some(item) => (item.quantity, item.stock),
        None => (0, product.stock),
    };
    let requested = in_cart.checked_add(quantity.get()).unwrap_or(u32::MAX);
    ensure_in_stock(&product.name, requested, stock).or_api(&correlation_id)?;

    cart.add_item(&product, quantity);
    info!(
        event_name = "cart.item.added",
        correlation_id = %correlation_id.as_str(),
        customer_id = %session.customer_id,
        product_id = %product_id,
        quantity = quantity.get(),
        "item added to cart"
    );
    Ok(Json(CartView::from(&*cart)))
}

async fn update_item(
    correlation_id: CorrelationId,
    session: Session,
    Path(id): Path<String>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    let quantity = positive_quantity(request.quantity).or_api(&correlation_id)?;
    let product_id = ProductId(id);

    let mut cart = session.cart.lock().await;
    let item = cart
        .item(&product_id)
        .ok_or_else(|| ApplicationError::NotFound(format!("cart item `{product_id}`")))
        .or_api(&correlation_id)?;
    ensure_in_stock(&item.name, quantity.get(), item.stock).or_api(&correlation_id)?;

    cart.update_quantity(&product_id, quantity);
    info!(
        event_name = "cart.item.updated",
        correlation_id = %correlation_id.as_str(),
        customer_id = %session.customer_id,
        product_id = %product_id,
        quantity = quantity.get(),
        "cart item quantity updated"
    );
    Ok(Json(CartView::from(&*cart)))
}

async fn remove_item(
    correlation_id: CorrelationId,
    session: Session,
    Path(id): Path<String>,
) -> Json<CartView> {
    let product_id = ProductId(id);
    let mut cart = session.cart.lock().await;
    let removed = cart.remove_item(&product_id);
    info!(
        event_name = "cart.item.removed",
        correlation_id = %correlation_id.as_str(),
        customer_id = %session.customer_id,
        product_id = %product_id,
        removed,
        "cart item removal requested"
    );
    Json(CartView::from(&*cart))
}

async fn apply_coupon(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
    Json(request): Json<ApplyCouponRequest>,
) -> Result<Json<CartView>, ApiError> {
    let mut cart = session.cart.lock().await;
    let coupon =
        state.coupons.redeem(&request.code, cart.shipping()).await.or_api(&correlation_id)?;
    let code = coupon.code().to_string();
    let replaced = cart.apply_coupon(coupon);

    info!(
        event_name = "cart.coupon.applied",
        correlation_id = %correlation_id.as_str(),
        customer_id = %session.customer_id,
        coupon_code = %code,
        replaced_code = replaced.as_ref().map(Coupon::code).unwrap_or("none"),
        "coupon applied"
    );
    Ok(Json(CartView::from(&*cart)))
}

async fn remove_coupon(correlation_id: CorrelationId, session: Session) -> Json<CartView> {
    let mut cart = session.cart.lock().await;
    let removed = cart.remove_coupon();
    info!(
        event_name = "cart.coupon.removed",
        correlation_id = %correlation_id.as_str(),
        customer_id = %session.customer_id,
        coupon_code = removed.as_ref().map(Coupon::code).unwrap_or("none"),
        "coupon removed"
    );
    Json(CartView::from(&*cart))
}

async fn quote_shipping(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
    Json(request): Json<ShippingRequest>,
) -> Result<Json<ShippingUpdate>, ApiError> {
    let quote = state.shipping.quote(&request.postal_code).await.or_api(&correlation_id)?;

    let mut cart = session.cart.lock().await;
    cart.set_shipping(quote.amount);
    info!(
        event_name = "cart.shipping.quoted",
        correlation_id = %correlation_id.as_str(),
        customer_id = %session.customer_id,
        postal_code = %quote.postal_code,
        amount = %Decimal::from(quote.amount),
        "shipping quote stored on cart"
    );
    Ok(Json(ShippingUpdate { quote, cart: CartView::from(&*cart) }))
}

fn positive_quantity(quantity: u32) -> Result<NonZeroU32, DomainError> {
    NonZeroU32::new(quantity)
        .ok_or_else(|| DomainError::Validation("quantity must be at least 1".to_string()))
}

fn ensure_in_stock(name: &str, requested: u32, stock: u32) -> Result<(), DomainError> {
    if requested > stock {
        return Err(DomainError::Validation(format!(
            "only {stock} unit(s) of `{name}` are available (requested {requested})"
        )));
    }
    Ok(())
}
