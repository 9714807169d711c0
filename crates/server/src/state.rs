use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use storefront_core::catalog::CatalogQueryEngine;
use storefront_core::checkout::{
    CouponBook, PostalCodeShippingQuoter, ShippingQuoter, StaticCouponBook,
};
use storefront_core::accounts::CredentialHasher;
use storefront_core::config::AppConfig;
use storefront_core::errors::DomainError;
use storefront_db::{CustomerRepository, OrderRepository, ProductRepository};

use crate::orders::OrderService;
use crate::sessions::SessionStore;

/// Shared handler state. Cloning is cheap; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub hasher: CredentialHasher,
    pub orders: OrderService,
    pub sessions: SessionStore,
    pub coupons: Arc<dyn CouponBook>,
    pub shipping: Arc<dyn ShippingQuoter>,
    pub engine: CatalogQueryEngine,
}

impl AppState {
    pub fn from_config(
        config: &AppConfig,
        products: Arc<dyn ProductRepository>,
        customers: Arc<dyn CustomerRepository>,
        orders: Arc<dyn OrderRepository>,
    ) -> Result<Self, DomainError> {
        let page_size = NonZeroU32::new(config.catalog.page_size).ok_or_else(|| {
            DomainError::Validation("catalog.page_size must be greater than zero".to_string())
        })?;

        Ok(Self {
            products,
            customers,
            hasher: CredentialHasher::from_config(&config.auth)?,
            orders: OrderService::new(
                orders,
                config.checkout.currency.clone(),
                config.checkout.order_number_prefix.clone(),
            ),
            sessions: SessionStore::new(Duration::from_secs(config.auth.session_ttl_secs)),
            coupons: Arc::new(StaticCouponBook::default()),
            shipping: Arc::new(PostalCodeShippingQuoter::from_config(&config.checkout)?),
            engine: CatalogQueryEngine::new(page_size),
        })
    }

    pub fn currency(&self) -> &str {
        self.orders.currency()
    }
}
