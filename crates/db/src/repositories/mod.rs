use async_trait::async_trait;
use thiserror::Error;

use storefront_core::accounts::{NewAddress, NewCustomer, NewPaymentMethod, ProfileChanges};
use storefront_core::domain::customer::{
    Customer, CustomerId, SavedAddress, SavedPaymentMethod, StoredCredentials,
};
use storefront_core::domain::order::{IdempotencyKey, Order};
use storefront_core::domain::product::{Product, ProductId};
use storefront_core::errors::ApplicationError;

pub mod customer;
pub mod memory;
pub mod order;
pub mod product;

pub use customer::SqlCustomerRepository;
pub use memory::{InMemoryCustomerRepository, InMemoryOrderRepository, InMemoryProductRepository};
pub use order::SqlOrderRepository;
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// The generated order number already belongs to another order. Callers
    /// pick a fresh number and retry.
    #[error("order number `{0}` is already taken")]
    OrderNumberTaken(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict(message) => ApplicationError::Conflict(message),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

/// Read side of the catalog. Listing methods return products in insertion
/// order.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn list_by_category_slug(&self, slug: &str) -> Result<Vec<Product>, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>, RepositoryError>;
    /// Newest first.
    async fn list_for_customer(&self, customer_id: CustomerId)
        -> Result<Vec<Order>, RepositoryError>;
    /// Fails with [`RepositoryError::Conflict`] when the idempotency key is
    /// taken and [`RepositoryError::OrderNumberTaken`] when the order number is.
    async fn insert(&self, order: Order) -> Result<(), RepositoryError>;
}

/// Customer accounts and everything hanging off them. Emails are stored
/// normalized; uniqueness is enforced here and reported as
/// [`RepositoryError::Conflict`].
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn create(&self, customer: NewCustomer) -> Result<Customer, RepositoryError>;
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;
    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, RepositoryError>;
    /// `None` when the customer does not exist.
    async fn update_profile(
        &self,
        id: CustomerId,
        changes: ProfileChanges,
    ) -> Result<Option<Customer>, RepositoryError>;
    /// A default address clears the flag on the customer's other addresses.
    async fn add_address(
        &self,
        id: CustomerId,
        address: NewAddress,
    ) -> Result<Option<SavedAddress>, RepositoryError>;
    /// A default card clears the flag on the customer's other cards.
    async fn add_payment_method(
        &self,
        id: CustomerId,
        method: NewPaymentMethod,
    ) -> Result<Option<SavedPaymentMethod>, RepositoryError>;
    /// `false` when the product was already a favorite.
    async fn add_favorite(
        &self,
        id: CustomerId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError>;
    /// `false` when the product was not a favorite.
    async fn remove_favorite(
        &self,
        id: CustomerId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError>;
}
