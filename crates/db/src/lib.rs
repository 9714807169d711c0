pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect_with_config, connect_with_settings, ping, DbPool};
pub use fixtures::{CatalogSeedDataset, CategorySeedInfo, SeedResult, VerificationResult};
pub use repositories::{
    CustomerRepository, InMemoryCustomerRepository, InMemoryOrderRepository,
    InMemoryProductRepository, OrderRepository, ProductRepository, RepositoryError,
    SqlCustomerRepository, SqlOrderRepository, SqlProductRepository,
};
