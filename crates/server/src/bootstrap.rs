use std::sync::Arc;

use axum::Router;
use storefront_core::config::{AppConfig, ConfigError, LoadOptions};
use storefront_core::errors::DomainError;
use storefront_db::{
    connect_with_config, migrations, DbPool, SqlCustomerRepository, SqlOrderRepository,
    SqlProductRepository,
};
use thiserror::Error;
use tracing::info;

use crate::health;
use crate::state::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("application state could not be built: {0}")]
    State(#[source] DomainError),
}

impl Application {
    /// API routes plus `/health`.
    pub fn router(&self) -> Router {
        crate::router(self.state.clone()).merge(health::router(self.db_pool.clone()))
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let state = AppState::from_config(
        &config,
        Arc::new(SqlProductRepository::new(db_pool.clone())),
        Arc::new(SqlCustomerRepository::new(db_pool.clone())),
        Arc::new(SqlOrderRepository::new(db_pool.clone())),
    )
    .map_err(BootstrapError::State)?;

    Ok(Application { config, db_pool, state })
}
