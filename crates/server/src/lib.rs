pub mod accounts;
pub mod bootstrap;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod health;
pub mod orders;
pub mod sessions;
pub mod state;

#[cfg(test)]
mod test_support;

use axum::Router;
use storefront_core::config::{LogFormat, LoggingConfig};
use tracing::Level;

use crate::state::AppState;

/// Storefront API routes over shared application state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(accounts::router())
        .merge(sessions::router())
        .merge(catalog::router())
        .merge(cart::router())
        .merge(orders::router())
        .with_state(state)
}

pub fn init_logging(config: &LoggingConfig) {
    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}
