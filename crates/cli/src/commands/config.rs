use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use storefront_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

struct ConfigField {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key_path: &'static str, value: String, env_keys: &'static [&'static str]) -> ConfigField {
    ConfigField { key_path, value, env_keys }
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    vec![
        field("database.url", config.database.url.clone(), &["STOREFRONT_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["STOREFRONT_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["STOREFRONT_DATABASE_TIMEOUT_SECS"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["STOREFRONT_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["STOREFRONT_SERVER_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["STOREFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "catalog.page_size",
            config.catalog.page_size.to_string(),
            &["STOREFRONT_CATALOG_PAGE_SIZE"],
        ),
        field(
            "checkout.currency",
            config.checkout.currency.clone(),
            &["STOREFRONT_CHECKOUT_CURRENCY"],
        ),
        field(
            "checkout.order_number_prefix",
            config.checkout.order_number_prefix.clone(),
            &["STOREFRONT_CHECKOUT_ORDER_NUMBER_PREFIX"],
        ),
        field(
            "checkout.shipping_min",
            config.checkout.shipping_min.to_string(),
            &["STOREFRONT_CHECKOUT_SHIPPING_MIN"],
        ),
        field(
            "checkout.shipping_max",
            config.checkout.shipping_max.to_string(),
            &["STOREFRONT_CHECKOUT_SHIPPING_MAX"],
        ),
        field(
            "auth.session_ttl_secs",
            config.auth.session_ttl_secs.to_string(),
            &["STOREFRONT_AUTH_SESSION_TTL_SECS"],
        ),
        field(
            "auth.password_memory_kib",
            config.auth.password_memory_kib.to_string(),
            &["STOREFRONT_AUTH_PASSWORD_MEMORY_KIB"],
        ),
        field(
            "auth.password_iterations",
            config.auth.password_iterations.to_string(),
            &["STOREFRONT_AUTH_PASSWORD_ITERATIONS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["STOREFRONT_LOGGING_LEVEL", "STOREFRONT_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["STOREFRONT_LOGGING_FORMAT", "STOREFRONT_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("storefront.toml"), PathBuf::from("config/storefront.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
