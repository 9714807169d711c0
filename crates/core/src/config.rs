use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub checkout: CheckoutConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogConfig {
    pub page_size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutConfig {
    pub currency: String,
    pub order_number_prefix: String,
    pub shipping_min: Decimal,
    pub shipping_max: Decimal,
}

/// Session lifetime and argon2 cost parameters for stored passwords.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthConfig {
    pub session_ttl_secs: u64,
    pub password_memory_kib: u32,
    pub password_iterations: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://storefront.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            catalog: CatalogConfig { page_size: 12 },
            checkout: CheckoutConfig {
                currency: "BRL".to_string(),
                order_number_prefix: "LS".to_string(),
                shipping_min: Decimal::new(10, 0),
                shipping_max: Decimal::new(40, 0),
            },
            auth: AuthConfig {
                session_ttl_secs: 86_400,
                password_memory_kib: 19_456,
                password_iterations: 2,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("storefront.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(page_size) = catalog.page_size {
                self.catalog.page_size = page_size;
            }
        }

        if let Some(checkout) = patch.checkout {
            if let Some(currency) = checkout.currency {
                self.checkout.currency = currency;
            }
            if let Some(order_number_prefix) = checkout.order_number_prefix {
                self.checkout.order_number_prefix = order_number_prefix;
            }
            if let Some(shipping_min) = checkout.shipping_min {
                self.checkout.shipping_min = shipping_min;
            }
            if let Some(shipping_max) = checkout.shipping_max {
                self.checkout.shipping_max = shipping_max;
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(session_ttl_secs) = auth.session_ttl_secs {
                self.auth.session_ttl_secs = session_ttl_secs;
            }
            if let Some(password_memory_kib) = auth.password_memory_kib {
                self.auth.password_memory_kib = password_memory_kib;
            }
            if let Some(password_iterations) = auth.password_iterations {
                self.auth.password_iterations = password_iterations;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("STOREFRONT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("STOREFRONT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("STOREFRONT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("STOREFRONT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("STOREFRONT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("STOREFRONT_SERVER_PORT") {
            self.server.port = parse_env("STOREFRONT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("STOREFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("STOREFRONT_CATALOG_PAGE_SIZE") {
            self.catalog.page_size = parse_env("STOREFRONT_CATALOG_PAGE_SIZE", &value)?;
        }

        if let Some(value) = read_env("STOREFRONT_CHECKOUT_CURRENCY") {
            self.checkout.currency = value;
        }
        if let Some(value) = read_env("STOREFRONT_CHECKOUT_ORDER_NUMBER_PREFIX") {
            self.checkout.order_number_prefix = value;
        }
        if let Some(value) = read_env("STOREFRONT_CHECKOUT_SHIPPING_MIN") {
            self.checkout.shipping_min = parse_env("STOREFRONT_CHECKOUT_SHIPPING_MIN", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_CHECKOUT_SHIPPING_MAX") {
            self.checkout.shipping_max = parse_env("STOREFRONT_CHECKOUT_SHIPPING_MAX", &value)?;
        }

        if let Some(value) = read_env("STOREFRONT_AUTH_SESSION_TTL_SECS") {
            self.auth.session_ttl_secs = parse_env("STOREFRONT_AUTH_SESSION_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_AUTH_PASSWORD_MEMORY_KIB") {
            self.auth.password_memory_kib =
                parse_env("STOREFRONT_AUTH_PASSWORD_MEMORY_KIB", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_AUTH_PASSWORD_ITERATIONS") {
            self.auth.password_iterations =
                parse_env("STOREFRONT_AUTH_PASSWORD_ITERATIONS", &value)?;
        }

        let log_level =
            read_env("STOREFRONT_LOGGING_LEVEL").or_else(|| read_env("STOREFRONT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STOREFRONT_LOGGING_FORMAT").or_else(|| read_env("STOREFRONT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_catalog(&self.catalog)?;
        validate_checkout(&self.checkout)?;
        validate_auth(&self.auth)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("storefront.toml"), PathBuf::from("config/storefront.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.page_size == 0 {
        return Err(ConfigError::Validation(
            "catalog.page_size must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_checkout(checkout: &CheckoutConfig) -> Result<(), ConfigError> {
    let currency = checkout.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(
            "checkout.currency must be a three-letter uppercase ISO code such as `BRL`".to_string(),
        ));
    }

    if checkout.order_number_prefix.trim().is_empty() {
        return Err(ConfigError::Validation(
            "checkout.order_number_prefix must not be empty".to_string(),
        ));
    }

    if checkout.shipping_min.is_sign_negative() || checkout.shipping_max.is_sign_negative() {
        return Err(ConfigError::Validation(
            "checkout.shipping_min and checkout.shipping_max must not be negative".to_string(),
        ));
    }

    if checkout.shipping_min > checkout.shipping_max {
        return Err(ConfigError::Validation(format!(
            "checkout.shipping_min ({}) must not exceed checkout.shipping_max ({})",
            checkout.shipping_min, checkout.shipping_max
        )));
    }

    Ok(())
}

fn validate_auth(auth: &AuthConfig) -> Result<(), ConfigError> {
    if auth.session_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "auth.session_ttl_secs must be greater than zero".to_string(),
        ));
    }

    // argon2 needs at least 8 KiB per lane; one lane is used.
    if auth.password_memory_kib < 8 {
        return Err(ConfigError::Validation(
            "auth.password_memory_kib must be at least 8".to_string(),
        ));
    }

    if auth.password_iterations == 0 {
        return Err(ConfigError::Validation(
            "auth.password_iterations must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    catalog: Option<CatalogPatch>,
    checkout: Option<CheckoutPatch>,
    auth: Option<AuthPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct CheckoutPatch {
    currency: Option<String>,
    order_number_prefix: Option<String>,
    shipping_min: Option<Decimal>,
    shipping_max: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    session_ttl_secs: Option<u64>,
    password_memory_kib: Option<u32>,
    password_iterations: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
