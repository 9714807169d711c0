use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use storefront_cli::commands::catalog::{self, CatalogArgs};
use storefront_cli::commands::{doctor, migrate, seed, start};
use tempfile::TempDir;

#[test]
fn start_returns_success_with_valid_env() {
    with_env(&[("STOREFRONT_DATABASE_URL", "sqlite::memory:")], || {
        let result = start::run();
        assert_eq!(result.exit_code, 0, "expected successful start preflight");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "ok");
        assert!(message(&payload).contains("3 pending migrations"));
    });
}

#[test]
fn start_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("STOREFRONT_DATABASE_URL", "postgres://localhost/storefront")], || {
        let result = start::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("STOREFRONT_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert!(message(&payload).contains("schema versions: 1, 2, 3"));
    });
}

#[test]
fn seed_reports_the_demo_catalog() {
    with_env(&[("STOREFRONT_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let summary = message(&payload);
        assert!(summary.starts_with("demo catalog ready with 20 products across 6 categories"));
        assert!(summary.contains("  - Eletrônicos (eletrônicos), products: 5"));
        assert!(summary.contains("  - Moda (moda), products: 3"));
        assert!(summary.contains("  - Infantil (infantil), products: 1"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = TempDir::new().expect("temp dir");
    let url = database_url(&dir);

    with_env(&[("STOREFRONT_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);

        assert_eq!(second_payload["status"], "ok");
        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn catalog_queries_the_seeded_products() {
    let dir = TempDir::new().expect("temp dir");
    let url = database_url(&dir);

    with_env(&[("STOREFRONT_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);

        let result = catalog::run(&CatalogArgs {
            category: Some("Moda".to_string()),
            sort: Some("price_asc".to_string()),
            ..CatalogArgs::default()
        });
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        let listing = message(&payload);
        assert!(listing.starts_with("page 1/1 (3 matching products)"));
        for id in ["[4]", "[12]", "[16]"] {
            assert!(listing.contains(id), "missing {id} in {listing}");
        }
        assert!(listing.lines().skip(1).all(|line| line.contains("| Moda |")));

        let past_end = catalog::run(&CatalogArgs {
            category: Some("Moda".to_string()),
            page: Some("2".to_string()),
            ..CatalogArgs::default()
        });
        let payload = parse_payload(&past_end.output);
        assert_eq!(message(&payload), "page 2/1 (3 matching products)");
    });
}

#[test]
fn catalog_rejects_unknown_sort_keys() {
    with_env(&[("STOREFRONT_DATABASE_URL", "sqlite::memory:")], || {
        let result = catalog::run(&CatalogArgs {
            sort: Some("cheapest".to_string()),
            ..CatalogArgs::default()
        });
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_query");
    });
}

#[test]
fn catalog_reports_missing_schema_as_query_failure() {
    with_env(&[("STOREFRONT_DATABASE_URL", "sqlite::memory:")], || {
        let result = catalog::run(&CatalogArgs::default());
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "catalog");
        assert_eq!(payload["error_class"], "catalog_query");
    });
}

#[test]
fn doctor_passes_once_the_catalog_is_seeded() {
    let dir = TempDir::new().expect("temp dir");
    let url = database_url(&dir);

    with_env(&[("STOREFRONT_DATABASE_URL", url.as_str())], || {
        let before = parse_payload(&doctor::run(true));
        assert_eq!(before["overall_status"], "fail");
        assert_eq!(before["checks"][2]["name"], "schema_migrations");
        assert_eq!(before["checks"][2]["status"], "fail");
        assert_eq!(before["checks"][3]["status"], "skipped");

        assert_eq!(seed::run().exit_code, 0);

        let after = parse_payload(&doctor::run(true));
        assert_eq!(after["overall_status"], "pass");
        assert_eq!(after["checks"][3]["details"], "20 products available");
    });
}

#[test]
fn doctor_skips_database_checks_when_config_is_invalid() {
    with_env(&[("STOREFRONT_CATALOG_PAGE_SIZE", "0")], || {
        let report = doctor::run(false);

        assert!(report.starts_with("doctor: one or more readiness checks failed"));
        assert!(report.contains("- [fail] config_validation:"));
        assert!(report.contains("- [skip] database_connectivity:"));
    });
}

fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("storefront.db").display())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn message(payload: &Value) -> &str {
    payload["message"].as_str().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "STOREFRONT_DATABASE_URL",
        "STOREFRONT_DATABASE_MAX_CONNECTIONS",
        "STOREFRONT_DATABASE_TIMEOUT_SECS",
        "STOREFRONT_SERVER_BIND_ADDRESS",
        "STOREFRONT_SERVER_PORT",
        "STOREFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "STOREFRONT_CATALOG_PAGE_SIZE",
        "STOREFRONT_CHECKOUT_CURRENCY",
        "STOREFRONT_CHECKOUT_ORDER_NUMBER_PREFIX",
        "STOREFRONT_CHECKOUT_SHIPPING_MIN",
        "STOREFRONT_CHECKOUT_SHIPPING_MAX",
        "STOREFRONT_AUTH_SESSION_TTL_SECS",
        "STOREFRONT_AUTH_PASSWORD_MEMORY_KIB",
        "STOREFRONT_AUTH_PASSWORD_ITERATIONS",
        "STOREFRONT_LOGGING_LEVEL",
        "STOREFRONT_LOGGING_FORMAT",
        "STOREFRONT_LOG_LEVEL",
        "STOREFRONT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
