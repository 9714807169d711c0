use serde::Serialize;
use storefront_core::config::{AppConfig, LoadOptions};
use storefront_db::{
    connect_with_config, migrations, ping, DbPool, ProductRepository, SqlProductRepository,
};

use crate::commands::start::pending_migrations;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["database_connectivity", "schema_migrations", "catalog_products"] {
                checks.push(skipped(name, "configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                skipped("schema_migrations", "database is unreachable"),
                skipped("catalog_products", "database is unreachable"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    skipped("schema_migrations", "database is unreachable"),
                    skipped("catalog_products", "database is unreachable"),
                ];
            }
        };

        let mut checks = Vec::new();
        match ping(&pool).await {
            Ok(()) => checks.push(DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Pass,
                details: format!("connected using `{}`", config.database.url),
            }),
            Err(error) => {
                checks.push(DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("database query failed: {error}"),
                });
                checks.push(skipped("schema_migrations", "database is unreachable"));
                checks.push(skipped("catalog_products", "database is unreachable"));
                pool.close().await;
                return checks;
            }
        }

        let applied = migrations::applied_versions(&pool).await.unwrap_or_default();
        let pending = pending_migrations(&applied);
        if pending == 0 {
            checks.push(DoctorCheck {
                name: "schema_migrations",
                status: CheckStatus::Pass,
                details: "all migrations applied".to_string(),
            });
            checks.push(match catalog_size(&pool).await {
                Ok(count) => DoctorCheck {
                    name: "catalog_products",
                    status: CheckStatus::Pass,
                    details: format!("{count} products available"),
                },
                Err(error) => DoctorCheck {
                    name: "catalog_products",
                    status: CheckStatus::Fail,
                    details: format!("catalog query failed: {error}"),
                },
            });
        } else {
            checks.push(DoctorCheck {
                name: "schema_migrations",
                status: CheckStatus::Fail,
                details: format!("{pending} pending migrations; run `storefront migrate`"),
            });
            checks.push(skipped("catalog_products", "schema is not current"));
        }

        pool.close().await;
        checks
    })
}

async fn catalog_size(pool: &DbPool) -> Result<usize, String> {
    SqlProductRepository::new(pool.clone())
        .list_all()
        .await
        .map(|products| products.len())
        .map_err(|error| error.to_string())
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{render_human, skipped, CheckStatus, DoctorCheck, DoctorReport};

    #[test]
    fn human_report_marks_each_check() {
        let report = DoctorReport {
            overall_status: CheckStatus::Fail,
            summary: "doctor: one or more readiness checks failed".to_string(),
            checks: vec![
                DoctorCheck {
                    name: "config_validation",
                    status: CheckStatus::Pass,
                    details: "configuration loaded and validated".to_string(),
                },
                skipped("catalog_products", "schema is not current"),
            ],
        };

        let rendered = render_human(&report);

        assert_eq!(
            rendered,
            "doctor: one or more readiness checks failed\n\
             - [ok] config_validation: configuration loaded and validated\n\
             - [skip] catalog_products: skipped because schema is not current"
        );
    }
}
