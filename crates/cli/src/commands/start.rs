use std::collections::BTreeSet;

use crate::commands::{load_config, open_pool, runtime, CommandResult, Failure};
use storefront_db::{migrations, ping};

/// Startup preflight for `storefront-server`: config, connectivity and schema state.
pub fn run() -> CommandResult {
    let config = match load_config("start") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("start") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        ping(&pool).await.map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        // A fresh database has no migration table yet; treat it as nothing applied.
        let applied = migrations::applied_versions(&pool).await.unwrap_or_default();
        pool.close().await;
        Ok::<usize, Failure>(pending_migrations(&applied))
    });

    match result {
        Ok(pending) => {
            let schema = if pending == 0 {
                "schema is current".to_string()
            } else {
                format!("{pending} pending migrations will be applied on server start")
            };
            CommandResult::success(
                "start",
                format!(
                    "preflight passed: serving on {}:{}, database reachable, {schema}",
                    config.server.bind_address, config.server.port
                ),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("start", error_class, message, exit_code)
        }
    }
}

pub(crate) fn pending_migrations(applied: &[i64]) -> usize {
    let known = migrations::MIGRATOR.iter().map(|migration| migration.version).collect::<BTreeSet<_>>();
    known.iter().filter(|version| !applied.contains(version)).count()
}
