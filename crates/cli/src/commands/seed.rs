use crate::commands::{load_config, open_pool, runtime, CommandResult, Failure};
use storefront_db::{migrations, CatalogSeedDataset, SeedResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = CatalogSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = CatalogSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedResult, Failure> = if verification.all_present {
            Ok(seed_result)
        } else {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_failure_message(&failed_checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", render_summary(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

/// Counts describe the dataset, not this run, so repeated runs print the same summary.
fn render_summary(seeded: &SeedResult) -> String {
    let categories = seeded
        .categories_seeded
        .iter()
        .map(|category| {
            format!("  - {} ({}), products: {}", category.name, category.slug, category.product_count)
        })
        .collect::<Vec<_>>();
    format!(
        "demo catalog ready with {} products across {} categories:\n{}",
        seeded.products_total,
        seeded.categories_seeded.len(),
        categories.join("\n")
    )
}

fn verification_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use storefront_db::{CategorySeedInfo, SeedResult};

    use super::{render_summary, verification_failure_message};

    #[test]
    fn verification_error_message_targets_failed_checks() {
        assert_eq!(
            verification_failure_message(&["moda", "product-images"]),
            "Seed verification failed for checks: moda, product-images"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        assert_eq!(verification_failure_message(&[]), "Some seed data failed to load");
    }

    #[test]
    fn summary_lists_every_category() {
        let seeded = SeedResult {
            products_inserted: 0,
            products_total: 4,
            categories_seeded: vec![
                CategorySeedInfo { name: "Moda", slug: "moda", product_count: 3 },
                CategorySeedInfo { name: "Infantil", slug: "infantil", product_count: 1 },
            ],
        };

        let summary = render_summary(&seeded);

        assert!(summary.starts_with("demo catalog ready with 4 products across 2 categories"));
        assert!(summary.contains("  - Moda (moda), products: 3"));
        assert!(summary.contains("  - Infantil (infantil), products: 1"));
    }
}
