use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Contract the demo catalog fixture must satisfy after loading.
struct SeedCategoryContract {
    name: &'static str,
    slug: &'static str,
    product_ids: &'static [&'static str],
}

const SEED_PRODUCT_IDS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20",
];

const SEED_CATEGORIES: &[SeedCategoryContract] = &[
    SeedCategoryContract {
        name: "Eletrônicos",
        slug: "eletrônicos",
        product_ids: &["1", "2", "3", "10", "17"],
    },
    SeedCategoryContract { name: "Moda", slug: "moda", product_ids: &["4", "12", "16"] },
    SeedCategoryContract {
        name: "Casa e Decoração",
        slug: "casa-e-decoração",
        product_ids: &["5", "6", "11", "13", "15", "18", "20"],
    },
    SeedCategoryContract { name: "Esportes", slug: "esportes", product_ids: &["7", "19"] },
    SeedCategoryContract {
        name: "Beleza e Saúde",
        slug: "beleza-e-saúde",
        product_ids: &["8", "14"],
    },
    SeedCategoryContract { name: "Infantil", slug: "infantil", product_ids: &["9"] },
];

/// Products whose seeded discount price must stay absent.
const SEED_FULL_PRICE_IDS: &[&str] = &["2", "5", "14"];

/// Demo storefront catalog: twenty products across six categories.
pub struct CatalogSeedDataset;

impl CatalogSeedDataset {
    /// SQL fixture content for the demo catalog.
    pub const SQL: &str = include_str!("../../../config/fixtures/catalog_seed_data.sql");

    /// Load the demo catalog. Rows that already exist are left untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let before: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product WHERE id IN {}",
            sql_array_from_ids(SEED_PRODUCT_IDS)
        ))
        .fetch_one(pool)
        .await?;

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        let after: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product WHERE id IN {}",
            sql_array_from_ids(SEED_PRODUCT_IDS)
        ))
        .fetch_one(pool)
        .await?;

        let categories_seeded = SEED_CATEGORIES
            .iter()
            .map(|category| CategorySeedInfo {
                name: category.name,
                slug: category.slug,
                product_count: category.product_ids.len(),
            })
            .collect();

        Ok(SeedResult {
            products_inserted: usize::try_from(after - before).unwrap_or(0),
            products_total: SEED_PRODUCT_IDS.len(),
            categories_seeded,
        })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let product_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product WHERE id IN {}",
            sql_array_from_ids(SEED_PRODUCT_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("products", product_count == SEED_PRODUCT_IDS.len() as i64));

        for category in SEED_CATEGORIES {
            let ids: Vec<String> = sqlx::query_scalar(
                "SELECT id FROM product WHERE category = ?1 AND category_slug = ?2 ORDER BY rowid",
            )
            .bind(category.name)
            .bind(category.slug)
            .fetch_all(pool)
            .await?;
            let matches = ids.len() == category.product_ids.len()
                && category.product_ids.iter().all(|expected| ids.iter().any(|id| id == expected));
            checks.push((category.slug, matches));
        }

        let full_price: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product WHERE discount_price IS NULL AND id IN {}",
            sql_array_from_ids(SEED_FULL_PRICE_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("full-price-products", full_price == SEED_FULL_PRICE_IDS.len() as i64));

        let malformed_images: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product
             WHERE id IN {} AND (json_valid(images_json) = 0 OR json_array_length(images_json) = 0)",
            sql_array_from_ids(SEED_PRODUCT_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("product-images", malformed_images == 0));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub products_inserted: usize,
    pub products_total: usize,
    pub categories_seeded: Vec<CategorySeedInfo>,
}

#[derive(Debug)]
pub struct CategorySeedInfo {
    pub name: &'static str,
    pub slug: &'static str,
    pub product_count: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
