use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

const CONTRACT_JSON: &str = include_str!("../../../config/fixtures/catalog_seed_contract.json");
const SEED_SQL: &str = include_str!("../../../config/fixtures/catalog_seed_data.sql");

const PRODUCT_COLUMNS: &[&str] = &[
    "id",
    "slug",
    "name",
    "description",
    "brand",
    "category",
    "category_slug",
    "price",
    "discount_price",
    "rating",
    "stock",
    "sales_count",
    "images_json",
    "created_at",
];

#[derive(Debug, Deserialize)]
struct CatalogSeedContract {
    dataset_version: String,
    seed_dataset: String,
    product_count: usize,
    product_ids: Vec<String>,
    categories: Vec<CategoryContract>,
    brands: Vec<String>,
    price_bounds: PriceBoundsContract,
    most_popular_product_id: String,
    newest_product_id: String,
}

#[derive(Debug, Deserialize)]
struct CategoryContract {
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct PriceBoundsContract {
    min: String,
    max: String,
}

/// One `VALUES (...)` tuple from the fixture; `None` marks a SQL `NULL`.
#[derive(Debug)]
struct SeedRow {
    values: Vec<Option<String>>,
}

impl SeedRow {
    fn text(&self, column: &str) -> SeedContractTestResult<&str> {
        let index = PRODUCT_COLUMNS
            .iter()
            .position(|candidate| *candidate == column)
            .ok_or_else(|| format!("unknown column `{column}`"))?;
        self.values
            .get(index)
            .and_then(|value| value.as_deref())
            .ok_or_else(|| format!("column `{column}` should be non-null"))
    }

    fn nullable(&self, column: &str) -> Option<&str> {
        let index = PRODUCT_COLUMNS.iter().position(|candidate| *candidate == column)?;
        self.values.get(index).and_then(|value| value.as_deref())
    }

    fn decimal(&self, column: &str) -> SeedContractTestResult<Decimal> {
        let raw = self.text(column)?;
        Decimal::from_str(raw).map_err(|error| format!("{column} `{raw}` is not a decimal: {error}"))
    }

    fn effective_price(&self) -> SeedContractTestResult<Decimal> {
        match self.nullable("discount_price") {
            Some(raw) => {
                let discount = Decimal::from_str(raw)
                    .map_err(|error| format!("discount_price `{raw}` is not a decimal: {error}"))?;
                if discount.is_zero() {
                    self.decimal("price")
                } else {
                    Ok(discount)
                }
            }
            None => self.decimal("price"),
        }
    }
}

fn load_contract() -> SeedContractTestResult<CatalogSeedContract> {
    serde_json::from_str(CONTRACT_JSON).map_err(|error| format!("contract should parse: {error}"))
}

fn parse_seed_rows() -> SeedContractTestResult<Vec<SeedRow>> {
    let mut rows = Vec::new();
    for line in SEED_SQL.lines() {
        let Some(tuple) = line.trim().strip_prefix("VALUES (") else {
            continue;
        };
        let tuple = tuple
            .strip_suffix(')')
            .ok_or_else(|| format!("VALUES line should close its tuple: {line}"))?;
        let values = split_sql_tuple(tuple)?;
        require_eq!(
            values.len(),
            PRODUCT_COLUMNS.len(),
            "expected {} values, found {} in {line}",
            PRODUCT_COLUMNS.len(),
            values.len()
        );
        rows.push(SeedRow { values });
    }
    Ok(rows)
}

fn split_sql_tuple(tuple: &str) -> SeedContractTestResult<Vec<Option<String>>> {
    let mut values = Vec::new();
    let mut chars = tuple.chars().peekable();

    loop {
        while chars.peek().is_some_and(|ch| ch.is_whitespace()) {
            chars.next();
        }
        if chars.peek() == Some(&'\'') {
            chars.next();
            let mut literal = String::new();
            loop {
                match chars.next() {
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        literal.push('\'');
                    }
                    Some('\'') => break,
                    Some(ch) => literal.push(ch),
                    None => return Err(format!("unterminated string literal in `{tuple}`")),
                }
            }
            values.push(Some(literal));
        } else {
            let mut bare = String::new();
            while let Some(ch) = chars.peek().copied() {
                if ch == ',' {
                    break;
                }
                bare.push(ch);
                chars.next();
            }
            let bare = bare.trim();
            require!(!bare.is_empty(), "empty value in `{tuple}`");
            values.push(if bare.eq_ignore_ascii_case("NULL") { None } else { Some(bare.to_string()) });
        }

        while chars.peek().is_some_and(|ch| ch.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some(',') => continue,
            None => break,
            Some(other) => return Err(format!("unexpected `{other}` in `{tuple}`")),
        }
    }

    Ok(values)
}

#[test]
fn contract_metadata_is_well_formed() -> SeedContractTestResult {
    let contract = load_contract()?;

    require_eq!(contract.dataset_version.as_str(), "catalog-v1");
    require!(!contract.seed_dataset.trim().is_empty(), "seed_dataset should be set");
    require_eq!(contract.product_ids.len(), contract.product_count);

    let unique: HashSet<&String> = contract.product_ids.iter().collect();
    require_eq!(unique.len(), contract.product_ids.len(), "product ids should be unique");

    let raw: Value = serde_json::from_str(CONTRACT_JSON).map_err(|error| error.to_string())?;
    require!(
        raw.get("categories").and_then(Value::as_array).is_some_and(|items| !items.is_empty()),
        "categories should be a non-empty array"
    );
    Ok(())
}

#[test]
fn every_contract_product_is_seeded_exactly_once() -> SeedContractTestResult {
    let contract = load_contract()?;
    let rows = parse_seed_rows()?;

    require_eq!(rows.len(), contract.product_count, "seed row count mismatch");
    let seeded: Vec<&str> = rows.iter().map(|row| row.text("id")).collect::<Result<_, _>>()?;
    let expected: Vec<&str> = contract.product_ids.iter().map(String::as_str).collect();
    require_eq!(seeded, expected, "seed rows should follow the contract's id order");

    let conflict_guards = SEED_SQL.matches("ON CONFLICT(id) DO NOTHING").count();
    require_eq!(conflict_guards, rows.len(), "every insert should be idempotent");
    Ok(())
}

#[test]
fn categories_and_slugs_match_contract() -> SeedContractTestResult {
    let contract = load_contract()?;
    let rows = parse_seed_rows()?;

    let mut seen = Vec::new();
    for row in &rows {
        let name = row.text("category")?;
        let slug = row.text("category_slug")?;
        let category = contract
            .categories
            .iter()
            .find(|category| category.name == name)
            .ok_or_else(|| format!("category `{name}` is missing from the contract"))?;
        require_eq!(slug, category.slug.as_str(), "slug mismatch for category `{name}`");
        if !seen.contains(&name) {
            seen.push(name);
        }
    }

    let expected: Vec<&str> = contract.categories.iter().map(|category| category.name.as_str()).collect();
    require_eq!(seen, expected, "categories should appear in contract order");
    Ok(())
}

#[test]
fn brands_follow_first_seen_order() -> SeedContractTestResult {
    let contract = load_contract()?;
    let rows = parse_seed_rows()?;

    let mut brands: Vec<&str> = Vec::new();
    for row in &rows {
        let brand = row.text("brand")?;
        if !brands.contains(&brand) {
            brands.push(brand);
        }
    }
    let expected: Vec<&str> = contract.brands.iter().map(String::as_str).collect();
    require_eq!(brands, expected);
    Ok(())
}

#[test]
fn prices_and_discounts_are_consistent() -> SeedContractTestResult {
    let contract = load_contract()?;
    let rows = parse_seed_rows()?;

    let mut effective = Vec::new();
    for row in &rows {
        let id = row.text("id")?;
        let price = row.decimal("price")?;
        require!(price > Decimal::ZERO, "product {id} should have a positive price");
        require_eq!(price.scale(), 2, "product {id} price should carry two decimals");

        if row.nullable("discount_price").is_some() {
            let discount = row.decimal("discount_price")?;
            require!(discount < price, "product {id} discount should undercut its price");
        }

        let rating = row.decimal("rating")?;
        require!(
            rating >= Decimal::ZERO && rating <= Decimal::new(5, 0),
            "product {id} rating {rating} should be within 0..=5"
        );
        effective.push(row.effective_price()?);
    }

    let min = effective.iter().copied().min().ok_or("catalog should not be empty")?;
    let max = effective.iter().copied().max().ok_or("catalog should not be empty")?;
    require_eq!(min.to_string(), contract.price_bounds.min);
    require_eq!(max.to_string(), contract.price_bounds.max);
    Ok(())
}

#[test]
fn popularity_and_recency_leaders_match_contract() -> SeedContractTestResult {
    let contract = load_contract()?;
    let rows = parse_seed_rows()?;

    let mut most_popular: Option<(u64, &str)> = None;
    let mut newest: Option<(&str, &str)> = None;
    for row in &rows {
        let id = row.text("id")?;
        let sales: u64 = row
            .text("sales_count")?
            .parse()
            .map_err(|error| format!("product {id} sales_count: {error}"))?;
        if most_popular.map_or(true, |(best, _)| sales > best) {
            most_popular = Some((sales, id));
        }
        let created_at = row.text("created_at")?;
        chrono::DateTime::parse_from_rfc3339(created_at)
            .map_err(|error| format!("product {id} created_at: {error}"))?;
        if newest.map_or(true, |(latest, _)| created_at > latest) {
            newest = Some((created_at, id));
        }
    }

    require_eq!(most_popular.map(|(_, id)| id), Some(contract.most_popular_product_id.as_str()));
    require_eq!(newest.map(|(_, id)| id), Some(contract.newest_product_id.as_str()));
    Ok(())
}

#[test]
fn images_are_non_empty_json_arrays_with_unique_slugs() -> SeedContractTestResult {
    let rows = parse_seed_rows()?;

    let mut slugs = BTreeSet::new();
    for row in &rows {
        let id = row.text("id")?;
        let images: Vec<String> = serde_json::from_str(row.text("images_json")?)
            .map_err(|error| format!("product {id} images_json: {error}"))?;
        require!(!images.is_empty(), "product {id} should carry at least one image");
        require!(
            images.iter().all(|image| image.starts_with("/assets/images/products/")),
            "product {id} images should live under the product asset path"
        );
        require!(slugs.insert(row.text("slug")?), "product {id} slug should be unique");
    }
    Ok(())
}
