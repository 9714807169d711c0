use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use storefront_core::domain::product::{Product, ProductId};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "id, slug, name, description, brand, category, price, discount_price,
     rating, stock, sales_count, images_json, created_at";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn decode_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}` is not a decimal: {error}")))
}

pub(crate) fn decode_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}` is not RFC 3339: {error}")))
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let get = |column: &str| -> Result<String, RepositoryError> {
        row.try_get::<String, _>(column).map_err(|e| RepositoryError::Decode(e.to_string()))
    };

    let discount_price: Option<String> =
        row.try_get("discount_price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let stock: i64 = row.try_get("stock").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let sales_count: i64 =
        row.try_get("sales_count").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let images: Vec<String> = serde_json::from_str(&get("images_json")?)
        .map_err(|e| RepositoryError::Decode(format!("images_json: {e}")))?;

    Ok(Product {
        id: ProductId(get("id")?),
        slug: get("slug")?,
        name: get("name")?,
        description: get("description")?,
        brand: get("brand")?,
        category: get("category")?,
        price: decode_decimal("price", &get("price")?)?,
        discount_price: discount_price
            .as_deref()
            .map(|raw| decode_decimal("discount_price", raw))
            .transpose()?,
        rating: decode_decimal("rating", &get("rating")?)?,
        stock: u32::try_from(stock)
            .map_err(|_| RepositoryError::Decode(format!("stock {stock} is out of range")))?,
        sales_count: u32::try_from(sales_count).map_err(|_| {
            RepositoryError::Decode(format!("sales_count {sales_count} is out of range"))
        })?,
        images,
        created_at: decode_timestamp("created_at", &get("created_at")?)?,
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_product(r)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product ORDER BY rowid"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn list_by_category_slug(&self, slug: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE category_slug = ? ORDER BY rowid"
        ))
        .bind(slug)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }
}
