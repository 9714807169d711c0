use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::Row;

use storefront_core::domain::customer::CustomerId;
use storefront_core::domain::order::{IdempotencyKey, Order, OrderId, OrderStatus};

use super::product::{decode_decimal, decode_timestamp};
use super::{OrderRepository, RepositoryError};
use crate::DbPool;

const ORDER_COLUMNS: &str = "id, order_number, customer_id, idempotency_key, request_fingerprint,
     status, items_json, shipping_address_json, payment_method_json, shipping_method_json,
     coupon_code, subtotal, shipping, discount, total, pricing_trace_json, created_at, updated_at";

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn encode_json<T: Serialize>(column: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn decode_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<Order, RepositoryError> {
    let get = |column: &str| -> Result<String, RepositoryError> {
        row.try_get::<String, _>(column).map_err(|e| RepositoryError::Decode(e.to_string()))
    };

    let status_str = get("status")?;
    let status = OrderStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown order status `{status_str}`")))?;
    let coupon_code: Option<String> =
        row.try_get("coupon_code").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_id: i64 =
        row.try_get("customer_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Order {
        id: OrderId(get("id")?),
        order_number: get("order_number")?,
        customer_id: CustomerId(customer_id),
        idempotency_key: IdempotencyKey(get("idempotency_key")?),
        request_fingerprint: get("request_fingerprint")?,
        status,
        items: decode_json("items_json", &get("items_json")?)?,
        shipping_address: decode_json("shipping_address_json", &get("shipping_address_json")?)?,
        payment_method: decode_json("payment_method_json", &get("payment_method_json")?)?,
        shipping_method: decode_json("shipping_method_json", &get("shipping_method_json")?)?,
        coupon_code,
        subtotal: decode_decimal("subtotal", &get("subtotal")?)?,
        shipping: decode_decimal("shipping", &get("shipping")?)?,
        discount: decode_decimal("discount", &get("discount")?)?,
        total: decode_decimal("total", &get("total")?)?,
        pricing_trace: decode_json("pricing_trace_json", &get("pricing_trace_json")?)?,
        created_at: decode_timestamp("created_at", &get("created_at")?)?,
        updated_at: decode_timestamp("updated_at", &get("updated_at")?)?,
    })
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order WHERE idempotency_key = ?"
        ))
        .bind(&key.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_order(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order
             WHERE customer_id = ?
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    async fn insert(&self, order: Order) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO customer_order (id, order_number, customer_id, idempotency_key,
                                         request_fingerprint, status, items_json,
                                         shipping_address_json, payment_method_json,
                                         shipping_method_json, coupon_code, subtotal, shipping,
                                         discount, total, pricing_trace_json, created_at,
                                         updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.id.0)
        .bind(&order.order_number)
        .bind(order.customer_id.0)
        .bind(&order.idempotency_key.0)
        .bind(&order.request_fingerprint)
        .bind(order.status.as_str())
        .bind(encode_json("items_json", &order.items)?)
        .bind(encode_json("shipping_address_json", &order.shipping_address)?)
        .bind(encode_json("payment_method_json", &order.payment_method)?)
        .bind(encode_json("shipping_method_json", &order.shipping_method)?)
        .bind(&order.coupon_code)
        .bind(order.subtotal.to_string())
        .bind(order.shipping.to_string())
        .bind(order.discount.to_string())
        .bind(order.total.to_string())
        .bind(encode_json("pricing_trace_json", &order.pricing_trace)?)
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                if error.message().contains("order_number") {
                    return Err(RepositoryError::OrderNumberTaken(order.order_number));
                }
                Err(RepositoryError::Conflict(format!(
                    "idempotency key `{}` is already attached to an order",
                    order.idempotency_key
                )))
            }
            Err(error) => Err(error.into()),
        }
    }
}
