//! Order submission.
//!
//! `POST /api/orders` turns the session cart into an order owned by the
//! session's customer, so order history survives logout and restarts. Every
//! attempt carries an `Idempotency-Key` header: the first success stores the
//! order and clears the cart, a retry with the same key and body returns the
//! stored order, and the same key with a different body is rejected.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use storefront_core::checkout::{request_fingerprint, CheckoutRequest, OrderDraft, OrderStamp};
use storefront_core::domain::customer::CustomerId;
use storefront_core::domain::order::{IdempotencyKey, Order};
use storefront_core::errors::{ApplicationError, DomainError};
use storefront_db::{OrderRepository, RepositoryError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, CorrelationId, ResultExt};
use crate::sessions::{Session, SharedCart};
use crate::state::AppState;

pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";
const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;
/// Order numbers keep six digits of the order uuid, so clashes are rare but
/// possible. Each retry draws a new uuid.
const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    currency: String,
    order_number_prefix: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub order: Order,
    pub replayed: bool,
}

impl OrderService {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        currency: String,
        order_number_prefix: String,
    ) -> Self {
        Self { repository, currency, order_number_prefix }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Submits the session cart for `customer_id`. The cart lock is held
    /// until the order is stored and the cart cleared, so retries on one
    /// session never interleave.
    pub async fn submit(
        &self,
        customer_id: CustomerId,
        cart: &SharedCart,
        idempotency_key: IdempotencyKey,
        request: &CheckoutRequest,
    ) -> Result<Submission, ApplicationError> {
        let fingerprint = request_fingerprint(request);
        let mut cart = cart.lock().await;

        if let Some(existing) = self.repository.find_by_idempotency_key(&idempotency_key).await? {
            return replay(existing, customer_id, &fingerprint);
        }

        let draft = OrderDraft::from_cart(&cart, request, &self.currency)?;
        let created_at = Utc::now();
        let mut attempt = 1;
        let order = loop {
            let order = draft.clone().into_order(OrderStamp {
                id: Uuid::new_v4(),
                customer_id,
                idempotency_key: idempotency_key.clone(),
                request_fingerprint: fingerprint.clone(),
                order_number_prefix: self.order_number_prefix.clone(),
                created_at,
            });

            match self.repository.insert(order.clone()).await {
                Ok(()) => break order,
                Err(RepositoryError::OrderNumberTaken(number))
                    if attempt < MAX_ORDER_NUMBER_ATTEMPTS =>
                {
                    warn!(
                        event_name = "order.submission.number_clash",
                        correlation_id = %idempotency_key,
                        order_number = %number,
                        attempt,
                        "order number already taken; drawing a new one"
                    );
                    attempt += 1;
                }
                Err(RepositoryError::Conflict(_)) => {
                    let existing = self
                        .repository
                        .find_by_idempotency_key(&idempotency_key)
                        .await?
                        .ok_or_else(|| {
                            ApplicationError::Conflict(format!(
                                "idempotency key `{idempotency_key}` is already in use"
                            ))
                        })?;
                    return replay(existing, customer_id, &fingerprint);
                }
                Err(error) => return Err(error.into()),
            }
        };

        cart.clear();
        info!(
            event_name = "order.submission.created",
            correlation_id = %idempotency_key,
            customer_id = %customer_id,
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "order created and cart cleared"
        );

        Ok(Submission { order, replayed: false })
    }

    /// Newest first.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, ApplicationError> {
        Ok(self.repository.list_for_customer(customer_id).await?)
    }
}

fn replay(
    existing: Order,
    customer_id: CustomerId,
    fingerprint: &str,
) -> Result<Submission, ApplicationError> {
    if existing.customer_id != customer_id || existing.request_fingerprint != fingerprint {
        return Err(ApplicationError::Conflict(format!(
            "idempotency key `{}` was already used for a different order request",
            existing.idempotency_key
        )));
    }

    info!(
        event_name = "order.submission.replayed",
        correlation_id = %existing.idempotency_key,
        order_id = %existing.id,
        order_number = %existing.order_number,
        "returning previously stored order for repeated submission"
    );
    Ok(Submission { order: existing, replayed: true })
}

pub fn idempotency_key(headers: &HeaderMap) -> Result<IdempotencyKey, DomainError> {
    let raw = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    if raw.is_empty() {
        return Err(DomainError::Validation("Idempotency-Key header is required".to_string()));
    }
    if raw.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(DomainError::Validation(format!(
            "Idempotency-Key must be at most {MAX_IDEMPOTENCY_KEY_LEN} characters"
        )));
    }
    Ok(IdempotencyKey(raw.to_string()))
}

#[derive(Debug, Serialize)]
pub struct OrderReceipt {
    pub order: Order,
    pub replayed: bool,
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<Order>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/orders", get(list_orders).post(submit_order))
}

async fn submit_order(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderReceipt>), ApiError> {
    let key = idempotency_key(&headers).or_api(&correlation_id)?;
    let submission = state
        .orders
        .submit(session.customer_id, &session.cart, key, &request)
        .await
        .or_api(&correlation_id)?;

    let status = if submission.replayed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(OrderReceipt { order: submission.order, replayed: submission.replayed })))
}

async fn list_orders(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
) -> Result<Json<OrderList>, ApiError> {
    let orders =
        state.orders.list_for_customer(session.customer_id).await.or_api(&correlation_id)?;
    Ok(Json(OrderList { orders }))
}
