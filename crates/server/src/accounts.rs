//! Customer accounts: registration, login, profile and the saved address,
//! card and favorites book.
//!
//! Register and login issue a bearer session. Routes under
//! `/api/users/{id}` only serve the session's own account; any other id is
//! rejected with 403.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::accounts::{
    AddressInput, CredentialHasher, Credentials, PaymentMethodInput, ProfileUpdate, Registration,
};
use storefront_core::domain::customer::{Customer, CustomerId, SavedAddress, SavedPaymentMethod};
use storefront_core::domain::product::ProductId;
use storefront_core::errors::{ApplicationError, DomainError};
use tracing::{info, warn};

use crate::error::{ApiError, CorrelationId, ResultExt};
use crate::orders::OrderList;
use crate::sessions::Session;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: Customer,
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    #[serde(default)]
    pub product_id: String,
}

#[derive(Debug, Serialize)]
pub struct FavoriteList {
    pub favorites: Vec<ProductId>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/me", get(me))
        .route("/api/users/{id}", put(update_profile))
        .route("/api/users/{id}/addresses", post(add_address))
        .route("/api/users/{id}/payment-methods", post(add_payment_method))
        .route("/api/users/{id}/orders", get(list_orders))
        .route("/api/users/{id}/favorites", post(add_favorite))
        .route("/api/users/{id}/favorites/{product_id}", delete(remove_favorite))
}

/// Runs argon2 on the blocking pool.
async fn hash_password(
    hasher: CredentialHasher,
    password: String,
) -> Result<String, ApplicationError> {
    tokio::task::spawn_blocking(move || hasher.hash(&password)).await.map_err(|error| {
        ApplicationError::Internal(format!("password hashing task failed: {error}"))
    })?
}

async fn verify_password(
    hasher: CredentialHasher,
    password: String,
    stored_hash: String,
) -> Result<bool, ApplicationError> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
        .await
        .map_err(|error| ApplicationError::Internal(format!("password check task failed: {error}")))
}

/// The path id must name the session's own account.
fn owned_account(
    path_id: &str,
    session: &Session,
    correlation_id: &CorrelationId,
) -> Result<CustomerId, ApiError> {
    match path_id.parse::<CustomerId>() {
        Ok(id) if id == session.customer_id => Ok(id),
        _ => Err(ApiError::from_application(
            ApplicationError::Forbidden(format!(
                "account `{}` belongs to another customer",
                path_id.trim()
            )),
            correlation_id,
        )),
    }
}

fn account_missing(id: CustomerId) -> ApplicationError {
    ApplicationError::NotFound(format!("customer `{id}`"))
}

async fn start_session(state: &AppState, user: Customer) -> AuthResponse {
    let issued = state.sessions.open(user.id).await;
    AuthResponse {
        user,
        token: issued.token.to_string(),
        token_type: "Bearer",
        expires_at: issued.expires_at,
    }
}

async fn register(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<Registration>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let registration = request.validate().or_api(&correlation_id)?;
    let password_hash =
        hash_password(state.hasher.clone(), request.password).await.or_api(&correlation_id)?;
    let customer = state
        .customers
        .create(registration.into_new_customer(password_hash, Utc::now()))
        .await
        .or_api(&correlation_id)?;

    info!(
        event_name = "account.registered",
        correlation_id = %correlation_id.as_str(),
        customer_id = %customer.id,
        "customer account created"
    );
    Ok((StatusCode::CREATED, Json(start_session(&state, customer).await)))
}

async fn login(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<Credentials>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = request.lookup_email().or_api(&correlation_id)?;
    let stored = state.customers.find_credentials(&email).await.or_api(&correlation_id)?;

    let verified = match &stored {
        Some(stored) => verify_password(
            state.hasher.clone(),
            request.password,
            stored.password_hash.clone(),
        )
        .await
        .or_api(&correlation_id)?,
        None => false,
    };
    let Some(stored) = stored.filter(|_| verified) else {
        warn!(
            event_name = "account.login.rejected",
            correlation_id = %correlation_id.as_str(),
            "login rejected"
        );
        return Err(ApiError::from_application(
            ApplicationError::InvalidCredentials,
            &correlation_id,
        ));
    };

    info!(
        event_name = "account.login.succeeded",
        correlation_id = %correlation_id.as_str(),
        customer_id = %stored.customer.id,
        "customer logged in"
    );
    Ok(Json(start_session(&state, stored.customer).await))
}

async fn me(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
) -> Result<Json<Customer>, ApiError> {
    let customer = state
        .customers
        .find_by_id(session.customer_id)
        .await
        .or_api(&correlation_id)?
        .ok_or_else(|| account_missing(session.customer_id))
        .or_api(&correlation_id)?;
    Ok(Json(customer))
}

async fn update_profile(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
    Path(id): Path<String>,
    Json(request): Json<ProfileUpdate>,
) -> Result<Json<Customer>, ApiError> {
    let id = owned_account(&id, &session, &correlation_id)?;
    let changes = request.validate(Utc::now()).or_api(&correlation_id)?;
    let customer = state
        .customers
        .update_profile(id, changes)
        .await
        .or_api(&correlation_id)?
        .ok_or_else(|| account_missing(id))
        .or_api(&correlation_id)?;

    info!(
        event_name = "account.profile.updated",
        correlation_id = %correlation_id.as_str(),
        customer_id = %id,
        "customer profile updated"
    );
    Ok(Json(customer))
}

async fn add_address(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
    Path(id): Path<String>,
    Json(request): Json<AddressInput>,
) -> Result<(StatusCode, Json<SavedAddress>), ApiError> {
    let id = owned_account(&id, &session, &correlation_id)?;
    let address = request.validate(Utc::now()).or_api(&correlation_id)?;
    let saved = state
        .customers
        .add_address(id, address)
        .await
        .or_api(&correlation_id)?
        .ok_or_else(|| account_missing(id))
        .or_api(&correlation_id)?;

    info!(
        event_name = "account.address.added",
        correlation_id = %correlation_id.as_str(),
        customer_id = %id,
        address_id = saved.id,
        is_default = saved.is_default,
        "address saved"
    );
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn add_payment_method(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
    Path(id): Path<String>,
    Json(request): Json<PaymentMethodInput>,
) -> Result<(StatusCode, Json<SavedPaymentMethod>), ApiError> {
    let id = owned_account(&id, &session, &correlation_id)?;
    let method = request.validate(Utc::now()).or_api(&correlation_id)?;
    let saved = state
        .customers
        .add_payment_method(id, method)
        .await
        .or_api(&correlation_id)?
        .ok_or_else(|| account_missing(id))
        .or_api(&correlation_id)?;

    info!(
        event_name = "account.payment_method.added",
        correlation_id = %correlation_id.as_str(),
        customer_id = %id,
        payment_method_id = saved.id,
        is_default = saved.is_default,
        "payment method saved"
    );
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn list_orders(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<OrderList>, ApiError> {
    let id = owned_account(&id, &session, &correlation_id)?;
    let orders = state.orders.list_for_customer(id).await.or_api(&correlation_id)?;
    Ok(Json(OrderList { orders }))
}

async fn current_favorites(
    state: &AppState,
    id: CustomerId,
) -> Result<FavoriteList, ApplicationError> {
    let customer = state.customers.find_by_id(id).await?.ok_or_else(|| account_missing(id))?;
    Ok(FavoriteList { favorites: customer.favorites })
}

async fn add_favorite(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
    Path(id): Path<String>,
    Json(request): Json<FavoriteRequest>,
) -> Result<(StatusCode, Json<FavoriteList>), ApiError> {
    let id = owned_account(&id, &session, &correlation_id)?;
    let product_id = ProductId(request.product_id.trim().to_string());
    if product_id.0.is_empty() {
        return Err(ApiError::from_application(
            DomainError::Validation("productId is required".to_string()).into(),
            &correlation_id,
        ));
    }
    state
        .products
        .find_by_id(&product_id)
        .await
        .or_api(&correlation_id)?
        .ok_or_else(|| ApplicationError::NotFound(format!("product `{product_id}`")))
        .or_api(&correlation_id)?;

    let added = state.customers.add_favorite(id, &product_id).await.or_api(&correlation_id)?;
    if !added {
        return Err(ApiError::from_application(
            ApplicationError::Conflict(format!("product `{product_id}` is already a favorite")),
            &correlation_id,
        ));
    }

    info!(
        event_name = "account.favorite.added",
        correlation_id = %correlation_id.as_str(),
        customer_id = %id,
        product_id = %product_id,
        "favorite added"
    );
    let favorites = current_favorites(&state, id).await.or_api(&correlation_id)?;
    Ok((StatusCode::CREATED, Json(favorites)))
}

async fn remove_favorite(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
    Path((id, product_id)): Path<(String, String)>,
) -> Result<Json<FavoriteList>, ApiError> {
    let id = owned_account(&id, &session, &correlation_id)?;
    let product_id = ProductId(product_id);

    let removed = state.customers.remove_favorite(id, &product_id).await.or_api(&correlation_id)?;
    if !removed {
        return Err(ApiError::from_application(
            ApplicationError::NotFound(format!("product `{product_id}` is not a favorite")),
            &correlation_id,
        ));
    }

    info!(
        event_name = "account.favorite.removed",
        correlation_id = %correlation_id.as_str(),
        customer_id = %id,
        product_id = %product_id,
        "favorite removed"
    );
    Ok(Json(current_favorites(&state, id).await.or_api(&correlation_id)?))
}
