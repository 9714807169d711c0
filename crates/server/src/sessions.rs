//! Bearer sessions and their carts.
//!
//! A session is issued on register or login, belongs to one customer and owns
//! exactly one [`Cart`] behind its own mutex. Handlers lock that mutex for the
//! whole of a mutation so two requests on the same session are applied one
//! after the other, while different sessions never contend.
//!
//! Sessions expire `auth.session_ttl_secs` after issue. An expired token is
//! evicted when it is presented, and every new session sweeps the rest.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::delete;
use axum::Router;
use chrono::{DateTime, TimeDelta, Utc};
use storefront_core::cart::Cart;
use storefront_core::domain::customer::CustomerId;
use storefront_core::errors::ApplicationError;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, CorrelationId};
use crate::state::AppState;

/// Opaque bearer token identifying a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type SharedCart = Arc<Mutex<Cart>>;

struct SessionEntry {
    customer_id: CustomerId,
    cart: SharedCart,
    expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: SessionId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
    ttl: TimeDelta,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        Self { entries: Arc::default(), ttl }
    }

    /// Issues a fresh token with an empty cart for `customer_id`.
    pub async fn open(&self, customer_id: CustomerId) -> IssuedSession {
        self.open_at(customer_id, Utc::now()).await
    }

    pub async fn open_at(&self, customer_id: CustomerId, now: DateTime<Utc>) -> IssuedSession {
        let token = SessionId(Uuid::new_v4().to_string());
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            token.clone(),
            SessionEntry { customer_id, cart: Arc::new(Mutex::new(Cart::new())), expires_at },
        );
        IssuedSession { token, expires_at }
    }

    pub async fn resolve(&self, token: &str) -> Option<Session> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Looks a token up, evicting it when it has expired.
    pub async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let id = SessionId(token.to_string());
        {
            let entries = self.entries.read().await;
            let entry = entries.get(&id)?;
            if entry.expires_at > now {
                return Some(Session {
                    id,
                    customer_id: entry.customer_id,
                    cart: Arc::clone(&entry.cart),
                });
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(&id).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(&id);
        }
        None
    }

    /// `false` when the token was not live.
    pub async fn close(&self, id: &SessionId) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Authenticated session resolved from `Authorization: Bearer <token>`.
pub struct Session {
    pub id: SessionId,
    pub customer_id: CustomerId,
    pub cart: SharedCart,
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let correlation_id = CorrelationId::from_headers(&parts.headers);
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token);

        let Some(token) = token else {
            return Err(ApiError::from_application(
                ApplicationError::Unauthenticated,
                &correlation_id,
            ));
        };

        state.sessions.resolve(token).await.ok_or_else(|| {
            ApiError::from_application(ApplicationError::Unauthenticated, &correlation_id)
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/sessions", delete(close_session))
}

async fn close_session(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: Session,
) -> StatusCode {
    state.sessions.close(&session.id).await;
    let active_sessions = state.sessions.len().await;
    info!(
        event_name = "session.closed",
        correlation_id = %correlation_id.as_str(),
        customer_id = %session.customer_id,
        active_sessions,
        "session closed"
    );
    StatusCode::NO_CONTENT
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
