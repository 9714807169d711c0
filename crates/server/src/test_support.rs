use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use storefront_core::checkout::{CheckoutRequest, PaymentDetails};
use storefront_core::config::AppConfig;
use storefront_core::domain::order::ShippingAddress;
use storefront_core::domain::product::{Product, ProductId};
use storefront_db::{
    InMemoryCustomerRepository, InMemoryOrderRepository, InMemoryProductRepository,
};
use tower::ServiceExt;

use crate::orders::IDEMPOTENCY_HEADER;
use crate::state::AppState;

pub const TEST_PASSWORD: &str = "senha-forte-1";

pub fn product(id: &str, price: Decimal, stock: u32) -> Product {
    Product {
        id: ProductId(id.to_string()),
        slug: format!("product-{id}"),
        name: format!("Product {id}"),
        description: format!("Demo item {id}"),
        brand: "Brand-A".to_string(),
        category: "Eletrônicos".to_string(),
        price,
        discount_price: None,
        rating: Decimal::new(40, 1),
        stock,
        sales_count: 0,
        images: vec![format!("/assets/images/products/product-{id}-1.jpg")],
        created_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
    }
}

/// Fourteen products, one brand each. Product 1 is discounted from 100 to 80;
/// products 4 to 14 cost 10 to 20.
pub fn seeded_products() -> Vec<Product> {
    (1u32..=14)
        .map(|index| {
            let id = index.to_string();
            let mut item = match index {
                1 => {
                    let mut item = product(&id, Decimal::new(100, 0), 5);
                    item.discount_price = Some(Decimal::new(80, 0));
                    item
                }
                2 => product(&id, Decimal::new(50, 0), 10),
                3 => product(&id, Decimal::new(40, 0), 10),
                _ => product(&id, Decimal::from(6 + index), 10),
            };
            item.brand = format!("Brand-{}", char::from(b'A' + (index - 1) as u8));
            item.category = match index {
                3 => "Moda".to_string(),
                4 => "Casa e Decoração".to_string(),
                _ => "Eletrônicos".to_string(),
            };
            item
        })
        .collect()
}

/// Default config with the cheapest argon2 cost argon2 accepts.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.password_memory_kib = 8;
    config.auth.password_iterations = 1;
    config
}

pub fn seeded_state() -> AppState {
    AppState::from_config(
        &test_config(),
        Arc::new(InMemoryProductRepository::with_products(seeded_products())),
        Arc::new(InMemoryCustomerRepository::default()),
        Arc::new(InMemoryOrderRepository::default()),
    )
    .expect("test config builds state")
}

pub fn seeded_app() -> Router {
    crate::router(seeded_state())
}

pub fn checkout_request() -> CheckoutRequest {
    CheckoutRequest {
        shipping_address: ShippingAddress {
            street: "Rua das Flores".to_string(),
            number: "123".to_string(),
            complement: None,
            neighborhood: Some("Centro".to_string()),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            zip_code: "01234-567".to_string(),
        },
        payment_method: PaymentDetails {
            card_type: "credit_card".to_string(),
            card_number: "4111 1111 1111 1111".to_string(),
            card_holder: "JOAO SILVA".to_string(),
            expiry_month: Some("12".to_string()),
            expiry_year: Some("2028".to_string()),
            cvv: Some("123".to_string()),
        },
        shipping_method: None,
    }
}

pub fn checkout_body() -> Value {
    serde_json::to_value(checkout_request()).expect("checkout request serializes")
}

pub async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

pub fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => raw.parse().expect("decimal string"),
        Value::Number(number) => number.to_string().parse().expect("decimal number"),
        other => panic!("expected a decimal, got {other}"),
    }
}

pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn seeded() -> Self {
        Self::new(seeded_app())
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        (status, read_json(response).await)
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        self.send(request).await
    }

    /// Registers `email` with [`TEST_PASSWORD`] and returns the bearer token.
    pub async fn register(&self, email: &str) -> String {
        let body = json!({
            "email": email,
            "password": TEST_PASSWORD,
            "firstName": "Cliente",
            "lastName": "Teste",
        });
        let (status, body) = self.request("POST", "/api/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn login(&self, email: &str) -> String {
        let body = json!({"email": email, "password": TEST_PASSWORD});
        let (status, body) = self.request("POST", "/api/login", None, Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().expect("token").to_string()
    }

    /// A session for a freshly registered customer.
    pub async fn open_session(&self) -> String {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        self.register(&format!("cliente{n}@example.com")).await
    }

    pub async fn submit_order(&self, token: &str, key: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/orders")
            .header("authorization", format!("Bearer {token}"))
            .header(IDEMPOTENCY_HEADER, key)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        self.send(request).await
    }
}
