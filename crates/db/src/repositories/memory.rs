use std::collections::HashMap;

use tokio::sync::RwLock;

use storefront_core::accounts::{NewAddress, NewCustomer, NewPaymentMethod, ProfileChanges};
use storefront_core::domain::customer::{
    Customer, CustomerId, SavedAddress, SavedPaymentMethod, StoredCredentials,
};
use storefront_core::domain::order::{IdempotencyKey, Order};
use storefront_core::domain::product::{Product, ProductId};

use super::{CustomerRepository, OrderRepository, ProductRepository, RepositoryError};

/// Keeps insertion order alongside the index so listings match the SQL store.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<(Vec<ProductId>, HashMap<String, Product>)>,
}

impl InMemoryProductRepository {
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut order = Vec::new();
        let mut index = HashMap::new();
        for product in products {
            if index.insert(product.id.0.clone(), product.clone()).is_none() {
                order.push(product.id);
            }
        }
        Self { products: RwLock::new((order, index)) }
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.1.get(&id.0).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let (order, index) = &*products;
        Ok(order.iter().filter_map(|id| index.get(&id.0).cloned()).collect())
    }

    async fn list_by_category_slug(&self, slug: &str) -> Result<Vec<Product>, RepositoryError> {
        let all = self.list_all().await?;
        Ok(all.into_iter().filter(|product| product.category_slug() == slug).collect())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|order| &order.idempotency_key == key).cloned())
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut found: Vec<Order> =
            orders.iter().rev().filter(|order| order.customer_id == customer_id).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn insert(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.iter().any(|existing| existing.idempotency_key == order.idempotency_key) {
            return Err(RepositoryError::Conflict(format!(
                "idempotency key `{}` is already attached to an order",
                order.idempotency_key
            )));
        }
        if orders.iter().any(|existing| existing.order_number == order.order_number) {
            return Err(RepositoryError::OrderNumberTaken(order.order_number));
        }
        orders.push(order);
        Ok(())
    }
}

#[derive(Default)]
struct CustomerBook {
    next_id: i64,
    next_entry_id: i64,
    records: Vec<StoredCredentials>,
}

impl CustomerBook {
    fn get_mut(&mut self, id: CustomerId) -> Option<&mut StoredCredentials> {
        self.records.iter_mut().find(|stored| stored.customer.id == id)
    }

    fn email_taken(&self, email: &str, except: Option<CustomerId>) -> bool {
        self.records
            .iter()
            .any(|stored| stored.customer.email == email && Some(stored.customer.id) != except)
    }

    fn entry_id(&mut self) -> i64 {
        self.next_entry_id += 1;
        self.next_entry_id
    }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    book: RwLock<CustomerBook>,
}

fn email_conflict(email: &str) -> RepositoryError {
    RepositoryError::Conflict(format!("email `{email}` is already registered"))
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn create(&self, customer: NewCustomer) -> Result<Customer, RepositoryError> {
        let mut book = self.book.write().await;
        if book.email_taken(&customer.email, None) {
            return Err(email_conflict(&customer.email));
        }
        book.next_id += 1;
        let created = Customer {
            id: CustomerId(book.next_id),
            email: customer.email,
            first_name: customer.first_name,
            last_name: customer.last_name,
            phone: None,
            birth_date: None,
            addresses: Vec::new(),
            payment_methods: Vec::new(),
            favorites: Vec::new(),
            created_at: customer.created_at,
            updated_at: customer.created_at,
        };
        book.records.push(StoredCredentials {
            customer: created.clone(),
            password_hash: customer.password_hash,
        });
        Ok(created)
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let book = self.book.read().await;
        Ok(book.records.iter().find(|stored| stored.customer.id == id).map(|s| s.customer.clone()))
    }

    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, RepositoryError> {
        let book = self.book.read().await;
        Ok(book.records.iter().find(|stored| stored.customer.email == email).cloned())
    }

    async fn update_profile(
        &self,
        id: CustomerId,
        changes: ProfileChanges,
    ) -> Result<Option<Customer>, RepositoryError> {
        let mut book = self.book.write().await;
        if let Some(email) = &changes.email {
            if book.email_taken(email, Some(id)) {
                return Err(email_conflict(email));
            }
        }
        let Some(stored) = book.get_mut(id) else {
            return Ok(None);
        };
        let customer = &mut stored.customer;
        if let Some(first_name) = changes.first_name {
            customer.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            customer.last_name = last_name;
        }
        if let Some(email) = changes.email {
            customer.email = email;
        }
        customer.phone = changes.phone.or(customer.phone.take());
        customer.birth_date = changes.birth_date.or(customer.birth_date.take());
        customer.updated_at = changes.updated_at;
        Ok(Some(customer.clone()))
    }

    async fn add_address(
        &self,
        id: CustomerId,
        address: NewAddress,
    ) -> Result<Option<SavedAddress>, RepositoryError> {
        let mut book = self.book.write().await;
        let entry_id = book.entry_id();
        let Some(stored) = book.get_mut(id) else {
            return Ok(None);
        };
        if address.is_default {
            stored.customer.addresses.iter_mut().for_each(|saved| saved.is_default = false);
        }
        let saved = SavedAddress {
            id: entry_id,
            address: address.address,
            is_default: address.is_default,
            created_at: address.created_at,
        };
        stored.customer.addresses.push(saved.clone());
        Ok(Some(saved))
    }

    async fn add_payment_method(
        &self,
        id: CustomerId,
        method: NewPaymentMethod,
    ) -> Result<Option<SavedPaymentMethod>, RepositoryError> {
        let mut book = self.book.write().await;
        let entry_id = book.entry_id();
        let Some(stored) = book.get_mut(id) else {
            return Ok(None);
        };
        if method.is_default {
            stored.customer.payment_methods.iter_mut().for_each(|saved| saved.is_default = false);
        }
        let saved = SavedPaymentMethod {
            id: entry_id,
            card_number: method.masked_number,
            card_holder: method.card_holder,
            card_type: method.card_type,
            expiry_month: method.expiry_month,
            expiry_year: method.expiry_year,
            is_default: method.is_default,
            created_at: method.created_at,
        };
        stored.customer.payment_methods.push(saved.clone());
        Ok(Some(saved))
    }

    async fn add_favorite(
        &self,
        id: CustomerId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut book = self.book.write().await;
        let Some(stored) = book.get_mut(id) else {
            return Ok(false);
        };
        if stored.customer.has_favorite(product_id) {
            return Ok(false);
        }
        stored.customer.favorites.push(product_id.clone());
        Ok(true)
    }

    async fn remove_favorite(
        &self,
        id: CustomerId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut book = self.book.write().await;
        let Some(stored) = book.get_mut(id) else {
            return Ok(false);
        };
        let before = stored.customer.favorites.len();
        stored.customer.favorites.retain(|favorite| favorite != product_id);
        Ok(stored.customer.favorites.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use storefront_core::accounts::{NewCustomer, ProfileChanges};
    use storefront_core::domain::customer::CustomerId;
    use storefront_core::domain::order::{
        IdempotencyKey, Order, OrderId, OrderStatus, PaymentMethod, ShippingAddress,
        ShippingMethod,
    };
    use storefront_core::domain::product::{Product, ProductId};
    use storefront_core::pricing::PricingTrace;

    use crate::repositories::{
        CustomerRepository, InMemoryCustomerRepository, InMemoryOrderRepository,
        InMemoryProductRepository, OrderRepository, ProductRepository, RepositoryError,
    };

    fn product(id: &str, category: &str) -> Product {
        Product {
            id: ProductId(id.to_string()),
            slug: format!("item-{id}"),
            name: format!("Item {id}"),
            description: "Demo item".to_string(),
            brand: "Acme".to_string(),
            category: category.to_string(),
            price: Decimal::new(1_000, 2),
            discount_price: None,
            rating: Decimal::new(4, 0),
            stock: 3,
            sales_count: 0,
            images: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn order(id: &str, number: &str, key: &str) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId(id.to_string()),
            order_number: number.to_string(),
            customer_id: CustomerId(1),
            idempotency_key: IdempotencyKey(key.to_string()),
            request_fingerprint: "sha256:abc".to_string(),
            status: OrderStatus::Pending,
            items: Vec::new(),
            shipping_address: ShippingAddress {
                street: "Rua A".to_string(),
                number: "1".to_string(),
                complement: None,
                neighborhood: None,
                city: "Recife".to_string(),
                state: "PE".to_string(),
                zip_code: "50000000".to_string(),
            },
            payment_method: PaymentMethod {
                card_number: "**** **** **** 0000".to_string(),
                card_holder: "ANA".to_string(),
                card_type: "credit_card".to_string(),
            },
            shipping_method: ShippingMethod { name: "Entrega padrão".to_string(), price: Decimal::TEN },
            coupon_code: None,
            subtotal: Decimal::ZERO,
            shipping: Decimal::TEN,
            discount: Decimal::ZERO,
            total: Decimal::TEN,
            pricing_trace: PricingTrace { currency: "BRL".to_string(), steps: Vec::new() },
            created_at: now,
            updated_at: now,
        }
    }

    fn new_customer(email: &str) -> NewCustomer {
        NewCustomer {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Souza".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn in_memory_product_repo_lists_in_insertion_order() {
        let repo = InMemoryProductRepository::with_products([
            product("z", "Moda"),
            product("a", "Casa e Decoração"),
            product("m", "Moda"),
            product("z", "Moda"),
        ]);

        let ids: Vec<String> =
            repo.list_all().await.expect("list").into_iter().map(|item| item.id.0).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);

        let moda = repo.list_by_category_slug("moda").await.expect("list moda");
        assert_eq!(moda.len(), 2);
        assert_eq!(
            repo.find_by_id(&ProductId("a".to_string())).await.expect("find"),
            Some(product("a", "Casa e Decoração"))
        );
    }

    #[tokio::test]
    async fn in_memory_order_repo_enforces_unique_keys_and_numbers() {
        let repo = InMemoryOrderRepository::default();
        let stored = order("o-1", "LS-000001", "k-1");

        repo.insert(stored.clone()).await.expect("insert order");
        let duplicate_key =
            repo.insert(order("o-2", "LS-000002", "k-1")).await.expect_err("duplicate key");
        let duplicate_number =
            repo.insert(order("o-3", "LS-000001", "k-3")).await.expect_err("duplicate number");

        assert!(matches!(duplicate_key, RepositoryError::Conflict(_)));
        assert!(
            matches!(duplicate_number, RepositoryError::OrderNumberTaken(ref n) if n == "LS-000001")
        );
        assert_eq!(
            repo.find_by_idempotency_key(&IdempotencyKey("k-1".to_string())).await.expect("find"),
            Some(stored.clone())
        );
        assert_eq!(repo.list_for_customer(CustomerId(1)).await.expect("list"), vec![stored]);
        assert!(repo.list_for_customer(CustomerId(2)).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn in_memory_customers_keep_emails_unique() {
        let repo = InMemoryCustomerRepository::default();
        let ana = repo.create(new_customer("ana@example.com")).await.expect("create");
        let bia = repo.create(new_customer("bia@example.com")).await.expect("create");

        assert_eq!(ana.id, CustomerId(1));
        assert_eq!(bia.id, CustomerId(2));
        assert!(matches!(
            repo.create(new_customer("ana@example.com")).await,
            Err(RepositoryError::Conflict(_))
        ));

        let steal = ProfileChanges {
            first_name: None,
            last_name: None,
            email: Some("ana@example.com".to_string()),
            phone: None,
            birth_date: None,
            updated_at: Utc::now(),
        };
        assert!(matches!(
            repo.update_profile(bia.id, steal).await,
            Err(RepositoryError::Conflict(_))
        ));

        let credentials =
            repo.find_credentials("ana@example.com").await.expect("find").expect("present");
        assert_eq!(credentials.customer, ana);
        assert_eq!(credentials.password_hash, "hash");
    }

    #[tokio::test]
    async fn in_memory_favorites_are_a_set() {
        let repo = InMemoryCustomerRepository::default();
        let ana = repo.create(new_customer("ana@example.com")).await.expect("create");
        let headphones = ProductId("1".to_string());

        assert!(repo.add_favorite(ana.id, &headphones).await.expect("add"));
        assert!(!repo.add_favorite(ana.id, &headphones).await.expect("re-add"));
        assert!(repo.remove_favorite(ana.id, &headphones).await.expect("remove"));
        assert!(!repo.remove_favorite(ana.id, &headphones).await.expect("remove again"));
        assert!(!repo.add_favorite(CustomerId(99), &headphones).await.expect("unknown customer"));
    }
}
