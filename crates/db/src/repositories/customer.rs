use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use storefront_core::accounts::{NewAddress, NewCustomer, NewPaymentMethod, ProfileChanges};
use storefront_core::domain::customer::{
    Customer, CustomerId, SavedAddress, SavedPaymentMethod, StoredCredentials,
};
use storefront_core::domain::order::ShippingAddress;
use storefront_core::domain::product::ProductId;

use super::product::decode_timestamp;
use super::{CustomerRepository, RepositoryError};
use crate::DbPool;

const CUSTOMER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, phone, birth_date, created_at, updated_at";

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self, row: &SqliteRow) -> Result<StoredCredentials, RepositoryError> {
        let id = CustomerId(column(row, "id")?);
        let addresses = sqlx::query(
            "SELECT id, street, number, complement, neighborhood, city, state, zip_code,
                    is_default, created_at
             FROM customer_address WHERE customer_id = ? ORDER BY id",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(row_to_address)
        .collect::<Result<Vec<_>, _>>()?;
        let payment_methods = sqlx::query(
            "SELECT id, masked_number, card_holder, card_type, expiry_month, expiry_year,
                    is_default, created_at
             FROM customer_payment_method WHERE customer_id = ? ORDER BY id",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(row_to_payment_method)
        .collect::<Result<Vec<_>, _>>()?;
        let favorites = sqlx::query_scalar::<_, String>(
            "SELECT product_id FROM customer_favorite WHERE customer_id = ?
             ORDER BY created_at, rowid",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ProductId)
        .collect();

        Ok(StoredCredentials {
            customer: Customer {
                id,
                email: column(row, "email")?,
                first_name: column(row, "first_name")?,
                last_name: column(row, "last_name")?,
                phone: column(row, "phone")?,
                birth_date: column(row, "birth_date")?,
                addresses,
                payment_methods,
                favorites,
                created_at: decode_timestamp("created_at", &column::<String>(row, "created_at")?)?,
                updated_at: decode_timestamp("updated_at", &column::<String>(row, "updated_at")?)?,
            },
            password_hash: column(row, "password_hash")?,
        })
    }

    async fn fetch(&self, id: CustomerId) -> Result<Option<StoredCredentials>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CUSTOMER_COLUMNS} FROM customer WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(self.load(r).await?)),
            None => Ok(None),
        }
    }

    async fn exists(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM customer WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get::<T, _>(name).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_address(row: &SqliteRow) -> Result<SavedAddress, RepositoryError> {
    Ok(SavedAddress {
        id: column(row, "id")?,
        address: ShippingAddress {
            street: column(row, "street")?,
            number: column(row, "number")?,
            complement: column(row, "complement")?,
            neighborhood: column(row, "neighborhood")?,
            city: column(row, "city")?,
            state: column(row, "state")?,
            zip_code: column(row, "zip_code")?,
        },
        is_default: column(row, "is_default")?,
        created_at: decode_timestamp("created_at", &column::<String>(row, "created_at")?)?,
    })
}

fn row_to_payment_method(row: &SqliteRow) -> Result<SavedPaymentMethod, RepositoryError> {
    Ok(SavedPaymentMethod {
        id: column(row, "id")?,
        card_number: column(row, "masked_number")?,
        card_holder: column(row, "card_holder")?,
        card_type: column(row, "card_type")?,
        expiry_month: column(row, "expiry_month")?,
        expiry_year: column(row, "expiry_year")?,
        is_default: column(row, "is_default")?,
        created_at: decode_timestamp("created_at", &column::<String>(row, "created_at")?)?,
    })
}

fn email_conflict(error: sqlx::Error, email: &str) -> RepositoryError {
    match error {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            RepositoryError::Conflict(format!("email `{email}` is already registered"))
        }
        other => other.into(),
    }
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn create(&self, customer: NewCustomer) -> Result<Customer, RepositoryError> {
        let created_at = customer.created_at.to_rfc3339();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO customer (email, password_hash, first_name, last_name, created_at,
                                   updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&customer.email)
        .bind(&customer.password_hash)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&created_at)
        .bind(&created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| email_conflict(error, &customer.email))?;

        Ok(Customer {
            id: CustomerId(id),
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
        })
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.fetch(id).await?.map(|stored| stored.customer))
    }

    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CUSTOMER_COLUMNS} FROM customer WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(self.load(r).await?)),
            None => Ok(None),
        }
    }

    async fn update_profile(
        &self,
        id: CustomerId,
        changes: ProfileChanges,
    ) -> Result<Option<Customer>, RepositoryError> {
        let email = changes.email.clone().unwrap_or_default();
        let updated = sqlx::query(
            "UPDATE customer SET
                 first_name = COALESCE(?, first_name),
                 last_name = COALESCE(?, last_name),
                 email = COALESCE(?, email),
                 phone = COALESCE(?, phone),
                 birth_date = COALESCE(?, birth_date),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.birth_date)
        .bind(changes.updated_at.to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(|error| email_conflict(error, &email))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn add_address(
        &self,
        id: CustomerId,
        address: NewAddress,
    ) -> Result<Option<SavedAddress>, RepositoryError> {
        if !self.exists(id).await? {
            return Ok(None);
        }

        let mut tx = self.pool.begin().await?;
        if address.is_default {
            sqlx::query("UPDATE customer_address SET is_default = 0 WHERE customer_id = ?")
                .bind(id.0)
                .execute(&mut *tx)
                .await?;
        }
        let address_id: i64 = sqlx::query_scalar(
            "INSERT INTO customer_address (customer_id, street, number, complement, neighborhood,
                                           city, state, zip_code, is_default, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(id.0)
        .bind(&address.address.street)
        .bind(&address.address.number)
        .bind(&address.address.complement)
        .bind(&address.address.neighborhood)
        .bind(&address.address.city)
        .bind(&address.address.state)
        .bind(&address.address.zip_code)
        .bind(address.is_default)
        .bind(address.created_at.to_rfc3339())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(SavedAddress {
            id: address_id,
            address: address.address,
            is_default: address.is_default,
            created_at: address.created_at,
        }))
    }

    async fn add_payment_method(
        &self,
        id: CustomerId,
        method: NewPaymentMethod,
    ) -> Result<Option<SavedPaymentMethod>, RepositoryError> {
        if !self.exists(id).await? {
            return Ok(None);
        }

        let mut tx = self.pool.begin().await?;
        if method.is_default {
            sqlx::query("UPDATE customer_payment_method SET is_default = 0 WHERE customer_id = ?")
                .bind(id.0)
                .execute(&mut *tx)
                .await?;
        }
        let method_id: i64 = sqlx::query_scalar(
            "INSERT INTO customer_payment_method (customer_id, masked_number, card_holder,
                                                  card_type, expiry_month, expiry_year,
                                                  is_default, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(id.0)
        .bind(&method.masked_number)
        .bind(&method.card_holder)
        .bind(&method.card_type)
        .bind(&method.expiry_month)
        .bind(&method.expiry_year)
        .bind(method.is_default)
        .bind(method.created_at.to_rfc3339())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(SavedPaymentMethod {
            id: method_id,
            card_number: method.masked_number,
            card_holder: method.card_holder,
            card_type: method.card_type,
            expiry_month: method.expiry_month,
            expiry_year: method.expiry_year,
            is_default: method.is_default,
            created_at: method.created_at,
        }))
    }

    async fn add_favorite(
        &self,
        id: CustomerId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let inserted = sqlx::query(
            "INSERT INTO customer_favorite (customer_id, product_id, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(customer_id, product_id) DO NOTHING",
        )
        .bind(id.0)
        .bind(&product_id.0)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(inserted.rows_affected() == 1)
    }

    async fn remove_favorite(
        &self,
        id: CustomerId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let removed =
            sqlx::query("DELETE FROM customer_favorite WHERE customer_id = ? AND product_id = ?")
                .bind(id.0)
                .bind(&product_id.0)
                .execute(&self.pool)
                .await?;
        Ok(removed.rows_affected() == 1)
    }
}
