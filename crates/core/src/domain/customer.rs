use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::order::ShippingAddress;
use crate::domain::product::ProductId;

/// Database-assigned account identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub i64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CustomerId {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse().map(Self)
    }
}

/// A customer account as exposed to its owner. The password hash never leaves
/// the repository layer on this type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub addresses: Vec<SavedAddress>,
    pub payment_methods: Vec<SavedPaymentMethod>,
    /// Oldest first.
    pub favorites: Vec<ProductId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
    pub id: i64,
    #[serde(flatten)]
    pub address: ShippingAddress,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// A stored card. `card_number` is always in `**** **** **** NNNN` form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPaymentMethod {
    pub id: i64,
    pub card_number: String,
    pub card_holder: String,
    pub card_type: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Account row plus the stored argon2 PHC string, returned only for login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredCredentials {
    pub customer: Customer,
    pub password_hash: String,
}

impl Customer {
    pub fn has_favorite(&self, product_id: &ProductId) -> bool {
        self.favorites.contains(product_id)
    }
}
