//! Customer account inputs: registration, login, profile edits and the
//! saved address and card book. Each input validates itself into the record
//! the repository stores.

pub mod password;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::checkout::order::{mask_card_number, validate_card_number};
use crate::checkout::shipping::normalize_postal_code;
use crate::domain::order::ShippingAddress;
use crate::errors::DomainError;

pub use password::CredentialHasher;

pub const MIN_PASSWORD_CHARS: usize = 8;

pub fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(DomainError::Validation("email is required".to_string()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(DomainError::Validation(format!("email `{}` is not a valid address", raw.trim()))),
    }
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// A validated registration awaiting its password hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidRegistration {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Registration {
    pub fn validate(&self) -> Result<ValidRegistration, DomainError> {
        let email = normalize_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(DomainError::Validation(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        Ok(ValidRegistration {
            email,
            first_name: required("firstName", &self.first_name)?,
            last_name: required("lastName", &self.last_name)?,
        })
    }
}

impl ValidRegistration {
    pub fn into_new_customer(self, password_hash: String, now: DateTime<Utc>) -> NewCustomer {
        NewCustomer {
            email: self.email,
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            created_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("email", &self.email).finish_non_exhaustive()
    }
}

impl Credentials {
    /// Normalized email for the lookup. Only presence is checked so a
    /// malformed address fails the same way as an unknown one.
    pub fn lookup_email(&self) -> Result<String, DomainError> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() || self.password.is_empty() {
            return Err(DomainError::Validation("email and password are required".to_string()));
        }
        Ok(email)
    }
}

/// Partial profile edit. Absent or blank fields keep their stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileUpdate {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ProfileChanges, DomainError> {
        let email = optional(self.email.as_deref()).map(|email| normalize_email(&email)).transpose()?;
        Ok(ProfileChanges {
            first_name: optional(self.first_name.as_deref()),
            last_name: optional(self.last_name.as_deref()),
            email,
            phone: optional(self.phone.as_deref()),
            birth_date: optional(self.birth_date.as_deref()),
            updated_at: now,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    #[serde(flatten)]
    pub address: ShippingAddress,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAddress {
    pub address: ShippingAddress,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl AddressInput {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<NewAddress, DomainError> {
        if let Some(field) = self.address.missing_field() {
            return Err(DomainError::Validation(format!("{field} is required")));
        }
        let mut address = self.address.clone();
        address.zip_code = normalize_postal_code(&address.zip_code)?;
        address.complement = optional(address.complement.as_deref());
        address.neighborhood = optional(address.neighborhood.as_deref());
        Ok(NewAddress { address, is_default: self.is_default, created_at: now })
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodInput {
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub card_holder: String,
    #[serde(default)]
    pub expiry_month: String,
    #[serde(default)]
    pub expiry_year: String,
    #[serde(default)]
    pub card_type: String,
    #[serde(default)]
    pub is_default: bool,
}

impl fmt::Debug for PaymentMethodInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentMethodInput")
            .field("card_number", &mask_card_number(&self.card_number))
            .field("card_holder", &self.card_holder)
            .field("card_type", &self.card_type)
            .field("is_default", &self.is_default)
            .finish_non_exhaustive()
    }
}

/// A card ready to store. The full number is gone by this point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPaymentMethod {
    pub masked_number: String,
    pub card_holder: String,
    pub card_type: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentMethodInput {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<NewPaymentMethod, DomainError> {
        validate_card_number("cardNumber", &self.card_number)?;
        let card_holder = required("cardHolder", &self.card_holder)?;
        let card_type = required("cardType", &self.card_type)?;
        let expiry_month = required("expiryMonth", &self.expiry_month)?;
        let expiry_year = required("expiryYear", &self.expiry_year)?;

        match expiry_month.parse::<u8>() {
            Ok(month) if (1..=12).contains(&month) => {}
            _ => {
                return Err(DomainError::Validation(format!(
                    "expiryMonth must be between 1 and 12 (got `{expiry_month}`)"
                )))
            }
        }
        if expiry_year.parse::<u16>().is_err() {
            return Err(DomainError::Validation(format!(
                "expiryYear must be numeric (got `{expiry_year}`)"
            )));
        }

        Ok(NewPaymentMethod {
            masked_number: mask_card_number(&self.card_number),
            card_holder,
            card_type,
            expiry_month,
            expiry_year,
            is_default: self.is_default,
            created_at: now,
        })
    }
}
