//! Transport shapes for clients.
//!
//! DTOs are flat, carry raw strings, and are validated before they are turned
//! into models. Wire names are camelCase.

use serde::{Deserialize, Serialize};

use storedesk_core::{ClientId, ClientType, Email};

use crate::models::Client;

const NAME_MIN_LENGTH: usize = 5;
const NAME_MAX_LENGTH: usize = 120;

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field_name: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field_name: &'static str, message: impl Into<String>) -> Self {
        Self {
            field_name,
            message: message.into(),
        }
    }
}

/// Payload for registering a new client with its first address.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCreateDto {
    pub name: String,
    pub email: String,
    pub tax_id: String,
    /// Client type code (1 individual, 2 business).
    pub client_type: i32,
    pub password: String,

    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub postal_code: String,
    pub city_id: i32,

    pub phone1: String,
    #[serde(default)]
    pub phone2: Option<String>,
    #[serde(default)]
    pub phone3: Option<String>,
}

impl ClientCreateDto {
    /// Check every field, collecting all failures.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        check_name(&self.name, &mut errors);
        check_email(&self.email, &mut errors);

        let tax_digits = self
            .tax_id
            .chars()
            .filter(|c| !matches!(c, '.' | '-' | '/' | ' '))
            .collect::<String>();
        if tax_digits.is_empty() {
            errors.push(FieldError::new("taxId", "must not be empty"));
        } else if !tax_digits.chars().all(|c| c.is_ascii_digit()) {
            errors.push(FieldError::new("taxId", "must contain only digits"));
        }

        if let Err(e) = ClientType::from_code(self.client_type) {
            errors.push(FieldError::new("clientType", e.to_string()));
        }

        if self.password.is_empty() {
            errors.push(FieldError::new("password", "must not be empty"));
        }

        for (field, value) in [
            ("street", &self.street),
            ("number", &self.number),
            ("postalCode", &self.postal_code),
            ("phone1", &self.phone1),
        ] {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, "must not be empty"));
            }
        }

        errors
    }
}

/// Client projection used for reads and for name/email updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientReadDto {
    pub id: Option<ClientId>,
    pub name: String,
    pub email: String,
}

impl ClientReadDto {
    /// Check name and email.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_name(&self.name, &mut errors);
        check_email(&self.email, &mut errors);
        errors
    }
}

impl From<&Client> for ClientReadDto {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id,
            name: client.name.clone(),
            email: client.email.as_str().to_owned(),
        }
    }
}

fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    let len = name.trim().chars().count();
    if !(NAME_MIN_LENGTH..=NAME_MAX_LENGTH).contains(&len) {
        errors.push(FieldError::new(
            "name",
            format!("must be between {NAME_MIN_LENGTH} and {NAME_MAX_LENGTH} characters"),
        ));
    }
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if let Err(e) = Email::parse(email) {
        errors.push(FieldError::new("email", e.to_string()));
    }
}
