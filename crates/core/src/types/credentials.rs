//! Login credentials.

use secrecy::SecretString;
use serde::Deserialize;

/// Email and plaintext password submitted for authentication.
///
/// Only ever deserialized from a request and handed to the auth service.
/// The password stays wrapped in a [`SecretString`] so it cannot end up in
/// logs through `Debug`, and the type deliberately has no `Serialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// Login email as typed by the user (validated by the auth service).
    pub email: String,
    /// Plaintext password.
    pub password: SecretString,
}

impl Credentials {
    /// Build credentials from raw parts.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}
