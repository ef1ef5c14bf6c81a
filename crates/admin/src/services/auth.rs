//! Client authentication.
//!
//! Email and password only. Issuing sessions or tokens is left to the
//! caller.

use secrecy::ExposeSecret;
use tracing::{debug, instrument};

use storedesk_core::{Credentials, Email};

use super::password::PasswordHasher;
use crate::db::ClientStore;
use crate::error::ServiceError;
use crate::models::Client;

/// Verifies client credentials against stored password hashes.
pub struct AuthService<'a, S, H> {
    store: &'a S,
    hasher: &'a H,
}

impl<'a, S: ClientStore, H: PasswordHasher> AuthService<'a, S, H> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a S, hasher: &'a H) -> Self {
        Self { store, hasher }
    }

    /// Authenticate a client by email and password.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidCredentials` if the email is malformed
    /// or unknown, the client has no password, or the password is wrong.
    /// Returns `ServiceError::Repository` if the lookup fails.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Client, ServiceError> {
        let Ok(email) = Email::parse(&credentials.email) else {
            return Err(ServiceError::InvalidCredentials);
        };

        let Some(client) = self.store.find_by_email(&email).await? else {
            debug!("No client with this email");
            return Err(ServiceError::InvalidCredentials);
        };

        let verified = client.password.as_ref().is_some_and(|hash| {
            self.hasher
                .verify(credentials.password.expose_secret(), hash)
        });
        if !verified {
            debug!("Password mismatch");
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(client)
    }
}
