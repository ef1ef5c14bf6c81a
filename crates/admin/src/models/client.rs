//! Client aggregate: the client, its phones and its addresses.
//!
//! These types represent domain objects as the services see them. Identity
//! fields are `Option` because a client only gets an id once the store has
//! persisted it.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use storedesk_core::{AddressId, CityId, ClientId, ClientType, Email};

/// An adaptive one-way password hash in PHC string format.
///
/// There is no way to construct one from plaintext except through a
/// [`PasswordHasher`](crate::services::password::PasswordHasher), so a client
/// can never carry a plaintext password.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Wrap a digest that was produced by a hasher or read from the store.
    #[must_use]
    pub const fn from_digest(digest: String) -> Self {
        Self(digest)
    }

    /// The encoded digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword([REDACTED])")
    }
}

/// A city. Addresses reference cities, never own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct City {
    pub id: CityId,
    /// `None` until the store resolves the reference.
    pub name: Option<String>,
}

impl City {
    /// A reference to a city known only by id.
    #[must_use]
    pub const fn reference(id: CityId) -> Self {
        Self { id, name: None }
    }
}

/// A postal address owned by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Option<AddressId>,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub postal_code: String,
    /// Back-reference to the owning client, set once the client has an id.
    pub client_id: Option<ClientId>,
    pub city: City,
}

/// A client of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Option<ClientId>,
    pub name: String,
    pub email: Email,
    pub tax_id: Option<String>,
    pub client_type: Option<ClientType>,
    #[serde(skip)]
    pub password: Option<HashedPassword>,
    /// Phone numbers in insertion order.
    pub phones: Vec<String>,
    pub addresses: Vec<Address>,
}

impl Client {
    /// A client with only the identifying fields set.
    #[must_use]
    pub const fn new(id: Option<ClientId>, name: String, email: Email) -> Self {
        Self {
            id,
            name,
            email,
            tax_id: None,
            client_type: None,
            password: None,
            phones: Vec::new(),
            addresses: Vec::new(),
        }
    }
}

/// Columns a client listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClientSortField {
    Id,
    #[default]
    Name,
    Email,
    TaxId,
    ClientType,
}

impl ClientSortField {
    /// Column name in the `client` table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::TaxId => "tax_id",
            Self::ClientType => "client_type",
        }
    }
}

impl FromStr for ClientSortField {
    type Err = String;

    /// Accepts both the wire (camelCase) and column (`snake_case`) names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            "taxId" | "tax_id" => Ok(Self::TaxId),
            "type" | "clientType" | "client_type" => Ok(Self::ClientType),
            other => Err(format!("unknown client sort field: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_is_bare() {
        let client = Client::new(None, "Maria Silva".into(), Email::parse("maria@gmail.com").unwrap());
        assert!(client.id.is_none());
        assert!(client.password.is_none());
        assert!(client.phones.is_empty());
        assert!(client.addresses.is_empty());
    }

    #[test]
    fn test_hashed_password_debug_is_redacted() {
        let hash = HashedPassword::from_digest("$argon2id$v=19$secretstuff".into());
        assert_eq!(format!("{hash:?}"), "HashedPassword([REDACTED])");
    }

    #[test]
    fn test_serialize_skips_password() {
        let mut client =
            Client::new(Some(ClientId::new(1)), "Maria Silva".into(), Email::parse("maria@gmail.com").unwrap());
        client.password = Some(HashedPassword::from_digest("digest".into()));

        let json = serde_json::to_value(&client).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "maria@gmail.com");
    }

    #[test]
    fn test_sort_field_parse() {
        assert_eq!("name".parse(), Ok(ClientSortField::Name));
        assert_eq!("taxId".parse(), Ok(ClientSortField::TaxId));
        assert_eq!("client_type".parse(), Ok(ClientSortField::ClientType));
        assert!("password".parse::<ClientSortField>().is_err());
        assert_eq!(ClientSortField::TaxId.column(), "tax_id");
    }
}
