//! Client service.
//!
//! Orchestrates lookups, registration, updates and deletion of clients on top
//! of a [`ClientStore`], and converts between DTOs and the client model.

use tracing::instrument;

use storedesk_core::{ClientId, ClientType, Email, Page, PageRequest, SortDirection};

use super::password::PasswordHasher;
use crate::db::{ClientStore, RepositoryError};
use crate::dto::{ClientCreateDto, ClientReadDto};
use crate::error::ServiceError;
use crate::models::{Address, City, Client, ClientSortField};

const CLIENT: &str = "Client";

/// Client administration service.
///
/// The store and the hasher are supplied by the caller, so the same service
/// runs against `PostgreSQL` in production and the memory store in tests.
pub struct ClientService<S, H> {
    store: S,
    hasher: H,
}

impl<S: ClientStore, H: PasswordHasher> ClientService<S, H> {
    /// Create a new client service.
    #[must_use]
    pub const fn new(store: S, hasher: H) -> Self {
        Self { store, hasher }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The password hasher used for new clients.
    #[must_use]
    pub const fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Get a client by id.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no client has this id.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn find(&self, id: ClientId) -> Result<Client, ServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(CLIENT, id))
    }

    /// Get a client by login email.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no client has this email.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn find_by_email(&self, email: &Email) -> Result<Client, ServiceError> {
        self.store
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::not_found(CLIENT, email))
    }

    /// Register a new client together with its addresses.
    ///
    /// Any id on the incoming client or its addresses is discarded. The
    /// client and its addresses are written in one unit of work.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if any write fails; nothing is
    /// persisted in that case.
    #[instrument(skip(self, client), fields(email = %client.email))]
    pub async fn insert(&self, mut client: Client) -> Result<Client, ServiceError> {
        client.id = None;
        for address in &mut client.addresses {
            address.id = None;
            address.client_id = None;
        }

        let mut uow = self.store.begin().await?;
        let mut saved = uow.save(&client).await?;
        let id = saved
            .id
            .ok_or_else(|| RepositoryError::DataCorruption("store returned no client id".into()))?;
        saved.addresses = uow.save_addresses(id, &client.addresses).await?;
        uow.commit().await?;

        tracing::info!(id = %id, "Client registered");
        Ok(saved)
    }

    /// Change a client's name and email.
    ///
    /// Everything else on `client` is ignored; the stored phones, addresses,
    /// password and type are kept.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` if `client` has no id, or
    /// `ServiceError::NotFound` if it does not exist.
    #[instrument(skip(self, client), fields(id = ?client.id))]
    pub async fn update(&self, client: Client) -> Result<Client, ServiceError> {
        let id = client
            .id
            .ok_or_else(|| ServiceError::InvalidArgument("client id is required for update".into()))?;

        let mut existing = self.find(id).await?;
        existing.name = client.name;
        existing.email = client.email;

        Ok(self.store.save(&existing).await?)
    }

    /// Delete a client with its phones and addresses.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the client does not exist, or
    /// `ServiceError::IntegrityConflict` if orders still reference it.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete(&self, id: ClientId) -> Result<(), ServiceError> {
        self.find(id).await?;

        match self.store.delete_by_id(id).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::IntegrityViolation(_)) => Err(ServiceError::IntegrityConflict(
                "cannot delete a client with related orders".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// All clients.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn find_all(&self) -> Result<Vec<Client>, ServiceError> {
        Ok(self.store.find_all().await?)
    }

    /// One page of clients sorted by `order_by` in `direction`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` if `page_size` is zero or if
    /// `direction` or `order_by` is not recognized.
    #[instrument(skip(self))]
    pub async fn find_page(
        &self,
        page_index: u32,
        page_size: u32,
        direction: &str,
        order_by: &str,
    ) -> Result<Page<Client>, ServiceError> {
        if page_size == 0 {
            return Err(ServiceError::InvalidArgument(
                "page size must be greater than zero".into(),
            ));
        }
        let direction = SortDirection::parse(direction)
            .map_err(|e| ServiceError::InvalidArgument(e.to_string()))?;
        let sort = order_by
            .parse::<ClientSortField>()
            .map_err(ServiceError::InvalidArgument)?;

        let request = PageRequest {
            page_index,
            page_size,
            direction,
            sort,
        };
        Ok(self.store.find_page(&request).await?)
    }

    /// Build a new client from a registration payload.
    ///
    /// The password is hashed here; the plaintext never reaches the model.
    /// Blank optional phones are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the payload is invalid, or
    /// `ServiceError::PasswordHash` if hashing fails.
    pub fn from_create_dto(&self, dto: ClientCreateDto) -> Result<Client, ServiceError> {
        let errors = dto.validate();
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let email =
            Email::parse(&dto.email).map_err(|e| ServiceError::InvalidArgument(e.to_string()))?;
        let client_type = ClientType::from_code(dto.client_type)
            .map_err(|e| ServiceError::InvalidArgument(e.to_string()))?;
        let password = self.hasher.hash(&dto.password)?;

        let phones = std::iter::once(Some(dto.phone1))
            .chain([dto.phone2, dto.phone3])
            .flatten()
            .filter(|phone| !phone.trim().is_empty())
            .collect();

        let address = Address {
            id: None,
            street: dto.street,
            number: dto.number,
            complement: dto.complement,
            neighborhood: dto.neighborhood,
            postal_code: dto.postal_code,
            client_id: None,
            city: City::reference(dto.city_id.into()),
        };

        let mut client = Client::new(None, dto.name.trim().to_owned(), email);
        client.tax_id = Some(dto.tax_id);
        client.client_type = Some(client_type);
        client.password = Some(password);
        client.phones = phones;
        client.addresses = vec![address];
        Ok(client)
    }

    /// Build a partial client (id, name, email) from a read/update payload.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if name or email is invalid.
    #[allow(clippy::unused_self)]
    pub fn from_read_dto(&self, dto: ClientReadDto) -> Result<Client, ServiceError> {
        let errors = dto.validate();
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let email =
            Email::parse(&dto.email).map_err(|e| ServiceError::InvalidArgument(e.to_string()))?;
        Ok(Client::new(dto.id, dto.name.trim().to_owned(), email))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::HashingConfig;
    use crate::db::MemoryClientStore;
    use crate::services::Argon2Hasher;

    type Service = ClientService<MemoryClientStore, Argon2Hasher>;

    fn service() -> Service {
        let hasher = Argon2Hasher::with_config(&HashingConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        ClientService::new(MemoryClientStore::new(), hasher)
    }

    fn create_dto(email: &str, city_id: i32) -> ClientCreateDto {
        serde_json::from_value(serde_json::json!({
            "name": "Maria Silva",
            "email": email,
            "taxId": "36378912377",
            "clientType": 1,
            "password": "123",
            "street": "Rua Flores",
            "number": "300",
            "complement": "Apto 303",
            "neighborhood": "Jardim",
            "postalCode": "38220834",
            "cityId": city_id,
            "phone1": "111",
            "phone2": null,
            "phone3": "333"
        }))
        .unwrap()
    }

    async fn registered(service: &Service, email: &str) -> Client {
        let city = service.store().add_city("Uberlândia").unwrap();
        let client = service
            .from_create_dto(create_dto(email, city.id.as_i32()))
            .unwrap();
        service.insert(client).await.unwrap()
    }

    #[test]
    fn test_from_create_dto_skips_missing_phones() {
        let client = service().from_create_dto(create_dto("maria@gmail.com", 1)).unwrap();
        assert_eq!(client.phones, vec!["111", "333"]);
    }

    #[test]
    fn test_from_create_dto_hashes_password() {
        let service = service();
        let client = service.from_create_dto(create_dto("maria@gmail.com", 1)).unwrap();
        let hash = client.password.unwrap();
        assert!(!hash.as_str().is_empty());
        assert_ne!(hash.as_str(), "123");
        assert!(service.hasher().verify("123", &hash));
    }

    #[test]
    fn test_from_create_dto_builds_one_address() {
        let client = service().from_create_dto(create_dto("maria@gmail.com", 4)).unwrap();
        assert_eq!(client.id, None);
        assert_eq!(client.client_type, Some(ClientType::Individual));
        assert_eq!(client.addresses.len(), 1);
        assert_eq!(client.addresses[0].city, City::reference(4.into()));
        assert_eq!(client.addresses[0].complement.as_deref(), Some("Apto 303"));
    }

    #[test]
    fn test_from_create_dto_rejects_invalid_payload() {
        let mut dto = create_dto("maria@gmail.com", 1);
        dto.client_type = 3;
        let err = service().from_create_dto(dto).unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(errors[0].field_name, "clientType");
    }

    #[test]
    fn test_from_read_dto_sets_only_identity() {
        let dto = ClientReadDto {
            id: Some(ClientId::new(9)),
            name: "Maria Souza".into(),
            email: "souza@gmail.com".into(),
        };
        let client = service().from_read_dto(dto).unwrap();
        assert_eq!(client.id, Some(ClientId::new(9)));
        assert_eq!(client.email.as_str(), "souza@gmail.com");
        assert!(client.password.is_none());
        assert!(client.phones.is_empty());
        assert!(client.addresses.is_empty());
    }

    #[tokio::test]
    async fn test_insert_discards_caller_id() {
        let service = service();
        let city = service.store().add_city("Uberlândia").unwrap();
        let mut client = service
            .from_create_dto(create_dto("maria@gmail.com", city.id.as_i32()))
            .unwrap();
        client.id = Some(ClientId::new(500));

        let saved = service.insert(client).await.unwrap();
        let id = saved.id.unwrap();
        assert_ne!(id, ClientId::new(500));
        assert_eq!(saved.addresses[0].client_id, Some(id));
        assert!(saved.addresses[0].id.is_some());
        assert_eq!(saved.addresses[0].city.name.as_deref(), Some("Uberlândia"));
    }

    #[tokio::test]
    async fn test_insert_with_existing_id_creates_new_client() {
        let service = service();
        let existing = registered(&service, "maria@gmail.com").await;
        let existing_id = existing.id.unwrap();

        let mut client = service
            .from_create_dto(create_dto("ana@gmail.com", 1))
            .unwrap();
        client.id = Some(existing_id);
        client.name = "Ana Costa".into();

        let saved = service.insert(client).await.unwrap();
        assert_ne!(saved.id, Some(existing_id));
        assert_eq!(service.store().client_count().unwrap(), 2);

        let untouched = service.find(existing_id).await.unwrap();
        assert_eq!(untouched, existing);
    }

    #[tokio::test]
    async fn test_insert_rolls_back_when_address_fails() {
        let service = service();
        let client = service
            .from_create_dto(create_dto("maria@gmail.com", 77))
            .unwrap();

        let err = service.insert(client).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repository(RepositoryError::IntegrityViolation(_))
        ));
        assert_eq!(service.store().client_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_missing_is_not_found() {
        let err = service().find(ClientId::new(42)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { kind: "Client", .. }));
        assert_eq!(err.to_string(), "Object not found! Id: 42, Type: Client");
    }

    #[tokio::test]
    async fn test_update_changes_only_name_and_email() {
        let service = service();
        let saved = registered(&service, "maria@gmail.com").await;
        let id = saved.id.unwrap();

        let mut change = Client::new(
            Some(id),
            "Maria Souza".into(),
            Email::parse("souza@gmail.com").unwrap(),
        );
        change.phones = vec!["999".into()];
        service.update(change).await.unwrap();

        let found = service.find(id).await.unwrap();
        assert_eq!(found.name, "Maria Souza");
        assert_eq!(found.email.as_str(), "souza@gmail.com");
        assert_eq!(found.phones, saved.phones);
        assert_eq!(found.addresses, saved.addresses);
        assert_eq!(found.password, saved.password);
        assert_eq!(found.client_type, saved.client_type);
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let client = Client::new(None, "Maria Souza".into(), Email::parse("a@b.com").unwrap());
        let err = service().update(client).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_delete_without_orders() {
        let service = service();
        let id = registered(&service, "maria@gmail.com").await.id.unwrap();

        service.delete(id).await.unwrap();
        assert!(matches!(
            service.find(id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_delete_with_orders_is_integrity_conflict() {
        let service = service();
        let id = registered(&service, "maria@gmail.com").await.id.unwrap();
        service.store().add_order(id).unwrap();

        let err = service.delete(id).await.unwrap_err();
        assert!(matches!(err, ServiceError::IntegrityConflict(_)));
        assert!(service.find(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let err = service().delete(ClientId::new(3)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_page_rejects_unknown_direction() {
        let err = service()
            .find_page(0, 10, "SIDEWAYS", "name")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_find_page_rejects_unknown_sort_field() {
        let err = service()
            .find_page(0, 10, "ASC", "nonexistent")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_find_page_rejects_zero_size() {
        let err = service().find_page(0, 0, "ASC", "name").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_find_page_descending() {
        let service = service();
        registered(&service, "maria@gmail.com").await;
        let mut other = service
            .from_create_dto(create_dto("ana@gmail.com", 1))
            .unwrap();
        other.name = "Ana Costa".into();
        service.insert(other).await.unwrap();

        let page = service
            .find_page(0, 10, "DESCENDING", "name")
            .await
            .unwrap();
        let names: Vec<_> = page.content.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Maria Silva", "Ana Costa"]);
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_find_by_email() {
        let service = service();
        let saved = registered(&service, "maria@gmail.com").await;

        let found = service
            .find_by_email(&Email::parse("maria@gmail.com").unwrap())
            .await
            .unwrap();
        assert_eq!(found.id, saved.id);

        let err = service
            .find_by_email(&Email::parse("nobody@gmail.com").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }
}
