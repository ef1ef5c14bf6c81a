//! In-process client store.
//!
//! Mirrors the `PostgreSQL` schema's rules so services behave the same on
//! both: emails are unique, addresses must reference a known city, and a
//! client referenced by an order cannot be deleted. Ids come from counters
//! that, like database sequences, are not rolled back.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use storedesk_core::{
    AddressId, CityId, ClientId, Email, OrderId, Page, PageRequest, SortDirection,
};

use super::{ClientStore, ClientUnitOfWork, RepositoryError};
use crate::models::{Address, City, Client, ClientSortField};

#[derive(Debug, Default)]
struct MemoryState {
    last_client_id: i32,
    last_address_id: i32,
    last_city_id: i32,
    last_order_id: i32,
    clients: BTreeMap<ClientId, Client>,
    cities: HashMap<CityId, String>,
    orders: HashMap<OrderId, ClientId>,
}

impl MemoryState {
    fn next_client_id(&mut self) -> ClientId {
        self.last_client_id += 1;
        ClientId::new(self.last_client_id)
    }

    fn next_address_id(&mut self) -> AddressId {
        self.last_address_id += 1;
        AddressId::new(self.last_address_id)
    }

    fn email_taken(&self, email: &Email, except: Option<ClientId>) -> bool {
        self.clients
            .values()
            .any(|c| &c.email == email && c.id != except)
    }

    /// Copy of a stored client with city names filled in.
    fn resolve(&self, client: &Client) -> Client {
        let mut client = client.clone();
        for address in &mut client.addresses {
            address.city.name = self.cities.get(&address.city.id).cloned();
        }
        client
    }
}

/// Client store that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryClientStore {
    state: Mutex<MemoryState>,
}

impl MemoryClientStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> Result<R, RepositoryError>,
    ) -> Result<R, RepositoryError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| RepositoryError::DataCorruption("memory store lock poisoned".into()))?;
        f(&mut state)
    }

    /// Register a city so addresses can reference it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the store lock is poisoned.
    pub fn add_city(&self, name: &str) -> Result<City, RepositoryError> {
        self.with_state(|state| {
            state.last_city_id += 1;
            let id = CityId::new(state.last_city_id);
            state.cities.insert(id, name.to_owned());
            Ok(City {
                id,
                name: Some(name.to_owned()),
            })
        })
    }

    /// Record an order placed by `client_id`, pinning that client.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::IntegrityViolation` if the client does not exist.
    pub fn add_order(&self, client_id: ClientId) -> Result<OrderId, RepositoryError> {
        self.with_state(|state| {
            if !state.clients.contains_key(&client_id) {
                return Err(RepositoryError::IntegrityViolation(format!(
                    "order references missing client {client_id}"
                )));
            }
            state.last_order_id += 1;
            let id = OrderId::new(state.last_order_id);
            state.orders.insert(id, client_id);
            Ok(id)
        })
    }

    /// Number of stored clients.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the store lock is poisoned.
    pub fn client_count(&self) -> Result<usize, RepositoryError> {
        self.with_state(|state| Ok(state.clients.len()))
    }
}

fn compare(a: &Client, b: &Client, field: ClientSortField) -> std::cmp::Ordering {
    match field {
        ClientSortField::Id => a.id.cmp(&b.id),
        ClientSortField::Name => a.name.cmp(&b.name),
        ClientSortField::Email => a.email.cmp(&b.email),
        ClientSortField::TaxId => a.tax_id.cmp(&b.tax_id),
        ClientSortField::ClientType => a
            .client_type
            .map(|t| t.code())
            .cmp(&b.client_type.map(|t| t.code())),
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        self.with_state(|state| Ok(state.clients.get(&id).map(|c| state.resolve(c))))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Client>, RepositoryError> {
        self.with_state(|state| {
            Ok(state
                .clients
                .values()
                .find(|c| &c.email == email)
                .map(|c| state.resolve(c)))
        })
    }

    async fn find_all(&self) -> Result<Vec<Client>, RepositoryError> {
        self.with_state(|state| Ok(state.clients.values().map(|c| state.resolve(c)).collect()))
    }

    async fn find_page(
        &self,
        request: &PageRequest<ClientSortField>,
    ) -> Result<Page<Client>, RepositoryError> {
        self.with_state(|state| {
            let mut all: Vec<&Client> = state.clients.values().collect();
            all.sort_by(|a, b| {
                let ordering = compare(a, b, request.sort);
                let ordering = match request.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                };
                ordering.then_with(|| a.id.cmp(&b.id))
            });

            let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
            let take = usize::try_from(request.page_size).unwrap_or(usize::MAX);
            let content = all
                .into_iter()
                .skip(skip)
                .take(take)
                .map(|c| state.resolve(c))
                .collect();

            Ok(Page::new(content, request, state.clients.len() as u64))
        })
    }

    async fn save(&self, client: &Client) -> Result<Client, RepositoryError> {
        self.with_state(|state| {
            let id = match client.id {
                None => {
                    if state.email_taken(&client.email, None) {
                        return Err(RepositoryError::Conflict("client_email_key".into()));
                    }
                    state.next_client_id()
                }
                Some(id) => {
                    if !state.clients.contains_key(&id) {
                        return Err(RepositoryError::NotFound);
                    }
                    if state.email_taken(&client.email, Some(id)) {
                        return Err(RepositoryError::Conflict("client_email_key".into()));
                    }
                    id
                }
            };

            let mut stored = client.clone();
            stored.id = Some(id);
            stored.addresses = state
                .clients
                .get(&id)
                .map(|c| c.addresses.clone())
                .unwrap_or_default();
            state.clients.insert(id, stored);
            debug!(id = %id, "Saved client in memory");

            let mut saved = client.clone();
            saved.id = Some(id);
            Ok(saved)
        })
    }

    async fn delete_by_id(&self, id: ClientId) -> Result<(), RepositoryError> {
        self.with_state(|state| {
            if !state.clients.contains_key(&id) {
                return Err(RepositoryError::NotFound);
            }
            if state.orders.values().any(|owner| *owner == id) {
                return Err(RepositoryError::IntegrityViolation(format!(
                    "client {id} is still referenced from table \"customer_order\""
                )));
            }
            state.clients.remove(&id);
            Ok(())
        })
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn ClientUnitOfWork + 'a>, RepositoryError> {
        Ok(Box::new(MemoryUnitOfWork {
            store: self,
            staged: BTreeMap::new(),
            new_addresses: BTreeMap::new(),
            preexisting: BTreeSet::new(),
        }))
    }
}

/// Writes staged against a [`MemoryClientStore`], applied on commit.
///
/// Commit re-checks the store's rules against whatever other writers
/// committed in the meantime: a staged email must still be free, and a client
/// that existed when the unit of work touched it must still exist.
struct MemoryUnitOfWork<'a> {
    store: &'a MemoryClientStore,
    /// Client rows written through `save`.
    staged: BTreeMap<ClientId, Client>,
    /// Addresses added through `save_addresses`, by owner.
    new_addresses: BTreeMap<ClientId, Vec<Address>>,
    /// Clients that were already committed when first touched.
    preexisting: BTreeSet<ClientId>,
}

#[async_trait]
impl ClientUnitOfWork for MemoryUnitOfWork<'_> {
    async fn save(&mut self, client: &Client) -> Result<Client, RepositoryError> {
        let staged = &mut self.staged;
        let preexisting = &mut self.preexisting;
        self.store.with_state(|state| {
            let taken_by_staged = |except: Option<ClientId>| {
                staged
                    .values()
                    .any(|c| c.email == client.email && c.id != except)
            };

            let id = match client.id {
                None => {
                    if state.email_taken(&client.email, None) || taken_by_staged(None) {
                        return Err(RepositoryError::Conflict("client_email_key".into()));
                    }
                    state.next_client_id()
                }
                Some(id) => {
                    if !staged.contains_key(&id) {
                        if !state.clients.contains_key(&id) {
                            return Err(RepositoryError::NotFound);
                        }
                        preexisting.insert(id);
                    }
                    if state.email_taken(&client.email, Some(id)) || taken_by_staged(Some(id)) {
                        return Err(RepositoryError::Conflict("client_email_key".into()));
                    }
                    id
                }
            };

            let mut stored = client.clone();
            stored.id = Some(id);
            stored.addresses = Vec::new();
            staged.insert(id, stored);

            let mut saved = client.clone();
            saved.id = Some(id);
            Ok(saved)
        })
    }

    async fn save_addresses(
        &mut self,
        client_id: ClientId,
        addresses: &[Address],
    ) -> Result<Vec<Address>, RepositoryError> {
        let staged = &self.staged;
        let new_addresses = &mut self.new_addresses;
        let preexisting = &mut self.preexisting;
        self.store.with_state(|state| {
            if !staged.contains_key(&client_id) {
                if !state.clients.contains_key(&client_id) {
                    return Err(RepositoryError::IntegrityViolation(format!(
                        "address references missing client {client_id}"
                    )));
                }
                preexisting.insert(client_id);
            }

            let mut saved = Vec::with_capacity(addresses.len());
            for address in addresses {
                let city_name = state.cities.get(&address.city.id).cloned().ok_or_else(|| {
                    RepositoryError::IntegrityViolation(format!(
                        "address references missing city {}",
                        address.city.id
                    ))
                })?;

                let mut stored = address.clone();
                stored.id = Some(state.next_address_id());
                stored.client_id = Some(client_id);
                stored.city.name = Some(city_name);
                saved.push(stored);
            }

            new_addresses
                .entry(client_id)
                .or_default()
                .extend(saved.iter().cloned());
            Ok(saved)
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self {
            store,
            staged,
            new_addresses,
            preexisting,
        } = *self;
        store.with_state(|state| {
            for id in &preexisting {
                if !state.clients.contains_key(id) {
                    return Err(RepositoryError::IntegrityViolation(format!(
                        "client {id} was deleted before commit"
                    )));
                }
            }
            for (id, client) in &staged {
                if state.email_taken(&client.email, Some(*id)) {
                    return Err(RepositoryError::Conflict("client_email_key".into()));
                }
            }

            debug!(
                clients = staged.len(),
                address_owners = new_addresses.len(),
                "Committing memory unit of work"
            );
            for (id, mut client) in staged {
                client.addresses = state
                    .clients
                    .get(&id)
                    .map(|c| c.addresses.clone())
                    .unwrap_or_default();
                state.clients.insert(id, client);
            }
            for (id, addresses) in new_addresses {
                if let Some(owner) = state.clients.get_mut(&id) {
                    owner.addresses.extend(addresses);
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(name: &str, email: &str) -> Client {
        Client::new(None, name.to_owned(), Email::parse(email).unwrap())
    }

    fn address(city: &City) -> Address {
        Address {
            id: None,
            street: "Rua Flores".into(),
            number: "300".into(),
            complement: None,
            neighborhood: "Jardim".into(),
            postal_code: "38220834".into(),
            client_id: None,
            city: City::reference(city.id),
        }
    }

    #[tokio::test]
    async fn test_save_assigns_sequential_ids() {
        let store = MemoryClientStore::new();
        let a = store.save(&client("Maria Silva", "maria@gmail.com")).await.unwrap();
        let b = store.save(&client("Ana Costa", "ana@gmail.com")).await.unwrap();
        assert_eq!(a.id, Some(ClientId::new(1)));
        assert_eq!(b.id, Some(ClientId::new(2)));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryClientStore::new();
        store.save(&client("Maria Silva", "maria@gmail.com")).await.unwrap();
        let err = store
            .save(&client("Maria Souza", "maria@gmail.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_uncommitted_unit_of_work_is_discarded() {
        let store = MemoryClientStore::new();
        {
            let mut uow = store.begin().await.unwrap();
            uow.save(&client("Maria Silva", "maria@gmail.com")).await.unwrap();
        }
        assert_eq!(store.client_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_applies_client_and_addresses() {
        let store = MemoryClientStore::new();
        let city = store.add_city("Uberlândia").unwrap();

        let mut uow = store.begin().await.unwrap();
        let saved = uow.save(&client("Maria Silva", "maria@gmail.com")).await.unwrap();
        let id = saved.id.unwrap();
        let addresses = uow.save_addresses(id, &[address(&city)]).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(addresses[0].client_id, Some(id));
        let found = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.addresses.len(), 1);
        assert_eq!(found.addresses[0].city.name.as_deref(), Some("Uberlândia"));
    }

    #[tokio::test]
    async fn test_address_with_unknown_city_is_integrity_violation() {
        let store = MemoryClientStore::new();
        let mut uow = store.begin().await.unwrap();
        let saved = uow.save(&client("Maria Silva", "maria@gmail.com")).await.unwrap();
        let missing = City::reference(CityId::new(99));
        let err = uow
            .save_addresses(saved.id.unwrap(), &[address(&missing)])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::IntegrityViolation(_)));
    }

    #[tokio::test]
    async fn test_interleaved_units_of_work_cannot_share_email() {
        let store = MemoryClientStore::new();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.save(&client("Maria Silva", "maria@gmail.com")).await.unwrap();
        second.save(&client("Maria Souza", "maria@gmail.com")).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref key) if key == "client_email_key"));

        let email = Email::parse("maria@gmail.com").unwrap();
        let found = store.find_by_email(&email).await.unwrap().unwrap();
        assert_eq!(found.name, "Maria Silva");
        assert_eq!(store.client_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_commit_after_delete_does_not_restore_client() {
        let store = MemoryClientStore::new();
        let city = store.add_city("Uberlândia").unwrap();
        let id = store
            .save(&client("Maria Silva", "maria@gmail.com"))
            .await
            .unwrap()
            .id
            .unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.save_addresses(id, &[address(&city)]).await.unwrap();
        store.delete_by_id(id).await.unwrap();

        let err = uow.commit().await.unwrap_err();
        assert!(matches!(err, RepositoryError::IntegrityViolation(_)));
        assert!(store.find_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_keeps_concurrent_update() {
        let store = MemoryClientStore::new();
        let city = store.add_city("Uberlândia").unwrap();
        let saved = store
            .save(&client("Maria Silva", "maria@gmail.com"))
            .await
            .unwrap();
        let id = saved.id.unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.save_addresses(id, &[address(&city)]).await.unwrap();

        let mut renamed = saved.clone();
        renamed.name = "Maria Souza".into();
        store.save(&renamed).await.unwrap();
        uow.commit().await.unwrap();

        let found = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.name, "Maria Souza");
        assert_eq!(found.addresses.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_blocked_by_order() {
        let store = MemoryClientStore::new();
        let saved = store.save(&client("Maria Silva", "maria@gmail.com")).await.unwrap();
        let id = saved.id.unwrap();
        store.add_order(id).unwrap();

        let err = store.delete_by_id(id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::IntegrityViolation(_)));
        assert!(store.find_by_id(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = MemoryClientStore::new();
        let err = store.delete_by_id(ClientId::new(5)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_find_page_sorts_and_slices() {
        let store = MemoryClientStore::new();
        for (name, email) in [
            ("Carla Dias", "carla@gmail.com"),
            ("Ana Costa", "ana@gmail.com"),
            ("Bruno Lima", "bruno@gmail.com"),
        ] {
            store.save(&client(name, email)).await.unwrap();
        }

        let request = PageRequest {
            page_index: 0,
            page_size: 2,
            direction: SortDirection::Descending,
            sort: ClientSortField::Name,
        };
        let page = store.find_page(&request).await.unwrap();
        let names: Vec<_> = page.content.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Carla Dias", "Bruno Lima"]);
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages(), 2);
    }
}
