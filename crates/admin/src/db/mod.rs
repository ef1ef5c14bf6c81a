//! Persistence for clients, addresses and cities.
//!
//! # Tables
//!
//! - `city` - Cities referenced by addresses
//! - `client` - Clients (unique email)
//! - `client_phone` - Ordered phone numbers, deleted with the client
//! - `address` - Client addresses, deleted with the client
//! - `customer_order` - Orders; block deletion of the client they belong to
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p storedesk-cli -- migrate
//! ```
//!
//! # Stores
//!
//! Services talk to the [`ClientStore`] trait. [`PgClientStore`] is the
//! production implementation; [`MemoryClientStore`] keeps everything in
//! process and is used by tests and local tooling.

pub mod cities;
pub mod clients;
pub mod memory;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use storedesk_core::{ClientId, Email, Page, PageRequest};

use crate::config::DatabaseConfig;
use crate::models::{Address, Client, ClientSortField};

pub use cities::CityRepository;
pub use clients::PgClientStore;
pub use memory::MemoryClientStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A write or delete would break a foreign key.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
}

impl RepositoryError {
    /// Classify a sqlx error, picking out constraint violations.
    pub(crate) fn from_write(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(
                    db_err
                        .constraint()
                        .map_or_else(|| db_err.message().to_owned(), str::to_owned),
                );
            }
            if db_err.is_foreign_key_violation() {
                return Self::IntegrityViolation(db_err.message().to_owned());
            }
        }
        Self::Database(e)
    }
}

/// Persistence gateway for the client aggregate.
///
/// `save` is an upsert: a client without an id is inserted and comes back
/// with a store-assigned id; a client with an id overwrites the stored row
/// and its phone list. Addresses are written separately through a
/// [`ClientUnitOfWork`].
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Look a client up by id, addresses and city names resolved.
    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError>;

    /// Look a client up by login email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<Client>, RepositoryError>;

    /// Every client, in store order.
    async fn find_all(&self) -> Result<Vec<Client>, RepositoryError>;

    /// One sorted page of clients.
    async fn find_page(
        &self,
        request: &PageRequest<ClientSortField>,
    ) -> Result<Page<Client>, RepositoryError>;

    /// Insert or update a client outside of any unit of work.
    async fn save(&self, client: &Client) -> Result<Client, RepositoryError>;

    /// Delete a client with its phones and addresses.
    ///
    /// Fails with `IntegrityViolation` when other records still reference it.
    async fn delete_by_id(&self, id: ClientId) -> Result<(), RepositoryError>;

    /// Open a unit of work. Nothing written through it is visible until
    /// [`ClientUnitOfWork::commit`]; dropping it uncommitted rolls back.
    async fn begin<'a>(&'a self) -> Result<Box<dyn ClientUnitOfWork + 'a>, RepositoryError>;
}

/// Scoped transaction handle returned by [`ClientStore::begin`].
#[async_trait]
pub trait ClientUnitOfWork: Send {
    /// Insert or update a client inside this unit of work.
    async fn save(&mut self, client: &Client) -> Result<Client, RepositoryError>;

    /// Insert addresses for `client_id`, returning them with ids assigned.
    async fn save_addresses(
        &mut self,
        client_id: ClientId,
        addresses: &[Address],
    ) -> Result<Vec<Address>, RepositoryError>;

    /// Make every write in this unit of work durable.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool from configuration.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(config.url.expose_secret())
        .await
}
