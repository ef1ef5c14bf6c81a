//! `PostgreSQL` client store.
//!
//! Queries are built at runtime with `sqlx::query_as`, so the crate compiles
//! without a live database. The sort column in paged queries comes from
//! [`ClientSortField::column`], never from caller input.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use storedesk_core::{AddressId, CityId, ClientId, ClientType, Email, Page, PageRequest};

use super::{ClientStore, ClientUnitOfWork, RepositoryError};
use crate::models::{Address, City, Client, ClientSortField, HashedPassword};

const CLIENT_COLUMNS: &str = "id, name, email, tax_id, client_type, password_hash";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `client` queries.
#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    id: i32,
    name: String,
    email: String,
    tax_id: Option<String>,
    client_type: Option<i32>,
    password_hash: Option<String>,
}

impl TryFrom<ClientRow> for Client {
    type Error = RepositoryError;

    fn try_from(row: ClientRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let client_type = row
            .client_type
            .map(ClientType::from_code)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: Some(ClientId::new(row.id)),
            name: row.name,
            email,
            tax_id: row.tax_id,
            client_type,
            password: row.password_hash.map(HashedPassword::from_digest),
            phones: Vec::new(),
            addresses: Vec::new(),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PhoneRow {
    client_id: i32,
    phone: String,
}

/// Address joined with its city name.
#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i32,
    street: String,
    number: String,
    complement: Option<String>,
    neighborhood: String,
    postal_code: String,
    client_id: i32,
    city_id: i32,
    city_name: String,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: Some(AddressId::new(row.id)),
            street: row.street,
            number: row.number,
            complement: row.complement,
            neighborhood: row.neighborhood,
            postal_code: row.postal_code,
            client_id: Some(ClientId::new(row.client_id)),
            city: City {
                id: CityId::new(row.city_id),
                name: Some(row.city_name),
            },
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Client store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgClientStore {
    pool: PgPool,
}

impl PgClientStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach phones and addresses to freshly loaded client rows.
    async fn hydrate(&self, rows: Vec<ClientRow>) -> Result<Vec<Client>, RepositoryError> {
        let mut clients = rows
            .into_iter()
            .map(Client::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        if clients.is_empty() {
            return Ok(clients);
        }

        let ids: Vec<i32> = clients
            .iter()
            .filter_map(|c| c.id.map(i32::from))
            .collect();

        let phones = sqlx::query_as::<_, PhoneRow>(
            r"
            SELECT client_id, phone
            FROM client_phone
            WHERE client_id = ANY($1)
            ORDER BY client_id, position
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let addresses = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT a.id, a.street, a.number, a.complement, a.neighborhood,
                   a.postal_code, a.client_id, a.city_id, c.name AS city_name
            FROM address a
            JOIN city c ON c.id = a.city_id
            WHERE a.client_id = ANY($1)
            ORDER BY a.id
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut phones_by_client: HashMap<i32, Vec<String>> = HashMap::new();
        for row in phones {
            phones_by_client.entry(row.client_id).or_default().push(row.phone);
        }
        let mut addresses_by_client: HashMap<i32, Vec<Address>> = HashMap::new();
        for row in addresses {
            addresses_by_client
                .entry(row.client_id)
                .or_default()
                .push(row.into());
        }

        for client in &mut clients {
            if let Some(id) = client.id.map(i32::from) {
                client.phones = phones_by_client.remove(&id).unwrap_or_default();
                client.addresses = addresses_by_client.remove(&id).unwrap_or_default();
            }
        }

        Ok(clients)
    }

    async fn find_one(&self, rows: Vec<ClientRow>) -> Result<Option<Client>, RepositoryError> {
        Ok(self.hydrate(rows).await?.into_iter().next())
    }
}

#[async_trait]
impl ClientStore for PgClientStore {
    #[instrument(skip(self), fields(id = %id))]
    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        let rows = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        self.find_one(rows).await
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &Email) -> Result<Option<Client>, RepositoryError> {
        let rows = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_all(&self.pool)
        .await?;

        self.find_one(rows).await
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Client>, RepositoryError> {
        let rows = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let clients = self.hydrate(rows).await?;
        debug!(count = clients.len(), "Loaded all clients");
        Ok(clients)
    }

    #[instrument(skip(self))]
    async fn find_page(
        &self,
        request: &PageRequest<ClientSortField>,
    ) -> Result<Page<Client>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM client")
            .fetch_one(&self.pool)
            .await?;

        // Tie-break on id so pages are stable for non-unique sort columns.
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM client ORDER BY {} {}, id LIMIT $1 OFFSET $2",
            request.sort.column(),
            request.direction.as_sql(),
        );
        let offset = i64::try_from(request.offset())
            .map_err(|_| RepositoryError::DataCorruption("page offset out of range".into()))?;
        let rows = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(i64::from(request.page_size))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let content = self.hydrate(rows).await?;
        debug!(count = content.len(), total, "Loaded client page");
        Ok(Page::new(
            content,
            request,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    #[instrument(skip(self, client), fields(id = ?client.id))]
    async fn save(&self, client: &Client) -> Result<Client, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let saved = save_client(&mut tx, client).await?;
        tx.commit().await?;
        Ok(saved)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_by_id(&self, id: ClientId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM client WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from_write)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        debug!("Deleted client");
        Ok(())
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn ClientUnitOfWork + 'a>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

// =============================================================================
// Unit of Work
// =============================================================================

/// A `PostgreSQL` transaction. sqlx rolls it back if dropped uncommitted.
struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ClientUnitOfWork for PgUnitOfWork {
    async fn save(&mut self, client: &Client) -> Result<Client, RepositoryError> {
        save_client(&mut self.tx, client).await
    }

    async fn save_addresses(
        &mut self,
        client_id: ClientId,
        addresses: &[Address],
    ) -> Result<Vec<Address>, RepositoryError> {
        let mut saved = Vec::with_capacity(addresses.len());
        for address in addresses {
            let row = sqlx::query_as::<_, AddressRow>(
                r"
                WITH inserted AS (
                    INSERT INTO address
                        (street, number, complement, neighborhood, postal_code, client_id, city_id)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING *
                )
                SELECT i.id, i.street, i.number, i.complement, i.neighborhood,
                       i.postal_code, i.client_id, i.city_id, c.name AS city_name
                FROM inserted i
                JOIN city c ON c.id = i.city_id
                ",
            )
            .bind(&address.street)
            .bind(&address.number)
            .bind(address.complement.as_deref())
            .bind(&address.neighborhood)
            .bind(&address.postal_code)
            .bind(client_id.as_i32())
            .bind(address.city.id.as_i32())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_write)?;
            saved.push(row.into());
        }

        debug!(client_id = %client_id, count = saved.len(), "Inserted addresses");
        Ok(saved)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Shared write helpers
// =============================================================================

/// Insert or update the client row and rewrite its phone list.
///
/// Addresses on `client` are carried over to the result untouched.
async fn save_client(conn: &mut PgConnection, client: &Client) -> Result<Client, RepositoryError> {
    let row = match client.id {
        None => {
            sqlx::query_as::<_, ClientRow>(&format!(
                r"
                INSERT INTO client (name, email, tax_id, client_type, password_hash)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {CLIENT_COLUMNS}
                "
            ))
            .bind(&client.name)
            .bind(client.email.as_str())
            .bind(client.tax_id.as_deref())
            .bind(client.client_type.map(ClientType::code))
            .bind(client.password.as_ref().map(HashedPassword::as_str))
            .fetch_one(&mut *conn)
            .await
            .map_err(RepositoryError::from_write)?
        }
        Some(id) => {
            sqlx::query_as::<_, ClientRow>(&format!(
                r"
                UPDATE client
                SET name = $1, email = $2, tax_id = $3, client_type = $4, password_hash = $5
                WHERE id = $6
                RETURNING {CLIENT_COLUMNS}
                "
            ))
            .bind(&client.name)
            .bind(client.email.as_str())
            .bind(client.tax_id.as_deref())
            .bind(client.client_type.map(ClientType::code))
            .bind(client.password.as_ref().map(HashedPassword::as_str))
            .bind(id.as_i32())
            .fetch_optional(&mut *conn)
            .await
            .map_err(RepositoryError::from_write)?
            .ok_or(RepositoryError::NotFound)?
        }
    };

    let id = row.id;
    sqlx::query("DELETE FROM client_phone WHERE client_id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        r"
        INSERT INTO client_phone (client_id, position, phone)
        SELECT $1, (t.ord - 1)::int, t.phone
        FROM UNNEST($2::text[]) WITH ORDINALITY AS t(phone, ord)
        ",
    )
    .bind(id)
    .bind(&client.phones)
    .execute(&mut *conn)
    .await?;

    let mut saved = Client::try_from(row)?;
    saved.phones.clone_from(&client.phones);
    saved.addresses.clone_from(&client.addresses);
    debug!(id, "Saved client");
    Ok(saved)
}
