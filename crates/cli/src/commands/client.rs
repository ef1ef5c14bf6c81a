//! Client administration commands.
//!
//! # Usage
//!
//! ```bash
//! sd-cli client show 1
//! sd-cli client list
//! sd-cli client page --size 10 --direction DESC --order-by email
//! sd-cli client create new-client.json
//! sd-cli client update 1 -n "Maria Souza" -e souza@gmail.com
//! sd-cli client delete 1
//! echo 's3cret' | sd-cli client login -e maria@gmail.com
//! ```
//!
//! Results are printed to standard output as JSON. Password hashes are never
//! printed.

use secrecy::SecretString;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use storedesk_admin::config::AdminConfig;
use storedesk_admin::db::{self, PgClientStore};
use storedesk_admin::dto::{ClientCreateDto, ClientReadDto};
use storedesk_admin::services::{Argon2Hasher, AuthService, ClientService};
use storedesk_core::{ClientId, Credentials};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Client service wired to `PostgreSQL` and Argon2.
pub struct ClientCommands {
    service: ClientService<PgClientStore, Argon2Hasher>,
}

impl ClientCommands {
    /// Connect to the database and build the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or the hashing
    /// parameters are invalid.
    pub async fn connect(config: &AdminConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = db::create_pool(&config.database).await?;
        let hasher = Argon2Hasher::with_config(&config.hashing)?;
        Ok(Self {
            service: ClientService::new(PgClientStore::new(pool), hasher),
        })
    }

    /// Print one client.
    pub async fn show(&self, id: i32) -> CommandResult {
        let client = self.service.find(ClientId::new(id)).await?;
        print_json(&client)
    }

    /// Print every client as read DTOs.
    pub async fn list(&self) -> CommandResult {
        let clients = self.service.find_all().await?;
        let dtos: Vec<ClientReadDto> = clients.iter().map(ClientReadDto::from).collect();
        print_json(&dtos)
    }

    /// Print one page of clients as read DTOs.
    pub async fn page(&self, page: u32, size: u32, direction: &str, order_by: &str) -> CommandResult {
        let page = self
            .service
            .find_page(page, size, direction, order_by)
            .await?
            .map(|client| ClientReadDto::from(&client));
        print_json(&page)
    }

    /// Register a client from a JSON file holding a `ClientCreateDto`.
    pub async fn create(&self, file_path: &str) -> CommandResult {
        let content = tokio::fs::read_to_string(file_path).await?;
        let dto: ClientCreateDto = serde_json::from_str(&content)?;

        let client = self.service.from_create_dto(dto)?;
        let saved = self.service.insert(client).await?;

        info!(id = ?saved.id, "Client created");
        print_json(&saved)
    }

    /// Change a client's name and email.
    pub async fn update(&self, id: i32, name: String, email: String) -> CommandResult {
        let client = self.service.from_read_dto(ClientReadDto {
            id: Some(ClientId::new(id)),
            name,
            email,
        })?;
        let saved = self.service.update(client).await?;

        info!(id, "Client updated");
        print_json(&ClientReadDto::from(&saved))
    }

    /// Delete a client.
    pub async fn delete(&self, id: i32) -> CommandResult {
        self.service.delete(ClientId::new(id)).await?;
        info!(id, "Client deleted");
        Ok(())
    }

    /// Check a password read from standard input against the stored hash.
    pub async fn login(&self, email: String) -> CommandResult {
        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;
        let password = SecretString::from(line.trim_end_matches(['\r', '\n']).to_owned());

        let credentials = Credentials { email, password };
        let auth = AuthService::new(self.service.store(), self.service.hasher());
        let client = auth.authenticate(&credentials).await?;

        info!(id = ?client.id, "Credentials accepted");
        print_json(&ClientReadDto::from(&client))
    }
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
