//! Integration tests for Storedesk.
//!
//! # Running Tests
//!
//! ```bash
//! # Service tests against the in-memory store
//! cargo test -p storedesk-integration-tests
//!
//! # Include the PostgreSQL tests
//! TEST_DATABASE_URL=postgres://localhost/storedesk_test \
//!     cargo test -p storedesk-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `client_service` - Client and auth services over `MemoryClientStore`
//! - `postgres_clients` - The same flows over `PgClientStore` (ignored by default)
//!
//! This crate only holds shared fixtures.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::PgPool;

use storedesk_admin::config::HashingConfig;
use storedesk_admin::db::MemoryClientStore;
use storedesk_admin::dto::ClientCreateDto;
use storedesk_admin::services::{Argon2Hasher, ClientService};

/// Client service over the in-memory store.
pub type MemoryService = ClientService<MemoryClientStore, Argon2Hasher>;

/// Argon2 with minimal cost so tests stay fast.
#[must_use]
pub fn fast_hasher() -> Argon2Hasher {
    Argon2Hasher::with_config(&HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("valid argon2 parameters")
}

/// A fresh client service with an empty memory store.
#[must_use]
pub fn memory_service() -> MemoryService {
    ClientService::new(MemoryClientStore::new(), fast_hasher())
}

/// A valid registration payload.
///
/// phone2 is absent and phone3 is set, so the resulting client has two phones.
#[must_use]
pub fn create_dto(name: &str, email: &str, city_id: i32) -> ClientCreateDto {
    serde_json::from_value(serde_json::json!({
        "name": name,
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
    .expect("valid create payload")
}

/// An email address no other test run has used.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{nanos}-{n}@example.com")
}

/// Connect to the test database and apply migrations.
///
/// Reads `TEST_DATABASE_URL`, falling back to `ADMIN_DATABASE_URL`.
pub async fn pg_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("ADMIN_DATABASE_URL"))
        .expect("TEST_DATABASE_URL or ADMIN_DATABASE_URL must be set");

    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("../admin/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
