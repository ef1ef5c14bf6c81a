//! Client service over `PgClientStore`.
//!
//! These tests require a running `PostgreSQL` database reachable through
//! `TEST_DATABASE_URL` (or `ADMIN_DATABASE_URL`). Migrations are applied on
//! connect.
//!
//! Run with: `cargo test -p storedesk-integration-tests -- --include-ignored`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sqlx::PgPool;

use storedesk_admin::db::{CityRepository, PgClientStore};
use storedesk_admin::error::ServiceError;
use storedesk_admin::models::Client;
use storedesk_admin::services::{Argon2Hasher, AuthService, ClientService};
use storedesk_core::{ClientId, Credentials};
use storedesk_integration_tests::{create_dto, fast_hasher, pg_pool, unique_email};

type PgService = ClientService<PgClientStore, Argon2Hasher>;

async fn setup() -> (PgPool, PgService) {
    let pool = pg_pool().await;
    let service = ClientService::new(PgClientStore::new(pool.clone()), fast_hasher());
    (pool, service)
}

async fn register(pool: &PgPool, service: &PgService, email: &str) -> Client {
    let city = CityRepository::new(pool)
        .ensure("Uberlândia")
        .await
        .expect("ensure city");
    let client = service
        .from_create_dto(create_dto("Maria Silva", email, city.id.as_i32()))
        .expect("valid dto");
    service.insert(client).await.expect("insert client")
}

async fn place_order(pool: &PgPool, client_id: ClientId) {
    sqlx::query("INSERT INTO customer_order (client_id) VALUES ($1)")
        .bind(client_id.as_i32())
        .execute(pool)
        .await
        .expect("insert order");
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_insert_and_find_roundtrip() {
    let (pool, service) = setup().await;
    let email = unique_email("roundtrip");
    let saved = register(&pool, &service, &email).await;
    let id = saved.id.expect("id assigned");

    let found = service.find(id).await.unwrap();
    assert_eq!(found.email.as_str(), email);
    assert_eq!(found.phones, vec!["111", "333"]);
    assert_eq!(found.addresses.len(), 1);
    assert_eq!(found.addresses[0].client_id, Some(id));
    assert_eq!(found.addresses[0].city.name.as_deref(), Some("Uberlândia"));
    assert!(found.password.is_some());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_insert_with_unknown_city_rolls_back() {
    let (_pool, service) = setup().await;
    let email = unique_email("rollback");
    let client = service
        .from_create_dto(create_dto("Maria Silva", &email, i32::MAX))
        .unwrap();

    assert!(service.insert(client).await.is_err());

    let err = service
        .find_by_email(&email.parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_update_keeps_phones_and_addresses() {
    let (pool, service) = setup().await;
    let saved = register(&pool, &service, &unique_email("update")).await;
    let id = saved.id.unwrap();

    let new_email = unique_email("updated");
    let mut change = Client::new(Some(id), "Maria Souza".into(), new_email.parse().unwrap());
    change.phones.clear();
    service.update(change).await.unwrap();

    let found = service.find(id).await.unwrap();
    assert_eq!(found.name, "Maria Souza");
    assert_eq!(found.email.as_str(), new_email);
    assert_eq!(found.phones, saved.phones);
    assert_eq!(found.addresses.len(), 1);
    assert_eq!(found.password, saved.password);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_delete_with_and_without_orders() {
    let (pool, service) = setup().await;
    let free = register(&pool, &service, &unique_email("free")).await.id.unwrap();
    let pinned = register(&pool, &service, &unique_email("pinned")).await.id.unwrap();
    place_order(&pool, pinned).await;

    service.delete(free).await.unwrap();
    assert!(matches!(
        service.find(free).await.unwrap_err(),
        ServiceError::NotFound { .. }
    ));

    let err = service.delete(pinned).await.unwrap_err();
    assert!(matches!(err, ServiceError::IntegrityConflict(_)));
    assert!(service.find(pinned).await.is_ok());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_find_page_sorted_by_id_descending() {
    let (pool, service) = setup().await;
    register(&pool, &service, &unique_email("page-a")).await;
    register(&pool, &service, &unique_email("page-b")).await;

    let page = service.find_page(0, 5, "DESC", "id").await.unwrap();
    assert!(page.content.len() <= 5);
    assert!(page.total_elements >= 2);
    let ids: Vec<_> = page.content.iter().map(|c| c.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(ids, sorted);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_authenticate_against_stored_hash() {
    let (pool, service) = setup().await;
    let email = unique_email("login");
    register(&pool, &service, &email).await;

    let auth = AuthService::new(service.store(), service.hasher());
    assert!(
        auth.authenticate(&Credentials::new(email.clone(), "123"))
            .await
            .is_ok()
    );
    assert!(matches!(
        auth.authenticate(&Credentials::new(email, "nope"))
            .await
            .unwrap_err(),
        ServiceError::InvalidCredentials
    ));
}
