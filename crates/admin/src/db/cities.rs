//! City repository for database operations.

use sqlx::PgPool;
use tracing::debug;

use storedesk_core::CityId;

use super::RepositoryError;
use crate::models::City;

#[derive(Debug, sqlx::FromRow)]
struct CityRow {
    id: i32,
    name: String,
}

impl From<CityRow> for City {
    fn from(row: CityRow) -> Self {
        Self {
            id: CityId::new(row.id),
            name: Some(row.name),
        }
    }
}

/// Repository for city reference data.
pub struct CityRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CityRepository<'a> {
    /// Create a new city repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all cities ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<City>, RepositoryError> {
        let rows = sqlx::query_as::<_, CityRow>("SELECT id, name FROM city ORDER BY name, id")
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a city unless one with the same name already exists.
    ///
    /// Returns the existing or newly created city.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure(&self, name: &str) -> Result<City, RepositoryError> {
        let existing = sqlx::query_as::<_, CityRow>("SELECT id, name FROM city WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;
        if let Some(row) = existing {
            return Ok(row.into());
        }

        let row = sqlx::query_as::<_, CityRow>(
            "INSERT INTO city (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        debug!(id = row.id, name, "Inserted city");
        Ok(row.into())
    }
}
