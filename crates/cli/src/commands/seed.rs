//! Seed reference data.
//!
//! Cities are read from a YAML file of the form:
//!
//! ```yaml
//! cities:
//!   - Uberlândia
//!   - São Paulo
//! ```
//!
//! Cities that already exist (by name) are left alone, so the command can be
//! re-run safely.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use storedesk_admin::config::AdminConfig;
use storedesk_admin::db::{self, CityRepository, RepositoryError};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Contents of a city seed file.
#[derive(Debug, Deserialize)]
pub struct CitySeed {
    pub cities: Vec<String>,
}

impl CitySeed {
    /// Problems with the file, one message each.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (index, name) in self.cities.iter().enumerate() {
            if name.trim().is_empty() {
                errors.push(format!("entry {index} is blank"));
            } else if self
                .cities
                .iter()
                .take(index)
                .any(|other| other.trim() == name.trim())
            {
                errors.push(format!("entry {index} duplicates \"{}\"", name.trim()));
            }
        }
        errors
    }
}

/// Insert every city from `file_path` that is not stored yet.
///
/// # Errors
///
/// Returns `SeedError` if the file is missing or invalid, or if a database
/// operation fails.
pub async fn cities(config: &AdminConfig, file_path: &str) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading cities from file");

    // Read and validate before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CitySeed = serde_yaml::from_str(&content)?;

    let errors = seed.validate();
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let pool = db::create_pool(&config.database).await?;
    info!("Connected to database");

    let repo = CityRepository::new(&pool);
    let before = repo.list_all().await?.len();
    for name in &seed.cities {
        let city = repo.ensure(name.trim()).await?;
        info!(id = %city.id, name = %name.trim(), "City ready");
    }
    let after = repo.list_all().await?.len();

    info!("Seeding complete!");
    info!("  Cities in file: {}", seed.cities.len());
    info!("  Cities inserted: {}", after.saturating_sub(before));

    Ok(())
}
