//! Business logic services.
//!
//! Services sit between callers (the CLI, or a future HTTP layer) and the
//! stores. They own validation, password hashing and error translation.

pub mod auth;
pub mod clients;
pub mod password;

pub use auth::AuthService;
pub use clients::ClientService;
pub use password::{Argon2Hasher, PasswordHasher};
