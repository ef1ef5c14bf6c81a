//! Domain models for client administration.

pub mod client;

pub use client::{Address, City, Client, ClientSortField, HashedPassword};
