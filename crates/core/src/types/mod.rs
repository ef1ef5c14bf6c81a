//! Core types for Storedesk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod client_type;
pub mod credentials;
pub mod email;
pub mod id;
pub mod pagination;

pub use client_type::{ClientType, ClientTypeError};
pub use credentials::Credentials;
pub use email::{Email, EmailError};
pub use id::*;
pub use pagination::{Page, PageRequest, SortDirection, SortDirectionError};
