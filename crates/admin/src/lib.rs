//! Storedesk admin library.
//!
//! Client administration for the store backend: the client aggregate, its
//! DTOs, password hashing, persistence, and the services that tie them
//! together.
//!
//! # Layout
//!
//! - [`config`] - Environment configuration
//! - [`db`] - Stores (`PostgreSQL` and in-memory) and the unit of work
//! - [`models`] - Client, address and city
//! - [`dto`] - Transport shapes and their validation
//! - [`services`] - Client and auth services, password hashing
//! - [`error`] - Service errors and their HTTP status mapping
//! - [`telemetry`] - Tracing subscriber setup

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;
