//! Client type (individual person or business).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a client type code or name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientTypeError {
    /// Numeric code outside the known range.
    #[error("invalid client type code: {0}")]
    UnknownCode(i32),
    /// Name that matches no variant.
    #[error("invalid client type: {0}")]
    UnknownName(String),
}

/// Whether a client is an individual or a business.
///
/// On the wire and in the database the type travels as a small integer code
/// (`1` individual, `2` business).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientType {
    /// A natural person, identified by a personal tax number.
    Individual,
    /// A company, identified by a business registration number.
    Business,
}

impl ClientType {
    /// Numeric code used by DTOs and the `client.client_type` column.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Individual => 1,
            Self::Business => 2,
        }
    }

    /// Resolve a numeric code.
    ///
    /// # Errors
    ///
    /// Returns `ClientTypeError::UnknownCode` for any code other than 1 or 2.
    pub const fn from_code(code: i32) -> Result<Self, ClientTypeError> {
        match code {
            1 => Ok(Self::Individual),
            2 => Ok(Self::Business),
            other => Err(ClientTypeError::UnknownCode(other)),
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Individual => write!(f, "INDIVIDUAL"),
            Self::Business => write!(f, "BUSINESS"),
        }
    }
}

impl std::str::FromStr for ClientType {
    type Err = ClientTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INDIVIDUAL" | "1" => Ok(Self::Individual),
            "BUSINESS" | "2" => Ok(Self::Business),
            _ => Err(ClientTypeError::UnknownName(s.to_owned())),
        }
    }
}
