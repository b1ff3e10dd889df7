//! Unified error type for the crate.
//!
//! Every fallible operation returns [`Result`]. Remote (data source) failures,
//! client-side validation failures and local store misses all flow through the
//! same enum so callers handle the failure branch explicitly.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Database (remote service) failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A record with the given id does not exist
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource name, e.g. `"budget"`
        resource: &'static str,
        /// Display form of the missing id
        id: String,
    },

    /// Input rejected before any remote call was made
    #[error("Validation failed: {message}")]
    Validation {
        /// Human-readable description
        message: String,
    },

    /// Negative, non-finite or otherwise unusable amount
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Page number or page size below 1
    #[error("Invalid page request: page {page}, page size {page_size}")]
    InvalidPage {
        /// Requested page (1-based)
        page: usize,
        /// Requested page size
        page_size: usize,
    },

    /// A status change the state machine does not allow
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Remote call rejected by the data source
    #[error("Remote call failed: {message}")]
    Remote {
        /// Human-readable description
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a [`Error::NotFound`] for the given resource and id.
    pub fn not_found(resource: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Builds a [`Error::Validation`] from a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
