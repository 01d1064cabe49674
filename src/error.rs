//! Error types for directory operations.
//!
//! Errors are split by where they originate. Local precondition failures are
//! [`ValidationError`]s and are raised before any request reaches the directory.
//! Remote failures carry the filter, distinguished name or attribute name of the
//! request that failed so the caller can diagnose them.
//!
//! A lookup that matches nothing is not an error: single-object lookups return
//! `Ok(None)`.

use crate::transport::TransportError;

/// Main error type for directory operations.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The server could not be resolved, reached or bound to.
    #[error("Connection error{}: {message}", server.as_deref().map(|s| format!(" ({s})")).unwrap_or_default())]
    Connection {
        server: Option<String>,
        message: String,
    },

    /// A search failed (malformed filter, paging failure mid-stream).
    #[error("Search error for filter '{filter}': {message}")]
    Search { filter: String, message: String },

    /// The directory rejected an add, delete, move or attribute write.
    #[error("Modify error on '{distinguished_name}'{}: {message}", attribute.as_deref().map(|a| format!(" (attribute '{a}')")).unwrap_or_default())]
    Modify {
        distinguished_name: String,
        attribute: Option<String>,
        message: String,
    },

    /// A compound operation needed an object that does not exist.
    #[error("Object not found: {kind} '{name}'")]
    ObjectNotFound { kind: String, name: String },

    /// Local precondition failure.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid session configuration.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Configuration could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DirectoryError {
    /// Wrap a transport failure raised while searching with `filter`.
    pub(crate) fn search(filter: Option<&str>, error: TransportError) -> Self {
        let filter = filter.unwrap_or("(objectClass=*)").to_string();
        match error {
            TransportError::Connection { message } => DirectoryError::Connection {
                server: None,
                message,
            },
            other => DirectoryError::Search {
                filter,
                message: other.to_string(),
            },
        }
    }

    /// Wrap a transport failure raised while modifying `distinguished_name`.
    pub(crate) fn modify(
        distinguished_name: &str,
        attribute: Option<&str>,
        error: TransportError,
    ) -> Self {
        match error {
            TransportError::Connection { message } => DirectoryError::Connection {
                server: None,
                message,
            },
            other => DirectoryError::Modify {
                distinguished_name: distinguished_name.to_string(),
                attribute: attribute.map(str::to_string),
                message: other.to_string(),
            },
        }
    }

    /// Whether this error was raised locally, before any transport call.
    pub fn is_validation(&self) -> bool {
        matches!(self, DirectoryError::Validation(_))
    }
}

/// Local precondition failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Group name violates the directory's naming rules.
    #[error("'{name}' is not a valid group name")]
    InvalidGroupName { name: String },

    /// A required argument was empty or whitespace.
    #[error("Parameter '{parameter}' must not be empty")]
    EmptyValue { parameter: String },

    /// The object has neither a GUID nor a distinguished name to address it by.
    #[error("Object has no identity to re-fetch it by")]
    MissingIdentity,
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Result type for local validation.
pub type ValidationResult<T> = Result<T, ValidationError>;
