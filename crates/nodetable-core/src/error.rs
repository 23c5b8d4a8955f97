//! Error types for the Nodetable data layer

use thiserror::Error;

/// Errors raised while reading or writing graph data.
///
/// There are no structured error codes beyond these kinds; views render
/// every variant through [`GraphError::user_message`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Network or transport failure (connection refused, timeout, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// Entity not found, either on the backend or in client-side state
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// Invalid input, rejected by the backend or by a client-side check
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The backend returned an empty or undefined body
    #[error("No data returned for {0}")]
    NoData(String),

    /// The response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for graph data operations
pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    /// Helper to create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        GraphError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Message shown in place of content when a query fails.
    pub fn user_message(&self) -> String {
        format!("An error has occurred: {}", self)
    }

    /// Check if the error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, GraphError::NotFound { .. })
    }

    /// Check if the error comes from the network layer rather than the backend
    pub fn is_transport(&self) -> bool {
        matches!(self, GraphError::Transport(_))
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::Decode(err.to_string())
    }
}
