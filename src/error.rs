//! Error types for the ONOS provider.

use thiserror::Error;

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested object does not exist on the controller.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request to the controller could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The controller answered with a non-success status.
    #[error("ONOS API error (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the controller.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// A numeric field could not be widened into the state model.
    #[error("Value out of range for {field}: {value}")]
    OutOfRange {
        /// Wire field name.
        field: &'static str,
        /// The offending value, rendered as text.
        value: String,
    },

    /// An import identifier did not have the expected shape.
    #[error("Invalid import identifier {id:?}: {reason}")]
    InvalidImportId {
        /// The identifier as supplied by the practitioner.
        id: String,
        /// Why the identifier was rejected.
        reason: String,
    },

    /// Resource already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Service temporarily unavailable, or the provider is shutting down.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation failed due to current state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Operation not supported by this resource type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Invalid request from the host.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Http(_err) => "HTTP error (see Debug output)",
            Self::Api { message, .. } => message,
            Self::OutOfRange { field, .. } => field,
            Self::InvalidImportId { reason, .. } => reason,
            Self::AlreadyExists(msg) => msg,
            Self::PermissionDenied(msg) => msg,
            Self::Unavailable(msg) => msg,
            Self::FailedPrecondition(msg) => msg,
            Self::Unimplemented(msg) => msg,
            Self::InvalidRequest(msg) => msg,
        }
    }

    /// Classify a non-success controller response.
    ///
    /// The body is kept as the message so the practitioner sees what ONOS
    /// reported; an empty body falls back to the reason phrase.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        } else {
            body
        };

        match status {
            reqwest::StatusCode::NOT_FOUND => Self::NotFound(message),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Self::PermissionDenied(message)
            },
            reqwest::StatusCode::CONFLICT => Self::AlreadyExists(message),
            reqwest::StatusCode::SERVICE_UNAVAILABLE => Self::Unavailable(message),
            _ => Self::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether this error means the object is gone on the controller.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Http(err) => tonic::Status::unavailable(format!("HTTP error: {}", err)),
            err @ ProviderError::Api { .. } => tonic::Status::internal(err.to_string()),
            err @ ProviderError::OutOfRange { .. } => tonic::Status::out_of_range(err.to_string()),
            err @ ProviderError::InvalidImportId { .. } => {
                tonic::Status::invalid_argument(err.to_string())
            },
            ProviderError::AlreadyExists(msg) => tonic::Status::already_exists(msg),
            ProviderError::PermissionDenied(msg) => tonic::Status::permission_denied(msg),
            ProviderError::Unavailable(msg) => tonic::Status::unavailable(msg),
            ProviderError::FailedPrecondition(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}
