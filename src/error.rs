//! Error types for the Aidbox provider.
//!
//! Two layers: [`ClientError`] for a single RPC round trip, and
//! [`ProviderError`] for the lifecycle operations the host invokes. A missing
//! license is never an error at either layer; it is reported as `None`.

use thiserror::Error;

/// Errors from a single Aidbox RPC call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request envelope could not be encoded as YAML.
    #[error("failed to create YAML request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The HTTP request could not be sent (connect, DNS, timeout).
    #[error("API call failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    ///
    /// Status line and body are kept verbatim for diagnostics.
    #[error("API response error: {status}; Body: {body}")]
    Api {
        /// Status line, e.g. `403 Forbidden`.
        status: String,
        /// Raw response body.
        body: String,
    },

    /// The response body did not match the expected envelope.
    #[error("failed to parse YAML response: {0}")]
    Decode(#[source] serde_yaml::Error),

    /// The response decoded but left out a field the caller depends on.
    #[error("failed to parse YAML response: missing {0}")]
    Incomplete(&'static str),
}

impl ClientError {
    /// Raw response body, when the remote side produced one.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Errors returned by provider lifecycle operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A lifecycle operation ran before `configure`.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Read or delete was invoked on state without an identifier.
    #[error("No ID Present: an ID must be present to {operation} the License")]
    MissingId {
        /// The lifecycle operation that was refused.
        operation: &'static str,
    },

    /// The remote API call failed.
    #[error("{summary}: {source}")]
    Api {
        /// Short description of the failed step.
        summary: String,
        /// Underlying client failure.
        #[source]
        source: ClientError,
    },

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal provider error occurred.
    #[error("SDK error: {0}")]
    Sdk(String),
}

impl ProviderError {
    /// Wrap a client failure with a short summary of the step that failed.
    pub fn api(summary: impl Into<String>, source: ClientError) -> Self {
        Self::Api {
            summary: summary.into(),
            source,
        }
    }

    /// Returns true if this error is a caller-contract violation.
    pub fn is_missing_id(&self) -> bool {
        matches!(self, Self::MissingId { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_keeps_status_and_body() {
        let err = ClientError::Api {
            status: "500 Internal Server Error".to_string(),
            body: "boom: stacktrace".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("500 Internal Server Error"));
        assert!(text.contains("boom: stacktrace"));
        assert_eq!(err.body(), Some("boom: stacktrace"));
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::UnknownResource("aidbox_box".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: aidbox_box");

        let err = ProviderError::Configuration("no token".to_string());
        assert_eq!(format!("{}", err), "Configuration error: no token");

        let err = ProviderError::MissingId { operation: "read" };
        assert_eq!(
            format!("{}", err),
            "No ID Present: an ID must be present to read the License"
        );
        assert!(err.is_missing_id());
    }

    #[test]
    fn test_api_wrapper_embeds_client_error() {
        let err = ProviderError::api(
            "API Call Failed",
            ClientError::Api {
                status: "401 Unauthorized".to_string(),
                body: "bad token".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "API Call Failed: API response error: 401 Unauthorized; Body: bad token"
        );
        assert!(!err.is_missing_id());
    }

    #[test]
    fn test_incomplete_response_names_field() {
        let err = ProviderError::api("API Call Failed", ClientError::Incomplete("license id"));
        assert_eq!(
            err.to_string(),
            "API Call Failed: failed to parse YAML response: missing license id"
        );
    }
}
