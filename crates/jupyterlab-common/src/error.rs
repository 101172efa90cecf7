//! Error types for the JupyterLab operator
//!
//! Errors carry enough context (resource kind, instance name) to be useful in
//! logs. API failures that the control loop treats specially (conflicting
//! writes, racing creates) get their own variants so callers can match on them
//! instead of inspecting HTTP status codes.

use std::time::Duration;

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for JupyterLab operator operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error not covered by a more specific variant
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Optimistic concurrency failure: another writer changed the object first
    #[error("conflict writing {kind} {name}: {message}")]
    Conflict {
        /// Resource kind being written
        kind: String,
        /// Resource name
        name: String,
        /// Message returned by the API server
        message: String,
    },

    /// A create raced with another writer that created the same object
    #[error("{kind} {name} already exists")]
    AlreadyExists {
        /// Resource kind being created
        kind: String,
        /// Resource name
        name: String,
    },

    /// Validation error for a Jupyterlab spec
    #[error("validation error for {instance}: {message}")]
    Validation {
        /// Name of the Jupyterlab with invalid configuration
        instance: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.size")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "reconciler", "builder")
        context: String,
    },

    /// Reconciliation exceeded its deadline
    #[error("reconcile timed out after {elapsed:?}")]
    Timeout {
        /// The deadline that was exceeded
        elapsed: Duration,
    },

    /// Reconciliation was interrupted by operator shutdown
    #[error("reconcile cancelled by shutdown")]
    Cancelled,
}

impl Error {
    /// Classify a kube error returned while writing `kind`/`name`.
    ///
    /// HTTP 409 responses are split by their `reason`: `AlreadyExists` for
    /// creates that lost a race, anything else is treated as a conflicting
    /// update. All other errors pass through as [`Error::Kube`].
    pub fn from_api(kind: impl Into<String>, name: impl Into<String>, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
                Self::AlreadyExists {
                    kind: kind.into(),
                    name: name.into(),
                }
            }
            kube::Error::Api(ae) if ae.code == 409 => Self::Conflict {
                kind: kind.into(),
                name: name.into(),
                message: ae.message,
            },
            other => Self::Kube { source: other },
        }
    }

    /// Create a validation error with instance context
    pub fn validation_for(instance: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            instance: instance.into(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with instance context and field path
    pub fn validation_for_field(
        instance: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            instance: instance.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Validation and serialization errors need a spec or code change, so
    /// retrying them only burns API calls. Everything else is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => !matches!(
                source,
                kube::Error::Api(ae) if (400..500).contains(&ae.code)
                    && ae.code != 404
                    && ae.code != 409
                    && ae.code != 429
            ),
            Error::Conflict { .. } => true,
            Error::AlreadyExists { .. } => true,
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
            Error::Internal { .. } => true,
            Error::Timeout { .. } => true,
            Error::Cancelled => true,
        }
    }

    /// True if this error came from a create that lost a race
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }

    /// True if this error is an optimistic concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Get the instance name if this error is associated with one
    pub fn instance(&self) -> Option<&str> {
        match self {
            Error::Validation { instance, .. } => Some(instance),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{reason} from test"),
            reason: reason.to_string(),
            code,
        })
    }

    /// Story: A create that loses a race is recognised as AlreadyExists
    #[test]
    fn story_racing_create_is_already_exists() {
        let err = Error::from_api("Deployment", "lab", api_error(409, "AlreadyExists"));
        assert!(err.is_already_exists());
        assert!(!err.is_conflict());
        assert_eq!(err.to_string(), "Deployment lab already exists");
    }

    /// Story: A stale resourceVersion on update is a retryable conflict
    #[test]
    fn story_stale_update_is_conflict() {
        let err = Error::from_api("Jupyterlab", "lab", api_error(409, "Conflict"));
        assert!(err.is_conflict());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Conflict from test"));
    }

    #[test]
    fn other_api_errors_pass_through() {
        let err = Error::from_api("Service", "lab", api_error(503, "ServiceUnavailable"));
        assert!(matches!(err, Error::Kube { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let err = Error::from(api_error(422, "Invalid"));
        assert!(!err.is_retryable());

        let err = Error::from(api_error(403, "Forbidden"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn not_found_and_throttling_stay_retryable() {
        assert!(Error::from(api_error(404, "NotFound")).is_retryable());
        assert!(Error::from(api_error(429, "TooManyRequests")).is_retryable());
    }

    #[test]
    fn validation_errors_carry_instance_and_field() {
        let err = Error::validation_for_field("lab", "spec.size", "must be >= 0");
        assert_eq!(err.instance(), Some("lab"));
        assert!(!err.is_retryable());
        match &err {
            Error::Validation { field, .. } => assert_eq!(field.as_deref(), Some("spec.size")),
            _ => panic!("Expected Validation variant"),
        }
    }

    #[test]
    fn serialization_errors_are_permanent() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(json_err);
        assert!(matches!(err, Error::Serialization { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn internal_error_default_context() {
        let err = Error::internal("unexpected state");
        assert!(err.to_string().contains("[unknown]"));
        assert!(err.is_retryable());

        let err = Error::internal_with_context("reconciler", "no uid");
        assert!(err.to_string().contains("[reconciler]"));
    }

    #[test]
    fn timeouts_and_cancellation_are_retryable() {
        assert!(Error::Timeout {
            elapsed: Duration::from_secs(30)
        }
        .is_retryable());
        assert!(Error::Cancelled.is_retryable());
    }
}
