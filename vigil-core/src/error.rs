use thiserror::Error;

/// Unified error type for the vigil workspace.
///
/// Covers registration faults, publish-time validation failures,
/// repository failures (split into transient and fatal kinds), subscriber
/// callback failures, and broker lifecycle errors.
#[derive(Debug, Clone, Error)]
pub enum VigilError {
    /// The message type is already registered and override was not requested.
    #[error("message type already registered: {message_type}")]
    TypeAlreadyRegistered {
        /// The conflicting type name.
        message_type: String,
    },

    /// The message type has no registered handler.
    #[error("message type not registered: {message_type}")]
    TypeNotRegistered {
        /// The unknown type name.
        message_type: String,
    },

    /// The handler does not satisfy the registration contract
    /// (e.g. its `type_name()` disagrees with the type being registered).
    #[error("handler contract violation for {message_type}: {reason}")]
    HandlerContract {
        /// The type the handler was registered under.
        message_type: String,
        /// Human-readable description of the mismatch.
        reason: String,
    },

    /// The payload failed handler validation; carries the handler's error list.
    #[error("validation failed: {}", errors.join("; "))]
    Validation {
        /// Per-field validation errors reported by the handler.
        errors: Vec<String>,
    },

    /// A repository call failed with a connectivity/timeout-class error.
    /// These are retried by the resolver.
    #[error("transient repository failure in {operation}: {msg}")]
    RepositoryTransient {
        /// The repository operation that failed.
        operation: &'static str,
        /// Human-readable error message.
        msg: String,
    },

    /// A repository call failed with a non-retryable error.
    #[error("repository failure in {operation}: {msg}")]
    Repository {
        /// The repository operation that failed.
        operation: &'static str,
        /// Human-readable error message.
        msg: String,
    },

    /// A subscriber callback returned an error during fan-out.
    #[error("subscriber {subscription_id} failed: {msg}")]
    Subscriber {
        /// The failing subscription.
        subscription_id: uuid::Uuid,
        /// Human-readable error message.
        msg: String,
    },

    /// The stream adapter's downstream sink is gone.
    #[error("stream sink unavailable: {0}")]
    StreamSink(String),

    /// The broker has been shut down; no further operations are accepted.
    #[error("broker has been shut down")]
    BrokerShutDown,

    /// The process-global broker was already installed.
    #[error("global broker already initialized")]
    AlreadyInitialized,

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),
}

impl VigilError {
    /// Helper: build a `TypeAlreadyRegistered` error.
    pub fn type_already_registered(message_type: impl Into<String>) -> Self {
        Self::TypeAlreadyRegistered {
            message_type: message_type.into(),
        }
    }

    /// Helper: build a `TypeNotRegistered` error.
    pub fn type_not_registered(message_type: impl Into<String>) -> Self {
        Self::TypeNotRegistered {
            message_type: message_type.into(),
        }
    }

    /// Helper: build a `HandlerContract` error.
    pub fn handler_contract(message_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HandlerContract {
            message_type: message_type.into(),
            reason: reason.into(),
        }
    }

    /// Helper: build a transient repository error for an operation.
    pub fn repository_transient(operation: &'static str, msg: impl Into<String>) -> Self {
        Self::RepositoryTransient {
            operation,
            msg: msg.into(),
        }
    }

    /// Helper: build a fatal repository error for an operation.
    pub fn repository(operation: &'static str, msg: impl Into<String>) -> Self {
        Self::Repository {
            operation,
            msg: msg.into(),
        }
    }

    /// Helper: build a `Subscriber` error.
    pub fn subscriber(subscription_id: uuid::Uuid, msg: impl Into<String>) -> Self {
        Self::Subscriber {
            subscription_id,
            msg: msg.into(),
        }
    }

    /// Whether the resolver's retry loop should attempt this error again.
    ///
    /// Only connectivity/timeout-class repository failures qualify; everything
    /// else fails fast to the fallback path.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RepositoryTransient { .. })
    }
}
