//! Directory error types
//!
//! Error definitions with a closed set of classified variants so callers can
//! branch on "already exists" / "not found" without matching message text.

use thiserror::Error;

/// LDAP result code: noSuchObject.
pub const RESULT_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code: invalidCredentials.
pub const RESULT_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: unwillingToPerform. AD returns it for password policy violations.
pub const RESULT_UNWILLING_TO_PERFORM: u32 = 53;
/// LDAP result code: entryAlreadyExists.
pub const RESULT_ENTRY_ALREADY_EXISTS: u32 = 68;

/// Error that can occur during directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    // Transport errors (usually transient)
    /// Failed to establish a connection to the directory server.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A directory round-trip exceeded the configured operation timeout.
    #[error("directory operation timed out: {operation}")]
    Timeout { operation: String },

    // Service-account errors
    /// The configured service account was rejected by the server.
    #[error("authentication failed: invalid service account credentials")]
    AuthenticationFailed,

    /// Configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Validation errors, raised before any directory call
    /// Caller supplied an empty or malformed value.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The server returned a value that could not be interpreted.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    // Classified business errors
    /// The object being created already exists.
    #[error("{identifier} already exists")]
    AlreadyExists { identifier: String },

    /// The object being looked up does not exist.
    #[error("{identifier} does not exist")]
    NotFound { identifier: String },

    // Authentication rejections
    /// The account is disabled via userAccountControl.
    #[error("account ({account}) is disabled")]
    AccountDisabled { account: String },

    /// Bind with the supplied password was rejected.
    #[error("incorrect password")]
    IncorrectPassword,

    /// The directory rejected the new password (result code 53).
    #[error("password does not meet complexity requirements")]
    WeakPassword,

    // Protocol errors
    /// Any other non-zero LDAP result code.
    #[error("directory returned result code {code}: {message}")]
    Protocol { code: u32, message: String },

    /// Operation failed in the client library.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DirectoryError {
    /// True when the error reports an object that already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, DirectoryError::AlreadyExists { .. })
    }

    /// True when the error reports an object that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::NotFound { .. })
    }

    /// Check if this error is caused by a temporary condition.
    ///
    /// Nothing in this crate retries; the flag is for callers that do.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectionFailed { .. } | DirectoryError::Timeout { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// LDAP result code carried by this error, if known.
    pub fn result_code(&self) -> Option<u32> {
        match self {
            DirectoryError::Protocol { code, .. } => Some(*code),
            DirectoryError::AuthenticationFailed => Some(RESULT_INVALID_CREDENTIALS),
            DirectoryError::WeakPassword => Some(RESULT_UNWILLING_TO_PERFORM),
            _ => None,
        }
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            DirectoryError::Timeout { .. } => "TIMEOUT",
            DirectoryError::AuthenticationFailed => "AUTH_FAILED",
            DirectoryError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            DirectoryError::InvalidInput { .. } => "INVALID_INPUT",
            DirectoryError::InvalidData { .. } => "INVALID_DATA",
            DirectoryError::AlreadyExists { .. } => "OBJECT_EXISTS",
            DirectoryError::NotFound { .. } => "OBJECT_NOT_FOUND",
            DirectoryError::AccountDisabled { .. } => "ACCOUNT_DISABLED",
            DirectoryError::IncorrectPassword => "INCORRECT_PASSWORD",
            DirectoryError::WeakPassword => "WEAK_PASSWORD",
            DirectoryError::Protocol { .. } => "PROTOCOL_ERROR",
            DirectoryError::OperationFailed { .. } => "OPERATION_FAILED",
        }
    }

    /// Classify a non-zero LDAP result code.
    ///
    /// `identifier` names the object the operation targeted and is used for
    /// the `NotFound` / `AlreadyExists` messages.
    pub fn from_result_code(code: u32, message: impl Into<String>, identifier: &str) -> Self {
        match code {
            RESULT_NO_SUCH_OBJECT => DirectoryError::NotFound {
                identifier: identifier.to_string(),
            },
            RESULT_ENTRY_ALREADY_EXISTS => DirectoryError::AlreadyExists {
                identifier: identifier.to_string(),
            },
            RESULT_INVALID_CREDENTIALS => DirectoryError::AuthenticationFailed,
            _ => DirectoryError::Protocol {
                code,
                message: message.into(),
            },
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        DirectoryError::OperationFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an operation failed error with source.
    pub fn operation_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::OperationFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        DirectoryError::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(identifier: impl Into<String>) -> Self {
        DirectoryError::NotFound {
            identifier: identifier.into(),
        }
    }

    /// Create an already exists error.
    pub fn already_exists(identifier: impl Into<String>) -> Self {
        DirectoryError::AlreadyExists {
            identifier: identifier.into(),
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
