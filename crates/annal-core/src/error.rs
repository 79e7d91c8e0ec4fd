//! Error types for annal operations.
//!
//! Every fallible operation in the engine returns [`AnnalResult`]. Errors
//! carry a structured [`ErrorCode`] for programmatic handling.

use thiserror::Error;

/// Result type alias for annal operations.
pub type AnnalResult<T> = Result<T, AnnalError>;

/// Main error type for all annal operations.
#[derive(Error, Debug)]
pub enum AnnalError {
    /// Version comparison invoked with an unknown mode.
    #[error("Comparison error: {message}")]
    Comparison { message: String, code: ErrorCode },

    /// A version row belongs to a different entity than the one being mutated.
    #[error("Version mismatch: {message}")]
    Mismatch {
        message: String,
        code: ErrorCode,
        entity_id: Option<String>,
    },

    /// A required parameter was not supplied.
    #[error("Missing parameter: {message}")]
    MissingParameter { message: String, code: ErrorCode },

    /// Version storage operation failed.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Comparison (CMP_xxx)
    CmpInvalidMode,

    // Foreign key (FK_xxx)
    FkMismatch,

    // Parameters (PARAM_xxx)
    ParamMissing,

    // Storage (STORE_xxx)
    StoreConflict,
    StoreOperationFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CmpInvalidMode => "CMP_001",
            ErrorCode::FkMismatch => "FK_001",
            ErrorCode::ParamMissing => "PARAM_001",
            ErrorCode::StoreConflict => "STORE_001",
            ErrorCode::StoreOperationFailed => "STORE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl AnnalError {
    /// Create a comparison error.
    pub fn comparison(message: impl Into<String>) -> Self {
        Self::Comparison {
            message: message.into(),
            code: ErrorCode::CmpInvalidMode,
        }
    }

    /// Create a foreign-key mismatch error.
    pub fn mismatch(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mismatch {
            message: message.into(),
            code: ErrorCode::FkMismatch,
            entity_id: Some(entity_id.into()),
        }
    }

    /// Create a missing-parameter error.
    pub fn missing_parameter(message: impl Into<String>) -> Self {
        Self::MissingParameter {
            message: message.into(),
            code: ErrorCode::ParamMissing,
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoreOperationFailed,
            source: None,
        }
    }

    /// Create a storage error wrapping an underlying driver error.
    pub fn storage_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoreOperationFailed,
            source: Some(source),
        }
    }

    /// Create a storage conflict error (duplicate version number).
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoreConflict,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Comparison { code, .. } => *code,
            Self::Mismatch { code, .. } => *code,
            Self::MissingParameter { code, .. } => *code,
            Self::Storage { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this error is a storage uniqueness conflict.
    pub fn is_conflict(&self) -> bool {
        self.code() == ErrorCode::StoreConflict
    }
}
