//! Blob service error codes and the sample's error taxonomy.

use http::StatusCode;
use thiserror::Error;

/// Blob service error codes surfaced by the snapshot sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // General errors
    InternalError,
    InvalidInput,
    InvalidQueryParameterValue,
    InvalidResourceName,

    // Blob-specific errors
    BlobNotFound,
    ContainerAlreadyExists,
    ContainerNotFound,
    InvalidBlockId,
    InvalidBlockList,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InternalError => "InternalError",
            ErrorCode::InvalidInput => "InvalidInput",
            ErrorCode::InvalidQueryParameterValue => "InvalidQueryParameterValue",
            ErrorCode::InvalidResourceName => "InvalidResourceName",
            ErrorCode::BlobNotFound => "BlobNotFound",
            ErrorCode::ContainerAlreadyExists => "ContainerAlreadyExists",
            ErrorCode::ContainerNotFound => "ContainerNotFound",
            ErrorCode::InvalidBlockId => "InvalidBlockId",
            ErrorCode::InvalidBlockList => "InvalidBlockList",
        }
    }

    /// Returns the HTTP status code the service answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            ErrorCode::InvalidInput
            | ErrorCode::InvalidQueryParameterValue
            | ErrorCode::InvalidResourceName
            | ErrorCode::InvalidBlockId
            | ErrorCode::InvalidBlockList => StatusCode::BAD_REQUEST,

            // 404 Not Found
            ErrorCode::BlobNotFound | ErrorCode::ContainerNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            ErrorCode::ContainerAlreadyExists => StatusCode::CONFLICT,

            // 500 Internal Server Error
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::BlobNotFound => "The specified blob does not exist.",
            ErrorCode::ContainerAlreadyExists => "The specified container already exists.",
            ErrorCode::ContainerNotFound => "The specified container does not exist.",
            ErrorCode::InvalidBlockId => "The specified block ID is invalid.",
            ErrorCode::InvalidBlockList => "The specified block list is invalid.",
            ErrorCode::InvalidResourceName => {
                "The specified resource name contains invalid characters."
            }
            ErrorCode::InvalidQueryParameterValue => {
                "Value for one of the query parameters specified in the request is invalid."
            }
            ErrorCode::InvalidInput => "One of the request inputs is not valid.",
            ErrorCode::InternalError => {
                "The server encountered an internal error. Please retry the request."
            }
        }
    }

    /// Returns true for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == StatusCode::NOT_FOUND
    }
}

/// Storage error with code and message.
#[derive(Debug, Clone, Error)]
#[error("{code:?}: {message}")]
pub struct StorageError {
    pub code: ErrorCode,
    pub message: String,
}

impl StorageError {
    /// Creates a new storage error with the given code and default message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.default_message().to_string(),
            code,
        }
    }

    /// Creates a new storage error with a custom message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by the snapshot sample and its CLI.
#[derive(Debug, Error)]
pub enum SampleError {
    /// A blob service call failed. Always fatal for the run.
    #[error("{step} failed: {source}")]
    Service {
        step: &'static str,
        #[source]
        source: StorageError,
    },

    /// An expectation about the sample's results did not hold.
    #[error("assertion `{check}` failed: expected {expected:?}, got {actual:?}")]
    Assertion {
        check: &'static str,
        expected: String,
        actual: String,
    },

    /// The command line carried more arguments than the sample accepts.
    #[error("Incorrect number of arguments")]
    InvalidArguments,
}

impl SampleError {
    /// Wraps a service failure with the name of the step that hit it.
    pub fn service(step: &'static str, source: StorageError) -> Self {
        SampleError::Service { step, source }
    }

    /// Builds an assertion failure from displayable values.
    pub fn assertion(
        check: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        SampleError::Assertion {
            check,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Returns the service error code, if this is a service failure.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            SampleError::Service { source, .. } => Some(source.code),
            _ => None,
        }
    }
}

/// Result type alias for sample runs.
pub type SampleResult<T> = Result<T, SampleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorCode::BlobNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ContainerAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::InvalidBlockList.status_code(), StatusCode::BAD_REQUEST);
        assert!(ErrorCode::ContainerNotFound.is_not_found());
        assert!(!ErrorCode::InvalidBlockId.is_not_found());
    }

    #[test]
    fn test_service_error_display() {
        let err = SampleError::service("DeleteSnapshot", StorageError::new(ErrorCode::BlobNotFound));
        assert_eq!(
            err.to_string(),
            "DeleteSnapshot failed: BlobNotFound: The specified blob does not exist."
        );
        assert_eq!(err.code(), Some(ErrorCode::BlobNotFound));
    }
}
