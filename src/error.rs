//! Error types shared by the compute and security facades.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Provider error codes that select a recovery path instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownError {
    /// Returned by every dry-run request the caller is permitted to make.
    DryRunOperation,
    /// The provider rejected the shape of an IP permission.
    InvalidPermissionMalformed,
    /// The provider does not understand one of the request parameters.
    UnknownParameter,
}

impl KnownError {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownError::DryRunOperation => "DryRunOperation",
            KnownError::InvalidPermissionMalformed => "InvalidPermission.Malformed",
            KnownError::UnknownParameter => "UnknownParameter",
        }
    }
}

/// A failed round trip to the EC2 API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{operation}] {}", detail(.code, .message))]
pub struct ApiError {
    pub operation: &'static str,
    pub code: Option<String>,
    pub message: String,
}

impl ApiError {
    pub fn new(operation: &'static str, code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Converts an SDK error, keeping the provider's error code when one was returned.
    ///
    /// Transport and credential failures carry no code; their message is the
    /// full error chain so nothing is lost when they propagate.
    pub fn from_sdk<E, R>(operation: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        if let Some(service) = err.as_service_error()
            && service.code().is_some()
        {
            return Self::from_metadata(operation, service);
        }

        Self {
            operation,
            code: None,
            message: DisplayErrorContext(&err).to_string(),
        }
    }

    /// Builds an error from anything exposing provider error metadata.
    pub fn from_metadata<E: ProvideErrorMetadata>(operation: &'static str, err: &E) -> Self {
        Self {
            operation,
            code: err.code().map(str::to_string),
            message: err.message().unwrap_or("no error message").to_string(),
        }
    }

    /// Substring match against both the error code and the message.
    pub fn is(&self, known: KnownError) -> bool {
        let marker = known.as_str();
        self.code.as_deref().is_some_and(|c| c.contains(marker)) || self.message.contains(marker)
    }

    pub fn is_any(&self, known: &[KnownError]) -> bool {
        known.iter().any(|k| self.is(*k))
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

fn detail(code: &Option<String>, message: &str) -> String {
    match code {
        Some(code) => format!("{code}: {message}"),
        None => message.to_string(),
    }
}

/// Errors returned by the facades.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{operation} response is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("Security group not found: {0}")]
    GroupNotFound(String),

    #[error("Invalid launch spec: {0}")]
    InvalidLaunchSpec(String),
}

impl Error {
    pub fn missing(operation: &'static str, field: &'static str) -> Self {
        Error::MissingField { operation, field }
    }

    /// The provider error behind this failure, if it came from the API.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Result type for single provider calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
