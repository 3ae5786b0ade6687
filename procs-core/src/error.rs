//! Errors reported through a device's error sink.
//!
//! Entry points that take a handle report an unusable handle directly with
//! [`InvalidId`](crate::InvalidId). Everything else that WebGPU calls a
//! validation, out-of-memory or internal error is turned into an [`Error`]
//! and handed to the owning device, which routes it to the innermost
//! matching error scope or to the uncaptured error callback.

use std::{error, fmt::Write as _};

use pt::{ErrorFilter, ErrorType, FeatureName};
use thiserror::Error;

/// An error delivered to a device's error sink.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    OutOfMemory(String),
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Build a validation error from a typed error, including its sources.
    pub fn validation(err: impl error::Error + 'static) -> Self {
        Self::Validation(format_pretty_any(&err))
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::Validation(_) => ErrorType::Validation,
            Self::OutOfMemory(_) => ErrorType::OutOfMemory,
            Self::Internal(_) => ErrorType::Internal,
        }
    }

    /// Returns `true` if an error scope with `filter` captures this error.
    pub fn matches(&self, filter: ErrorFilter) -> bool {
        match (self, filter) {
            (Self::Validation(_), ErrorFilter::Validation) => true,
            (Self::OutOfMemory(_), ErrorFilter::OutOfMemory) => true,
            (Self::Internal(_), ErrorFilter::Internal) => true,
            _ => false,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message) | Self::OutOfMemory(message) | Self::Internal(message) => {
                message
            }
        }
    }
}

/// Format an error and its chain of sources on one line.
pub fn format_pretty_any(error: &(dyn error::Error + 'static)) -> String {
    let mut output = error.to_string();
    let mut source = error.source();

    while let Some(err) = source {
        let _ = write!(output, ": {err}");
        source = err.source();
    }

    output
}

/// A device feature required by an operation is not enabled.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Feature {0:?} is not enabled on the device")]
pub struct MissingFeature(pub FeatureName);

/// A limit was exceeded.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Limit '{name}' value {requested} is better than allowed {allowed}")]
pub struct FailedLimit {
    pub name: &'static str,
    pub requested: u64,
    pub allowed: u64,
}

/// An object referenced by a descriptor or argument can't be used.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ObjectError {
    #[error("{0} is invalid")]
    Invalid(&'static str),
    #[error("{0} with label {1:?} is an error object")]
    ErrorObject(&'static str, String),
    #[error("{0} with label {1:?} is destroyed")]
    Destroyed(&'static str, String),
    #[error("{0} with label {1:?} belongs to a different device")]
    WrongDevice(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] MissingFeature);

    #[test]
    fn validation_includes_sources() {
        let err = Error::validation(Outer(MissingFeature(FeatureName::TimestampQuery)));
        assert_eq!(
            err.message(),
            "outer: Feature TimestampQuery is not enabled on the device"
        );
        assert!(err.matches(ErrorFilter::Validation));
        assert!(!err.matches(ErrorFilter::OutOfMemory));
        assert_eq!(err.error_type(), ErrorType::Validation);
    }
}
