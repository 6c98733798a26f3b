//! Error types for IAM Role Verifier

use crate::aws::AwsError;
use thiserror::Error;

/// Errors that abort a verification run.
///
/// Failed expectations are not errors: they are collected as
/// [`Violation`](crate::Violation)s in the report.
#[derive(Error, Debug)]
pub enum VerifierError {
    #[error("AWS operation failed: {0}")]
    Aws(#[from] AwsError),

    #[error("Failed to URL decode assume role policy document: {0}")]
    Decode(String),

    #[error("Failed to parse assume role policy document: {0}")]
    Parse(String),

    #[error("Failed to parse expected tags: {0}")]
    ExpectedTags(String),

    #[error("Provisioning outputs error: {0}")]
    Outputs(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias
pub type VerifierResult<T> = Result<T, VerifierError>;

impl VerifierError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
    pub fn expected_tags(msg: impl Into<String>) -> Self {
        Self::ExpectedTags(msg.into())
    }
    pub fn outputs(msg: impl Into<String>) -> Self {
        Self::Outputs(msg.into())
    }
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}
