//! This crate provides the core logic for IAM Role Verifier:
//! - Trust policy decoding (URL-encoded JSON as returned by IAM)
//! - Field-by-field verification of a live role against provisioning outputs
//! - IAM role lookup and STS caller identity
//!

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod aws;
mod error;
pub mod outputs;
mod parsing;
mod types;
mod verifier;
pub mod verify;

// Re-exports for a small, focused public API
pub use aws::arn::RoleArn;
pub use aws::{AwsError, AwsSettings, CallerIdentity, IamRoleClient, RoleSource, StsCallerIdentity};
pub use error::{VerifierError, VerifierResult};
pub use outputs::{expected_role_from_outputs, read_outputs, OutputsSource};
pub use parsing::{encode_trust_policy, parse_trust_policy};
pub use types::{
    ActionType, Check, CheckOutcome, ExpectedRole, LiveRole, Principal, PrincipalValue,
    StatementList, TrustPolicy, TrustStatement, VerificationReport, VerifyOptions, Violation,
    DEFAULT_MAX_SESSION_DURATION, SERVICE_PRINCIPAL_SUFFIX,
};
pub use verifier::RoleVerifier;
