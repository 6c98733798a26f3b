//! Trust policy document codec.
//!
//! IAM returns `AssumeRolePolicyDocument` URL-encoded; decoding is query
//! unescaping followed by JSON parsing.

pub(crate) mod utils;

use log::trace;
use serde_json::Value;

use crate::error::{VerifierError, VerifierResult};
use crate::types::TrustPolicy;

/// Decode and parse a URL-encoded trust policy document
pub fn parse_trust_policy(raw: &str) -> VerifierResult<TrustPolicy> {
    let decoded = utils::query_unescape(raw)?;
    trace!("Decoded assume role policy document: {decoded}");
    let document: Value =
        serde_json::from_str(&decoded).map_err(|e| VerifierError::parse(e.to_string()))?;
    if !document.is_object() {
        return Err(VerifierError::parse(format!(
            "expected a JSON object, got {document}"
        )));
    }
    serde_json::from_value(document).map_err(|e| VerifierError::parse(e.to_string()))
}

/// Serialize and URL-encode a trust policy the way IAM returns it
pub fn encode_trust_policy(policy: &TrustPolicy) -> VerifierResult<String> {
    let json =
        serde_json::to_string(policy).map_err(|e| VerifierError::serialization(e.to_string()))?;
    Ok(urlencoding::encode(&json).into_owned())
}
