//! Core type definitions for IAM Role Verifier

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Max session duration the provisioned role is expected to carry, in seconds
pub const DEFAULT_MAX_SESSION_DURATION: i32 = 7200;

/// Suffix shared by every AWS service principal
pub const SERVICE_PRINCIPAL_SUFFIX: &str = ".amazonaws.com";

/// Expected role values, read from provisioning outputs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ExpectedRole {
    pub role_arn: String,
    pub role_name: String,
    pub role_id: String,
    /// String-valued tags
    pub tags: BTreeMap<String, String>,
    /// The `role_tags` output re-serialized as JSON; empty when the output is absent
    pub tags_json: String,
}

impl ExpectedRole {
    #[must_use]
    pub fn new(role_arn: String, role_name: String, role_id: String) -> Self {
        Self {
            role_arn,
            role_name,
            role_id,
            tags: BTreeMap::new(),
            tags_json: String::new(),
        }
    }

    /// Attach expected tags; the JSON text is derived from the map
    #[must_use]
    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags_json = tags_json(&tags);
        self.tags = tags;
        self
    }
}

/// JSON object text for string-valued tags
fn tags_json(tags: &BTreeMap<String, String>) -> String {
    let object: serde_json::Map<String, Value> = tags
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    Value::Object(object).to_string()
}

/// Live role metadata as returned by IAM GetRole
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct LiveRole {
    pub arn: String,
    pub name: String,
    pub id: String,
    pub create_date: Option<DateTime<Utc>>,
    pub path: Option<String>,
    pub max_session_duration: Option<i32>,
    pub tags: BTreeMap<String, String>,
    /// URL-encoded JSON, exactly as IAM returns it
    pub assume_role_policy_document: Option<String>,
}

/// Trust (assume-role) policy document.
///
/// Any document that is a JSON object deserializes. Fields of an unexpected
/// type land in the `Other`/`Invalid` variants or stay as raw values, so that
/// structural problems surface as violations instead of parse failures.
/// A key that is present with a `null` value is `Some(Value::Null)`, not `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct TrustPolicy {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub statement: Option<StatementList>,
}

/// Keep a present key as `Some` even when its value is `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl TrustPolicy {
    /// Statements in document order, if `Statement` is a list of objects
    pub fn statements(&self) -> Option<&[TrustStatement]> {
        match &self.statement {
            Some(StatementList::Multiple(statements)) => Some(statements),
            _ => None,
        }
    }

    /// First statement of the list, if any
    pub fn first_statement(&self) -> Option<&TrustStatement> {
        self.statements().and_then(|statements| statements.first())
    }
}

/// IAM accepts either a list of statements or a single statement object
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StatementList {
    Multiple(Vec<TrustStatement>),
    Single(Box<TrustStatement>),
    /// Anything else, including a list with a non-object entry
    Invalid(Value),
}

// Statements are only read from JSON objects; derived struct impls would
// also accept arrays positionally.
impl<'de> Deserialize<'de> for StatementList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let list = match &value {
            Value::Array(items) if items.iter().all(Value::is_object) => {
                serde_json::from_value(value.clone()).map(Self::Multiple).ok()
            }
            Value::Object(_) => serde_json::from_value(value.clone())
                .map(|statement| Self::Single(Box::new(statement)))
                .ok(),
            _ => None,
        };
        Ok(list.unwrap_or(Self::Invalid(value)))
    }
}

/// Trust policy statement structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct TrustStatement {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub sid: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub effect: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionType>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl TrustStatement {
    /// `Effect` when it is a string
    pub fn effect_str(&self) -> Option<&str> {
        self.effect.as_ref().and_then(Value::as_str)
    }
}

/// Action can be a single string or list of strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ActionType {
    Single(String),
    Multiple(Vec<String>),
    Other(Value),
}

impl ActionType {
    pub fn as_string(&self) -> String {
        match self {
            Self::Single(value) => value.clone(),
            Self::Multiple(values) => values.join(","),
            Self::Other(value) => value.to_string(),
        }
    }
}

/// Principal block of a statement: `"*"` or a mapping keyed by principal type
/// (`Service`, `AWS`, `Federated`, `CanonicalUser`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Principal {
    Wildcard(String),
    Mapping(BTreeMap<String, PrincipalValue>),
    Other(Value),
}

impl Principal {
    /// Shorthand for a `{"Service": ...}` principal
    #[must_use]
    pub fn service(value: PrincipalValue) -> Self {
        Self::Mapping(BTreeMap::from([("Service".to_string(), value)]))
    }

    /// Value under `key` when this is a mapping
    pub fn get(&self, key: &str) -> Option<&PrincipalValue> {
        match self {
            Self::Mapping(map) => map.get(key),
            Self::Wildcard(_) | Self::Other(_) => None,
        }
    }
}

/// A single principal string or a list of them.
///
/// List entries are kept as raw values; only string entries name principals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PrincipalValue {
    Single(String),
    Multiple(Vec<Value>),
    Other(Value),
}

/// Named group of assertions, run against a freshly fetched role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    RoleExists,
    AssumeRolePolicy,
    AssumeRolePolicyPrincipals,
    RoleProperties,
    RoleTags,
    CallerAccount,
}

impl Check {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoleExists => "role_exists",
            Self::AssumeRolePolicy => "assume_role_policy",
            Self::AssumeRolePolicyPrincipals => "assume_role_policy_principals",
            Self::RoleProperties => "role_properties",
            Self::RoleTags => "role_tags",
            Self::CallerAccount => "caller_account",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed expectation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Violation {
    /// What was checked, e.g. `Arn` or `Tags.env`
    pub field: String,
    pub message: String,
}

impl Violation {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of one check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CheckOutcome {
    pub check: Check,
    pub violations: Vec<Violation>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Outcome of a full verification run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct VerificationReport {
    pub role_name: String,
    pub outcomes: Vec<CheckOutcome>,
}

impl VerificationReport {
    #[must_use]
    pub fn new(role_name: String) -> Self {
        Self {
            role_name,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, check: Check, violations: Vec<Violation>) {
        self.outcomes.push(CheckOutcome { check, violations });
    }

    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(CheckOutcome::passed)
    }

    pub fn violation_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.violations.len()).sum()
    }

    /// All violations paired with the check that produced them
    pub fn violations(&self) -> impl Iterator<Item = (Check, &Violation)> {
        self.outcomes
            .iter()
            .flat_map(|o| o.violations.iter().map(move |v| (o.check, v)))
    }
}

/// Options for a verification run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Seconds the role's `MaxSessionDuration` must equal when it is set
    pub expected_max_session_duration: i32,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            expected_max_session_duration: DEFAULT_MAX_SESSION_DURATION,
        }
    }
}
