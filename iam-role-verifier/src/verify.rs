//! Field-by-field assertions against a live role.
//!
//! Every function here is pure: it takes values and returns the violations it
//! found. An empty list means the assertion group passed.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::aws::arn::RoleArn;
use crate::error::{VerifierError, VerifierResult};
use crate::types::{
    ExpectedRole, LiveRole, Principal, PrincipalValue, StatementList, TrustPolicy, Violation,
    SERVICE_PRINCIPAL_SUFFIX,
};

/// True when `value` names an AWS service principal, e.g. `ec2.amazonaws.com`.
/// The bare suffix itself does not count.
pub fn is_service_principal(value: &str) -> bool {
    value.len() > SERVICE_PRINCIPAL_SUFFIX.len() && value.ends_with(SERVICE_PRINCIPAL_SUFFIX)
}

/// Compare ARN, name and ID of the live role with the expected values
pub fn verify_identity(live: &LiveRole, expected: &ExpectedRole) -> Vec<Violation> {
    let mut violations = Vec::new();
    if live.arn != expected.role_arn {
        violations.push(Violation::new(
            "Arn",
            format!(
                "Expected role ARN did not match actual ARN! expected \"{}\", got \"{}\"",
                expected.role_arn, live.arn
            ),
        ));
    }
    if live.name != expected.role_name {
        violations.push(Violation::new(
            "RoleName",
            format!(
                "Expected role name did not match actual name! expected \"{}\", got \"{}\"",
                expected.role_name, live.name
            ),
        ));
    }
    if live.id != expected.role_id {
        violations.push(Violation::new(
            "RoleId",
            format!(
                "Expected role ID did not match actual ID! expected \"{}\", got \"{}\"",
                expected.role_id, live.id
            ),
        ));
    }
    violations
}

/// Check that the trust policy has a version and a non-empty statement list
/// whose first statement is a well-formed `Allow`.
pub fn verify_trust_policy_structure(policy: &TrustPolicy) -> Vec<Violation> {
    let mut violations = Vec::new();
    if policy.version.is_none() {
        violations.push(Violation::new(
            "Version",
            "Assume role policy should have Version",
        ));
    }

    let statements = match &policy.statement {
        None => {
            violations.push(Violation::new(
                "Statement",
                "Assume role policy should have Statement",
            ));
            return violations;
        }
        Some(StatementList::Multiple(statements)) => statements,
        Some(StatementList::Invalid(Value::Array(_))) => {
            violations.push(Violation::new(
                "Statement",
                "Policy Statement entries should be objects",
            ));
            return violations;
        }
        Some(StatementList::Single(_) | StatementList::Invalid(_)) => {
            violations.push(Violation::new(
                "Statement",
                "Policy should contain Statement array",
            ));
            return violations;
        }
    };

    let Some(statement) = statements.first() else {
        violations.push(Violation::new(
            "Statement",
            "Policy should have at least one statement",
        ));
        return violations;
    };

    if statement.effect.is_none() {
        violations.push(Violation::new(
            "Statement[0].Effect",
            "Statement should have Effect",
        ));
    }
    if statement.action.is_none() {
        violations.push(Violation::new(
            "Statement[0].Action",
            "Statement should have Action",
        ));
    }
    if statement.principal.is_none() {
        violations.push(Violation::new(
            "Statement[0].Principal",
            "Statement should have Principal for role assumption",
        ));
    }
    match &statement.effect {
        Some(Value::String(effect)) if effect != "Allow" => violations.push(Violation::new(
            "Statement[0].Effect",
            format!("Effect should be Allow for assume role policy, got \"{effect}\""),
        )),
        Some(Value::String(_)) | None => {}
        Some(other) => violations.push(Violation::new(
            "Statement[0].Effect",
            format!("Effect should be a string, got {other}"),
        )),
    }
    violations
}

/// Validate the `Service` entry of a principal.
///
/// Principals without a `Service` key (`AWS`, `Federated`, `"*"`) are not
/// validated. Non-string entries of a service list are skipped.
pub fn verify_principal(principal: &Principal) -> Vec<Violation> {
    let Some(service) = principal.get("Service") else {
        return Vec::new();
    };

    match service {
        PrincipalValue::Multiple(services) => {
            if services.is_empty() {
                return vec![Violation::new(
                    "Principal.Service",
                    "Should have at least one service principal",
                )];
            }
            if services
                .iter()
                .filter_map(Value::as_str)
                .any(is_service_principal)
            {
                Vec::new()
            } else {
                vec![Violation::new(
                    "Principal.Service",
                    format!(
                        "Expected to find at least one valid AWS service principal ending with {SERVICE_PRINCIPAL_SUFFIX}, got {}",
                        Value::Array(services.clone())
                    ),
                )]
            }
        }
        PrincipalValue::Single(service) => {
            if is_service_principal(service) {
                Vec::new()
            } else {
                vec![Violation::new(
                    "Principal.Service",
                    format!(
                        "Expected a valid AWS service principal ending with {SERVICE_PRINCIPAL_SUFFIX}, got: {service}"
                    ),
                )]
            }
        }
        PrincipalValue::Other(Value::Null) => vec![Violation::new(
            "Principal.Service",
            "Service principal should be defined",
        )],
        PrincipalValue::Other(_) => Vec::new(),
    }
}

/// Check creation date, path and (when set) the max session duration
pub fn verify_properties(live: &LiveRole, expected_max_session_duration: i32) -> Vec<Violation> {
    let mut violations = Vec::new();
    if live.create_date.is_none() {
        violations.push(Violation::new(
            "CreateDate",
            "Role should have a creation date",
        ));
    }
    if live.path.is_none() {
        violations.push(Violation::new("Path", "Role should have a path"));
    }
    if let Some(duration) = live.max_session_duration {
        if duration != expected_max_session_duration {
            violations.push(Violation::new(
                "MaxSessionDuration",
                format!(
                    "Expected max session duration to be {expected_max_session_duration} seconds, got {duration}"
                ),
            ));
        }
    }
    violations
}

/// Compare live tags against the expected tags JSON.
///
/// An empty `expected_tags_json` skips the check. Extra live tags are ignored.
/// Malformed JSON is an error, not a violation.
pub fn verify_tags(live: &LiveRole, expected_tags_json: &str) -> VerifierResult<Vec<Violation>> {
    if expected_tags_json.is_empty() {
        return Ok(Vec::new());
    }

    let expected: BTreeMap<String, Value> = serde_json::from_str(expected_tags_json)
        .map_err(|e| VerifierError::expected_tags(e.to_string()))?;
    if expected.is_empty() {
        return Ok(Vec::new());
    }

    let mut violations = Vec::new();
    if live.tags.is_empty() {
        violations.push(Violation::new("Tags", "Role should have tags"));
    }

    for (key, value) in &expected {
        let field = format!("Tags.{key}");
        match (live.tags.get(key), value) {
            (None, _) => violations.push(Violation::new(
                field,
                format!("Tag {key} should have expected value {value}, but it is missing"),
            )),
            (Some(actual), Value::String(wanted)) if actual == wanted => {}
            (Some(actual), _) => violations.push(Violation::new(
                field,
                format!("Tag {key} should have expected value {value}, got \"{actual}\""),
            )),
        }
    }
    Ok(violations)
}

/// Check that the expected role ARN lives in the caller's account
pub fn verify_account(expected_role_arn: &str, caller_account: &str) -> Vec<Violation> {
    match RoleArn::parse(expected_role_arn) {
        Ok(arn) if arn.account == caller_account => Vec::new(),
        Ok(arn) => vec![Violation::new(
            "Arn",
            format!(
                "Role account {} does not match caller account {caller_account}",
                arn.account
            ),
        )],
        Err(e) => vec![Violation::new(
            "Arn",
            format!("Expected role ARN \"{expected_role_arn}\" is not a role ARN: {e}"),
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionType, TrustStatement};
    use chrono::{TimeZone, Utc};

    fn live_role() -> LiveRole {
        LiveRole {
            arn: "arn:aws:iam::123456789012:role/app-role".to_string(),
            name: "app-role".to_string(),
            id: "AROA123456789EXAMPLE".to_string(),
            create_date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single(),
            path: Some("/".to_string()),
            max_session_duration: Some(7200),
            tags: BTreeMap::from([
                ("env".to_string(), "prod".to_string()),
                ("team".to_string(), "platform".to_string()),
            ]),
            assume_role_policy_document: None,
        }
    }

    fn expected_role() -> ExpectedRole {
        ExpectedRole::new(
            "arn:aws:iam::123456789012:role/app-role".to_string(),
            "app-role".to_string(),
            "AROA123456789EXAMPLE".to_string(),
        )
    }

    fn allow_statement(principal: Principal) -> TrustStatement {
        TrustStatement {
            effect: Some("Allow".into()),
            action: Some(ActionType::Single("sts:AssumeRole".to_string())),
            principal: Some(principal),
            ..TrustStatement::default()
        }
    }

    fn policy_with(statements: Vec<TrustStatement>) -> TrustPolicy {
        TrustPolicy {
            version: Some("2012-10-17".into()),
            id: None,
            statement: Some(StatementList::Multiple(statements)),
        }
    }

    fn service(value: &str) -> Principal {
        Principal::service(PrincipalValue::Single(value.to_string()))
    }

    #[test]
    fn test_verify_identity_matches() {
        assert!(verify_identity(&live_role(), &expected_role()).is_empty());
    }

    #[test]
    fn test_verify_identity_reports_every_mismatch() {
        let mut live = live_role();
        live.arn = "arn:aws:iam::123456789012:role/other".to_string();
        live.id = "AROAOTHER".to_string();

        let violations = verify_identity(&live, &expected_role());
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["Arn", "RoleId"]);
        assert!(violations[0].message.contains("role/other"));
    }

    #[test]
    fn test_structure_passes_for_ec2_trust() {
        let policy = policy_with(vec![allow_statement(service("ec2.amazonaws.com"))]);
        assert!(verify_trust_policy_structure(&policy).is_empty());
    }

    #[test]
    fn test_structure_missing_version_and_statement() {
        let violations = verify_trust_policy_structure(&TrustPolicy::default());
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["Version", "Statement"]);
    }

    #[test]
    fn test_structure_rejects_single_statement_object() {
        let policy = TrustPolicy {
            version: Some("2012-10-17".into()),
            id: None,
            statement: Some(StatementList::Single(Box::new(allow_statement(service(
                "ec2.amazonaws.com",
            ))))),
        };
        let violations = verify_trust_policy_structure(&policy);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("Statement array"));
    }

    #[test]
    fn test_structure_rejects_empty_statement_list() {
        let violations = verify_trust_policy_structure(&policy_with(vec![]));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("at least one statement"));
    }

    #[test]
    fn test_structure_rejects_deny_effect() {
        let mut statement = allow_statement(service("ec2.amazonaws.com"));
        statement.effect = Some("Deny".into());
        let violations = verify_trust_policy_structure(&policy_with(vec![statement]));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "Statement[0].Effect");
    }

    #[test]
    fn test_structure_non_string_effect_is_a_violation() {
        let mut statement = allow_statement(service("ec2.amazonaws.com"));
        statement.effect = Some(Value::Bool(true));
        let violations = verify_trust_policy_structure(&policy_with(vec![statement]));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "Statement[0].Effect");
        assert_eq!(violations[0].message, "Effect should be a string, got true");
    }

    #[test]
    fn test_structure_irregular_statement_shapes() {
        let scalar = TrustPolicy {
            version: Some("2012-10-17".into()),
            id: None,
            statement: Some(StatementList::Invalid("Allow".into())),
        };
        let violations = verify_trust_policy_structure(&scalar);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("Statement array"));

        let entries = TrustPolicy {
            statement: Some(StatementList::Invalid(serde_json::json!(["Allow"]))),
            ..scalar
        };
        let violations = verify_trust_policy_structure(&entries);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("entries should be objects"));
    }

    #[test]
    fn test_structure_only_inspects_first_statement() {
        let broken = TrustStatement::default();
        let policy = policy_with(vec![allow_statement(service("ec2.amazonaws.com")), broken]);
        assert!(verify_trust_policy_structure(&policy).is_empty());
    }

    #[test]
    fn test_structure_reports_missing_statement_fields() {
        let violations = verify_trust_policy_structure(&policy_with(vec![TrustStatement::default()]));
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "Statement[0].Effect",
                "Statement[0].Action",
                "Statement[0].Principal"
            ]
        );
    }

    #[test]
    fn test_principal_single_service_passes() {
        assert!(verify_principal(&service("ec2.amazonaws.com")).is_empty());
    }

    #[test]
    fn test_principal_service_list_passes_with_one_valid_entry() {
        let principal = Principal::service(PrincipalValue::Multiple(vec![
            "ec2.amazonaws.com".into(),
            "lambda.amazonaws.com".into(),
        ]));
        assert!(verify_principal(&principal).is_empty());

        let mixed = Principal::service(PrincipalValue::Multiple(vec![
            "not-a-service".into(),
            "lambda.amazonaws.com".into(),
        ]));
        assert!(verify_principal(&mixed).is_empty());
    }

    #[test]
    fn test_principal_arbitrary_string_fails() {
        let violations = verify_principal(&service("arbitrary-not-aws"));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("arbitrary-not-aws"));
    }

    #[test]
    fn test_principal_bare_suffix_fails() {
        assert_eq!(verify_principal(&service(".amazonaws.com")).len(), 1);
    }

    #[test]
    fn test_principal_empty_service_list_fails() {
        let principal = Principal::service(PrincipalValue::Multiple(vec![]));
        let violations = verify_principal(&principal);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("at least one service principal"));
    }

    #[test]
    fn test_principal_list_without_valid_service_fails() {
        let principal = Principal::service(PrincipalValue::Multiple(vec![
            "example.com".into(),
            "arbitrary-not-aws".into(),
        ]));
        let violations = verify_principal(&principal);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains(r#"["example.com","arbitrary-not-aws"]"#));
    }

    #[test]
    fn test_principal_list_skips_non_string_entries() {
        let principal: Principal =
            serde_json::from_str(r#"{"Service":["ec2.amazonaws.com",null,42]}"#).unwrap();
        assert!(verify_principal(&principal).is_empty());

        let only_junk: Principal = serde_json::from_str(r#"{"Service":[null,{"a":1}]}"#).unwrap();
        assert_eq!(verify_principal(&only_junk).len(), 1);
    }

    #[test]
    fn test_principal_null_service_fails() {
        let principal: Principal = serde_json::from_str(r#"{"Service":null}"#).unwrap();
        let violations = verify_principal(&principal);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "Service principal should be defined");
    }

    #[test]
    fn test_principal_irregular_shapes_are_not_validated() {
        let numeric: Principal = serde_json::from_str(r#"{"Service":42}"#).unwrap();
        assert!(verify_principal(&numeric).is_empty());

        let list: Principal = serde_json::from_str(r#"["ec2.amazonaws.com"]"#).unwrap();
        assert!(verify_principal(&list).is_empty());
    }

    #[test]
    fn test_principal_without_service_key_is_not_validated() {
        let aws = Principal::Mapping(BTreeMap::from([(
            "AWS".to_string(),
            PrincipalValue::Single("arbitrary-not-aws".to_string()),
        )]));
        assert!(verify_principal(&aws).is_empty());
        assert!(verify_principal(&Principal::Wildcard("*".to_string())).is_empty());
    }

    #[test]
    fn test_properties_pass_with_expected_duration() {
        assert!(verify_properties(&live_role(), 7200).is_empty());
    }

    #[test]
    fn test_properties_skip_absent_duration() {
        let mut live = live_role();
        live.max_session_duration = None;
        assert!(verify_properties(&live, 7200).is_empty());
    }

    #[test]
    fn test_properties_flag_unexpected_duration() {
        let mut live = live_role();
        live.max_session_duration = Some(3600);
        let violations = verify_properties(&live, 7200);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "MaxSessionDuration");
        assert!(violations[0].message.contains("3600"));
    }

    #[test]
    fn test_properties_require_create_date_and_path() {
        let mut live = live_role();
        live.create_date = None;
        live.path = None;
        let fields: Vec<String> = verify_properties(&live, 7200)
            .into_iter()
            .map(|v| v.field)
            .collect();
        assert_eq!(fields, vec!["CreateDate", "Path"]);
    }

    #[test]
    fn test_tags_empty_json_is_noop() {
        let mut live = live_role();
        live.tags.clear();
        assert!(verify_tags(&live, "").unwrap().is_empty());
    }

    #[test]
    fn test_tags_empty_mapping_passes() {
        let mut live = live_role();
        live.tags.clear();
        assert!(verify_tags(&live, "{}").unwrap().is_empty());
    }

    #[test]
    fn test_tags_matching_subset_passes() {
        assert!(verify_tags(&live_role(), r#"{"env":"prod"}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_tags_mismatch_names_key() {
        let mut live = live_role();
        live.tags.insert("env".to_string(), "staging".to_string());
        let violations = verify_tags(&live, r#"{"env":"prod"}"#).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "Tags.env");
        assert!(violations[0].message.contains("env"));
        assert!(violations[0].message.contains("staging"));
    }

    #[test]
    fn test_tags_missing_key_fails() {
        let violations = verify_tags(&live_role(), r#"{"owner":"alice"}"#).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "Tags.owner");
    }

    #[test]
    fn test_tags_non_string_value_fails() {
        let violations = verify_tags(&live_role(), r#"{"env":1}"#).unwrap();
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_tags_untagged_role_names_every_expected_key() {
        let mut live = live_role();
        live.tags.clear();
        let violations = verify_tags(&live, r#"{"env":"prod","team":"platform"}"#).unwrap();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["Tags", "Tags.env", "Tags.team"]);
        assert_eq!(violations[0].message, "Role should have tags");
        assert!(violations[1].message.contains("missing"));
    }

    #[test]
    fn test_tags_malformed_json_is_error() {
        let err = verify_tags(&live_role(), "{not json").unwrap_err();
        assert!(matches!(err, VerifierError::ExpectedTags(_)));
    }

    #[test]
    fn test_account_matches() {
        assert!(verify_account("arn:aws:iam::123456789012:role/app-role", "123456789012").is_empty());
    }

    #[test]
    fn test_account_mismatch() {
        let violations = verify_account("arn:aws:iam::123456789012:role/app-role", "999999999999");
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("999999999999"));
    }

    #[test]
    fn test_account_invalid_arn() {
        let violations = verify_account("not-an-arn", "123456789012");
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("not a role ARN"));
    }
}
