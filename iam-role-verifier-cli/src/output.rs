//! Rendering of verification results

use anyhow::{Context, Result};
use iam_role_verifier::{TrustPolicy, VerificationReport, Violation};
use serde_json::json;

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.context("Failed to serialize output")
}

/// Print the report as JSON on stdout and a summary of violations on stderr
pub fn output_report(report: &VerificationReport, pretty: bool) -> Result<()> {
    println!("{}", to_json(report, pretty)?);

    if !report.passed() {
        for (check, violation) in report.violations() {
            eprintln!("FAIL {check}: {violation}");
        }
        eprintln!(
            "{} violation(s) found for role {}",
            report.violation_count(),
            report.role_name
        );
    }
    Ok(())
}

/// Print a decoded trust policy together with its structure and principal violations
pub fn output_trust_policy(
    policy: &TrustPolicy,
    violations: &[Violation],
    pretty: bool,
) -> Result<()> {
    let value = json!({
        "Policy": policy,
        "Violations": violations,
    });
    println!("{}", to_json(&value, pretty)?);
    for violation in violations {
        eprintln!("FAIL {violation}");
    }
    Ok(())
}
