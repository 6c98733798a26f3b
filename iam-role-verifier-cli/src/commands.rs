//! Subcommand handlers

use std::io::{self, Read};

use anyhow::{Context, Result};
use iam_role_verifier::verify::{verify_principal, verify_trust_policy_structure};
use iam_role_verifier::{
    expected_role_from_outputs, parse_trust_policy, read_outputs, AwsSettings, IamRoleClient,
    OutputsSource, RoleVerifier, StsCallerIdentity, VerifyOptions,
};
use log::{debug, info};

use crate::output;
use crate::types::ExitCode;

/// Configuration for the verify subcommand
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub source: OutputsSource,
    pub aws: AwsSettings,
    pub options: VerifyOptions,
    pub check_account: bool,
    pub pretty: bool,
}

/// Handle the verify subcommand
pub async fn verify(config: &VerifyConfig) -> Result<ExitCode> {
    info!("Running verify command");

    let outputs = read_outputs(&config.source)
        .await
        .context("Failed to read provisioning outputs")?;
    let expected =
        expected_role_from_outputs(&outputs).context("Failed to load expected role values")?;
    debug!(
        "Expected role {} ({}), tags: {}",
        expected.role_name, expected.role_arn, expected.tags_json
    );

    let roles = IamRoleClient::new(&config.aws).await;
    let mut verifier = RoleVerifier::new(roles, config.options.clone());
    if config.check_account {
        verifier =
            verifier.with_caller_identity(Box::new(StsCallerIdentity::new(&config.aws).await));
    }

    let report = verifier
        .verify(&expected)
        .await
        .with_context(|| format!("Verification of role {} aborted", expected.role_name))?;

    output::output_report(&report, config.pretty)?;
    Ok(ExitCode::from_passed(report.passed()))
}

/// Handle the parse-trust-policy subcommand
pub fn parse_trust_policy_document(document: Option<String>, pretty: bool) -> Result<ExitCode> {
    let raw = match document {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read trust policy from stdin")?;
            buffer
        }
    };

    let policy = parse_trust_policy(raw.trim()).context("Invalid trust policy document")?;

    let mut violations = verify_trust_policy_structure(&policy);
    if let Some(principal) = policy.first_statement().and_then(|s| s.principal.as_ref()) {
        violations.extend(verify_principal(principal));
    }

    output::output_trust_policy(&policy, &violations, pretty)?;
    Ok(ExitCode::from_passed(violations.is_empty()))
}

/// Print version information
pub fn print_version_info(verbose: bool) -> Result<()> {
    println!("iam-role-verifier {}", env!("CARGO_PKG_VERSION"));
    if verbose {
        println!("library: iam-role-verifier");
        println!(
            "default expected max session duration: {}s",
            iam_role_verifier::DEFAULT_MAX_SESSION_DURATION
        );
    }
    Ok(())
}
