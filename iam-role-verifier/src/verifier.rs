//! Sequential check runner
//!
//! Runs each check against a freshly fetched role and collects the
//! violations into a [`VerificationReport`]. Fetch and parse failures abort
//! the run.

use log::{debug, info};

use crate::aws::{CallerIdentity, RoleSource};
use crate::error::{VerifierError, VerifierResult};
use crate::parsing::parse_trust_policy;
use crate::types::{
    Check, ExpectedRole, TrustPolicy, VerificationReport, VerifyOptions, Violation,
};
use crate::verify::{
    verify_account, verify_identity, verify_principal, verify_properties, verify_tags,
    verify_trust_policy_structure,
};

/// Verifies a live role against its expected values
pub struct RoleVerifier<S: RoleSource> {
    roles: S,
    caller: Option<Box<dyn CallerIdentity>>,
    options: VerifyOptions,
}

impl<S: RoleSource> RoleVerifier<S> {
    pub fn new(roles: S, options: VerifyOptions) -> Self {
        Self {
            roles,
            caller: None,
            options,
        }
    }

    /// Also run the caller account check
    #[must_use]
    pub fn with_caller_identity(mut self, caller: Box<dyn CallerIdentity>) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Run every check in order and report all violations
    pub async fn verify(&self, expected: &ExpectedRole) -> VerifierResult<VerificationReport> {
        let mut report = VerificationReport::new(expected.role_name.clone());

        let checks = [
            Check::RoleExists,
            Check::AssumeRolePolicy,
            Check::AssumeRolePolicyPrincipals,
            Check::RoleProperties,
            Check::RoleTags,
        ];
        for check in checks {
            info!("Running check {check}");
            let violations = self.run_check(check, expected).await?;
            debug!("Check {check} found {} violation(s)", violations.len());
            report.record(check, violations);
        }

        if self.caller.is_some() {
            info!("Running check {}", Check::CallerAccount);
            let violations = self.run_check(Check::CallerAccount, expected).await?;
            report.record(Check::CallerAccount, violations);
        }

        Ok(report)
    }

    /// Run a single role check
    pub async fn run_check(
        &self,
        check: Check,
        expected: &ExpectedRole,
    ) -> VerifierResult<Vec<Violation>> {
        let role_name = expected.role_name.as_str();
        match check {
            Check::RoleExists => {
                let live = self.roles.fetch_role(role_name).await?;
                Ok(verify_identity(&live, expected))
            }
            Check::AssumeRolePolicy => {
                let policy = self.fetch_trust_policy(role_name).await?;
                Ok(verify_trust_policy_structure(&policy))
            }
            Check::AssumeRolePolicyPrincipals => {
                let policy = self.fetch_trust_policy(role_name).await?;
                Ok(first_statement_principal_violations(&policy))
            }
            Check::RoleProperties => {
                let live = self.roles.fetch_role(role_name).await?;
                Ok(verify_properties(
                    &live,
                    self.options.expected_max_session_duration,
                ))
            }
            Check::RoleTags => {
                if expected.tags_json.is_empty() {
                    debug!("No expected tags, skipping tag comparison");
                    return Ok(Vec::new());
                }
                let live = self.roles.fetch_role(role_name).await?;
                verify_tags(&live, &expected.tags_json)
            }
            Check::CallerAccount => match &self.caller {
                Some(caller) => {
                    let account = caller.caller_account_id().await?;
                    Ok(verify_account(&expected.role_arn, &account))
                }
                None => Ok(Vec::new()),
            },
        }
    }

    async fn fetch_trust_policy(&self, role_name: &str) -> VerifierResult<TrustPolicy> {
        let live = self.roles.fetch_role(role_name).await?;
        let document = live.assume_role_policy_document.as_deref().ok_or_else(|| {
            VerifierError::parse(format!("role {role_name} has no AssumeRolePolicyDocument"))
        })?;
        parse_trust_policy(document)
    }
}

fn first_statement_principal_violations(policy: &TrustPolicy) -> Vec<Violation> {
    let Some(statement) = policy.first_statement() else {
        return vec![Violation::new(
            "Statement",
            "Policy should contain a non-empty Statement array",
        )];
    };
    match &statement.principal {
        Some(principal) => verify_principal(principal),
        None => vec![Violation::new(
            "Statement[0].Principal",
            "Statement should have Principal",
        )],
    }
}
