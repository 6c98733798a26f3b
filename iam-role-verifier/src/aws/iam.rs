//! IAM role lookup
//!
//! Wraps the IAM `GetRole` API and converts its output into a [`LiveRole`].

use async_trait::async_trait;
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_iam::operation::get_role::GetRoleError;
use aws_sdk_iam::types::Role;
use aws_sdk_iam::Client as IamClient;
use aws_smithy_runtime_api::client::result::SdkError;
use chrono::{DateTime, Utc};
use log::debug;

use crate::aws::{load_sdk_config, AwsError, AwsResult, AwsSettings, RoleSource};
use crate::types::LiveRole;

/// Error codes IAM uses when the caller lacks permission or credentials are unusable
const PERMISSION_ERROR_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
    "ExpiredToken",
    "SignatureDoesNotMatch",
];

/// [`RoleSource`] backed by the AWS IAM API
pub struct IamRoleClient {
    client: IamClient,
}

impl IamRoleClient {
    /// Create a client from the ambient credential chain
    pub async fn new(settings: &AwsSettings) -> Self {
        let config = load_sdk_config(settings).await;
        Self {
            client: IamClient::new(&config),
        }
    }

    /// Create a client around an existing SDK client
    pub fn with_client(client: IamClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RoleSource for IamRoleClient {
    async fn fetch_role(&self, role_name: &str) -> AwsResult<LiveRole> {
        debug!("Fetching IAM role {role_name}");
        let output = self
            .client
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| classify_get_role_error(role_name, &e))?;

        let role = output.role().ok_or_else(|| {
            AwsError::SdkError(format!("IAM GetRole returned no role for {role_name}"))
        })?;
        Ok(live_role_from(role))
    }
}

fn classify_get_role_error(
    role_name: &str,
    err: &SdkError<GetRoleError, aws_smithy_runtime_api::http::Response>,
) -> AwsError {
    err.as_service_error()
        .and_then(|service_err| classify_service_error(role_name, service_err))
        .unwrap_or_else(|| {
            AwsError::SdkError(format!("IAM GetRole failed: {}", DisplayErrorContext(err)))
        })
}

/// Map modeled and well-known IAM errors to [`AwsError`] kinds
fn classify_service_error(role_name: &str, err: &GetRoleError) -> Option<AwsError> {
    if err.is_no_such_entity_exception() {
        return Some(AwsError::NotFound(role_name.to_string()));
    }
    let code = err.code()?;
    if PERMISSION_ERROR_CODES.contains(&code) {
        let detail = err.message().unwrap_or(code);
        return Some(AwsError::PermissionDenied(format!(
            "IAM GetRole on {role_name}: {detail}"
        )));
    }
    None
}

/// Convert the SDK role shape into a [`LiveRole`]
pub(crate) fn live_role_from(role: &Role) -> LiveRole {
    let create_date = role.create_date();
    let path = role.path();

    LiveRole {
        arn: role.arn().to_string(),
        name: role.role_name().to_string(),
        id: role.role_id().to_string(),
        create_date: DateTime::<Utc>::from_timestamp(create_date.secs(), create_date.subsec_nanos()),
        path: (!path.is_empty()).then(|| path.to_string()),
        max_session_duration: role.max_session_duration(),
        tags: role
            .tags()
            .iter()
            .map(|tag| (tag.key().to_string(), tag.value().to_string()))
            .collect(),
        assume_role_policy_document: role.assume_role_policy_document().map(str::to_string),
    }
}
