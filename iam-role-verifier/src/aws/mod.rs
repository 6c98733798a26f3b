//! AWS access: IAM role lookup, STS caller identity and ARN helpers

pub mod arn;
pub mod iam;
pub mod sts;

pub use iam::IamRoleClient;
pub use sts::StsCallerIdentity;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_iam::config::Region;
use thiserror::Error;

use crate::types::LiveRole;

/// Failures talking to AWS
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AwsError {
    #[error("IAM role not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("AWS SDK error: {0}")]
    SdkError(String),

    #[error("AWS configuration error: {0}")]
    ConfigError(String),
}

/// Result type for AWS operations
pub type AwsResult<T> = Result<T, AwsError>;

/// Source of live role metadata.
///
/// Every call is an independent read; implementations must not cache.
#[async_trait]
pub trait RoleSource: Send + Sync {
    /// Fetch the role named `role_name`
    async fn fetch_role(&self, role_name: &str) -> AwsResult<LiveRole>;
}

#[async_trait]
impl<T: RoleSource + ?Sized> RoleSource for &T {
    async fn fetch_role(&self, role_name: &str) -> AwsResult<LiveRole> {
        (**self).fetch_role(role_name).await
    }
}

/// Source of the calling principal's account ID
#[async_trait]
pub trait CallerIdentity: Send + Sync {
    /// Account ID of the credentials in use
    async fn caller_account_id(&self) -> AwsResult<String>;
}

/// Overrides for the ambient AWS configuration chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsSettings {
    pub region: Option<String>,
    pub profile: Option<String>,
}

/// Load SDK configuration from the default chain, applying `settings`
pub async fn load_sdk_config(settings: &AwsSettings) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(profile) = &settings.profile {
        loader = loader.profile_name(profile);
    }
    loader.load().await
}
