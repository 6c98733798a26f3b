//! STS caller identity

use async_trait::async_trait;
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client as StsClient;
use log::debug;

use crate::aws::{load_sdk_config, AwsError, AwsResult, AwsSettings, CallerIdentity};

/// [`CallerIdentity`] backed by STS GetCallerIdentity
pub struct StsCallerIdentity {
    client: StsClient,
}

impl StsCallerIdentity {
    pub async fn new(settings: &AwsSettings) -> Self {
        let config = load_sdk_config(settings).await;
        Self {
            client: StsClient::new(&config),
        }
    }

    pub fn with_client(client: StsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallerIdentity for StsCallerIdentity {
    async fn caller_account_id(&self) -> AwsResult<String> {
        caller_account_id(&self.client).await
    }
}

/// Return the current caller account ID using STS GetCallerIdentity.
///
/// Used to confirm the role under test lives in the account the credentials belong to.
pub async fn caller_account_id(client: &StsClient) -> AwsResult<String> {
    let out = client.get_caller_identity().send().await.map_err(|e| {
        AwsError::SdkError(format!(
            "STS GetCallerIdentity failed: {}",
            DisplayErrorContext(&e)
        ))
    })?;
    let acct = out
        .account()
        .map(std::string::ToString::to_string)
        .ok_or_else(|| AwsError::SdkError("STS GetCallerIdentity missing Account".to_string()))?;
    debug!("Caller account: {acct}");
    Ok(acct)
}
