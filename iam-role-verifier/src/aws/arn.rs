//! IAM role ARN parsing

use serde::{Deserialize, Serialize};

/// Components of `arn:<partition>:iam::<account>:role/<path/>name`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RoleArn {
    pub partition: String,
    pub account: String,
    /// Role path including leading and trailing `/`, e.g. `/` or `/service/`
    pub path: String,
    pub name: String,
}

pub fn is_account_id(value: &str) -> bool {
    value.len() == 12 && value.chars().all(|c| c.is_ascii_digit())
}

impl RoleArn {
    /// Parse a role ARN.
    ///
    /// STS assumed-role ARNs, users and other resource types are rejected.
    pub fn parse(arn: &str) -> Result<Self, String> {
        // The resource part may itself contain colons
        let parts: Vec<&str> = arn.splitn(6, ':').collect();
        if parts.len() < 6 || parts[0] != "arn" {
            return Err("invalid ARN format: expected at least 6 colon-separated parts".to_string());
        }
        let (partition, service, region, account, resource) =
            (parts[1], parts[2], parts[3], parts[4], parts[5]);

        if partition.is_empty() {
            return Err("invalid ARN format: empty partition".to_string());
        }
        if service != "iam" {
            return Err(format!(
                "unsupported service '{service}': only IAM roles are supported"
            ));
        }
        if !region.is_empty() {
            return Err("IAM ARNs must not carry a region".to_string());
        }
        if !is_account_id(account) {
            return Err(format!("invalid account ID '{account}'"));
        }

        let Some(role_path) = resource.strip_prefix("role/") else {
            return Err(format!(
                "unsupported IAM resource '{resource}': only roles are supported"
            ));
        };
        let (path, name) = match role_path.rsplit_once('/') {
            Some((path, name)) => (format!("/{path}/"), name),
            None => ("/".to_string(), role_path),
        };
        if name.is_empty() {
            return Err("role name is empty".to_string());
        }

        Ok(Self {
            partition: partition.to_string(),
            account: account.to_string(),
            path,
            name: name.to_string(),
        })
    }
}
