//! Provisioning outputs
//!
//! Reads the values the role was provisioned with from Terraform output JSON.
//! Both the `terraform output -json` shape (`{"name": {"value": ..}}`) and a
//! flat `{"name": value}` mapping are accepted.

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::{debug, info};
use serde_json::{Map, Value};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::{VerifierError, VerifierResult};
use crate::types::ExpectedRole;

pub const ROLE_ARN_OUTPUT: &str = "role_arn";
pub const ROLE_NAME_OUTPUT: &str = "role_name";
pub const ROLE_ID_OUTPUT: &str = "role_id";
pub const ROLE_TAGS_OUTPUT: &str = "role_tags";

/// Where provisioning outputs come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputsSource {
    /// A JSON file
    File(PathBuf),
    /// JSON on standard input
    Stdin,
    /// Run `<binary> -chdir=<dir> output -json`
    Terraform { dir: PathBuf, binary: PathBuf },
}

/// Read the raw outputs JSON text from `source`
pub async fn read_outputs(source: &OutputsSource) -> VerifierResult<String> {
    match source {
        OutputsSource::File(path) => {
            debug!("Reading provisioning outputs from {}", path.display());
            tokio::fs::read_to_string(path).await.map_err(|e| {
                VerifierError::outputs(format!("cannot read {}: {e}", path.display()))
            })
        }
        OutputsSource::Stdin => {
            debug!("Reading provisioning outputs from stdin");
            let mut buffer = String::new();
            tokio::io::stdin().read_to_string(&mut buffer).await?;
            Ok(buffer)
        }
        OutputsSource::Terraform { dir, binary } => terraform_output(dir, binary).await,
    }
}

async fn terraform_output(dir: &std::path::Path, binary: &std::path::Path) -> VerifierResult<String> {
    info!(
        "Running {} output -json in {}",
        binary.display(),
        dir.display()
    );
    let output = Command::new(binary)
        .arg(format!("-chdir={}", dir.display()))
        .args(["output", "-json"])
        .output()
        .await
        .map_err(|e| {
            VerifierError::outputs(format!("failed to run {}: {e}", binary.display()))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VerifierError::outputs(format!(
            "{} output exited with {}: {}",
            binary.display(),
            output.status,
            stderr.trim()
        )));
    }
    String::from_utf8(output.stdout)
        .map_err(|e| VerifierError::outputs(format!("terraform output is not UTF-8: {e}")))
}

/// Build the expected role from outputs JSON text
pub fn expected_role_from_outputs(json: &str) -> VerifierResult<ExpectedRole> {
    let root: Value = serde_json::from_str(json)
        .map_err(|e| VerifierError::outputs(format!("outputs are not valid JSON: {e}")))?;
    let Value::Object(outputs) = root else {
        return Err(VerifierError::outputs("outputs must be a JSON object"));
    };

    let role_arn = required_string(&outputs, ROLE_ARN_OUTPUT)?;
    let role_name = required_string(&outputs, ROLE_NAME_OUTPUT)?;
    let role_id = required_string(&outputs, ROLE_ID_OUTPUT)?;

    let mut expected = ExpectedRole::new(role_arn, role_name, role_id);
    match outputs.get(ROLE_TAGS_OUTPUT).map(output_value) {
        None | Some(Value::Null) => {}
        Some(Value::Object(tags)) => {
            expected.tags = string_tags(tags);
            expected.tags_json = serde_json::to_string(tags)
                .map_err(|e| VerifierError::serialization(e.to_string()))?;
        }
        Some(other) => {
            return Err(VerifierError::outputs(format!(
                "output '{ROLE_TAGS_OUTPUT}' must be a mapping, got {other}"
            )))
        }
    }
    Ok(expected)
}

/// Unwrap a `terraform output -json` entry to its value
fn output_value(entry: &Value) -> &Value {
    match entry {
        Value::Object(fields)
            if fields.contains_key("value")
                && (fields.contains_key("type") || fields.contains_key("sensitive")) =>
        {
            &fields["value"]
        }
        other => other,
    }
}

fn required_string(outputs: &Map<String, Value>, name: &str) -> VerifierResult<String> {
    match outputs.get(name).map(output_value) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(VerifierError::outputs(format!(
            "output '{name}' must be a string, got {other}"
        ))),
        None => Err(VerifierError::outputs(format!("missing output '{name}'"))),
    }
}

fn string_tags(tags: &Map<String, Value>) -> BTreeMap<String, String> {
    tags.iter()
        .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
        .collect()
}
