//! aws CLI wrapper
//!
//! CloudFormation and STS calls go through the `aws` CLI so that credential
//! resolution, SSO and MFA behave exactly as they do for the user's shell.

use crate::error::{AwsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

pub struct AwsCli {
    region: String,
    profile: Option<String>,
}

impl AwsCli {
    pub fn new(region: impl Into<String>, profile: Option<String>) -> Self {
        Self {
            region: region.into(),
            profile,
        }
    }

    /// Check that `aws` is installed and the credentials resolve
    pub async fn check_auth(&self) -> Result<CallerIdentity> {
        let which = Command::new("which").arg("aws").output().await?;
        if !which.status.success() {
            return Err(AwsError::AwsCliNotFound);
        }

        let output = self
            .run_command(&["sts", "get-caller-identity"])
            .await
            .map_err(|e| match e {
                AwsError::CommandFailed(msg) => AwsError::AuthenticationFailed(msg),
                other => other,
            })?;
        Ok(serde_json::from_str(&output)?)
    }

    /// Run an aws command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("aws");
        cmd.args(args);
        cmd.arg("--region").arg(&self.region);
        if let Some(profile) = &self.profile {
            cmd.arg("--profile").arg(profile);
        }
        cmd.arg("--output").arg("json");
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: aws {} --region {}", args.join(" "), self.region);

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AwsError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Describe a stack, `None` when it does not exist
    pub async fn describe_stack(&self, stack_name: &str) -> Result<Option<StackDescription>> {
        let output = match self
            .run_command(&["cloudformation", "describe-stacks", "--stack-name", stack_name])
            .await
        {
            Ok(output) => output,
            Err(AwsError::CommandFailed(msg)) if is_missing_stack(&msg) => return Ok(None),
            Err(e) => return Err(e),
        };

        let response: DescribeStacksResponse = serde_json::from_str(&output)?;
        Ok(response.stacks.into_iter().next())
    }

    pub async fn list_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>> {
        let output = self
            .run_command(&[
                "cloudformation",
                "describe-stack-resources",
                "--stack-name",
                stack_name,
            ])
            .await?;

        let response: DescribeStackResourcesResponse = serde_json::from_str(&output)?;
        Ok(response.stack_resources)
    }

    /// Template the stack was last deployed with
    pub async fn get_template(&self, stack_name: &str) -> Result<serde_json::Value> {
        let output = self
            .run_command(&["cloudformation", "get-template", "--stack-name", stack_name])
            .await?;
        parse_template_body(&output)
    }

    /// Create or update the stack from a template file
    pub async fn deploy(&self, stack_name: &str, template_file: &Path) -> Result<()> {
        let template = template_file.to_string_lossy().into_owned();
        self.run_command(&[
            "cloudformation",
            "deploy",
            "--stack-name",
            stack_name,
            "--template-file",
            template.as_str(),
            "--no-fail-on-empty-changeset",
        ])
        .await?;
        Ok(())
    }

    /// Delete the stack and wait until it is gone
    pub async fn delete_stack(&self, stack_name: &str) -> Result<()> {
        self.run_command(&["cloudformation", "delete-stack", "--stack-name", stack_name])
            .await?;
        self.run_command(&[
            "cloudformation",
            "wait",
            "stack-delete-complete",
            "--stack-name",
            stack_name,
        ])
        .await?;
        Ok(())
    }
}

fn is_missing_stack(stderr: &str) -> bool {
    stderr.contains("does not exist")
}

/// `TemplateBody` comes back as an object for JSON templates and as a
/// string for templates the engine could not re-encode
fn parse_template_body(output: &str) -> Result<serde_json::Value> {
    let response: serde_json::Value = serde_json::from_str(output)?;
    match response.get("TemplateBody") {
        Some(serde_json::Value::String(body)) => Ok(serde_json::from_str(body)?),
        Some(body) => Ok(body.clone()),
        None => Err(AwsError::UnexpectedOutput(
            "get-template returned no TemplateBody".to_string(),
        )),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacksResponse {
    #[serde(default)]
    stacks: Vec<StackDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackDescription {
    pub stack_name: String,
    pub stack_status: String,
    #[serde(default)]
    pub stack_status_reason: Option<String>,
    #[serde(default)]
    pub outputs: Vec<StackOutputEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackOutputEntry {
    pub output_key: String,
    pub output_value: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStackResourcesResponse {
    #[serde(default)]
    stack_resources: Vec<StackResource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackResource {
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    pub resource_type: String,
    pub resource_status: String,
    #[serde(default)]
    pub resource_status_reason: Option<String>,
}
