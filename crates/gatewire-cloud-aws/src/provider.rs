//! AWS CloudFormation provider implementation

use crate::awscli::{AwsCli, StackDescription, StackResource};
use crate::error::{AwsError, Result};
use crate::images::{ImageChecker, images_for_region, mapped_regions};
use async_trait::async_trait;
use gatewire_cloud::{
    ApplyResult, AuthStatus, BootstrapReport, CloudError, CloudProvider, Plan, ResourceSet,
    ResourceState, ResourceStatus, StackState,
};
use std::path::{Path, PathBuf};
use tokio::fs;

const PROVIDER_NAME: &str = "aws";

/// Map a CloudFormation stack or resource status
pub fn parse_status(status: &str) -> ResourceStatus {
    if status.contains("FAILED") || status.contains("ROLLBACK") {
        ResourceStatus::Error
    } else if status == "DELETE_COMPLETE" {
        ResourceStatus::Deleted
    } else if status.starts_with("DELETE") {
        ResourceStatus::Deleting
    } else if status.ends_with("_COMPLETE") {
        ResourceStatus::Running
    } else if status.starts_with("CREATE") || status == "REVIEW_IN_PROGRESS" {
        ResourceStatus::Creating
    } else if status.starts_with("UPDATE") || status.starts_with("IMPORT") {
        ResourceStatus::Updating
    } else {
        ResourceStatus::Unknown
    }
}

/// Deploys templates as CloudFormation stacks
pub struct AwsProvider {
    cli: AwsCli,
    region: String,
    profile: Option<String>,
    project_root: PathBuf,
}

impl AwsProvider {
    pub fn new(
        region: impl Into<String>,
        profile: Option<String>,
        project_root: impl AsRef<Path>,
    ) -> Self {
        let region = region.into();
        Self {
            cli: AwsCli::new(&region, profile.clone()),
            region,
            profile,
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    pub fn template_path(&self, stack_name: &str) -> PathBuf {
        gatewire_config::template_path(&self.project_root, stack_name)
    }

    /// Write the template the engine deploys from
    pub async fn write_template(&self, desired: &ResourceSet) -> Result<PathBuf> {
        let path = self.template_path(&desired.stack_name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let content = serde_json::to_string_pretty(&desired.template)?;
        fs::write(&path, content).await?;
        tracing::debug!("Wrote template to {}", path.display());
        Ok(path)
    }

    async fn check_images(&self, desired: &ResourceSet, report: &mut BootstrapReport) -> Result<()> {
        let images = images_for_region(&desired.template, &desired.region);
        let checker = ImageChecker::new(&self.region, self.profile.as_deref()).await;
        let missing = checker.missing(&images).await?;
        for image in images {
            if missing.contains(&image) {
                report.fail("image", format!("{} not found in {}", image, self.region));
            } else {
                report.pass("image", format!("{} available in {}", image, self.region));
            }
        }
        Ok(())
    }
}

/// The target region needs an entry in the template's image map
fn check_region(desired: &ResourceSet, report: &mut BootstrapReport) {
    if images_for_region(&desired.template, &desired.region).is_empty() {
        let mapped: Vec<String> = mapped_regions(&desired.template).into_iter().collect();
        report.fail(
            "region",
            format!(
                "no image mapped for {} (mapped: {})",
                desired.region,
                mapped.join(", ")
            ),
        );
    } else {
        report.pass("region", format!("{} has a mapped image", desired.region));
    }
}

fn build_stack_state(
    region: &str,
    description: &StackDescription,
    resources: &[StackResource],
    template: Option<&serde_json::Value>,
) -> StackState {
    let mut state = StackState::new(&description.stack_name, PROVIDER_NAME, region)
        .with_status(parse_status(&description.stack_status));

    for resource in resources {
        let mut entry = ResourceState::new(
            resource.physical_resource_id.clone().unwrap_or_default(),
            &resource.resource_type,
        )
        .with_status(parse_status(&resource.resource_status));

        let deployed = template
            .and_then(|t| t.get("Resources"))
            .and_then(|r| r.get(&resource.logical_resource_id));
        if let Some(deployed) = deployed {
            entry = entry.with_properties(
                deployed
                    .get("Properties")
                    .cloned()
                    .unwrap_or(serde_json::Value::Null),
            );
        }
        if let Some(reason) = &resource.resource_status_reason {
            entry = entry.with_attribute("status_reason", serde_json::json!(reason));
        }
        state.add_resource(&resource.logical_resource_id, entry);
    }

    for output in &description.outputs {
        state.set_output(&output.output_key, &output.output_value);
    }
    if let Some(template) = template {
        state = state.with_template(template.clone());
    }
    state
}

#[async_trait]
impl CloudProvider for AwsProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "AWS CloudFormation"
    }

    async fn check_auth(&self) -> gatewire_cloud::Result<AuthStatus> {
        match self.cli.check_auth().await {
            Ok(identity) => Ok(AuthStatus::ok(identity.account, identity.arn)),
            Err(AwsError::AwsCliNotFound) => Ok(AuthStatus::failed("aws CLI is not installed")),
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn bootstrap(&self, desired: &ResourceSet) -> gatewire_cloud::Result<BootstrapReport> {
        let mut report = BootstrapReport::new();
        check_region(desired, &mut report);

        let auth = self.check_auth().await?;
        match (auth.authenticated, auth.account_id.as_deref()) {
            (true, Some(account)) if account == desired.account => report.pass(
                "identity",
                auth.account_info.clone().unwrap_or_else(|| account.to_string()),
            ),
            (true, Some(account)) => report.fail(
                "identity",
                format!(
                    "credentials belong to account {} but the stack targets {}",
                    account, desired.account
                ),
            ),
            _ => report.fail(
                "identity",
                auth.error
                    .clone()
                    .unwrap_or_else(|| "not authenticated".to_string()),
            ),
        }

        if report.is_ready() {
            self.check_images(desired, &mut report).await?;
        } else {
            report.fail("image", "skipped until the checks above pass");
        }

        Ok(report)
    }

    async fn get_state(&self, stack_name: &str) -> gatewire_cloud::Result<Option<StackState>> {
        let Some(description) = self.cli.describe_stack(stack_name).await? else {
            tracing::debug!("Stack {} is not deployed", stack_name);
            return Ok(None);
        };
        let resources = self.cli.list_stack_resources(stack_name).await?;
        let template = match self.cli.get_template(stack_name).await {
            Ok(template) => Some(template),
            Err(e) => {
                tracing::warn!("Could not read deployed template of {}: {}", stack_name, e);
                None
            }
        };

        Ok(Some(build_stack_state(
            &self.region,
            &description,
            &resources,
            template.as_ref(),
        )))
    }

    async fn apply(
        &self,
        desired: &ResourceSet,
        plan: &Plan,
    ) -> gatewire_cloud::Result<ApplyResult> {
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();
        let action_id = format!("deploy-{}", desired.stack_name);

        if plan.has_changes {
            let path = self.write_template(desired).await?;
            tracing::info!("Deploying stack {} ({})", desired.stack_name, plan.summary());
            match self.cli.deploy(&desired.stack_name, &path).await {
                Ok(()) => result.add_success(
                    action_id,
                    format!("Stack {} deployed", desired.stack_name),
                ),
                Err(e) => result.add_failure(action_id, e.to_string()),
            }
        } else {
            result.add_success(action_id, "No changes to deploy".to_string());
        }

        if result.is_success() {
            if let Some(description) = self.cli.describe_stack(&desired.stack_name).await? {
                for output in description.outputs {
                    result.outputs.insert(output.output_key, output.output_value);
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn destroy_all(&self, stack_name: &str) -> gatewire_cloud::Result<ApplyResult> {
        if self.cli.describe_stack(stack_name).await?.is_none() {
            return Err(CloudError::StackNotFound(stack_name.to_string()));
        }

        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();
        let action_id = format!("delete-{}", stack_name);

        tracing::info!("Deleting stack {}", stack_name);
        match self.cli.delete_stack(stack_name).await {
            Ok(()) => result.add_success(action_id, format!("Stack {} deleted", stack_name)),
            Err(e) => result.add_failure(action_id, e.to_string()),
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awscli::StackOutputEntry;
    use serde_json::json;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("CREATE_COMPLETE"), ResourceStatus::Running);
        assert_eq!(parse_status("UPDATE_COMPLETE"), ResourceStatus::Running);
        assert_eq!(parse_status("CREATE_IN_PROGRESS"), ResourceStatus::Creating);
        assert_eq!(
            parse_status("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"),
            ResourceStatus::Updating
        );
        assert_eq!(parse_status("DELETE_IN_PROGRESS"), ResourceStatus::Deleting);
        assert_eq!(parse_status("DELETE_COMPLETE"), ResourceStatus::Deleted);
        assert_eq!(parse_status("ROLLBACK_COMPLETE"), ResourceStatus::Error);
        assert_eq!(parse_status("CREATE_FAILED"), ResourceStatus::Error);
        assert_eq!(parse_status("SOMETHING_NEW"), ResourceStatus::Unknown);
    }

    #[test]
    fn test_build_stack_state() {
        let description = StackDescription {
            stack_name: "NeelStack".to_string(),
            stack_status: "CREATE_COMPLETE".to_string(),
            stack_status_reason: None,
            outputs: vec![StackOutputEntry {
                output_key: "ApiEndpoint".to_string(),
                output_value: "https://abc123.execute-api.us-east-1.amazonaws.com/prod/"
                    .to_string(),
                description: Some("API Gateway Endpoint".to_string()),
            }],
        };
        let resources = vec![
            StackResource {
                logical_resource_id: "MyVpc".to_string(),
                physical_resource_id: Some("vpc-0abc".to_string()),
                resource_type: "AWS::EC2::VPC".to_string(),
                resource_status: "CREATE_COMPLETE".to_string(),
                resource_status_reason: None,
            },
            StackResource {
                logical_resource_id: "MyVpcIGW".to_string(),
                physical_resource_id: Some("igw-0abc".to_string()),
                resource_type: "AWS::EC2::InternetGateway".to_string(),
                resource_status: "CREATE_COMPLETE".to_string(),
                resource_status_reason: None,
            },
        ];
        let template = json!({
            "Resources": {
                "MyVpc": {
                    "Type": "AWS::EC2::VPC",
                    "Properties": { "CidrBlock": "10.0.0.0/16" }
                },
                "MyVpcIGW": { "Type": "AWS::EC2::InternetGateway" }
            }
        });

        let state = build_stack_state("us-east-1", &description, &resources, Some(&template));
        assert_eq!(state.status, ResourceStatus::Running);
        assert_eq!(state.provider, "aws");
        assert_eq!(state.resources["MyVpc"].id, "vpc-0abc");
        assert_eq!(
            state.resources["MyVpc"].properties,
            Some(json!({ "CidrBlock": "10.0.0.0/16" }))
        );
        assert_eq!(
            state.resources["MyVpcIGW"].properties,
            Some(serde_json::Value::Null)
        );
        assert!(state.output("ApiEndpoint").unwrap().starts_with("https://"));
        assert_eq!(state.template.as_ref(), Some(&template));
        assert_eq!(
            state.deployed_definition("MyVpcIGW"),
            Some(&json!({ "Type": "AWS::EC2::InternetGateway" }))
        );
    }

    fn image_set(region: &str) -> ResourceSet {
        ResourceSet::from_template(
            "NeelStack",
            "851725255821",
            region,
            json!({
                "Resources": { "MyVpc": { "Type": "AWS::EC2::VPC" } },
                "Mappings": {
                    "MyEC2Instance1AmiMap": { "us-east-1": { "ami": "ami-0ba8562d785e35387" } }
                }
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_region_check_uses_image_map() {
        let mut report = BootstrapReport::new();
        check_region(&image_set("us-east-1"), &mut report);
        assert!(report.is_ready());

        let mut report = BootstrapReport::new();
        check_region(&image_set("eu-west-1"), &mut report);
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.name, "region");
        assert!(failure.detail.contains("eu-west-1"));
        assert!(failure.detail.contains("us-east-1"));
    }

    #[tokio::test]
    async fn test_write_template() {
        let temp_dir = tempfile::tempdir().unwrap();
        let provider = AwsProvider::new("us-east-1", None, temp_dir.path());
        let desired = ResourceSet::from_template(
            "NeelStack",
            "851725255821",
            "us-east-1",
            json!({ "Resources": { "MyVpc": { "Type": "AWS::EC2::VPC" } } }),
        )
        .unwrap();

        let path = provider.write_template(&desired).await.unwrap();
        assert!(path.ends_with(".gatewire/out/NeelStack.template.json"));
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, desired.template);
    }
}
