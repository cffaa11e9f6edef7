//! Provider trait definition

use crate::action::{ApplyResult, Plan};
use crate::error::{CloudError, Result};
use crate::state::StackState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deployment engine abstraction
///
/// A provider takes a synthesized template and makes the target account
/// match it. All provisioning (ordering, rollback, waiting) is the engine's
/// job; the provider only hands the template over and reports back.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Provider name (e.g., "aws")
    fn name(&self) -> &str;

    /// Provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Verify the target environment can host `desired`
    async fn bootstrap(&self, desired: &ResourceSet) -> Result<BootstrapReport>;

    /// Deployed state of `stack_name`, `None` when it does not exist
    async fn get_state(&self, stack_name: &str) -> Result<Option<StackState>>;

    /// Diff `desired` against what is deployed
    async fn plan(&self, desired: &ResourceSet) -> Result<Plan> {
        let current = self.get_state(&desired.stack_name).await?;
        Ok(Plan::between(desired, current.as_ref()))
    }

    /// Deploy `desired`; `plan` is what the caller agreed to
    async fn apply(&self, desired: &ResourceSet, plan: &Plan) -> Result<ApplyResult>;

    /// Tear down every resource of `stack_name`
    async fn destroy_all(&self, stack_name: &str) -> Result<ApplyResult>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account the credentials belong to
    pub account_id: Option<String>,

    /// Caller identity (ARN, user name, ...)
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_id: impl Into<String>, account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_id: Some(account_id.into()),
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_id: None,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// One environment check run by `bootstrap`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapReport {
    pub checks: Vec<BootstrapCheck>,
}

impl BootstrapReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pass(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        self.checks.push(BootstrapCheck {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        });
    }

    pub fn fail(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        self.checks.push(BootstrapCheck {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        });
    }

    /// Every check passed
    pub fn is_ready(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &BootstrapCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// The desired stack: its template plus the resources it declares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSet {
    pub stack_name: String,
    pub account: String,
    pub region: String,

    /// Full template body handed to the engine
    pub template: serde_json::Value,

    /// Resources indexed by logical id
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ResourceSet {
    /// Index the `Resources` section of `template`
    pub fn from_template(
        stack_name: impl Into<String>,
        account: impl Into<String>,
        region: impl Into<String>,
        template: serde_json::Value,
    ) -> Result<Self> {
        let entries = template
            .get("Resources")
            .and_then(|r| r.as_object())
            .ok_or_else(|| {
                CloudError::InvalidConfig("template has no Resources section".to_string())
            })?;

        let mut resources = BTreeMap::new();
        for (id, body) in entries {
            let resource_type = body
                .get("Type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| {
                    CloudError::InvalidConfig(format!("resource '{}' has no Type", id))
                })?;
            let properties = body
                .get("Properties")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            resources.insert(
                id.clone(),
                ResourceConfig::new(resource_type, id.as_str(), properties),
            );
        }

        Ok(Self {
            stack_name: stack_name.into(),
            account: account.into(),
            region: region.into(),
            template,
            resources,
        })
    }

    pub fn get(&self, id: &str) -> Option<&ResourceConfig> {
        self.resources.get(id)
    }

    /// Full template entry of `id`, attributes included
    pub fn definition(&self, id: &str) -> Option<&serde_json::Value> {
        self.template.get("Resources").and_then(|r| r.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }

    pub fn by_type(&self, resource_type: &str) -> Vec<&ResourceConfig> {
        self.resources
            .values()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// A single template resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type (e.g., "AWS::EC2::VPC")
    pub resource_type: String,

    /// Logical id
    pub id: String,

    pub properties: serde_json::Value,
}

impl ResourceConfig {
    pub fn new(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        properties: serde_json::Value,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            properties,
        }
    }
}
