//! Plans and apply results

use crate::provider::ResourceSet;
use crate::state::StackState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Resource type shown for changes to a template section
pub const TEMPLATE_SECTION: &str = "Template";

/// A planned change to one template resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g., "AWS::EC2::VPC")
    pub resource_type: String,

    /// Logical id
    pub resource_id: String,

    pub description: String,

    /// Additional details about the action
    pub details: HashMap<String, serde_json::Value>,
}

impl Action {
    fn new(
        action_type: ActionType,
        resource_type: &str,
        resource_id: &str,
        description: String,
    ) -> Self {
        Self {
            id: format!("{}-{}", action_type, resource_id),
            action_type,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            description,
            details: HashMap::new(),
        }
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub succeeded: Vec<ActionResult>,

    pub failed: Vec<ActionResult>,

    /// Stack outputs reported after the apply
    pub outputs: BTreeMap<String, String>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            outputs: BTreeMap::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: String,

    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Every action needed to bring the deployed stack to the desired one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Diff `desired` against the deployed stack, if any
    ///
    /// Resources are matched by logical id. A changed type is an update the
    /// engine carries out as a replacement. When the deployed template body
    /// is known, resource attributes such as `DependsOn` and the sections
    /// outside `Resources` (`Mappings`, `Outputs`, ...) are compared too.
    pub fn between(desired: &ResourceSet, current: Option<&StackState>) -> Self {
        let mut actions = Vec::new();

        for resource in desired.iter() {
            let deployed = current.and_then(|s| s.resources.get(&resource.id));
            let action = match deployed {
                None => Action::new(
                    ActionType::Create,
                    &resource.resource_type,
                    &resource.id,
                    format!("{} will be created", resource.id),
                ),
                Some(state) if state.resource_type != resource.resource_type => {
                    Action::new(
                        ActionType::Update,
                        &resource.resource_type,
                        &resource.id,
                        format!(
                            "{} will be replaced ({} -> {})",
                            resource.id, state.resource_type, resource.resource_type
                        ),
                    )
                }
                Some(state) => match &state.properties {
                    Some(properties) => {
                        let mut changed = changed_keys(properties, &resource.properties);
                        let definitions = (
                            current.and_then(|s| s.deployed_definition(&resource.id)),
                            desired.definition(&resource.id),
                        );
                        if let (Some(old), Some(new)) = definitions {
                            changed.extend(changed_attributes(old, new));
                        }
                        if changed.is_empty() {
                            Action::new(
                                ActionType::NoOp,
                                &resource.resource_type,
                                &resource.id,
                                format!("{} is up to date", resource.id),
                            )
                        } else {
                            let mut action = Action::new(
                                ActionType::Update,
                                &resource.resource_type,
                                &resource.id,
                                format!(
                                    "{} will be updated ({})",
                                    resource.id,
                                    changed.join(", ")
                                ),
                            );
                            action
                                .details
                                .insert("changed".to_string(), serde_json::json!(changed));
                            action
                        }
                    }
                    None => Action::new(
                        ActionType::Update,
                        &resource.resource_type,
                        &resource.id,
                        format!("{} will be updated (deployed properties unknown)", resource.id),
                    ),
                },
            };
            actions.push(action);
        }

        if let Some(current) = current {
            for (id, state) in &current.resources {
                if desired.get(id).is_none() {
                    actions.push(Action::new(
                        ActionType::Delete,
                        &state.resource_type,
                        id,
                        format!("{} will be deleted", id),
                    ));
                }
            }

            if let Some(deployed_template) = &current.template {
                for section in changed_sections(deployed_template, &desired.template) {
                    actions.push(Action::new(
                        ActionType::Update,
                        TEMPLATE_SECTION,
                        &section,
                        format!("{} section will be updated", section),
                    ));
                }
            }
        }

        Self::new(actions)
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Top-level property names that differ between two property objects
fn changed_keys(deployed: &serde_json::Value, desired: &serde_json::Value) -> Vec<String> {
    if deployed == desired {
        return Vec::new();
    }
    let (Some(old), Some(new)) = (deployed.as_object(), desired.as_object()) else {
        return vec!["Properties".to_string()];
    };
    differing_keys(old, new, &[])
}

/// Resource attributes outside `Type` and `Properties` that differ
fn changed_attributes(deployed: &serde_json::Value, desired: &serde_json::Value) -> Vec<String> {
    let (Some(old), Some(new)) = (deployed.as_object(), desired.as_object()) else {
        return Vec::new();
    };
    differing_keys(old, new, &["Type", "Properties"])
}

/// Template sections other than `Resources` that differ
fn changed_sections(deployed: &serde_json::Value, desired: &serde_json::Value) -> Vec<String> {
    match (deployed.as_object(), desired.as_object()) {
        (Some(old), Some(new)) => differing_keys(old, new, &["Resources"]),
        _ => vec!["Template".to_string()],
    }
}

fn differing_keys(
    old: &serde_json::Map<String, serde_json::Value>,
    new: &serde_json::Map<String, serde_json::Value>,
    skip: &[&str],
) -> Vec<String> {
    let keys: BTreeSet<&String> = old
        .keys()
        .chain(new.keys())
        .filter(|k| !skip.contains(&k.as_str()))
        .collect();
    keys.into_iter()
        .filter(|k| old.get(*k) != new.get(*k))
        .cloned()
        .collect()
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ResourceState, ResourceStatus};
    use serde_json::json;

    fn desired() -> ResourceSet {
        ResourceSet::from_template(
            "NeelStack",
            "851725255821",
            "us-east-1",
            json!({
                "Resources": {
                    "MyVpc": {
                        "Type": "AWS::EC2::VPC",
                        "Properties": { "CidrBlock": "10.0.0.0/16", "EnableDnsSupport": true }
                    },
                    "MySecurityGroup": {
                        "Type": "AWS::EC2::SecurityGroup",
                        "Properties": { "GroupDescription": "Allow HTTP inbound traffic" }
                    },
                    "MyVpcLink": {
                        "Type": "AWS::ApiGateway::VpcLink",
                        "Properties": { "Name": "MyVpcLink" }
                    }
                }
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_nothing_deployed_creates_everything() {
        let plan = Plan::between(&desired(), None);
        assert!(plan.has_changes);
        let summary = plan.summary();
        assert_eq!(summary.create, 3);
        assert_eq!(
            summary.to_string(),
            "3 to create, 0 to update, 0 to delete, 0 unchanged"
        );
    }

    #[test]
    fn test_classifies_each_resource() {
        let mut current = StackState::new("NeelStack", "aws", "us-east-1");
        current.add_resource(
            "MyVpc",
            ResourceState::new("vpc-1", "AWS::EC2::VPC")
                .with_status(ResourceStatus::Running)
                .with_properties(json!({ "CidrBlock": "10.0.0.0/16", "EnableDnsSupport": true })),
        );
        current.add_resource(
            "MySecurityGroup",
            ResourceState::new("sg-1", "AWS::EC2::SecurityGroup")
                .with_properties(json!({ "GroupDescription": "old" })),
        );
        current.add_resource(
            "OldBucket",
            ResourceState::new("bucket-1", "AWS::S3::Bucket"),
        );

        let plan = Plan::between(&desired(), Some(&current));
        let kind_of = |id: &str| {
            plan.actions
                .iter()
                .find(|a| a.resource_id == id)
                .map(|a| a.action_type)
        };

        assert_eq!(kind_of("MyVpc"), Some(ActionType::NoOp));
        assert_eq!(kind_of("MySecurityGroup"), Some(ActionType::Update));
        assert_eq!(kind_of("MyVpcLink"), Some(ActionType::Create));
        assert_eq!(kind_of("OldBucket"), Some(ActionType::Delete));

        let update = plan.actions_by_type(ActionType::Update)[0];
        assert_eq!(update.details["changed"], json!(["GroupDescription"]));
    }

    #[test]
    fn test_type_change_is_replacement() {
        let mut current = StackState::new("NeelStack", "aws", "us-east-1");
        current.add_resource(
            "MyVpcLink",
            ResourceState::new("x", "AWS::ApiGatewayV2::VpcLink")
                .with_properties(json!({ "Name": "MyVpcLink" })),
        );
        let plan = Plan::between(&desired(), Some(&current));
        let action = plan
            .actions
            .iter()
            .find(|a| a.resource_id == "MyVpcLink")
            .unwrap();
        assert_eq!(action.action_type, ActionType::Update);
        assert!(action.description.contains("replaced"));
    }

    #[test]
    fn test_unchanged_plan_has_no_changes() {
        let desired = desired();
        let mut current = StackState::new("NeelStack", "aws", "us-east-1");
        for resource in desired.iter() {
            current.add_resource(
                resource.id.clone(),
                ResourceState::new("p", resource.resource_type.clone())
                    .with_properties(resource.properties.clone()),
            );
        }
        let plan = Plan::between(&desired, Some(&current));
        assert!(!plan.has_changes);
        assert_eq!(plan.summary().no_change, 3);
    }

    fn instance_template(image: &str, depends_on: &str) -> serde_json::Value {
        json!({
            "Resources": {
                "MyEC2Instance1": {
                    "Type": "AWS::EC2::Instance",
                    "Properties": {
                        "InstanceType": "t2.micro",
                        "ImageId": {
                            "Fn::FindInMap": ["MyEC2Instance1AmiMap", { "Ref": "AWS::Region" }, "ami"]
                        }
                    },
                    "DependsOn": [depends_on]
                }
            },
            "Mappings": {
                "MyEC2Instance1AmiMap": { "us-east-1": { "ami": image } }
            }
        })
    }

    fn deployed_from(template: serde_json::Value) -> StackState {
        let deployed = ResourceSet::from_template(
            "NeelStack",
            "851725255821",
            "us-east-1",
            template.clone(),
        )
        .unwrap();
        let mut current =
            StackState::new("NeelStack", "aws", "us-east-1").with_template(template);
        for resource in deployed.iter() {
            current.add_resource(
                resource.id.clone(),
                ResourceState::new("i-0abc", resource.resource_type.clone())
                    .with_properties(resource.properties.clone()),
            );
        }
        current
    }

    #[test]
    fn test_identical_template_has_no_changes() {
        let template =
            instance_template("ami-0ba8562d785e35387", "MyVpcPrivateSubnet1DefaultRoute");
        let current = deployed_from(template.clone());
        let desired =
            ResourceSet::from_template("NeelStack", "851725255821", "us-east-1", template).unwrap();

        let plan = Plan::between(&desired, Some(&current));
        assert!(!plan.has_changes);
    }

    #[test]
    fn test_image_map_change_is_planned() {
        let current = deployed_from(instance_template(
            "ami-0ba8562d785e35387",
            "MyVpcPrivateSubnet1DefaultRoute",
        ));
        let desired = ResourceSet::from_template(
            "NeelStack",
            "851725255821",
            "us-east-1",
            instance_template("ami-0123456789abcdef0", "MyVpcPrivateSubnet1DefaultRoute"),
        )
        .unwrap();

        let plan = Plan::between(&desired, Some(&current));
        assert!(plan.has_changes);
        let section = plan
            .actions
            .iter()
            .find(|a| a.resource_type == TEMPLATE_SECTION)
            .unwrap();
        assert_eq!(section.resource_id, "Mappings");
        assert_eq!(section.action_type, ActionType::Update);

        let instance = plan
            .actions
            .iter()
            .find(|a| a.resource_id == "MyEC2Instance1")
            .unwrap();
        assert_eq!(instance.action_type, ActionType::NoOp);
    }

    #[test]
    fn test_depends_on_change_is_planned() {
        let current = deployed_from(instance_template(
            "ami-0ba8562d785e35387",
            "MyVpcPrivateSubnet1DefaultRoute",
        ));
        let desired = ResourceSet::from_template(
            "NeelStack",
            "851725255821",
            "us-east-1",
            instance_template("ami-0ba8562d785e35387", "MyVpcPublicSubnet1DefaultRoute"),
        )
        .unwrap();

        let plan = Plan::between(&desired, Some(&current));
        let update = plan.actions_by_type(ActionType::Update);
        assert_eq!(update.len(), 1);
        assert_eq!(update[0].resource_id, "MyEC2Instance1");
        assert_eq!(update[0].details["changed"], json!(["DependsOn"]));
    }

    #[test]
    fn test_apply_result() {
        let mut result = ApplyResult::new();
        result.add_success("deploy-NeelStack".to_string(), "done".to_string());
        assert!(result.is_success());
        result.add_failure("deploy-NeelStack".to_string(), "rolled back".to_string());
        assert!(!result.is_success());
    }
}
