//! Ordered resource declarations and the builder that enforces their order

use crate::error::{Result, StackError};
use crate::model::{
    ApiEndpoint, ComputeInstance, GatewayLink, LoadBalancer, Network, SecurityPolicy, StackOutput,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    SecurityPolicy,
    ComputeInstance,
    LoadBalancer,
    GatewayLink,
    ApiEndpoint,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Network,
        ResourceKind::SecurityPolicy,
        ResourceKind::ComputeInstance,
        ResourceKind::LoadBalancer,
        ResourceKind::GatewayLink,
        ResourceKind::ApiEndpoint,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Network => write!(f, "network"),
            ResourceKind::SecurityPolicy => write!(f, "security-policy"),
            ResourceKind::ComputeInstance => write!(f, "compute-instance"),
            ResourceKind::LoadBalancer => write!(f, "load-balancer"),
            ResourceKind::GatewayLink => write!(f, "gateway-link"),
            ResourceKind::ApiEndpoint => write!(f, "api-endpoint"),
        }
    }
}

/// A single resource declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Network(Network),
    SecurityPolicy(SecurityPolicy),
    ComputeInstance(ComputeInstance),
    LoadBalancer(LoadBalancer),
    GatewayLink(GatewayLink),
    ApiEndpoint(ApiEndpoint),
}

impl Declaration {
    pub fn logical_id(&self) -> &str {
        match self {
            Declaration::Network(r) => &r.logical_id,
            Declaration::SecurityPolicy(r) => &r.logical_id,
            Declaration::ComputeInstance(r) => &r.logical_id,
            Declaration::LoadBalancer(r) => &r.logical_id,
            Declaration::GatewayLink(r) => &r.logical_id,
            Declaration::ApiEndpoint(r) => &r.logical_id,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Declaration::Network(_) => ResourceKind::Network,
            Declaration::SecurityPolicy(_) => ResourceKind::SecurityPolicy,
            Declaration::ComputeInstance(_) => ResourceKind::ComputeInstance,
            Declaration::LoadBalancer(_) => ResourceKind::LoadBalancer,
            Declaration::GatewayLink(_) => ResourceKind::GatewayLink,
            Declaration::ApiEndpoint(_) => ResourceKind::ApiEndpoint,
        }
    }

    /// Logical ids of the declarations this one takes parameters from
    pub fn references(&self) -> Vec<&str> {
        match self {
            Declaration::Network(_) => Vec::new(),
            Declaration::SecurityPolicy(r) => r.references(),
            Declaration::ComputeInstance(r) => r.references(),
            Declaration::LoadBalancer(r) => r.references(),
            Declaration::GatewayLink(r) => r.references(),
            Declaration::ApiEndpoint(r) => r.references(),
        }
    }
}

macro_rules! impl_from_resource {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Declaration {
                fn from(resource: $variant) -> Self {
                    Declaration::$variant(resource)
                }
            }
        )*
    };
}

impl_from_resource!(
    Network,
    SecurityPolicy,
    ComputeInstance,
    LoadBalancer,
    GatewayLink,
    ApiEndpoint
);

/// Target account and region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub account: String,
    pub region: String,
}

/// The finished, ordered declaration list handed to the deployment engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
    pub env: Environment,
    pub declarations: Vec<Declaration>,
    pub outputs: Vec<StackOutput>,
}

impl Stack {
    pub fn get(&self, logical_id: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|d| d.logical_id() == logical_id)
    }

    pub fn position(&self, logical_id: &str) -> Option<usize> {
        self.declarations
            .iter()
            .position(|d| d.logical_id() == logical_id)
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(move |d| d.kind() == kind)
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Network(r) => Some(r),
            _ => None,
        })
    }

    pub fn security_policies(&self) -> impl Iterator<Item = &SecurityPolicy> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::SecurityPolicy(r) => Some(r),
            _ => None,
        })
    }

    pub fn load_balancers(&self) -> impl Iterator<Item = &LoadBalancer> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::LoadBalancer(r) => Some(r),
            _ => None,
        })
    }

    pub fn api_endpoints(&self) -> impl Iterator<Item = &ApiEndpoint> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::ApiEndpoint(r) => Some(r),
            _ => None,
        })
    }

    pub fn network(&self, logical_id: &str) -> Option<&Network> {
        self.networks().find(|n| n.logical_id == logical_id)
    }

    pub fn output(&self, name: &str) -> Option<&StackOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }
}

/// Appends declarations one at a time, rejecting anything that would break
/// the declared-before-use order.
#[derive(Debug)]
pub struct StackBuilder {
    name: String,
    env: Environment,
    declarations: Vec<Declaration>,
    outputs: Vec<StackOutput>,
    index: HashMap<String, usize>,
}

impl StackBuilder {
    pub fn new(name: impl Into<String>, env: Environment) -> Self {
        Self {
            name: name.into(),
            env,
            declarations: Vec::new(),
            outputs: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn declare(&mut self, declaration: impl Into<Declaration>) -> Result<()> {
        let declaration = declaration.into();
        let id = declaration.logical_id();

        if self.index.contains_key(id) {
            return Err(StackError::DuplicateResource(id.to_string()));
        }

        for reference in declaration.references() {
            if reference == id {
                return Err(StackError::SelfReference(id.to_string()));
            }
            if !self.index.contains_key(reference) {
                return Err(StackError::UnresolvedReference {
                    resource: id.to_string(),
                    reference: reference.to_string(),
                });
            }
        }

        tracing::debug!(
            "Declared {} '{}' (depends on: [{}])",
            declaration.kind(),
            id,
            declaration.references().join(", ")
        );

        self.index.insert(id.to_string(), self.declarations.len());
        self.declarations.push(declaration);
        Ok(())
    }

    pub fn output(&mut self, output: StackOutput) -> Result<()> {
        if self.outputs.iter().any(|o| o.name == output.name) {
            return Err(StackError::DuplicateOutput(output.name));
        }
        for reference in output.value.references() {
            if !self.index.contains_key(reference) {
                return Err(StackError::UnresolvedReference {
                    resource: output.name.clone(),
                    reference: reference.to_string(),
                });
            }
        }
        self.outputs.push(output);
        Ok(())
    }

    pub fn build(self) -> Stack {
        Stack {
            name: self.name,
            env: self.env,
            declarations: self.declarations,
            outputs: self.outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        EndpointType, HealthCheck, HealthCheckProtocol, MachineImage, OutputValue, SubnetKind,
        TargetGroup,
    };
    use std::time::Duration;

    fn env() -> Environment {
        Environment {
            account: "123456789012".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    fn network() -> Network {
        Network::new("Vpc", "10.0.0.0/16".parse().unwrap(), 1)
            .with_subnet("Private", SubnetKind::PrivateWithEgress, 24)
            .unwrap()
    }

    #[test]
    fn test_declare_in_order() {
        let network = network();
        let sg = SecurityPolicy::new("Sg", &network, "test", true);

        let mut builder = StackBuilder::new("Test", env());
        builder.declare(network).unwrap();
        builder.declare(sg).unwrap();

        let stack = builder.build();
        assert_eq!(stack.declarations.len(), 2);
        assert_eq!(stack.position("Vpc"), Some(0));
        assert_eq!(stack.position("Sg"), Some(1));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let network = network();
        let sg = SecurityPolicy::new("Sg", &network, "test", true);

        let mut builder = StackBuilder::new("Test", env());
        let err = builder.declare(sg).unwrap_err();
        assert!(matches!(
            err,
            StackError::UnresolvedReference { ref resource, ref reference }
                if resource == "Sg" && reference == "Vpc"
        ));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut builder = StackBuilder::new("Test", env());
        builder.declare(network()).unwrap();
        let err = builder.declare(network()).unwrap_err();
        assert!(matches!(err, StackError::DuplicateResource(ref id) if id == "Vpc"));
    }

    #[test]
    fn test_self_reference_rejected() {
        let network = network();
        let sg = SecurityPolicy::new("Sg", &network, "test", true);
        let instance = ComputeInstance::new(
            "Box",
            &network,
            &sg,
            "t2.micro",
            MachineImage::default(),
            SubnetKind::PrivateWithEgress,
        );
        let mut nlb = LoadBalancer::new("Nlb", &network, false, true);
        nlb.add_listener(
            "Listener",
            80,
            TargetGroup::new(
                "Tg",
                80,
                &[&instance],
                HealthCheck {
                    path: "/".to_string(),
                    port: "80".to_string(),
                    protocol: HealthCheckProtocol::Http,
                    interval: Duration::from_secs(30),
                    timeout: Duration::from_secs(10),
                },
            ),
        );
        // a balancer whose target is itself
        nlb.listeners[0].target_group.targets = vec!["Nlb".to_string()];

        let mut builder = StackBuilder::new("Test", env());
        builder.declare(network).unwrap();
        let err = builder.declare(nlb).unwrap_err();
        assert!(matches!(err, StackError::SelfReference(ref id) if id == "Nlb"));
    }

    #[test]
    fn test_output_must_reference_declared_api() {
        let api = ApiEndpoint::new("Api", EndpointType::Regional, "prod");
        let mut builder = StackBuilder::new("Test", env());

        let err = builder
            .output(StackOutput::new("Url", OutputValue::api_url(&api, "us-east-1")))
            .unwrap_err();
        assert!(matches!(err, StackError::UnresolvedReference { .. }));

        builder.declare(api.clone()).unwrap();
        builder
            .output(StackOutput::new("Url", OutputValue::api_url(&api, "us-east-1")))
            .unwrap();
        let err = builder
            .output(StackOutput::new("Url", OutputValue::literal("x")))
            .unwrap_err();
        assert!(matches!(err, StackError::DuplicateOutput(_)));
    }
}
