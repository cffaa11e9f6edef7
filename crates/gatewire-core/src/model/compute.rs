//! EC2 instance declaration

use crate::error::{Result, StackError};
use crate::model::{Network, SecurityPolicy, SubnetKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Region-keyed machine image lookup (a generic Linux AMI per region)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineImage {
    images: BTreeMap<String, String>,
}

impl MachineImage {
    pub fn generic_linux(images: BTreeMap<String, String>) -> Self {
        Self { images }
    }

    pub fn image_for(&self, region: &str) -> Result<&str> {
        self.images
            .get(region)
            .map(|s| s.as_str())
            .ok_or_else(|| StackError::UnsupportedRegion {
                region: region.to_string(),
                available: self.regions().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.images.iter().map(|(r, i)| (r.as_str(), i.as_str()))
    }
}

/// Commands executed once at first boot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    commands: Vec<String>,
}

impl UserData {
    pub fn for_linux() -> Self {
        Self::default()
    }

    /// Add a multi-line script; blank lines and surrounding indentation are dropped
    pub fn add_commands(&mut self, script: &str) {
        self.commands.extend(
            script
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn render(&self) -> String {
        let mut script = String::from("#!/bin/bash");
        for command in &self.commands {
            script.push('\n');
            script.push_str(command);
        }
        script
    }
}

/// Virtual machine placed in one of the network's subnets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeInstance {
    pub logical_id: String,
    /// Logical id of the network the instance is placed in
    pub network: String,
    /// Logical id of the attached security policy
    pub security_policy: String,
    pub instance_type: String,
    pub image: MachineImage,
    pub subnet: SubnetKind,
    pub user_data: UserData,
}

impl ComputeInstance {
    pub fn new(
        logical_id: impl Into<String>,
        network: &Network,
        security_policy: &SecurityPolicy,
        instance_type: impl Into<String>,
        image: MachineImage,
        subnet: SubnetKind,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            network: network.logical_id.clone(),
            security_policy: security_policy.logical_id.clone(),
            instance_type: instance_type.into(),
            image,
            subnet,
            user_data: UserData::for_linux(),
        }
    }

    pub fn references(&self) -> Vec<&str> {
        vec![self.network.as_str(), self.security_policy.as_str()]
    }
}
