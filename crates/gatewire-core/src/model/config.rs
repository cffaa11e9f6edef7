//! Stack configuration
//!
//! Every value has a built-in default; `stack.kdl` and CLI flags only
//! override what they name.

use crate::error::{Result, StackError};
use crate::model::{Environment, Ipv4Cidr, MachineImage};
use crate::scripts;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_STACK_NAME: &str = "NeelStack";
pub const DEFAULT_ACCOUNT: &str = "851725255821";
pub const DEFAULT_REGION: &str = "us-east-1";
/// Ubuntu 20.04 LTS in us-east-1
pub const DEFAULT_IMAGE_ID: &str = "ami-0ba8562d785e35387";
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";
pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";
pub const DEFAULT_SUBNET_MASK: u8 = 24;
pub const DEFAULT_ROUTE: &str = "mynlb";
pub const DEFAULT_STAGE: &str = "prod";
pub const DEFAULT_BOOT_SCRIPT: &str = "nginx";

pub const HTTP_PORT: u16 = 80;
pub const HEALTH_CHECK_PATH: &str = "/";
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    pub name: String,
    pub account: String,
    pub region: String,
    /// Machine image id per region
    pub images: BTreeMap<String, String>,
    pub instance_type: String,
    pub vpc_cidr: String,
    pub subnet_mask: u8,
    /// Path segment the API exposes under its root
    pub route: String,
    /// API deployment stage name
    pub stage: String,
    /// Name of the built-in boot script run on the instance
    pub boot_script: String,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_STACK_NAME.to_string(),
            account: DEFAULT_ACCOUNT.to_string(),
            region: DEFAULT_REGION.to_string(),
            images: BTreeMap::from([(DEFAULT_REGION.to_string(), DEFAULT_IMAGE_ID.to_string())]),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            vpc_cidr: DEFAULT_VPC_CIDR.to_string(),
            subnet_mask: DEFAULT_SUBNET_MASK,
            route: DEFAULT_ROUTE.to_string(),
            stage: DEFAULT_STAGE.to_string(),
            boot_script: DEFAULT_BOOT_SCRIPT.to_string(),
        }
    }
}

impl StackConfig {
    pub fn env(&self) -> Environment {
        Environment {
            account: self.account.clone(),
            region: self.region.clone(),
        }
    }

    pub fn machine_image(&self) -> MachineImage {
        MachineImage::generic_linux(self.images.clone())
    }

    /// Image id for the configured region
    pub fn image_id(&self) -> Result<String> {
        self.machine_image()
            .image_for(&self.region)
            .map(|s| s.to_string())
    }

    pub fn vpc_cidr(&self) -> Result<Ipv4Cidr> {
        self.vpc_cidr.parse()
    }

    pub fn boot_script(&self) -> Result<&'static str> {
        scripts::get_builtin_script(&self.boot_script).ok_or_else(|| {
            StackError::InvalidConfig(format!("unknown boot script: '{}'", self.boot_script))
        })
    }

    /// Check the values that the sequencer cannot repair on its own
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(StackError::InvalidConfig(
                "stack name must not be empty".to_string(),
            ));
        }
        if self.account.len() != 12 || !self.account.chars().all(|c| c.is_ascii_digit()) {
            return Err(StackError::InvalidConfig(format!(
                "account id must be 12 digits: '{}'",
                self.account
            )));
        }
        if !is_name(&self.route, &['-', '_', '.']) {
            return Err(StackError::InvalidConfig(format!(
                "route must be a single path segment of letters, digits, '-', '_' or '.': '{}'",
                self.route
            )));
        }
        if !is_name(&self.stage, &['-', '_']) {
            return Err(StackError::InvalidConfig(format!(
                "stage name must be letters, digits, '-' or '_': '{}'",
                self.stage
            )));
        }
        self.vpc_cidr()?;
        self.image_id()?;
        self.boot_script()?;
        Ok(())
    }
}

/// At least one ASCII letter or digit, and nothing outside `extra`
fn is_name(value: &str, extra: &[char]) -> bool {
    value.chars().any(|c| c.is_ascii_alphanumeric())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || extra.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StackConfig::default();
        config.validate().unwrap();
        assert_eq!(config.image_id().unwrap(), DEFAULT_IMAGE_ID);
        assert!(HEALTH_CHECK_INTERVAL > HEALTH_CHECK_TIMEOUT);
    }

    #[test]
    fn test_unsupported_region() {
        let config = StackConfig {
            region: "ap-northeast-1".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StackError::UnsupportedRegion { .. })
        ));
    }

    #[test]
    fn test_invalid_account() {
        let config = StackConfig {
            account: "12345".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StackError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_boot_script() {
        let config = StackConfig {
            boot_script: "apache".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StackError::InvalidConfig(_))));
    }

    #[test]
    fn test_route_must_be_single_segment() {
        let config = StackConfig {
            route: "a/b".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_route_and_stage_characters() {
        let config = StackConfig {
            route: "my-nlb".to_string(),
            stage: "dev_1".to_string(),
            ..Default::default()
        };
        config.validate().unwrap();

        let rejected = [
            ("-", "prod"),
            ("mynlb", "--"),
            ("my nlb", "prod"),
            ("mynlb", "v1.0"),
        ];
        for (route, stage) in rejected {
            let config = StackConfig {
                route: route.to_string(),
                stage: stage.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(StackError::InvalidConfig(_))),
                "route {:?} stage {:?} should be rejected",
                route,
                stage
            );
        }
    }
}
