//! Network Load Balancer declaration

use crate::model::{ComputeInstance, Network, Token};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthCheckProtocol {
    Http,
    Https,
    Tcp,
}

impl fmt::Display for HealthCheckProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthCheckProtocol::Http => write!(f, "HTTP"),
            HealthCheckProtocol::Https => write!(f, "HTTPS"),
            HealthCheckProtocol::Tcp => write!(f, "TCP"),
        }
    }
}

/// Health probe the load balancer runs against its targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    /// Port as the engine expects it ("80" or "traffic-port")
    pub port: String,
    pub protocol: HealthCheckProtocol,
    pub interval: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub logical_id: String,
    pub port: u16,
    /// Logical ids of the registered instances
    pub targets: Vec<String>,
    pub health_check: HealthCheck,
}

impl TargetGroup {
    pub fn new(
        logical_id: impl Into<String>,
        port: u16,
        targets: &[&ComputeInstance],
        health_check: HealthCheck,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            port,
            targets: targets.iter().map(|t| t.logical_id.clone()).collect(),
            health_check,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub logical_id: String,
    pub port: u16,
    pub target_group: TargetGroup,
}

/// Traffic distributor forwarding TCP connections to healthy targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub logical_id: String,
    /// Logical id of the network the balancer lives in
    pub network: String,
    pub internet_facing: bool,
    pub cross_zone_enabled: bool,
    pub listeners: Vec<Listener>,
}

impl LoadBalancer {
    pub fn new(
        logical_id: impl Into<String>,
        network: &Network,
        internet_facing: bool,
        cross_zone_enabled: bool,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            network: network.logical_id.clone(),
            internet_facing,
            cross_zone_enabled,
            listeners: Vec::new(),
        }
    }

    /// Add a listener on `port` forwarding to `target_group`
    pub fn add_listener(&mut self, name: &str, port: u16, target_group: TargetGroup) {
        self.listeners.push(Listener {
            logical_id: format!("{}{}", self.logical_id, name),
            port,
            target_group,
        });
    }

    pub fn dns_name(&self) -> Token {
        Token::attr(&self.logical_id, "DNSName")
    }

    pub fn arn(&self) -> Token {
        Token::reference(&self.logical_id)
    }

    pub fn references(&self) -> Vec<&str> {
        let mut refs = vec![self.network.as_str()];
        for listener in &self.listeners {
            for target in &listener.target_group.targets {
                if !refs.contains(&target.as_str()) {
                    refs.push(target.as_str());
                }
            }
        }
        refs
    }
}
