//! Security group declaration

use crate::model::{Ipv4Cidr, Network, Token};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traffic source of an ingress rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Peer {
    AnyIpv4,
    Cidr(Ipv4Cidr),
}

impl Peer {
    pub fn cidr(&self) -> Ipv4Cidr {
        match self {
            Peer::AnyIpv4 => Ipv4Cidr::any(),
            Peer::Cidr(cidr) => *cidr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub peer: Peer,
    pub protocol: Protocol,
    pub port: u16,
    pub description: String,
}

/// Firewall policy attached to the compute instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub logical_id: String,
    /// Logical id of the owning network
    pub network: String,
    pub description: String,
    pub ingress: Vec<IngressRule>,
    pub allow_all_outbound: bool,
}

impl SecurityPolicy {
    pub fn new(
        logical_id: impl Into<String>,
        network: &Network,
        description: impl Into<String>,
        allow_all_outbound: bool,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            network: network.logical_id.clone(),
            description: description.into(),
            ingress: Vec::new(),
            allow_all_outbound,
        }
    }

    pub fn add_ingress_rule(
        &mut self,
        peer: Peer,
        protocol: Protocol,
        port: u16,
        description: impl Into<String>,
    ) {
        self.ingress.push(IngressRule {
            peer,
            protocol,
            port,
            description: description.into(),
        });
    }

    pub fn group_id(&self) -> Token {
        Token::attr(&self.logical_id, "GroupId")
    }

    pub fn references(&self) -> Vec<&str> {
        vec![self.network.as_str()]
    }
}
