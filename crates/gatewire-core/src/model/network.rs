//! Network (VPC) declaration

use crate::error::{Result, StackError};
use crate::model::Token;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// IPv4 address block in CIDR notation (`10.0.0.0/16`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(StackError::InvalidCidr(format!(
                "{}/{}: prefix must be at most 32",
                addr, prefix
            )));
        }
        let cidr = Self { addr, prefix };
        if u32::from(addr) & !cidr.mask() != 0 {
            return Err(StackError::InvalidCidr(format!(
                "{}/{}: host bits must be zero",
                addr, prefix
            )));
        }
        Ok(cidr)
    }

    /// The block matching every IPv4 address
    pub fn any() -> Self {
        Self {
            addr: Ipv4Addr::UNSPECIFIED,
            prefix: 0,
        }
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        }
    }

    /// The `index`-th block of size `/prefix` inside this block
    pub fn subdivide(&self, prefix: u8, index: u32) -> Result<Self> {
        if prefix < self.prefix || prefix > 32 {
            return Err(StackError::InvalidCidr(format!(
                "cannot carve /{} blocks out of {}",
                prefix, self
            )));
        }
        let available = 1u64 << (prefix - self.prefix);
        if u64::from(index) >= available {
            return Err(StackError::InvalidCidr(format!(
                "{} has room for {} /{} blocks, requested block #{}",
                self, available, prefix, index
            )));
        }
        let step = 1u64 << (32 - u32::from(prefix));
        let base = u64::from(u32::from(self.addr)) + u64::from(index) * step;
        // base stays within the parent block, so it fits in u32
        let addr = Ipv4Addr::from(base as u32);
        Self::new(addr, prefix)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| StackError::InvalidCidr(format!("{}: missing '/<prefix>'", s)))?;
        let addr: Ipv4Addr = addr
            .trim()
            .parse()
            .map_err(|_| StackError::InvalidCidr(format!("{}: invalid address", s)))?;
        let prefix: u8 = prefix
            .trim()
            .parse()
            .map_err(|_| StackError::InvalidCidr(format!("{}: invalid prefix", s)))?;
        Self::new(addr, prefix)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = StackError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(cidr: Ipv4Cidr) -> Self {
        cidr.to_string()
    }
}

/// Subnet flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetKind {
    /// Routed to the internet gateway
    Public,
    /// Outbound-only through a NAT gateway in the public subnet
    PrivateWithEgress,
}

impl fmt::Display for SubnetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetKind::Public => write!(f, "public"),
            SubnetKind::PrivateWithEgress => write!(f, "private-with-egress"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// Name used to derive logical ids (`Public`, `Private`)
    pub name: String,
    pub kind: SubnetKind,
    pub cidr: Ipv4Cidr,
}

/// An isolated address space split into public and private subnets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub logical_id: String,
    pub cidr: Ipv4Cidr,
    pub max_azs: u8,
    pub subnets: Vec<Subnet>,
}

impl Network {
    pub fn new(logical_id: impl Into<String>, cidr: Ipv4Cidr, max_azs: u8) -> Self {
        Self {
            logical_id: logical_id.into(),
            cidr,
            max_azs,
            subnets: Vec::new(),
        }
    }

    /// Append a subnet of size `/mask`, allocated right after the previous one
    pub fn with_subnet(
        mut self,
        name: impl Into<String>,
        kind: SubnetKind,
        mask: u8,
    ) -> Result<Self> {
        let index = self.subnets.len() as u32;
        let cidr = self.cidr.subdivide(mask, index)?;
        self.subnets.push(Subnet {
            name: name.into(),
            kind,
            cidr,
        });
        Ok(self)
    }

    pub fn subnet(&self, kind: SubnetKind) -> Option<&Subnet> {
        self.subnets.iter().find(|s| s.kind == kind)
    }

    /// Logical id of the subnet resource inside the synthesized template
    pub fn subnet_logical_id(&self, subnet: &Subnet) -> String {
        format!("{}{}Subnet1", self.logical_id, subnet.name)
    }

    pub fn vpc_id(&self) -> Token {
        Token::reference(&self.logical_id)
    }
}
