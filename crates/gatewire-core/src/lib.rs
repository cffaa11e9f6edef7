//! gatewire core
//!
//! Declares the resources of the gatewire stack (VPC, security group, EC2
//! instance, internal Network Load Balancer, VPC link and REST API) as plain
//! immutable records, orders them so that every resource only references
//! resources declared before it, and renders the result as a CloudFormation
//! template for the deployment engine.
//!
//! ```text
//! StackConfig ──► sequencer::sequence ──► Stack ──► template::synthesize ──► Template
//!                                           │
//!                                           ├──► graph::DependencyGraph (deploy / teardown order)
//!                                           └──► validate::validate_stack
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gatewire_core::{sequence, synthesize, StackConfig};
//!
//! let stack = sequence(&StackConfig::default())?;
//! let template = synthesize(&stack)?;
//! println!("{}", template.to_json_string()?);
//! ```

pub mod error;
pub mod graph;
pub mod model;
pub mod parser;
pub mod scripts;
pub mod sequencer;
pub mod template;
pub mod validate;

pub use error::{Result, StackError};
pub use graph::DependencyGraph;
pub use model::*;
pub use parser::{parse_stack_file, parse_stack_string};
pub use sequencer::sequence;
pub use template::{Template, synthesize};
pub use validate::{Violation, check_stack, validate_stack};
