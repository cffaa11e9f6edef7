//! Resource model
//!
//! Plain immutable records for every resource the stack declares.
//! Each resource kind lives in its own module.

mod balancer;
mod compute;
mod config;
mod gateway;
mod network;
mod output;
mod security;
mod stack;
mod token;

// Re-exports
pub use balancer::*;
pub use compute::*;
pub use config::*;
pub use gateway::*;
pub use network::*;
pub use output::*;
pub use security::*;
pub use stack::*;
pub use token::*;
