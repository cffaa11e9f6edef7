//! AWS provider for gatewire
//!
//! Implements [`gatewire_cloud::CloudProvider`] on top of CloudFormation.
//!
//! # Requirements
//!
//! - `aws` CLI v2 installed and configured (`aws configure` or SSO)
//! - Credentials for the account the stack targets
//!
//! # Example
//!
//! ```ignore
//! use gatewire_cloud::CloudProvider;
//! use gatewire_cloud_aws::AwsProvider;
//!
//! let provider = AwsProvider::new("us-east-1", None, ".");
//! let auth = provider.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//! ```

pub mod awscli;
pub mod error;
pub mod images;
pub mod provider;

pub use error::{AwsError, Result};
pub use provider::{AwsProvider, parse_status};
