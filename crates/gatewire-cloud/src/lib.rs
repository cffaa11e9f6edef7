//! gatewire deployment layer
//!
//! Provider abstraction between the synthesized template and the engine
//! that provisions it.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 gatewire CLI                  │
//! │     (bootstrap / diff / deploy / destroy)     │
//! └─────────────────────┬────────────────────────┘
//!                       │ ResourceSet (template)
//! ┌─────────────────────▼────────────────────────┐
//! │                gatewire-cloud                 │
//! │  ┌────────────────────────────────────────┐  │
//! │  │  trait CloudProvider { ... }           │  │
//! │  └────────────────────────────────────────┘  │
//! │  ┌──────────────┐  ┌──────────────────────┐  │
//! │  │ Plan / diff  │  │ State (.gatewire/)   │  │
//! │  └──────────────┘  └──────────────────────┘  │
//! └─────────────────────┬────────────────────────┘
//!                       │
//!               ┌───────▼────────┐
//!               │  aws provider  │
//!               │ CloudFormation │
//!               └────────────────┘
//! ```

pub mod action;
pub mod error;
pub mod provider;
pub mod state;

pub use action::{
    Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary, TEMPLATE_SECTION,
};
pub use error::{CloudError, Result};
pub use provider::{
    AuthStatus, BootstrapCheck, BootstrapReport, CloudProvider, ResourceConfig, ResourceSet,
};
pub use state::{GlobalState, ResourceState, ResourceStatus, StackState, StateLock, StateManager};
