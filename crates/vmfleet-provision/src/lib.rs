//! vmfleet provisioning orchestrator
//!
//! Ties the validated fleet model to a virtualization driver and a
//! policy engine. The [`FleetLoader`] is a one-shot, idempotent-intent
//! pipeline: materialize every machine, bootstrap the agent, then
//! converge each machine against the declared environment.

pub mod error;
pub mod loader;
pub mod policy;
pub mod scripts;

// Re-exports
pub use error::{ProvisionError, Result};
pub use loader::{BOOTSTRAP_ATTEMPTS, FleetLoader, NodeOutcome, RunReport};
pub use policy::{ChefSolo, PolicyEngine};
pub use scripts::{BootstrapScript, CHEF_INSTALL, CHEF_KEY_IMPORT};
