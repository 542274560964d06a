//! vmfleet virtualization driver abstraction
//!
//! This crate defines the seam between the fleet provisioner and the
//! hypervisor. The provisioning layer only ever talks to a
//! [`MachineDriver`]; concrete backends (VirtualBox via `VBoxManage`)
//! live in their own crates.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               vmfleet CLI               │
//! │          (vmfleet up/destroy)           │
//! └───────────────────┬─────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────┐
//! │            vmfleet-provision            │
//! │   FleetLoader { materialize, ... }      │
//! └───────────────────┬─────────────────────┘
//!                     │ trait MachineDriver
//! ┌───────────────────▼─────────────────────┐
//! │          vmfleet-machine-vbox           │
//! │          (VBoxManage wrapper)           │
//! └─────────────────────────────────────────┘
//! ```

pub mod driver;
pub mod error;
pub mod machine;

// Re-exports
pub use driver::{DriverStatus, MachineDriver};
pub use error::{MachineError, Result};
pub use machine::{MachineInfo, MachineState, ShellOutput};
