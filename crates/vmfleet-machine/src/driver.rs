//! Virtualization driver trait definition

use crate::error::Result;
use crate::machine::{MachineInfo, ShellOutput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Virtualization driver abstraction
///
/// All hypervisor backends implement this trait to provide a unified
/// interface for defining, configuring and controlling machines. Every
/// operation is an external-process invocation and therefore blocking
/// from the hypervisor's point of view; callers decide how machines
/// are scheduled.
#[async_trait]
pub trait MachineDriver: Send + Sync {
    /// Returns the driver name (e.g., "virtualbox")
    fn name(&self) -> &str;

    /// Returns the driver display name for operator output
    fn display_name(&self) -> &str;

    /// Check that the driver CLI is installed and responding
    async fn check_install(&self) -> Result<DriverStatus>;

    /// Create a machine from a registered base image
    async fn define_machine(&self, name: &str, image: &str) -> Result<()>;

    /// Set the guest hostname
    async fn set_hostname(&self, machine: &str, hostname: &str) -> Result<()>;

    /// Attach a private network interface with a static IPv4 address
    async fn add_private_network(&self, machine: &str, ip: &str) -> Result<()>;

    /// Apply a CPU execution cap (percent) and a memory limit (MB)
    async fn set_resource_limits(&self, machine: &str, cpu_cap_pct: u8, memory_mb: u32)
    -> Result<()>;

    /// Mount a host directory into the guest
    async fn mount_shared_folder(&self, machine: &str, host: &Path, guest: &Path) -> Result<()>;

    /// Boot the machine
    async fn start(&self, machine: &str) -> Result<()>;

    /// Graceful power-off
    async fn halt(&self, machine: &str) -> Result<()>;

    /// Unregister the machine and delete its media
    async fn destroy(&self, machine: &str) -> Result<()>;

    /// Execute a shell script inside the guest
    async fn run_shell(&self, machine: &str, script: &str) -> Result<ShellOutput>;

    /// List all machines known to the driver
    async fn list_machines(&self) -> Result<Vec<MachineInfo>>;
}

/// Result of a driver installation check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverStatus {
    /// Whether the driver CLI is usable
    pub available: bool,

    /// Driver version string if available
    pub version: Option<String>,

    /// Error message if not usable
    pub error: Option<String>,
}

impl DriverStatus {
    pub fn ok(version: impl Into<String>) -> Self {
        Self {
            available: true,
            version: Some(version.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            available: false,
            version: None,
            error: Some(error.into()),
        }
    }
}
