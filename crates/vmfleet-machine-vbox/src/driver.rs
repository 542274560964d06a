//! VirtualBox driver implementation

use crate::vboxmanage::Vboxmanage;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use vmfleet_machine::{
    DriverStatus, MachineDriver, MachineError, MachineInfo, MachineState, Result, ShellOutput,
};

/// Shared-folder name registered with VirtualBox for every fleet machine.
const SHARE_NAME: &str = "vmfleet";

/// Guest property prefix for fleet-managed settings.
const GUEST_PROPERTY_PREFIX: &str = "/VMFleet";

/// VirtualBox driver
pub struct VirtualBoxDriver {
    vboxmanage: Vboxmanage,
}

impl Default for VirtualBoxDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualBoxDriver {
    pub fn new() -> Self {
        Self {
            vboxmanage: Vboxmanage::default(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            vboxmanage: Vboxmanage::new(binary),
        }
    }
}

#[async_trait]
impl MachineDriver for VirtualBoxDriver {
    fn name(&self) -> &str {
        "virtualbox"
    }

    fn display_name(&self) -> &str {
        "VirtualBox"
    }

    async fn check_install(&self) -> Result<DriverStatus> {
        match self.vboxmanage.version().await {
            Ok(version) => Ok(DriverStatus::ok(version)),
            Err(MachineError::DriverNotFound(binary)) => Ok(DriverStatus::failed(format!(
                "{binary} not found. Please install VirtualBox"
            ))),
            Err(e) => Ok(DriverStatus::failed(e.to_string())),
        }
    }

    async fn define_machine(&self, name: &str, image: &str) -> Result<()> {
        tracing::info!(machine = name, image, "Defining machine");
        self.vboxmanage.clone_vm(image, name).await
    }

    async fn set_hostname(&self, machine: &str, hostname: &str) -> Result<()> {
        // Picked up by the guest service at boot.
        self.vboxmanage
            .set_guest_property(
                machine,
                &format!("{GUEST_PROPERTY_PREFIX}/hostname"),
                hostname,
            )
            .await
    }

    async fn add_private_network(&self, machine: &str, ip: &str) -> Result<()> {
        let existing = self.vboxmanage.host_only_addresses().await?;
        if existing.iter().any(|addr| addr == ip) {
            return Err(MachineError::NetworkConflict { ip: ip.to_string() });
        }

        self.vboxmanage
            .modify_vm(
                machine,
                &["--nic2", "hostonly", "--hostonlyadapter2", "vboxnet0"],
            )
            .await?;

        self.vboxmanage
            .set_guest_property(machine, &format!("{GUEST_PROPERTY_PREFIX}/Network/ip"), ip)
            .await
    }

    async fn set_resource_limits(
        &self,
        machine: &str,
        cpu_cap_pct: u8,
        memory_mb: u32,
    ) -> Result<()> {
        let cap = cpu_cap_pct.to_string();
        let memory = memory_mb.to_string();
        self.vboxmanage
            .modify_vm(machine, &["--cpuexecutioncap", &cap, "--memory", &memory])
            .await
    }

    async fn mount_shared_folder(&self, machine: &str, host: &Path, guest: &Path) -> Result<()> {
        self.vboxmanage
            .add_shared_folder(
                machine,
                SHARE_NAME,
                &host.to_string_lossy(),
                &guest.to_string_lossy(),
            )
            .await
    }

    async fn start(&self, machine: &str) -> Result<()> {
        tracing::info!(machine, "Starting machine");
        self.vboxmanage.start_vm(machine).await
    }

    async fn halt(&self, machine: &str) -> Result<()> {
        tracing::info!(machine, "Halting machine");
        self.vboxmanage.acpi_power_off(machine).await
    }

    async fn destroy(&self, machine: &str) -> Result<()> {
        tracing::info!(machine, "Destroying machine");
        self.vboxmanage.unregister_vm(machine).await
    }

    async fn run_shell(&self, machine: &str, script: &str) -> Result<ShellOutput> {
        self.vboxmanage.guest_run(machine, script).await
    }

    async fn list_machines(&self) -> Result<Vec<MachineInfo>> {
        let all = self.vboxmanage.list_vms().await?;
        let running: HashSet<String> = self
            .vboxmanage
            .list_running_vms()
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        Ok(all
            .into_iter()
            .map(|(name, id)| {
                let state = if running.contains(&name) {
                    MachineState::Running
                } else {
                    MachineState::PoweredOff
                };
                MachineInfo { id, name, state }
            })
            .collect())
    }
}
