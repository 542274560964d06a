//! VBoxManage CLI wrapper
//!
//! Wraps the VBoxManage CLI commands used to define and control fleet
//! machines.

use std::process::Stdio;
use tokio::process::Command;
use vmfleet_machine::{MachineError, Result, ShellOutput};

/// VBoxManage CLI wrapper
pub struct Vboxmanage {
    binary: String,
}

impl Default for Vboxmanage {
    fn default() -> Self {
        Self::new("VBoxManage")
    }
}

impl Vboxmanage {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check if VBoxManage is installed and report its version
    pub async fn version(&self) -> Result<String> {
        let which = Command::new("which").arg(&self.binary).output().await?;

        if !which.status.success() {
            return Err(MachineError::DriverNotFound(self.binary.clone()));
        }

        let version = self.run_command(&["--version"]).await?;
        Ok(version.trim().to_string())
    }

    /// Run a VBoxManage command and return stdout
    pub async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}", self.binary, args.join(" "));

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MachineError::CommandFailed(stderr.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Clone a registered base image into a new machine
    pub async fn clone_vm(&self, image: &str, name: &str) -> Result<()> {
        self.run_command(&["clonevm", image, "--name", name, "--register"])
            .await
            .map_err(|e| match e {
                MachineError::CommandFailed(stderr)
                    if stderr.contains("Could not find a registered machine") =>
                {
                    MachineError::ImageNotFound(image.to_string())
                }
                MachineError::CommandFailed(stderr) if stderr.contains("already exists") => {
                    MachineError::MachineAlreadyExists(name.to_string())
                }
                other => other,
            })?;
        Ok(())
    }

    /// Apply modifyvm settings (machine must be powered off)
    pub async fn modify_vm(&self, machine: &str, args: &[&str]) -> Result<()> {
        let mut full = vec!["modifyvm", machine];
        full.extend_from_slice(args);
        self.run_command(&full).await.map_err(not_found(machine))?;
        Ok(())
    }

    /// Set a guest property
    pub async fn set_guest_property(&self, machine: &str, key: &str, value: &str) -> Result<()> {
        self.run_command(&["guestproperty", "set", machine, key, value])
            .await
            .map_err(not_found(machine))?;
        Ok(())
    }

    /// Attach a host directory as an automounted shared folder
    ///
    /// Re-registering a share that already exists is treated as success,
    /// so repeated runs against the same machine do not fail here.
    pub async fn add_shared_folder(
        &self,
        machine: &str,
        name: &str,
        host_path: &str,
        mount_point: &str,
    ) -> Result<()> {
        let result = self
            .run_command(&[
                "sharedfolder",
                "add",
                machine,
                "--name",
                name,
                "--hostpath",
                host_path,
                "--automount",
                "--auto-mount-point",
                mount_point,
            ])
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(MachineError::CommandFailed(stderr)) if stderr.contains("already exists") => Ok(()),
            Err(e) => Err(not_found(machine)(e)),
        }
    }

    /// Boot a machine headless
    pub async fn start_vm(&self, machine: &str) -> Result<()> {
        self.run_command(&["startvm", machine, "--type", "headless"])
            .await
            .map_err(not_found(machine))?;
        Ok(())
    }

    /// Send an ACPI power button event
    pub async fn acpi_power_off(&self, machine: &str) -> Result<()> {
        self.run_command(&["controlvm", machine, "acpipowerbutton"])
            .await
            .map_err(not_found(machine))?;
        Ok(())
    }

    /// Unregister a machine and delete its media
    pub async fn unregister_vm(&self, machine: &str) -> Result<()> {
        self.run_command(&["unregistervm", machine, "--delete"])
            .await
            .map_err(not_found(machine))?;
        Ok(())
    }

    /// IPv4 addresses of the existing host-only interfaces
    pub async fn host_only_addresses(&self) -> Result<Vec<String>> {
        let output = self.run_command(&["list", "hostonlyifs"]).await?;
        Ok(parse_host_only_addresses(&output))
    }

    /// Names of all registered machines
    pub async fn list_vms(&self) -> Result<Vec<(String, String)>> {
        let output = self.run_command(&["list", "vms"]).await?;
        Ok(parse_vm_list(&output))
    }

    /// Names of the machines currently running
    pub async fn list_running_vms(&self) -> Result<Vec<(String, String)>> {
        let output = self.run_command(&["list", "runningvms"]).await?;
        Ok(parse_vm_list(&output))
    }

    /// Execute a shell script in the guest and capture its output
    ///
    /// A non-zero guest exit status is not an error here; the caller
    /// inspects [`ShellOutput::status`].
    pub async fn guest_run(&self, machine: &str, script: &str) -> Result<ShellOutput> {
        let mut cmd = Command::new(&self.binary);
        cmd.args([
            "guestcontrol",
            machine,
            "run",
            "--exec",
            "/bin/sh",
            "--wait-stdout",
            "--wait-stderr",
            "--",
            "sh",
            "-c",
            script,
        ]);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(machine, "Running guest script");

        let output = cmd.output().await?;

        Ok(ShellOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Map "Could not find a registered machine" onto MachineNotFound.
fn not_found(machine: &str) -> impl FnOnce(MachineError) -> MachineError {
    let machine = machine.to_string();
    move |e| match e {
        MachineError::CommandFailed(stderr)
            if stderr.contains("Could not find a registered machine") =>
        {
            MachineError::MachineNotFound(machine)
        }
        other => other,
    }
}

/// Parse `VBoxManage list vms` output.
///
/// Each line has the form `"name" {uuid}`.
pub fn parse_vm_list(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let (name, uuid) = line.rsplit_once(' ')?;
            let name = name.trim().strip_prefix('"')?.strip_suffix('"')?;
            let uuid = uuid.trim().strip_prefix('{')?.strip_suffix('}')?;
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), uuid.to_string()))
        })
        .collect()
}

/// Extract `IPAddress:` values from `VBoxManage list hostonlyifs` output.
pub fn parse_host_only_addresses(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix("IPAddress:")?;
            let ip = rest.trim();
            if ip.is_empty() {
                None
            } else {
                Some(ip.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_list() {
        let output = r#""client" {9a2b6f7e-1111-2222-3333-444455556666}
"infra0" {0f0f0f0f-aaaa-bbbb-cccc-ddddeeeeffff}
"#;
        let vms = parse_vm_list(output);
        assert_eq!(vms.len(), 2);
        assert_eq!(vms[0].0, "client");
        assert_eq!(vms[0].1, "9a2b6f7e-1111-2222-3333-444455556666");
        assert_eq!(vms[1].0, "infra0");
    }

    #[test]
    fn test_parse_vm_list_with_spaces_in_name() {
        let vms = parse_vm_list("\"base image 7.1\" {1234}\n");
        assert_eq!(vms.len(), 1);
        assert_eq!(vms[0].0, "base image 7.1");
    }

    #[test]
    fn test_parse_vm_list_empty() {
        assert!(parse_vm_list("").is_empty());
        assert!(parse_vm_list("\n\n").is_empty());
    }

    #[test]
    fn test_parse_host_only_addresses() {
        let output = r#"Name:            vboxnet0
GUID:            786f6276-656e-4074-8000-0a0027000000
DHCP:            Disabled
IPAddress:       192.168.56.1
NetworkMask:     255.255.255.0
Name:            vboxnet1
IPAddress:       10.0.3.1
"#;
        let addresses = parse_host_only_addresses(output);
        assert_eq!(addresses, vec!["192.168.56.1", "10.0.3.1"]);
    }
}
