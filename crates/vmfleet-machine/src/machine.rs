//! Machine state types shared by all drivers.

use serde::{Deserialize, Serialize};

/// Run state of a defined machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    Running,
    PoweredOff,
    Saved,
    Aborted,
    Unknown,
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineState::Running => write!(f, "running"),
            MachineState::PoweredOff => write!(f, "powered off"),
            MachineState::Saved => write!(f, "saved"),
            MachineState::Aborted => write!(f, "aborted"),
            MachineState::Unknown => write!(f, "unknown"),
        }
    }
}

/// One machine as reported by the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    /// Driver-side identifier (UUID for VirtualBox).
    pub id: String,
    /// Machine name, equal to the node hostname for fleet machines.
    pub name: String,
    pub state: MachineState,
}

impl MachineInfo {
    pub fn is_running(&self) -> bool {
        self.state == MachineState::Running
    }
}

/// Captured output of a guest shell invocation.
#[derive(Debug, Clone, Default)]
pub struct ShellOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Diagnostic text for operator-facing error reports: stderr when
    /// present, stdout otherwise.
    pub fn diagnostic(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}
