use crate::error::{FleetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Effective memory when a node does not declare `ram`.
pub const DEFAULT_RAM_MB: u32 = 256;

/// CPU execution cap applied to every machine, in percent.
pub const CPU_CAP_PCT: u8 = 40;

/// Guest-side mount point of the shared project folder.
pub const GUEST_SHARE_PATH: &str = "/vmfleet";

/// Declarative description of one virtual machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Machine name, unique within the fleet.
    pub hostname: String,
    /// Static private-network IPv4 address, unique within the fleet.
    pub ip: String,
    /// Identifier of the base VM image.
    #[serde(rename = "box")]
    pub box_image: String,
    /// Memory in megabytes. `None` falls back to [`DEFAULT_RAM_MB`].
    pub ram: Option<u32>,
}

impl NodeSpec {
    pub fn effective_ram(&self) -> u32 {
        self.ram.unwrap_or(DEFAULT_RAM_MB)
    }
}

/// Policy-engine settings applied to every machine after materialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Named environment the policy engine converges against.
    pub environment: String,
    /// Directory containing environment definitions, relative to the
    /// project root.
    pub environments_path: PathBuf,
    /// Directory containing cookbooks, relative to the project root.
    pub cookbooks_path: PathBuf,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
            environments_path: PathBuf::from("environments"),
            cookbooks_path: PathBuf::from("cookbooks"),
        }
    }
}

/// Host directory mounted read-shared into every guest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedFolder {
    pub host: PathBuf,
    pub guest: PathBuf,
}

impl Default for SharedFolder {
    fn default() -> Self {
        Self {
            host: PathBuf::from("."),
            guest: PathBuf::from(GUEST_SHARE_PATH),
        }
    }
}

/// Raw parse result of a `fleet.kdl` file, before validation.
#[derive(Debug, Clone, Default)]
pub struct FleetDoc {
    pub name: String,
    pub nodes: Vec<NodeSpec>,
    pub provision: ProvisionConfig,
    pub shared_folder: SharedFolder,
}

impl FleetDoc {
    /// Freeze the document into a validated [`Fleet`].
    ///
    /// Rejects duplicate hostnames, duplicate IPs and unparseable IPs.
    /// Runs before any driver call is issued, so a bad fleet produces
    /// no side effects at all.
    pub fn validate(self) -> Result<Fleet> {
        let mut hostnames = HashSet::new();
        let mut ips: HashMap<&str, &str> = HashMap::new();

        for node in &self.nodes {
            if !hostnames.insert(node.hostname.as_str()) {
                return Err(FleetError::DuplicateHostname(node.hostname.clone()));
            }
            if node.ip.parse::<Ipv4Addr>().is_err() {
                return Err(FleetError::InvalidIp {
                    hostname: node.hostname.clone(),
                    ip: node.ip.clone(),
                });
            }
            if let Some(first) = ips.insert(node.ip.as_str(), node.hostname.as_str()) {
                return Err(FleetError::DuplicateIp {
                    ip: node.ip.clone(),
                    first: first.to_string(),
                    second: node.hostname.clone(),
                });
            }
        }

        tracing::debug!(fleet = %self.name, nodes = self.nodes.len(), "Fleet validated");

        Ok(Fleet {
            name: self.name,
            nodes: self.nodes,
            provision: self.provision,
            shared_folder: self.shared_folder,
        })
    }
}

/// The validated, immutable set of nodes processed in one run.
///
/// Constructed once via [`FleetDoc::validate`] and never mutated
/// afterwards; declaration order is preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fleet {
    pub name: String,
    pub nodes: Vec<NodeSpec>,
    pub provision: ProvisionConfig,
    pub shared_folder: SharedFolder,
}

impl Fleet {
    pub fn node(&self, hostname: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.hostname == hostname)
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.hostname.as_str())
    }
}
