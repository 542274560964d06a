//! Policy engine abstraction
//!
//! The policy engine is the external configuration-management system
//! that converges a machine toward its declared policy. vmfleet only
//! triggers a converge run and surfaces its diagnostics.

use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use std::path::Path;
use vmfleet_core::ProvisionConfig;
use vmfleet_machine::MachineDriver;

/// Configuration-management engine run once per machine after the
/// whole fleet is defined.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    /// Returns the engine name (e.g., "chef-solo")
    fn name(&self) -> &str;

    /// Converge one machine toward the named environment.
    ///
    /// A non-zero engine exit is fatal to the run and must carry the
    /// machine name and the engine's diagnostic output.
    async fn converge(
        &self,
        driver: &dyn MachineDriver,
        machine: &str,
        provision: &ProvisionConfig,
        guest_share: &Path,
    ) -> Result<()>;
}

/// Chef Solo engine
///
/// Policy definitions are read from the shared project folder mounted
/// in the guest, so no files are copied to the machine.
#[derive(Debug, Clone, Default)]
pub struct ChefSolo;

impl ChefSolo {
    /// Build the guest-side converge script for one machine.
    fn converge_script(provision: &ProvisionConfig, guest_share: &Path) -> String {
        let cookbooks = guest_share.join(&provision.cookbooks_path);
        let environments = guest_share.join(&provision.environments_path);

        format!(
            r#"#!/bin/sh
set -e
cat > /tmp/vmfleet-solo.rb <<'SOLO'
cookbook_path "{cookbooks}"
environment_path "{environments}"
SOLO
chef-solo -c /tmp/vmfleet-solo.rb -E {environment}
"#,
            cookbooks = cookbooks.display(),
            environments = environments.display(),
            environment = provision.environment,
        )
    }
}

#[async_trait]
impl PolicyEngine for ChefSolo {
    fn name(&self) -> &str {
        "chef-solo"
    }

    async fn converge(
        &self,
        driver: &dyn MachineDriver,
        machine: &str,
        provision: &ProvisionConfig,
        guest_share: &Path,
    ) -> Result<()> {
        let script = Self::converge_script(provision, guest_share);

        tracing::info!(machine, environment = %provision.environment, "Running policy engine");

        let output = driver.run_shell(machine, &script).await?;
        if !output.success() {
            return Err(ProvisionError::PolicyApply {
                hostname: machine.to_string(),
                output: output.diagnostic().to_string(),
            });
        }

        Ok(())
    }
}
