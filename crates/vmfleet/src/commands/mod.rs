pub mod destroy;
pub mod halt;
pub mod provision;
pub mod status;
pub mod up;
pub mod validate;

use colored::Colorize;
use std::sync::Arc;
use vmfleet_machine::MachineDriver;
use vmfleet_machine_vbox::VirtualBoxDriver;
use vmfleet_provision::RunReport;

/// Build the virtualization driver and fail early when its CLI is
/// missing.
pub async fn connect_driver() -> anyhow::Result<Arc<dyn MachineDriver>> {
    let driver: Arc<dyn MachineDriver> = Arc::new(VirtualBoxDriver::new());

    let status = driver.check_install().await?;
    if !status.available {
        anyhow::bail!(
            "{} is not usable: {}",
            driver.display_name(),
            status.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    if let Some(version) = status.version {
        tracing::debug!(driver = driver.name(), %version, "Driver ready");
    }

    Ok(driver)
}

/// Print per-node outcomes and fail when any node did not make it.
pub fn finish_run(report: &RunReport) -> anyhow::Result<()> {
    println!();
    for outcome in &report.outcomes {
        match &outcome.error {
            None => println!("  {} {}", "✓".green(), outcome.hostname),
            Some(e) => println!("  {} {}: {}", "✗".red(), outcome.hostname.red(), e),
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!("provisioning failed for {failed} node(s)");
    }

    println!();
    println!("{}", "✓ Fleet is up".green().bold());
    Ok(())
}
