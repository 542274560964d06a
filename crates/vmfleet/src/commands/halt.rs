use colored::Colorize;
use vmfleet_core::Fleet;
use vmfleet_machine::MachineError;

/// Gracefully power off every fleet machine.
pub async fn handle(fleet: &Fleet) -> anyhow::Result<()> {
    let driver = super::connect_driver().await?;

    for node in &fleet.nodes {
        print!("  {} ... ", node.hostname.cyan());
        match driver.halt(&node.hostname).await {
            Ok(()) => println!("{}", "halted".green()),
            Err(MachineError::MachineNotFound(_)) => println!("{}", "not defined".yellow()),
            Err(e) => {
                println!("{}", "failed".red());
                return Err(e.into());
            }
        }
    }

    Ok(())
}
