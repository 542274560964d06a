use colored::Colorize;
use std::io::Write;
use vmfleet_core::Fleet;
use vmfleet_machine::MachineError;

/// Unregister every fleet machine and delete its media.
pub async fn handle(fleet: &Fleet, yes: bool) -> anyhow::Result<()> {
    if !yes && !confirm(fleet)? {
        println!("{}", "Aborted.".yellow());
        return Ok(());
    }

    let driver = super::connect_driver().await?;

    for node in &fleet.nodes {
        print!("  {} ... ", node.hostname.cyan());
        match driver.destroy(&node.hostname).await {
            Ok(()) => println!("{}", "destroyed".green()),
            Err(MachineError::MachineNotFound(_)) => println!("{}", "not defined".yellow()),
            Err(e) => {
                println!("{}", "failed".red());
                return Err(e.into());
            }
        }
    }

    Ok(())
}

fn confirm(fleet: &Fleet) -> anyhow::Result<bool> {
    println!(
        "{}",
        format!(
            "This deletes {} machine(s) of fleet '{}' including their disks.",
            fleet.nodes.len(),
            fleet.name
        )
        .yellow()
    );
    print!("Continue? [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
