use colored::Colorize;
use std::collections::HashMap;
use vmfleet_core::Fleet;
use vmfleet_machine::MachineState;

/// Show every fleet machine and its run state.
pub async fn handle(fleet: &Fleet) -> anyhow::Result<()> {
    let driver = super::connect_driver().await?;

    let machines: HashMap<String, MachineState> = driver
        .list_machines()
        .await?
        .into_iter()
        .map(|m| (m.name, m.state))
        .collect();

    println!("Fleet: {}", fleet.name.cyan());
    println!();

    for node in &fleet.nodes {
        let state = match machines.get(&node.hostname) {
            Some(MachineState::Running) => "running".green(),
            Some(state) => state.to_string().yellow(),
            None => "not defined".dimmed(),
        };
        println!("  {:<16} {:<15} {}", node.hostname.cyan(), node.ip, state);
    }

    Ok(())
}
