use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use vmfleet_core::Fleet;
use vmfleet_provision::{ChefSolo, FleetLoader};

pub async fn handle(fleet: Fleet, project_root: &Path, skip_provision: bool) -> anyhow::Result<()> {
    let driver = super::connect_driver().await?;

    println!("Fleet: {}", fleet.name.cyan());
    println!();
    println!("{}", format!("Nodes ({}):", fleet.nodes.len()).bold());
    for node in &fleet.nodes {
        println!(
            "  • {} {} ({}, {} MB)",
            node.hostname.cyan(),
            node.ip,
            node.box_image,
            node.effective_ram()
        );
    }
    println!();

    let loader = FleetLoader::new(fleet, project_root, driver, Arc::new(ChefSolo));

    // Ctrl-C abandons the remaining nodes; machines that are already
    // defined are left as-is, not rolled back.
    let report = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("{}", "Interrupted. Defined machines are left as-is.".yellow());
            return Ok(());
        }
        report = run(&loader, skip_provision) => report?,
    };

    super::finish_run(&report)
}

async fn run(
    loader: &FleetLoader,
    skip_provision: bool,
) -> vmfleet_provision::Result<vmfleet_provision::RunReport> {
    if skip_provision {
        println!("{}", "Materializing fleet (provisioning skipped)...".blue());
        Ok(loader.materialize().await)
    } else {
        println!("{}", "Provisioning fleet...".blue());
        loader.up().await
    }
}
