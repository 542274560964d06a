use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use vmfleet_core::Fleet;
use vmfleet_provision::{ChefSolo, FleetLoader, RunReport};

/// Re-run bootstrap and the policy engine on an already-defined fleet.
pub async fn handle(fleet: Fleet, project_root: &Path) -> anyhow::Result<()> {
    let driver = super::connect_driver().await?;

    println!(
        "{}",
        format!("Provisioning {} machine(s)...", fleet.nodes.len()).blue()
    );

    let loader = FleetLoader::new(fleet, project_root, driver, Arc::new(ChefSolo));

    let report = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("{}", "Interrupted. Machines are left as-is.".yellow());
            return Ok(());
        }
        report = run(&loader) => report?,
    };

    super::finish_run(&report)
}

async fn run(loader: &FleetLoader) -> vmfleet_provision::Result<RunReport> {
    let hostnames: Vec<String> = loader.fleet().hostnames().map(String::from).collect();

    let report = loader.bootstrap(&hostnames).await;
    loader.apply_configuration(&report.ok_hostnames()).await?;

    Ok(report)
}
