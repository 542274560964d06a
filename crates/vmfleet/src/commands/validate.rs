use colored::Colorize;
use vmfleet_core::{CPU_CAP_PCT, Fleet};

/// Print the validated fleet. Parsing and validation already happened
/// on load, so reaching this point means the descriptor is well-formed.
pub fn handle(fleet: &Fleet) {
    println!("{} fleet.kdl is valid", "✓".green());
    println!();
    println!("Fleet: {}", fleet.name.cyan());
    println!(
        "Environment: {} ({})",
        fleet.provision.environment.cyan(),
        fleet.provision.environments_path.display()
    );
    println!(
        "Shared folder: {} -> {}",
        fleet.shared_folder.host.display(),
        fleet.shared_folder.guest.display()
    );
    println!();
    println!("{}", format!("Nodes ({}):", fleet.nodes.len()).bold());
    for node in &fleet.nodes {
        println!(
            "  • {:<16} {:<15} {} ({} MB, cpu cap {}%)",
            node.hostname.cyan(),
            node.ip,
            node.box_image,
            node.effective_ram(),
            CPU_CAP_PCT
        );
    }
}
