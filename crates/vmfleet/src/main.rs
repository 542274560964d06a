mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vmfleet")]
#[command(about = "Declarative virtual-machine fleet provisioning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Define, bootstrap and converge the whole fleet
    Up {
        /// Define machines only, skip bootstrap and the policy run
        #[arg(long)]
        skip_provision: bool,
    },
    /// Bootstrap and converge already-defined machines
    Provision,
    /// Gracefully power off every fleet machine
    Halt,
    /// Unregister every fleet machine and delete its media
    Destroy {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show fleet machines and their run state
    Status,
    /// Parse and validate fleet.kdl
    Validate,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    // Version needs no fleet file
    if matches!(cli.command, Commands::Version) {
        println!("vmfleet {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let project_root = vmfleet_core::find_project_root()?;
    let fleet = vmfleet_core::load_fleet(&project_root)?;

    match cli.command {
        Commands::Up { skip_provision } => {
            commands::up::handle(fleet, &project_root, skip_provision).await?;
        }
        Commands::Provision => {
            commands::provision::handle(fleet, &project_root).await?;
        }
        Commands::Halt => {
            commands::halt::handle(&fleet).await?;
        }
        Commands::Destroy { yes } => {
            commands::destroy::handle(&fleet, yes).await?;
        }
        Commands::Status => {
            commands::status::handle(&fleet).await?;
        }
        Commands::Validate => {
            commands::validate::handle(&fleet);
        }
        Commands::Version => {
            unreachable!("Version is handled before fleet loading");
        }
    }

    Ok(())
}
