//! Project root discovery.
//!
//! Locates the `fleet.kdl` describing the fleet, starting from the
//! current directory.

use crate::error::{FleetError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Detect the project root.
///
/// Search order:
/// 1. the `VMFLEET_PROJECT_ROOT` environment variable
/// 2. upward from the current directory, looking for `fleet.kdl` or
///    `.vmfleet/fleet.kdl`
#[tracing::instrument]
pub fn find_project_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var("VMFLEET_PROJECT_ROOT") {
        let path = PathBuf::from(&root);
        debug!(env_root = %root, "Checking VMFLEET_PROJECT_ROOT");
        if fleet_file(&path).is_some() {
            info!(project_root = %path.display(), "Found project root from environment variable");
            return Ok(path);
        }
    }

    let start_dir = std::env::current_dir()?;
    let mut current = start_dir.clone();
    debug!(start_dir = %start_dir.display(), "Searching for project root");

    loop {
        if fleet_file(&current).is_some() {
            info!(project_root = %current.display(), "Found project root");
            return Ok(current);
        }

        if !current.pop() {
            break;
        }
    }

    warn!(start_dir = %start_dir.display(), "Project root not found");
    Err(FleetError::ProjectRootNotFound(start_dir))
}

/// The fleet file within a project root, if any.
///
/// `fleet.kdl` at the root takes priority over `.vmfleet/fleet.kdl`.
pub fn fleet_file(project_root: &Path) -> Option<PathBuf> {
    let direct = project_root.join("fleet.kdl");
    if direct.exists() {
        return Some(direct);
    }

    let hidden = project_root.join(".vmfleet/fleet.kdl");
    if hidden.exists() {
        return Some(hidden);
    }

    None
}
