//! Fleet model, configuration parsing and validation for vmfleet.
//!
//! A fleet is declared once in `fleet.kdl`, parsed into a [`FleetDoc`],
//! validated into an immutable [`Fleet`] (load, validate, freeze) and
//! then handed to the provisioning layer. Nothing in this crate talks
//! to a hypervisor.

pub mod discovery;
pub mod error;
pub mod model;
pub mod parser;

pub use discovery::{find_project_root, fleet_file};
pub use error::{FleetError, Result};
pub use model::{
    CPU_CAP_PCT, DEFAULT_RAM_MB, Fleet, FleetDoc, GUEST_SHARE_PATH, NodeSpec, ProvisionConfig,
    SharedFolder,
};
pub use parser::{parse_kdl_file, parse_kdl_string};

/// Load and validate the fleet for a project root.
pub fn load_fleet(project_root: &std::path::Path) -> Result<Fleet> {
    let file = discovery::fleet_file(project_root)
        .ok_or_else(|| FleetError::ProjectRootNotFound(project_root.to_path_buf()))?;
    parser::parse_kdl_file(file)?.validate()
}
