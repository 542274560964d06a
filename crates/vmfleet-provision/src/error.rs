//! Provisioning error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("bootstrap failed on '{hostname}' after {attempts} attempt(s): {detail}")]
    Bootstrap {
        hostname: String,
        attempts: u32,
        detail: String,
    },

    #[error("policy engine failed on '{hostname}': {output}")]
    PolicyApply { hostname: String, output: String },

    #[error("no machine was materialized; nothing to provision")]
    NothingMaterialized,

    #[error(transparent)]
    Machine(#[from] vmfleet_machine::MachineError),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
