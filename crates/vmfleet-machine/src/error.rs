//! Virtualization driver error types

use thiserror::Error;

/// Errors surfaced by a [`crate::MachineDriver`] implementation.
#[derive(Error, Debug)]
pub enum MachineError {
    #[error("virtualization driver not found: {0}")]
    DriverNotFound(String),

    #[error("base image not found: {0}")]
    ImageNotFound(String),

    #[error("network conflict: ip {ip} collides with an existing interface")]
    NetworkConflict { ip: String },

    #[error("machine not found: {0}")]
    MachineNotFound(String),

    #[error("machine already exists: {0}")]
    MachineAlreadyExists(String),

    #[error("driver command failed: {0}")]
    CommandFailed(String),

    #[error("guest shell exited with status {status}: {stderr}")]
    ShellFailed { status: i32, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MachineError>;
