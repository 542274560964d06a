use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("node '{0}' has no ip address")]
    MissingIp(String),

    #[error("node '{0}' has no box image")]
    MissingBox(String),

    #[error("duplicate hostname in fleet: {0}")]
    DuplicateHostname(String),

    #[error("duplicate ip address in fleet: {ip} (nodes '{first}' and '{second}')")]
    DuplicateIp {
        ip: String,
        first: String,
        second: String,
    },

    #[error("invalid ipv4 address for node '{hostname}': {ip}")]
    InvalidIp { hostname: String, ip: String },

    #[error(
        "project root not found\nsearched upward from: {0}\nhint: run inside a directory containing fleet.kdl"
    )]
    ProjectRootNotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, FleetError>;
