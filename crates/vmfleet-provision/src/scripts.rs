//! Built-in bootstrap scripts for vmfleet
//!
//! These run inside every guest before the policy engine, in two
//! separate steps so the install step can be retried on its own.

/// Registers the Chef package-repository signing key.
pub const CHEF_KEY_IMPORT: &str = r#"#!/bin/sh
set -e
rpm --import https://packages.chef.io/chef.asc
"#;

/// Installs the Chef agent from the package mirror.
///
/// Mirror flakiness is expected here; the loader retries this script,
/// not the script itself.
pub const CHEF_INSTALL: &str = r#"#!/bin/sh
set -e
yum install -y chef
"#;

/// The two-step bootstrap sequence executed on every machine.
#[derive(Debug, Clone)]
pub struct BootstrapScript {
    /// Runs once per machine.
    pub signing_key: String,
    /// Retried up to the attempt limit, stopping at first success.
    pub install: String,
}

impl Default for BootstrapScript {
    fn default() -> Self {
        Self {
            signing_key: CHEF_KEY_IMPORT.to_string(),
            install: CHEF_INSTALL.to_string(),
        }
    }
}
