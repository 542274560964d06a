//! Fleet Descriptor Loader
//!
//! Walks a validated [`Fleet`] through the three provisioning stages:
//! materialize (define every machine at the driver), bootstrap
//! (install the policy-engine agent in every guest) and apply
//! (converge every machine against the named environment).
//!
//! Nodes are independent, so materialization runs them concurrently
//! and one node's failure never aborts its siblings. The apply stage
//! only ever starts after every node has been through materialize;
//! that ordering barrier is the one global constraint of a run.

use crate::error::{ProvisionError, Result};
use crate::policy::PolicyEngine;
use crate::scripts::BootstrapScript;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use vmfleet_core::{CPU_CAP_PCT, Fleet, NodeSpec};
use vmfleet_machine::{MachineDriver, MachineError};

/// Maximum agent-install attempts per machine.
pub const BOOTSTRAP_ATTEMPTS: u32 = 3;

/// Result of one node's trip through a provisioning stage.
#[derive(Debug)]
pub struct NodeOutcome {
    pub hostname: String,
    pub error: Option<ProvisionError>,
}

impl NodeOutcome {
    fn ok(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            error: None,
        }
    }

    fn failed(hostname: impl Into<String>, error: ProvisionError) -> Self {
        Self {
            hostname: hostname.into(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-node outcomes of a run, in fleet declaration order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<NodeOutcome>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(NodeOutcome::is_ok)
    }

    pub fn ok_hostnames(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.is_ok())
            .map(|o| o.hostname.clone())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }
}

/// Fleet Descriptor Loader
///
/// Borrowing nothing: the loader owns an [`Arc`] of the driver and the
/// policy engine so node tasks can run on the Tokio runtime.
pub struct FleetLoader {
    fleet: Arc<Fleet>,
    project_root: PathBuf,
    driver: Arc<dyn MachineDriver>,
    engine: Arc<dyn PolicyEngine>,
    bootstrap_script: BootstrapScript,
}

impl FleetLoader {
    pub fn new(
        fleet: Fleet,
        project_root: impl Into<PathBuf>,
        driver: Arc<dyn MachineDriver>,
        engine: Arc<dyn PolicyEngine>,
    ) -> Self {
        Self {
            fleet: Arc::new(fleet),
            project_root: project_root.into(),
            driver,
            engine,
            bootstrap_script: BootstrapScript::default(),
        }
    }

    pub fn with_bootstrap_script(mut self, script: BootstrapScript) -> Self {
        self.bootstrap_script = script;
        self
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Host-side path of the shared folder, resolved against the
    /// project root.
    fn shared_host_path(&self) -> PathBuf {
        self.project_root.join(&self.fleet.shared_folder.host)
    }

    /// Define and configure every machine in the fleet.
    ///
    /// Nodes provision concurrently; a failing node is reported with
    /// its hostname and does not abort the others. Re-running against
    /// already-defined machines is expected to converge, not
    /// duplicate.
    pub async fn materialize(&self) -> RunReport {
        let host = self.shared_host_path();
        let mut set: JoinSet<(String, Result<()>)> = JoinSet::new();

        for node in &self.fleet.nodes {
            let driver = Arc::clone(&self.driver);
            let node = node.clone();
            let host = host.clone();
            let guest = self.fleet.shared_folder.guest.clone();

            set.spawn(async move {
                let result = materialize_node(driver.as_ref(), &node, &host, &guest).await;
                (node.hostname, result)
            });
        }

        let mut results: HashMap<String, Result<()>> = HashMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((hostname, result)) => {
                    results.insert(hostname, result);
                }
                Err(e) => {
                    tracing::error!(error = %e, "materialize task aborted");
                }
            }
        }

        // Report in declaration order, not completion order.
        let outcomes = self
            .fleet
            .nodes
            .iter()
            .map(|node| match results.remove(&node.hostname) {
                Some(Ok(())) => NodeOutcome::ok(&node.hostname),
                Some(Err(e)) => {
                    tracing::warn!(machine = %node.hostname, error = %e, "materialize failed");
                    NodeOutcome::failed(&node.hostname, e)
                }
                None => NodeOutcome::failed(
                    &node.hostname,
                    MachineError::CommandFailed("provisioning task aborted".to_string()).into(),
                ),
            })
            .collect();

        RunReport { outcomes }
    }

    /// Install the policy-engine agent on the given machines.
    ///
    /// The signing-key script runs once per machine; the install
    /// script is retried up to [`BOOTSTRAP_ATTEMPTS`] times, stopping
    /// at the first success. Exhausting the attempts is fatal for that
    /// machine only.
    pub async fn bootstrap(&self, hostnames: &[String]) -> RunReport {
        let mut outcomes = Vec::with_capacity(hostnames.len());

        for hostname in hostnames {
            match self.bootstrap_machine(hostname).await {
                Ok(()) => outcomes.push(NodeOutcome::ok(hostname)),
                Err(e) => {
                    tracing::warn!(machine = %hostname, error = %e, "bootstrap failed");
                    outcomes.push(NodeOutcome::failed(hostname, e));
                }
            }
        }

        RunReport { outcomes }
    }

    async fn bootstrap_machine(&self, hostname: &str) -> Result<()> {
        let key = self
            .driver
            .run_shell(hostname, &self.bootstrap_script.signing_key)
            .await?;
        if !key.success() {
            return Err(ProvisionError::Bootstrap {
                hostname: hostname.to_string(),
                attempts: 0,
                detail: format!("signing key import failed: {}", key.diagnostic()),
            });
        }

        let mut attempts = 0;
        let mut detail = String::new();
        while attempts < BOOTSTRAP_ATTEMPTS {
            attempts += 1;
            let install = self
                .driver
                .run_shell(hostname, &self.bootstrap_script.install)
                .await?;
            if install.success() {
                tracing::info!(machine = %hostname, attempts, "Agent installed");
                return Ok(());
            }
            tracing::warn!(machine = %hostname, attempt = attempts, "Agent install failed");
            detail = install.diagnostic().to_string();
        }

        Err(ProvisionError::Bootstrap {
            hostname: hostname.to_string(),
            attempts,
            detail,
        })
    }

    /// Run the policy engine once per machine.
    ///
    /// Callers must only pass machines that are already defined; a
    /// policy-engine failure is fatal to the whole run.
    pub async fn apply_configuration(&self, hostnames: &[String]) -> Result<()> {
        for hostname in hostnames {
            self.engine
                .converge(
                    self.driver.as_ref(),
                    hostname,
                    &self.fleet.provision,
                    &self.fleet.shared_folder.guest,
                )
                .await?;
        }
        Ok(())
    }

    /// Full provisioning run: materialize, bootstrap, apply.
    ///
    /// All machines are defined before the first converge starts. The
    /// returned report carries per-node failures; a policy-engine
    /// failure or an entirely failed fleet surfaces as `Err`.
    pub async fn up(&self) -> Result<RunReport> {
        let materialized = self.materialize().await;

        let survivors = materialized.ok_hostnames();
        if survivors.is_empty() {
            for outcome in materialized.failures() {
                if let Some(e) = &outcome.error {
                    tracing::error!(machine = %outcome.hostname, error = %e, "node failed");
                }
            }
            return Err(ProvisionError::NothingMaterialized);
        }

        let bootstrapped = self.bootstrap(&survivors).await;
        self.apply_configuration(&bootstrapped.ok_hostnames())
            .await?;

        // Merge: a node's outcome is its first failure in the pipeline.
        let mut bootstrap_errors: HashMap<String, ProvisionError> = bootstrapped
            .outcomes
            .into_iter()
            .filter_map(|o| o.error.map(|e| (o.hostname, e)))
            .collect();

        let outcomes = materialized
            .outcomes
            .into_iter()
            .map(|o| match bootstrap_errors.remove(&o.hostname) {
                Some(e) if o.is_ok() => NodeOutcome::failed(o.hostname, e),
                _ => o,
            })
            .collect();

        Ok(RunReport { outcomes })
    }
}

/// Provision one machine: define, network, limits, shared folder, boot.
async fn materialize_node(
    driver: &dyn MachineDriver,
    node: &NodeSpec,
    host: &std::path::Path,
    guest: &std::path::Path,
) -> Result<()> {
    driver.define_machine(&node.hostname, &node.box_image).await?;
    driver.set_hostname(&node.hostname, &node.hostname).await?;
    driver.add_private_network(&node.hostname, &node.ip).await?;
    driver
        .set_resource_limits(&node.hostname, CPU_CAP_PCT, node.effective_ram())
        .await?;
    driver.mount_shared_folder(&node.hostname, host, guest).await?;
    driver.start(&node.hostname).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ChefSolo;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::Mutex;
    use vmfleet_core::{FleetDoc, FleetError};
    use vmfleet_machine::{DriverStatus, MachineInfo, ShellOutput};

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Define(String),
        Hostname(String),
        Network(String, String),
        Limits(String, u8, u32),
        Mount(String),
        Start(String),
        Shell(String, Script),
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Script {
        SigningKey,
        Install,
        Converge,
    }

    /// Scripted in-memory driver recording every call.
    #[derive(Default)]
    struct MockDriver {
        events: Mutex<Vec<Event>>,
        missing_images: HashSet<String>,
        conflicting_ips: HashSet<String>,
        /// Remaining install failures per machine.
        install_failures: Mutex<HashMap<String, u32>>,
        converge_failures: HashSet<String>,
    }

    impl MockDriver {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn record(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }

        fn with_install_failures(self, machine: &str, count: u32) -> Self {
            self.install_failures
                .lock()
                .unwrap()
                .insert(machine.to_string(), count);
            self
        }

        fn classify(script: &str) -> Script {
            if script.contains("rpm --import") {
                Script::SigningKey
            } else if script.contains("yum install") {
                Script::Install
            } else if script.contains("chef-solo") {
                Script::Converge
            } else {
                panic!("unexpected script: {script}");
            }
        }
    }

    #[async_trait]
    impl MachineDriver for MockDriver {
        fn name(&self) -> &str {
            "mock"
        }

        fn display_name(&self) -> &str {
            "Mock"
        }

        async fn check_install(&self) -> vmfleet_machine::Result<DriverStatus> {
            Ok(DriverStatus::ok("mock-1.0"))
        }

        async fn define_machine(&self, name: &str, image: &str) -> vmfleet_machine::Result<()> {
            if self.missing_images.contains(image) {
                return Err(MachineError::ImageNotFound(image.to_string()));
            }
            self.record(Event::Define(name.to_string()));
            Ok(())
        }

        async fn set_hostname(&self, machine: &str, _hostname: &str) -> vmfleet_machine::Result<()> {
            self.record(Event::Hostname(machine.to_string()));
            Ok(())
        }

        async fn add_private_network(&self, machine: &str, ip: &str) -> vmfleet_machine::Result<()> {
            if self.conflicting_ips.contains(ip) {
                return Err(MachineError::NetworkConflict { ip: ip.to_string() });
            }
            self.record(Event::Network(machine.to_string(), ip.to_string()));
            Ok(())
        }

        async fn set_resource_limits(
            &self,
            machine: &str,
            cpu_cap_pct: u8,
            memory_mb: u32,
        ) -> vmfleet_machine::Result<()> {
            self.record(Event::Limits(machine.to_string(), cpu_cap_pct, memory_mb));
            Ok(())
        }

        async fn mount_shared_folder(
            &self,
            machine: &str,
            _host: &Path,
            _guest: &Path,
        ) -> vmfleet_machine::Result<()> {
            self.record(Event::Mount(machine.to_string()));
            Ok(())
        }

        async fn start(&self, machine: &str) -> vmfleet_machine::Result<()> {
            self.record(Event::Start(machine.to_string()));
            Ok(())
        }

        async fn halt(&self, _machine: &str) -> vmfleet_machine::Result<()> {
            Ok(())
        }

        async fn destroy(&self, _machine: &str) -> vmfleet_machine::Result<()> {
            Ok(())
        }

        async fn run_shell(
            &self,
            machine: &str,
            script: &str,
        ) -> vmfleet_machine::Result<ShellOutput> {
            let kind = Self::classify(script);
            self.record(Event::Shell(machine.to_string(), kind));

            let failed = match kind {
                Script::Install => {
                    let mut failures = self.install_failures.lock().unwrap();
                    match failures.get_mut(machine) {
                        Some(remaining) if *remaining > 0 => {
                            *remaining -= 1;
                            true
                        }
                        _ => false,
                    }
                }
                Script::Converge => self.converge_failures.contains(machine),
                Script::SigningKey => false,
            };

            if failed {
                Ok(ShellOutput {
                    status: 1,
                    stdout: String::new(),
                    stderr: "mirror timeout".to_string(),
                })
            } else {
                Ok(ShellOutput {
                    status: 0,
                    stdout: "ok".to_string(),
                    stderr: String::new(),
                })
            }
        }

        async fn list_machines(&self) -> vmfleet_machine::Result<Vec<MachineInfo>> {
            Ok(Vec::new())
        }
    }

    fn node(hostname: &str, ip: &str, box_image: &str, ram: Option<u32>) -> vmfleet_core::NodeSpec {
        vmfleet_core::NodeSpec {
            hostname: hostname.to_string(),
            ip: ip.to_string(),
            box_image: box_image.to_string(),
            ram,
        }
    }

    fn two_node_fleet() -> Fleet {
        FleetDoc {
            name: "etcd-lab".to_string(),
            nodes: vec![
                node("client", "10.0.3.254", "bento/centos-7.1", None),
                node("infra0", "10.0.3.10", "bento/centos-7.1", None),
            ],
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    fn loader(fleet: Fleet, driver: Arc<MockDriver>) -> FleetLoader {
        FleetLoader::new(fleet, "/project", driver, Arc::new(ChefSolo))
    }

    #[tokio::test]
    async fn test_two_node_scenario() {
        let driver = Arc::new(MockDriver::default());
        let report = loader(two_node_fleet(), Arc::clone(&driver)).up().await.unwrap();

        assert!(report.is_success());

        let events = driver.events();
        let defines: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::Define(_)))
            .collect();
        assert_eq!(defines.len(), 2);

        // Both nodes: default memory, fixed CPU cap, shared folder.
        for machine in ["client", "infra0"] {
            assert!(events.contains(&Event::Limits(machine.to_string(), 40, 256)));
            assert!(events.contains(&Event::Mount(machine.to_string())));
            assert!(events.contains(&Event::Start(machine.to_string())));
        }

        // The policy engine ran exactly once per machine.
        let converges: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::Shell(_, Script::Converge)))
            .collect();
        assert_eq!(converges.len(), 2);
    }

    #[tokio::test]
    async fn test_all_machines_defined_before_first_converge() {
        let driver = Arc::new(MockDriver::default());
        loader(two_node_fleet(), Arc::clone(&driver)).up().await.unwrap();

        let events = driver.events();
        let last_define = events
            .iter()
            .rposition(|e| matches!(e, Event::Define(_)))
            .unwrap();
        let first_converge = events
            .iter()
            .position(|e| matches!(e, Event::Shell(_, Script::Converge)))
            .unwrap();
        assert!(last_define < first_converge);
    }

    #[tokio::test]
    async fn test_explicit_ram_is_used() {
        let fleet = FleetDoc {
            name: "t".to_string(),
            nodes: vec![node("big", "10.0.3.20", "bento/centos-7.1", Some(512))],
            ..Default::default()
        }
        .validate()
        .unwrap();

        let driver = Arc::new(MockDriver::default());
        loader(fleet, Arc::clone(&driver)).materialize().await;

        assert!(driver.events().contains(&Event::Limits("big".to_string(), 40, 512)));
    }

    #[test]
    fn test_duplicate_ip_rejected_before_any_driver_call() {
        let err = FleetDoc {
            name: "t".to_string(),
            nodes: vec![
                node("client", "10.0.3.10", "bento/centos-7.1", None),
                node("infra0", "10.0.3.10", "bento/centos-7.1", None),
            ],
            ..Default::default()
        }
        .validate()
        .unwrap_err();

        // Validation failure means no Fleet, no loader, no side effects.
        assert!(matches!(err, FleetError::DuplicateIp { .. }));
    }

    #[tokio::test]
    async fn test_image_not_found_does_not_abort_siblings() {
        let fleet = FleetDoc {
            name: "t".to_string(),
            nodes: vec![
                node("client", "10.0.3.254", "missing/image", None),
                node("infra0", "10.0.3.10", "bento/centos-7.1", None),
            ],
            ..Default::default()
        }
        .validate()
        .unwrap();

        let driver = Arc::new(MockDriver {
            missing_images: HashSet::from(["missing/image".to_string()]),
            ..Default::default()
        });

        let report = loader(fleet, Arc::clone(&driver)).up().await.unwrap();

        let client = &report.outcomes[0];
        assert_eq!(client.hostname, "client");
        assert!(matches!(
            client.error,
            Some(ProvisionError::Machine(MachineError::ImageNotFound(_)))
        ));

        // The sibling still went all the way to converge.
        let events = driver.events();
        assert!(events.contains(&Event::Start("infra0".to_string())));
        assert!(events.contains(&Event::Shell("infra0".to_string(), Script::Converge)));
        assert!(!events.contains(&Event::Shell("client".to_string(), Script::Converge)));
    }

    #[tokio::test]
    async fn test_network_conflict_is_isolated() {
        let fleet = two_node_fleet();
        let driver = Arc::new(MockDriver {
            conflicting_ips: HashSet::from(["10.0.3.254".to_string()]),
            ..Default::default()
        });

        let report = loader(fleet, Arc::clone(&driver)).up().await.unwrap();

        assert!(matches!(
            report.outcomes[0].error,
            Some(ProvisionError::Machine(MachineError::NetworkConflict { .. }))
        ));
        assert!(report.outcomes[1].is_ok());
    }

    #[tokio::test]
    async fn test_bootstrap_succeeds_first_attempt() {
        let driver = Arc::new(MockDriver::default());
        let l = loader(two_node_fleet(), Arc::clone(&driver));

        let report = l.bootstrap(&["client".to_string()]).await;
        assert!(report.is_success());

        let installs = driver
            .events()
            .iter()
            .filter(|e| **e == Event::Shell("client".to_string(), Script::Install))
            .count();
        assert_eq!(installs, 1);
    }

    #[tokio::test]
    async fn test_bootstrap_retries_until_success() {
        let driver = Arc::new(MockDriver::default().with_install_failures("client", 1));
        let l = loader(two_node_fleet(), Arc::clone(&driver));

        let report = l.bootstrap(&["client".to_string()]).await;
        assert!(report.is_success());

        let installs = driver
            .events()
            .iter()
            .filter(|e| **e == Event::Shell("client".to_string(), Script::Install))
            .count();
        assert_eq!(installs, 2);
    }

    #[tokio::test]
    async fn test_bootstrap_gives_up_after_three_attempts() {
        let driver = Arc::new(MockDriver::default().with_install_failures("client", 5));
        let l = loader(two_node_fleet(), Arc::clone(&driver));

        let report = l.bootstrap(&["client".to_string()]).await;

        let installs = driver
            .events()
            .iter()
            .filter(|e| **e == Event::Shell("client".to_string(), Script::Install))
            .count();
        assert_eq!(installs, 3);

        match &report.outcomes[0].error {
            Some(ProvisionError::Bootstrap {
                hostname, attempts, ..
            }) => {
                assert_eq!(hostname, "client");
                assert_eq!(*attempts, 3);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_failure_excludes_machine_from_converge() {
        let driver = Arc::new(MockDriver::default().with_install_failures("client", 5));
        let report = loader(two_node_fleet(), Arc::clone(&driver)).up().await.unwrap();

        assert!(!report.is_success());
        let events = driver.events();
        assert!(!events.contains(&Event::Shell("client".to_string(), Script::Converge)));
        assert!(events.contains(&Event::Shell("infra0".to_string(), Script::Converge)));
    }

    #[tokio::test]
    async fn test_policy_failure_is_fatal() {
        let driver = Arc::new(MockDriver {
            converge_failures: HashSet::from(["infra0".to_string()]),
            ..Default::default()
        });

        let err = loader(two_node_fleet(), Arc::clone(&driver)).up().await.unwrap_err();

        match err {
            ProvisionError::PolicyApply { hostname, output } => {
                assert_eq!(hostname, "infra0");
                assert_eq!(output, "mirror timeout");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_nothing_materialized() {
        let fleet = FleetDoc {
            name: "t".to_string(),
            nodes: vec![node("client", "10.0.3.254", "missing/image", None)],
            ..Default::default()
        }
        .validate()
        .unwrap();

        let driver = Arc::new(MockDriver {
            missing_images: HashSet::from(["missing/image".to_string()]),
            ..Default::default()
        });

        let err = loader(fleet, driver).up().await.unwrap_err();
        assert!(matches!(err, ProvisionError::NothingMaterialized));
    }
}
