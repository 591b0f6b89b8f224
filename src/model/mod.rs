//! Topology assembly: turn a validated harness spec into the concrete
//! service instances the compose renderer emits.
//!
//! One dev instance plus N node instances share one network segment.
//! Node 1 is the bootstrap: it starts unconditionally and every other
//! node declares a start-order dependency on it and is handed its fixed
//! address as the discovery seed. Both facts are derived from the same
//! source here, and `verify_topology` re-checks them so a hand-edited
//! topology cannot drift silently.

use crate::Result;
use crate::spec::{Subnet, ValidatedHarness};
use anyhow::bail;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Runs demo scripts against the network; no startup command wiring.
    Dev,
    /// Node 1, the discovery seed for every other node.
    Bootstrap,
    /// Nodes 2..N, started after the bootstrap.
    Node,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub name: String,
    pub role: Role,
    pub image: String,
    pub port: u16,
    pub address: Ipv4Addr,
    pub command: Option<String>,
    pub depends_on: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub project: String,
    pub network_name: String,
    pub subnet: Subnet,
    pub bootstrap: String,
    /// "address:port" of the bootstrap, as passed to dependent nodes.
    pub seed: String,
    /// Declaration order: dev first, then node 1..N.
    pub services: Vec<ServiceInstance>,
}

/// Assemble the service instances for a harness and verify the result.
pub fn build_topology(harness: &ValidatedHarness) -> Result<Topology> {
    let mut services = Vec::with_capacity(harness.nodes + 1);

    services.push(ServiceInstance {
        name: format!("{}-dev", harness.name),
        role: Role::Dev,
        image: harness.image.clone(),
        port: harness.port,
        address: harness.subnet.host_at(0)?,
        command: harness.dev_command.clone(),
        depends_on: None,
    });

    let bootstrap = format!("{}1", harness.name);
    let bootstrap_addr = harness.subnet.host_at(1)?;
    let seed = format!("{}:{}", bootstrap_addr, harness.port);

    let cmd = &harness.node_command;
    for i in 1..=harness.nodes {
        let address = harness.subnet.host_at(i)?;

        let mut command = format!(
            "{} {} {} {} {}",
            cmd.run, cmd.host_flag, address, cmd.port_flag, harness.port
        );
        if i > 1 {
            command.push_str(&format!(" {} {}", cmd.seed_flag, seed));
        }
        for flag in &cmd.mode_flags {
            command.push(' ');
            command.push_str(flag);
        }

        services.push(ServiceInstance {
            name: format!("{}{}", harness.name, i),
            role: if i == 1 { Role::Bootstrap } else { Role::Node },
            image: harness.image.clone(),
            port: harness.port,
            address,
            command: Some(command),
            depends_on: (i > 1).then(|| bootstrap.clone()),
        });
    }

    let topology = Topology {
        project: harness.name.clone(),
        network_name: harness.network_name.clone(),
        subnet: harness.subnet,
        bootstrap,
        seed,
        services,
    };

    verify_topology(&topology)?;
    Ok(topology)
}

/// Structural checks the harness is only valid under:
/// - service names and fixed addresses are distinct,
/// - the declared subnet contains every fixed address,
/// - every non-bootstrap node depends on the bootstrap and names the
///   bootstrap seed in its startup command,
/// - neither the dev instance nor the bootstrap has a dependency.
pub fn verify_topology(topology: &Topology) -> Result<()> {
    let mut names = BTreeSet::new();
    let mut addresses = BTreeSet::new();

    for svc in &topology.services {
        if !names.insert(&svc.name) {
            bail!("duplicate service name: {}", svc.name);
        }
        if !addresses.insert(svc.address) {
            bail!("duplicate fixed address: {} ({})", svc.address, svc.name);
        }
        if !topology.subnet.contains(svc.address) {
            bail!(
                "service {} has address {} outside subnet {}",
                svc.name,
                svc.address,
                topology.subnet
            );
        }

        match svc.role {
            Role::Node => {
                if svc.depends_on.as_deref() != Some(topology.bootstrap.as_str()) {
                    bail!(
                        "node {} must depend on the bootstrap {}, found {:?}",
                        svc.name,
                        topology.bootstrap,
                        svc.depends_on
                    );
                }
                let seeded = svc
                    .command
                    .as_deref()
                    .is_some_and(|c| c.contains(&topology.seed));
                if !seeded {
                    bail!(
                        "node {} does not reference the bootstrap seed {} in its command",
                        svc.name,
                        topology.seed
                    );
                }
            }
            Role::Dev | Role::Bootstrap => {
                if svc.depends_on.is_some() {
                    bail!("{} must not declare a dependency", svc.name);
                }
            }
        }
    }

    if !topology.services.iter().any(|s| s.role == Role::Bootstrap) {
        bail!("topology has no bootstrap instance");
    }

    Ok(())
}
