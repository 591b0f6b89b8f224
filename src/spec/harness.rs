//! Harness spec (harness.json): the local test network description.
//!
//! JSON shape:
//! {
//!   "name": "nucypher",              // service name prefix
//!   "image": "circle:nucypher",      // backing image for every instance
//!   "nodes": 4,                       // node instances; node 1 is the bootstrap
//!   "port": 11500,                    // REST port, published on every instance
//!   "network": { "name": "nucypher_net", "subnet": "172.29.1.0/16" },
//!   "node_command": {
//!     "run": "nucypher ursula run",   // opaque node binary + subcommand
//!     "host_flag": "--rest-host",
//!     "port_flag": "--rest-port",
//!     "seed_flag": "--teacher",       // receives the bootstrap address:port
//!     "mode_flags": ["--federated-only"]
//!   },
//!   "dev": { "command": "/bin/bash" } // optional; omitted => image default
//! }
//!
//! We validate names, parse the subnet, and hand the result to topology
//! assembly, which draws the fixed addresses (dev at base+0, node i at
//! base+i) and wires every non-bootstrap node to the bootstrap.

use crate::Result;
use crate::spec::Subnet;
use anyhow::bail;
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct HarnessSpec {
    pub name: String,

    pub image: String,

    #[serde(default = "default_nodes")]
    pub nodes: usize,

    pub port: u16,

    pub network: NetworkSpec,

    pub node_command: NodeCommandSpec,

    #[serde(default)]
    pub dev: DevSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSpec {
    #[serde(default)]
    pub name: Option<String>,

    pub subnet: String,
}

/// How a node instance's startup command is assembled.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeCommandSpec {
    pub run: String,

    #[serde(default = "default_host_flag")]
    pub host_flag: String,

    #[serde(default = "default_port_flag")]
    pub port_flag: String,

    #[serde(default = "default_seed_flag")]
    pub seed_flag: String,

    #[serde(default)]
    pub mode_flags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevSpec {
    #[serde(default)]
    pub command: Option<String>,
}

/// Validated harness spec, ready for topology assembly.
#[derive(Debug, Clone)]
pub struct ValidatedHarness {
    pub name: String,
    pub image: String,
    pub nodes: usize,
    pub port: u16,
    pub network_name: String,
    pub subnet: Subnet,
    pub node_command: NodeCommandSpec,
    pub dev_command: Option<String>,
}

// Service names end up as compose keys; keep them to the safe subset.
const NAME_RE: &str = r"^[a-z0-9][a-z0-9_-]*$";

impl HarnessSpec {
    /// Check field-level constraints and normalize into a ValidatedHarness.
    pub fn validate_and_build(&self) -> Result<ValidatedHarness> {
        let name_re = Regex::new(NAME_RE)?;

        if !name_re.is_match(&self.name) {
            bail!(
                "harness name must match {} (lowercase, digits, '-', '_'): {:?}",
                NAME_RE,
                self.name
            );
        }

        let network_name = self
            .network
            .name
            .clone()
            .unwrap_or_else(|| format!("{}_net", self.name));
        if !name_re.is_match(&network_name) {
            bail!("network name must match {}: {:?}", NAME_RE, network_name);
        }

        if self.image.trim().is_empty() || self.image.contains(char::is_whitespace) {
            bail!("image must be a single non-empty reference: {:?}", self.image);
        }

        if self.nodes == 0 {
            bail!("harness needs at least one node instance (the bootstrap)");
        }

        if self.port == 0 {
            bail!("port must be non-zero");
        }

        let subnet = Subnet::parse(&self.network.subnet)?;

        let cmd = &self.node_command;
        if cmd.run.trim().is_empty() {
            bail!("node_command.run cannot be empty");
        }
        for flag in [&cmd.host_flag, &cmd.port_flag, &cmd.seed_flag] {
            if flag.trim().is_empty() || flag.contains(char::is_whitespace) {
                bail!("node_command flags must be single tokens: {:?}", flag);
            }
        }

        // Commands are emitted inside double quotes in the compose file.
        let mut fragments: Vec<&str> = vec![cmd.run.as_str()];
        fragments.extend(cmd.mode_flags.iter().map(String::as_str));
        if let Some(dev_cmd) = &self.dev.command {
            fragments.push(dev_cmd.as_str());
        }
        for fragment in fragments {
            if fragment.contains('"') || fragment.contains('\n') {
                bail!("command fragments cannot contain '\"' or newlines: {:?}", fragment);
            }
            if fragment.trim().is_empty() {
                bail!("command fragments cannot be empty");
            }
        }

        Ok(ValidatedHarness {
            name: self.name.clone(),
            image: self.image.clone(),
            nodes: self.nodes,
            port: self.port,
            network_name,
            subnet,
            node_command: cmd.clone(),
            dev_command: self.dev.command.clone(),
        })
    }
}

// Default value functions

fn default_nodes() -> usize {
    4
}

fn default_host_flag() -> String {
    "--rest-host".to_string()
}

fn default_port_flag() -> String {
    "--rest-port".to_string()
}

fn default_seed_flag() -> String {
    "--teacher".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec_json() -> &'static str {
        r#"{
            "name": "testnet",
            "image": "example/node:latest",
            "nodes": 4,
            "port": 11500,
            "network": { "subnet": "172.29.1.0/16" },
            "node_command": {
                "run": "node run",
                "mode_flags": ["--federated-only"]
            },
            "dev": { "command": "/bin/bash" }
        }"#
    }

    #[test]
    fn parse_applies_flag_defaults() {
        let spec: HarnessSpec = serde_json::from_str(spec_json()).unwrap();
        let harness = spec.validate_and_build().unwrap();

        assert_eq!(harness.network_name, "testnet_net");
        assert_eq!(harness.node_command.host_flag, "--rest-host");
        assert_eq!(harness.node_command.seed_flag, "--teacher");
        assert_eq!(harness.subnet.to_string(), "172.29.1.0/16");
        assert_eq!(harness.dev_command.as_deref(), Some("/bin/bash"));
    }

    #[test]
    fn rejects_bad_harness_name() {
        let mut spec: HarnessSpec = serde_json::from_str(spec_json()).unwrap();
        spec.name = "Test Net".to_string();
        assert!(spec.validate_and_build().is_err());
    }

    #[test]
    fn rejects_zero_nodes() {
        let mut spec: HarnessSpec = serde_json::from_str(spec_json()).unwrap();
        spec.nodes = 0;
        assert!(spec.validate_and_build().is_err());
    }

    #[test]
    fn rejects_quotes_in_command_fragments() {
        let mut spec: HarnessSpec = serde_json::from_str(spec_json()).unwrap();
        spec.dev.command = Some(r#"echo "hi""#.to_string());
        assert!(spec.validate_and_build().is_err());
    }

    #[test]
    fn rejects_multi_token_flags() {
        let mut spec: HarnessSpec = serde_json::from_str(spec_json()).unwrap();
        spec.node_command.seed_flag = "--teacher uri".to_string();
        assert!(spec.validate_and_build().is_err());
    }
}
