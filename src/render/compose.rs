//! Compose file rendering.
//!
//! Emits one service block per instance (declaration order: dev first,
//! then node 1..N) and a single network with the declared subnet.
//! Commands are emitted inside double quotes; spec validation rejects
//! fragments containing '"' or newlines, so no escaping happens here.
//! Same topology in, byte-identical file out.

use crate::model::Topology;

pub fn render_compose(topology: &Topology) -> String {
    let mut out = String::new();

    out.push_str("version: '3'\n");
    out.push_str("\nservices:\n");

    for svc in &topology.services {
        out.push_str(&format!("\n  {}:\n", svc.name));
        out.push_str(&format!("    image: {}\n", svc.image));
        out.push_str("    ports:\n");
        out.push_str(&format!("      - \"{}\"\n", svc.port));
        if let Some(command) = &svc.command {
            out.push_str(&format!("    command: \"{}\"\n", command));
        }
        if let Some(dep) = &svc.depends_on {
            out.push_str("    depends_on:\n");
            out.push_str(&format!("      - {}\n", dep));
        }
        out.push_str("    networks:\n");
        out.push_str(&format!("      {}:\n", topology.network_name));
        out.push_str(&format!("        ipv4_address: {}\n", svc.address));
    }

    out.push_str("\nnetworks:\n");
    out.push_str(&format!("  {}:\n", topology.network_name));
    out.push_str("    ipam:\n");
    out.push_str("      driver: default\n");
    out.push_str("      config:\n");
    out.push_str(&format!("        - subnet: {}\n", topology.subnet));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build_topology;
    use crate::spec::HarnessSpec;
    use pretty_assertions::assert_eq;

    fn two_node_topology() -> Topology {
        let json = r#"{
            "name": "testnet",
            "image": "example/node:latest",
            "nodes": 2,
            "port": 11500,
            "network": { "subnet": "172.29.1.0/16" },
            "node_command": {
                "run": "node run",
                "mode_flags": ["--federated-only"]
            },
            "dev": { "command": "/bin/bash" }
        }"#;
        let spec: HarnessSpec = serde_json::from_str(json).unwrap();
        build_topology(&spec.validate_and_build().unwrap()).unwrap()
    }

    #[test]
    fn renders_the_full_two_node_file() {
        let expected = r#"version: '3'

services:

  testnet-dev:
    image: example/node:latest
    ports:
      - "11500"
    command: "/bin/bash"
    networks:
      testnet_net:
        ipv4_address: 172.29.1.0

  testnet1:
    image: example/node:latest
    ports:
      - "11500"
    command: "node run --rest-host 172.29.1.1 --rest-port 11500 --federated-only"
    networks:
      testnet_net:
        ipv4_address: 172.29.1.1

  testnet2:
    image: example/node:latest
    ports:
      - "11500"
    command: "node run --rest-host 172.29.1.2 --rest-port 11500 --teacher 172.29.1.1:11500 --federated-only"
    depends_on:
      - testnet1
    networks:
      testnet_net:
        ipv4_address: 172.29.1.2

networks:
  testnet_net:
    ipam:
      driver: default
      config:
        - subnet: 172.29.1.0/16
"#;

        assert_eq!(render_compose(&two_node_topology()), expected);
    }

    #[test]
    fn rendering_is_deterministic() {
        let topology = two_node_topology();
        assert_eq!(render_compose(&topology), render_compose(&topology));
    }

    #[test]
    fn dev_without_command_omits_the_command_line() {
        let mut topology = two_node_topology();
        topology.services[0].command = None;
        let yaml = render_compose(&topology);
        let dev_block: Vec<&str> = yaml
            .lines()
            .skip_while(|l| *l != "  testnet-dev:")
            .take_while(|l| *l != "  testnet1:")
            .collect();
        assert!(!dev_block.iter().any(|l| l.contains("command:")));
    }
}
