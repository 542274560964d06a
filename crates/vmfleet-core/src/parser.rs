use crate::error::{FleetError, Result};
use crate::model::*;
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::{Path, PathBuf};

/// Parse a `fleet.kdl` file into an unvalidated [`FleetDoc`].
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<FleetDoc> {
    let content = fs::read_to_string(path.as_ref())?;
    let name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_kdl_string(&content, name)
}

/// Parse KDL text. `default_name` is used when no `fleet` node names
/// the project.
pub fn parse_kdl_string(content: &str, default_name: String) -> Result<FleetDoc> {
    let doc: KdlDocument = content.parse()?;

    let mut fleet = FleetDoc {
        name: default_name,
        ..Default::default()
    };

    for node in doc.nodes() {
        match node.name().value() {
            "fleet" => {
                if let Some(name) = node.entries().first().and_then(|e| e.value().as_string()) {
                    fleet.name = name.to_string();
                }
            }
            "node" => {
                fleet.nodes.push(parse_node(node)?);
            }
            "provision" => {
                fleet.provision = parse_provision(node);
            }
            "shared-folder" => {
                fleet.shared_folder = parse_shared_folder(node);
            }
            _ => {
                // Unknown top-level nodes are skipped so a fleet file can
                // carry annotations for other tools.
            }
        }
    }

    Ok(fleet)
}

/// Parse a `node` declaration.
///
/// Supported forms:
/// - child nodes: `node "client" { ip "10.0.3.254"; box "..."; ram 512 }`
/// - inline named arguments: `node "client" ip="10.0.3.254" box="..."`
fn parse_node(node: &KdlNode) -> Result<NodeSpec> {
    let hostname = node
        .entries()
        .first()
        .filter(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| FleetError::InvalidConfig("node requires a hostname".to_string()))?
        .to_string();

    let mut ip = node
        .get("ip")
        .and_then(|v| v.as_string())
        .map(|s| s.to_string());
    let mut box_image = node
        .get("box")
        .and_then(|v| v.as_string())
        .map(|s| s.to_string());
    let mut ram = node
        .get("ram")
        .and_then(|v| v.as_integer())
        .map(|v| v as u32);

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "ip" => {
                    ip = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                "box" => {
                    box_image = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                "ram" => {
                    ram = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .map(|v| v as u32);
                }
                _ => {}
            }
        }
    }

    Ok(NodeSpec {
        ip: ip.ok_or_else(|| FleetError::MissingIp(hostname.clone()))?,
        box_image: box_image.ok_or_else(|| FleetError::MissingBox(hostname.clone()))?,
        hostname,
        ram,
    })
}

/// Parse the `provision` block. Absent fields keep their defaults.
fn parse_provision(node: &KdlNode) -> ProvisionConfig {
    let mut provision = ProvisionConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let value = child.entries().first().and_then(|e| e.value().as_string());
            match child.name().value() {
                "environment" => {
                    if let Some(v) = value {
                        provision.environment = v.to_string();
                    }
                }
                "environments-path" => {
                    if let Some(v) = value {
                        provision.environments_path = PathBuf::from(v);
                    }
                }
                "cookbooks-path" => {
                    if let Some(v) = value {
                        provision.cookbooks_path = PathBuf::from(v);
                    }
                }
                _ => {}
            }
        }
    }

    provision
}

/// Parse `shared-folder host="." guest="/vmfleet"`.
///
/// Positional arguments are accepted as a fallback:
/// `shared-folder "." "/vmfleet"`.
fn parse_shared_folder(node: &KdlNode) -> SharedFolder {
    let mut folder = SharedFolder::default();

    if let Some(host) = node
        .get("host")
        .and_then(|v| v.as_string())
        .or_else(|| node.entries().first().and_then(|e| e.value().as_string()))
    {
        folder.host = PathBuf::from(host);
    }

    if let Some(guest) = node
        .get("guest")
        .and_then(|v| v.as_string())
        .or_else(|| node.entries().get(1).and_then(|e| e.value().as_string()))
    {
        folder.guest = PathBuf::from(guest);
    }

    folder
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
fleet "etcd-lab"

node "client" {
    ip "10.0.3.254"
    box "bento/centos-7.1"
}

node "infra0" {
    ip "10.0.3.10"
    box "bento/centos-7.1"
    ram 512
}

provision {
    environment "test"
    environments-path "environments"
    cookbooks-path "cookbooks"
}

shared-folder host="." guest="/vmfleet"
"#;

    #[test]
    fn test_parse_full_fleet() {
        let doc = parse_kdl_string(FULL, "fallback".to_string()).unwrap();

        assert_eq!(doc.name, "etcd-lab");
        assert_eq!(doc.nodes.len(), 2);

        assert_eq!(doc.nodes[0].hostname, "client");
        assert_eq!(doc.nodes[0].ip, "10.0.3.254");
        assert_eq!(doc.nodes[0].box_image, "bento/centos-7.1");
        assert_eq!(doc.nodes[0].ram, None);

        assert_eq!(doc.nodes[1].hostname, "infra0");
        assert_eq!(doc.nodes[1].ram, Some(512));

        assert_eq!(doc.provision.environment, "test");
        assert_eq!(doc.provision.environments_path, PathBuf::from("environments"));
        assert_eq!(doc.shared_folder.guest, PathBuf::from("/vmfleet"));
    }

    #[test]
    fn test_parse_inline_node_args() {
        let doc = parse_kdl_string(
            r#"node "client" ip="10.0.3.254" box="bento/centos-7.1" ram=512"#,
            "inline".to_string(),
        )
        .unwrap();

        assert_eq!(doc.name, "inline");
        assert_eq!(doc.nodes[0].ip, "10.0.3.254");
        assert_eq!(doc.nodes[0].ram, Some(512));
    }

    #[test]
    fn test_child_overrides_inline() {
        let doc = parse_kdl_string(
            r#"node "client" ip="10.0.0.1" box="a" { ip "10.0.3.254" }"#,
            "t".to_string(),
        )
        .unwrap();

        assert_eq!(doc.nodes[0].ip, "10.0.3.254");
    }

    #[test]
    fn test_node_without_ip_fails() {
        let err = parse_kdl_string(r#"node "client" box="bento/centos-7.1""#, "t".to_string())
            .unwrap_err();
        assert!(matches!(err, FleetError::MissingIp(h) if h == "client"));
    }

    #[test]
    fn test_node_without_box_fails() {
        let err =
            parse_kdl_string(r#"node "client" ip="10.0.3.254""#, "t".to_string()).unwrap_err();
        assert!(matches!(err, FleetError::MissingBox(h) if h == "client"));
    }

    #[test]
    fn test_defaults_when_blocks_absent() {
        let doc = parse_kdl_string(
            r#"node "client" ip="10.0.3.254" box="b""#,
            "bare".to_string(),
        )
        .unwrap();

        assert_eq!(doc.provision.environment, "production");
        assert_eq!(doc.shared_folder.host, PathBuf::from("."));
        assert_eq!(doc.shared_folder.guest, PathBuf::from(GUEST_SHARE_PATH));
    }

    #[test]
    fn test_unknown_nodes_skipped() {
        let doc = parse_kdl_string(
            r#"
annotation "ignored"
node "client" ip="10.0.3.254" box="b"
"#,
            "t".to_string(),
        )
        .unwrap();

        assert_eq!(doc.nodes.len(), 1);
    }

    #[test]
    fn test_invalid_kdl_fails() {
        let err = parse_kdl_string(r#"node "unterminated"#, "t".to_string()).unwrap_err();
        assert!(matches!(err, FleetError::KdlParse(_)));
    }
}
