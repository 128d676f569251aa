//! Shell command builders for `ovs-vsctl` and `ovs-ofctl` operations.

use ovsagent_common::shell::{self, OVS_OFCTL_CMD, OVS_VSCTL_CMD};

use crate::types::{DatapathType, FailMode, TunnelType, VXLAN_UDP_PORT};

/// Build add-bridge command (idempotent via --may-exist).
pub fn build_add_br_cmd(bridge: &str, datapath_type: DatapathType) -> String {
    format!(
        "{} --may-exist add-br {} -- set Bridge {} datapath_type={}",
        OVS_VSCTL_CMD,
        shell::shellquote(bridge),
        shell::shellquote(bridge),
        datapath_type.as_str()
    )
}

/// Build delete-bridge command.
pub fn build_del_br_cmd(bridge: &str) -> String {
    format!(
        "{} --if-exists del-br {}",
        OVS_VSCTL_CMD,
        shell::shellquote(bridge)
    )
}

/// Build bridge existence check command.
pub fn build_br_exists_cmd(bridge: &str) -> String {
    format!(
        "{} br-exists {}",
        OVS_VSCTL_CMD,
        shell::shellquote(bridge)
    )
}

/// Build set fail-mode command.
pub fn build_set_fail_mode_cmd(bridge: &str, mode: FailMode) -> String {
    format!(
        "{} set-fail-mode {} {}",
        OVS_VSCTL_CMD,
        shell::shellquote(bridge),
        mode.as_str()
    )
}

/// Build set OpenFlow protocols command.
pub fn build_set_protocols_cmd(bridge: &str, protocols: &[&str]) -> String {
    format!(
        "{} set Bridge {} protocols={}",
        OVS_VSCTL_CMD,
        shell::shellquote(bridge),
        protocols.join(",")
    )
}

/// Build add-port command with optional Interface attributes.
///
/// Attributes are rendered as `key=value` pairs on the Interface row,
/// e.g. `type=patch options:peer=patch-int`.
pub fn build_add_port_cmd(bridge: &str, port: &str, iface_attrs: &[(String, String)]) -> String {
    let mut cmd = format!(
        "{} --may-exist add-port {} {}",
        OVS_VSCTL_CMD,
        shell::shellquote(bridge),
        shell::shellquote(port)
    );
    if !iface_attrs.is_empty() {
        let attrs = iface_attrs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        cmd.push_str(&format!(
            " -- set Interface {} {}",
            shell::shellquote(port),
            attrs
        ));
    }
    cmd
}

/// Build delete-port command.
pub fn build_del_port_cmd(bridge: &str, port: &str) -> String {
    format!(
        "{} --if-exists del-port {} {}",
        OVS_VSCTL_CMD,
        shell::shellquote(bridge),
        shell::shellquote(port)
    )
}

/// Build patch port Interface attributes.
pub fn patch_port_attrs(peer: &str) -> Vec<(String, String)> {
    vec![
        ("type".to_string(), "patch".to_string()),
        ("options:peer".to_string(), peer.to_string()),
    ]
}

/// Build tunnel port Interface attributes.
///
/// Flow-based keys are used (`in_key=flow`, `out_key=flow`) so one
/// port carries all tunnels of that type. A custom VXLAN UDP port is
/// only emitted when it differs from the default.
pub fn tunnel_port_attrs(
    tunnel_type: TunnelType,
    remote_ip: &str,
    local_ip: &str,
    vxlan_udp_port: u16,
    dont_fragment: bool,
    tunnel_csum: bool,
) -> Vec<(String, String)> {
    let mut attrs = vec![("type".to_string(), tunnel_type.as_str().to_string())];
    if tunnel_type == TunnelType::Vxlan && vxlan_udp_port != VXLAN_UDP_PORT {
        attrs.push(("options:dst_port".to_string(), vxlan_udp_port.to_string()));
    }
    attrs.push((
        "options:df_default".to_string(),
        dont_fragment.to_string(),
    ));
    attrs.push(("options:remote_ip".to_string(), remote_ip.to_string()));
    attrs.push(("options:local_ip".to_string(), local_ip.to_string()));
    attrs.push(("options:in_key".to_string(), "flow".to_string()));
    attrs.push(("options:out_key".to_string(), "flow".to_string()));
    if tunnel_csum {
        attrs.push(("options:csum".to_string(), "true".to_string()));
    }
    attrs
}

/// Build get-ofport command for an interface.
pub fn build_get_ofport_cmd(port: &str) -> String {
    format!(
        "{} get Interface {} ofport",
        OVS_VSCTL_CMD,
        shell::shellquote(port)
    )
}

/// Build a batched flow mutation command reading expressions from stdin.
pub fn build_ofctl_flow_cmd(subcommand: &str, bridge: &str) -> String {
    format!(
        "{} {} {} -",
        OVS_OFCTL_CMD,
        subcommand,
        shell::shellquote(bridge)
    )
}

/// Build dump-flows command with an optional filter expression.
pub fn build_dump_flows_cmd(bridge: &str, filter: &str) -> String {
    if filter.is_empty() {
        format!("{} dump-flows {}", OVS_OFCTL_CMD, shell::shellquote(bridge))
    } else {
        format!(
            "{} dump-flows {} {}",
            OVS_OFCTL_CMD,
            shell::shellquote(bridge),
            shell::shellquote(filter)
        )
    }
}

/// Build delete-all-flows command.
pub fn build_del_all_flows_cmd(bridge: &str) -> String {
    format!("{} del-flows {}", OVS_OFCTL_CMD, shell::shellquote(bridge))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_add_br_cmd() {
        let cmd = build_add_br_cmd("br-int", DatapathType::System);
        assert!(cmd.contains("--may-exist add-br \"br-int\""));
        assert!(cmd.contains("datapath_type=system"));
    }

    #[test]
    fn test_build_del_br_cmd() {
        let cmd = build_del_br_cmd("br-tun");
        assert!(cmd.contains("--if-exists del-br \"br-tun\""));
    }

    #[test]
    fn test_build_set_fail_mode_cmd() {
        let cmd = build_set_fail_mode_cmd("br-int", FailMode::Secure);
        assert!(cmd.contains("set-fail-mode \"br-int\" secure"));
    }

    #[test]
    fn test_build_set_protocols_cmd() {
        let cmd = build_set_protocols_cmd("br-int", &["OpenFlow10", "OpenFlow13"]);
        assert!(cmd.contains("protocols=OpenFlow10,OpenFlow13"));
    }

    #[test]
    fn test_build_add_port_plain() {
        let cmd = build_add_port_cmd("br-int", "tap123", &[]);
        assert!(cmd.contains("add-port \"br-int\" \"tap123\""));
        assert!(!cmd.contains("set Interface"));
    }

    #[test]
    fn test_build_add_port_with_attrs() {
        let cmd = build_add_port_cmd("br-int", "patch-tun", &patch_port_attrs("patch-int"));
        assert!(cmd.contains("set Interface \"patch-tun\" type=patch options:peer=patch-int"));
    }

    #[test]
    fn test_tunnel_port_attrs_vxlan_default_port() {
        let attrs = tunnel_port_attrs(
            TunnelType::Vxlan,
            "192.168.1.2",
            "192.168.1.1",
            VXLAN_UDP_PORT,
            true,
            false,
        );
        assert!(attrs.iter().any(|(k, v)| k == "type" && v == "vxlan"));
        // Default UDP port must not be emitted.
        assert!(!attrs.iter().any(|(k, _)| k == "options:dst_port"));
        assert!(attrs
            .iter()
            .any(|(k, v)| k == "options:in_key" && v == "flow"));
        assert!(attrs
            .iter()
            .any(|(k, v)| k == "options:df_default" && v == "true"));
    }

    #[test]
    fn test_tunnel_port_attrs_custom_udp_port() {
        let attrs =
            tunnel_port_attrs(TunnelType::Vxlan, "10.0.0.2", "10.0.0.1", 8472, false, true);
        assert!(attrs
            .iter()
            .any(|(k, v)| k == "options:dst_port" && v == "8472"));
        assert!(attrs.iter().any(|(k, v)| k == "options:csum" && v == "true"));
    }

    #[test]
    fn test_build_ofctl_flow_cmd() {
        let cmd = build_ofctl_flow_cmd("add-flows", "br-int");
        assert!(cmd.ends_with("add-flows \"br-int\" -"));
    }

    #[test]
    fn test_build_dump_flows_cmd() {
        let cmd = build_dump_flows_cmd("br-int", "");
        assert!(cmd.ends_with("dump-flows \"br-int\""));

        let cmd = build_dump_flows_cmd("br-int", "cookie=0x1/0xffffffffffffffff");
        assert!(cmd.contains("dump-flows \"br-int\" \"cookie=0x1/"));
    }

    #[test]
    fn test_shellquote_safety() {
        // Dangerous port names must stay inside the quotes.
        let cmd = build_del_port_cmd("br-int", "tap0; rm -rf /");
        assert!(cmd.contains("\"tap0; rm -rf /\""));
    }
}
