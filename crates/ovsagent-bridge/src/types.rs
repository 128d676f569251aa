//! Core types for the OVS bridge layer.

use serde::{Deserialize, Serialize};

/// Return value for an ofport that OVS failed to assign.
pub const INVALID_OFPORT: i32 = -1;

/// Default VXLAN UDP port.
pub const VXLAN_UDP_PORT: u16 = 4789;

/// The two well-known bridge roles in the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeKind {
    /// Primary bridge carrying local virtual network traffic.
    Integration,
    /// Bridge carrying overlay/tunnel-encapsulated traffic.
    Tunnel,
}

impl BridgeKind {
    /// Returns the kind name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeKind::Integration => "integration",
            BridgeKind::Tunnel => "tunnel",
        }
    }
}

/// OVS bridge fail modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    /// Drop traffic when the controller is unreachable.
    Secure,
    /// Act as a learning switch when the controller is unreachable.
    Standalone,
}

impl FailMode {
    /// Returns the mode string as used by `ovs-vsctl set-fail-mode`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailMode::Secure => "secure",
            FailMode::Standalone => "standalone",
        }
    }
}

/// OVS datapath types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatapathType {
    /// Kernel datapath.
    #[default]
    System,
    /// Userspace datapath (DPDK).
    Netdev,
}

impl DatapathType {
    /// Returns the datapath type string for the OVSDB Bridge table.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatapathType::System => "system",
            DatapathType::Netdev => "netdev",
        }
    }
}

/// Supported overlay tunnel types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelType {
    Gre,
    Vxlan,
    Geneve,
}

impl TunnelType {
    /// Returns the interface type string for the OVSDB Interface table.
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelType::Gre => "gre",
            TunnelType::Vxlan => "vxlan",
            TunnelType::Geneve => "geneve",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_kind() {
        assert_eq!(BridgeKind::Integration.as_str(), "integration");
        assert_eq!(BridgeKind::Tunnel.as_str(), "tunnel");
    }

    #[test]
    fn test_fail_mode() {
        assert_eq!(FailMode::Secure.as_str(), "secure");
        assert_eq!(FailMode::Standalone.as_str(), "standalone");
    }

    #[test]
    fn test_datapath_type() {
        assert_eq!(DatapathType::default(), DatapathType::System);
        assert_eq!(DatapathType::Netdev.as_str(), "netdev");
    }

    #[test]
    fn test_tunnel_type() {
        assert_eq!(TunnelType::Gre.as_str(), "gre");
        assert_eq!(TunnelType::Vxlan.as_str(), "vxlan");
        assert_eq!(TunnelType::Geneve.as_str(), "geneve");
    }
}
